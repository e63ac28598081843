//! One wake-measure-upload-sleep cycle.
//!
//! [`Station`] owns every collaborator plus the state that outlives a single
//! cycle. The caller drives it: `run_cycle`, sleep for
//! [`Station::sleep_duration`], then `wake`.

use core::future::Future;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app_state::{AppRunState, CycleIssue, CycleIssues, CycleState};
use crate::clock::{Clock, TimeOfDay};
use crate::config::StationConfig;
use crate::device::{SleepCounter, SystemInfo};
use crate::poll::PollOutcome;
use crate::sensors::{
    BatteryMonitor, BatteryProbe, ClimateReading, LightSensor, MeasurementTiming,
    TriggeredSensor, measure_triggered,
};
use crate::status::{DeviceSnapshot, StatusRecord, encode};
use crate::upload::{StatusCode, UploadClient};

/// Network link used for the upload. Association waits are the
/// implementation's business.
pub trait Connectivity {
    /// `true` once the link is usable.
    fn connect(&mut self) -> impl Future<Output = bool>;

    fn disconnect(&mut self) -> impl Future<Output = ()>;
}

/// The hardware and services a [`Station`] talks to.
pub struct StationParts<N, K, C, L, B, S, U, D> {
    pub network: N,
    pub clock: K,
    pub climate: C,
    pub light: L,
    pub battery: B,
    pub system: S,
    pub uploader: U,
    pub delay: D,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub snapshot: DeviceSnapshot,
    pub record: StatusRecord,
    /// `None` when the upload was skipped because the network was down.
    pub upload: Option<StatusCode>,
    pub issues: CycleIssues,
}

impl CycleReport {
    pub fn uploaded(&self) -> bool {
        self.upload.is_some_and(StatusCode::is_success)
    }
}

pub struct Station<N, K, C, L, B, S, U, D> {
    parts: StationParts<N, K, C, L, B, S, U, D>,
    config: StationConfig,
    monitor: BatteryMonitor,
    timing: MeasurementTiming,
    counter: SleepCounter,
    state: CycleState,
    run_state: AppRunState,
}

fn note(issues: &mut CycleIssues, issue: CycleIssue) {
    warn!("{}", issue);
    if issues.push(issue).is_err() {
        warn!("cycle issue list full, dropping: {}", issue);
    }
}

impl<N, K, C, L, B, S, U, D> Station<N, K, C, L, B, S, U, D>
where
    N: Connectivity,
    K: Clock,
    C: TriggeredSensor<Reading = ClimateReading>,
    L: LightSensor,
    B: BatteryProbe,
    S: SystemInfo,
    U: UploadClient,
    D: DelayNs,
{
    pub fn new(
        parts: StationParts<N, K, C, L, B, S, U, D>,
        config: StationConfig,
        counter: SleepCounter,
    ) -> Self {
        Self {
            monitor: BatteryMonitor::from(&config.battery),
            timing: MeasurementTiming::from(&config.sampling),
            parts,
            config,
            counter,
            state: CycleState::default(),
            run_state: AppRunState::Uninitialized,
        }
    }

    pub const fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub const fn sleep_counter(&self) -> SleepCounter {
        self.counter
    }

    pub const fn last_readings(&self) -> &CycleState {
        &self.state
    }

    pub const fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn parts(&self) -> &StationParts<N, K, C, L, B, S, U, D> {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut StationParts<N, K, C, L, B, S, U, D> {
        &mut self.parts
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.config.schedule.sleep_interval_secs))
    }

    /// Run one cycle. Never fails; problems end up in
    /// [`CycleReport::issues`].
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut issues = CycleIssues::new();
        info!("Sleep count = {}", self.counter.value());

        self.run_state = AppRunState::Connecting;
        let connected = self.parts.network.connect().await;
        if !connected {
            note(&mut issues, CycleIssue::ConnectivityUnavailable);
        }

        self.run_state = AppRunState::Measuring;
        self.measure_climate(&mut issues);
        self.measure_light(&mut issues);
        self.measure_battery(&mut issues);

        let time = self.parts.clock.try_get_local_time().await;
        if time.is_none() {
            note(&mut issues, CycleIssue::TimeUnavailable);
        }
        let snapshot = self.snapshot(time);
        let record = encode(&snapshot, self.config.layout.layout());
        info!("status {}", record);

        let upload = if connected {
            self.run_state = AppRunState::Uploading;
            let code = self
                .parts
                .uploader
                .publish(&record, &self.state.fields())
                .await;
            if code.is_success() {
                info!("channel {} updated", self.config.channel.channel_id);
            } else {
                note(&mut issues, CycleIssue::UploadRejected { code });
            }
            Some(code)
        } else {
            None
        };

        self.parts.network.disconnect().await;
        self.run_state = AppRunState::Sleeping;

        CycleReport {
            snapshot,
            record,
            upload,
            issues,
        }
    }

    /// Call after the sleep period ends.
    pub fn wake(&mut self) -> SleepCounter {
        self.counter.advance();
        info!("woke up, sleep count {}", self.counter.value());
        self.counter
    }

    fn snapshot(&self, time: Option<TimeOfDay>) -> DeviceSnapshot {
        DeviceSnapshot {
            time,
            reset_reason_code: self.parts.system.reset_reason().code(),
            wake_cause_code: self.parts.system.wake_cause().code(),
            sleep_cycle_count: self.counter.value(),
            battery_voltage: self.state.battery_voltage,
            light_gain_time_index: self.state.light_gain_time_index(),
        }
    }

    fn measure_climate(&mut self, issues: &mut CycleIssues) {
        match measure_triggered(&mut self.parts.climate, &self.timing, &mut self.parts.delay) {
            Ok((reading, outcome)) => {
                if outcome == PollOutcome::TimedOut {
                    note(issues, CycleIssue::PollTimeout { sensor: C::NAME });
                }
                info!(
                    "{}: {:.2} C, {:.2} mmHg, {:.2} %",
                    C::NAME,
                    reading.temperature_c,
                    reading.pressure_mmhg,
                    reading.humidity_pct
                );
                self.state.climate = reading;
            }
            Err(e) => {
                warn!("{}", e);
                note(issues, CycleIssue::SensorAbsent { sensor: C::NAME });
            }
        }
    }

    fn measure_light(&mut self, issues: &mut CycleIssues) {
        match self.parts.light.read_light() {
            Ok(reading) => {
                info!("light: {:.2} lx ({})", reading.lux, reading.setting);
                self.state.light = Some(reading);
            }
            Err(e) => {
                warn!("{}", e);
                note(issues, CycleIssue::SensorAbsent { sensor: e.sensor() });
            }
        }
    }

    fn measure_battery(&mut self, issues: &mut CycleIssues) {
        match self.monitor.read(&mut self.parts.battery) {
            Ok(volts) => {
                info!("Vbat = {:.2} V", volts);
                self.state.battery_voltage = volts;
            }
            Err(e) => {
                warn!("{}", e);
                note(issues, CycleIssue::SensorAbsent { sensor: e.sensor() });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ResetReason, WakeCause};
    use crate::poll::tests::RecordingDelay;
    use crate::sensors::tests::FakeClimate;
    use crate::sensors::{LightReading, LightSetting, SensorError};
    use crate::status::{FieldLayout, FieldSource, LayoutVersion};
    use embassy_futures::block_on;
    use heapless::String;

    #[derive(Default)]
    struct MockNetwork {
        offline: bool,
        connects: u32,
        disconnects: u32,
    }

    impl Connectivity for MockNetwork {
        async fn connect(&mut self) -> bool {
            self.connects += 1;
            !self.offline
        }

        async fn disconnect(&mut self) {
            self.disconnects += 1;
        }
    }

    struct MockClock(Option<TimeOfDay>);

    impl Clock for MockClock {
        async fn try_get_local_time(&mut self) -> Option<TimeOfDay> {
            self.0
        }
    }

    struct MockLight(Result<LightReading, SensorError>);

    impl LightSensor for MockLight {
        fn read_light(&mut self) -> Result<LightReading, SensorError> {
            self.0
        }
    }

    struct MockBattery(Result<u16, SensorError>);

    impl BatteryProbe for MockBattery {
        fn read_raw(&mut self) -> Result<u16, SensorError> {
            self.0
        }
    }

    struct MockSystem;

    impl SystemInfo for MockSystem {
        fn reset_reason(&self) -> ResetReason {
            ResetReason::PowerOn
        }

        fn wake_cause(&self) -> WakeCause {
            WakeCause::Timer
        }
    }

    struct MockUploader {
        code: StatusCode,
        calls: u32,
        status: String<32>,
        fields: [f32; 5],
    }

    impl MockUploader {
        fn answering(code: StatusCode) -> Self {
            Self {
                code,
                calls: 0,
                status: String::new(),
                fields: [0.0; 5],
            }
        }
    }

    impl UploadClient for MockUploader {
        async fn publish(&mut self, status: &StatusRecord, fields: &[f32]) -> StatusCode {
            self.calls += 1;
            self.status = String::try_from(status.as_str()).unwrap();
            self.fields.copy_from_slice(fields);
            self.code
        }
    }

    type TestStation = Station<
        MockNetwork,
        MockClock,
        FakeClimate,
        MockLight,
        MockBattery,
        MockSystem,
        MockUploader,
        RecordingDelay,
    >;

    // 2909 counts is 4.119 V through the default divider.
    const BATTERY_RAW: u16 = 2909;

    fn light_reading() -> LightReading {
        LightReading {
            lux: 321.0,
            setting: LightSetting::INITIAL,
        }
    }

    fn station() -> TestStation {
        let parts = StationParts {
            network: MockNetwork::default(),
            clock: MockClock(Some(TimeOfDay::new(9, 5, 3))),
            climate: FakeClimate::ready_after(2),
            light: MockLight(Ok(light_reading())),
            battery: MockBattery(Ok(BATTERY_RAW)),
            system: MockSystem,
            uploader: MockUploader::answering(StatusCode::OK),
            delay: RecordingDelay::default(),
        };
        Station::new(parts, StationConfig::default(), SleepCounter::restore(18))
    }

    #[test]
    fn test_happy_path() {
        let mut station = station();
        let report = block_on(station.run_cycle());

        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report.uploaded());
        assert_eq!(report.record.as_str(), "090503-r1s4z12b412c02");

        let parts = station.parts();
        assert_eq!(parts.uploader.calls, 1);
        assert_eq!(parts.uploader.status.as_str(), report.record.as_str());
        let [t, p, h, lux, vbat] = parts.uploader.fields;
        assert_eq!((t, p, h), (21.5, 751.2, 43.0));
        assert_eq!(lux, 321.0);
        assert!((vbat - 4.119).abs() < 1e-3);
        assert_eq!(parts.network.connects, 1);
        assert_eq!(parts.network.disconnects, 1);
        assert_eq!(station.run_state(), AppRunState::Sleeping);
    }

    #[test]
    fn test_legacy_layout_omits_battery() {
        let mut station = station();
        station.config.layout = LayoutVersion::Legacy;
        station.parts_mut().light = MockLight(Ok(LightReading {
            lux: 12.0,
            setting: LightSetting::from_gain_time_index(0x23).unwrap(),
        }));
        let report = block_on(station.run_cycle());
        assert_eq!(report.record.as_str(), "090503-c23r1s4z12");
    }

    #[test]
    fn test_time_unavailable_keeps_placeholder() {
        let mut station = station();
        station.parts_mut().clock = MockClock(None);
        let report = block_on(station.run_cycle());

        assert_eq!(report.issues.as_slice(), &[CycleIssue::TimeUnavailable]);
        assert_eq!(report.record.as_str(), "______-r1s4z12b412c02");
        assert_eq!(
            report.record.field(&FieldLayout::EXTENDED, FieldSource::Hour),
            Ok(None)
        );
        assert!(report.uploaded());
    }

    #[test]
    fn test_poll_timeout_still_reads() {
        let mut station = station();
        station.parts_mut().climate = FakeClimate::ready_after(u32::MAX);
        let report = block_on(station.run_cycle());

        assert_eq!(
            report.issues.as_slice(),
            &[CycleIssue::PollTimeout { sensor: "BME280" }]
        );
        assert_eq!(station.last_readings().climate.temperature_c, 21.5);
        assert_eq!(station.parts().climate.checks, 100);
        assert!(report.uploaded());
    }

    #[test]
    fn test_failed_sensors_reuse_previous_readings() {
        let mut station = station();
        block_on(station.run_cycle());

        station.parts_mut().climate.present = false;
        station.parts_mut().light = MockLight(Err(SensorError::ReadFailed {
            sensor: "VEML7700",
            operation: "read ALS",
            details: "nack",
        }));
        station.parts_mut().battery = MockBattery(Err(SensorError::NotFound { sensor: "ADC" }));
        let report = block_on(station.run_cycle());

        assert_eq!(
            report.issues.as_slice(),
            &[
                CycleIssue::SensorAbsent { sensor: "BME280" },
                CycleIssue::SensorAbsent { sensor: "VEML7700" },
                CycleIssue::SensorAbsent { sensor: "ADC" },
            ]
        );
        assert_eq!(station.parts().uploader.fields[0], 21.5);
        assert_eq!(station.parts().uploader.fields[3], 321.0);
        assert_eq!(report.record.as_str(), "090503-r1s4z12b412c02");
    }

    #[test]
    fn test_no_light_reading_leaves_placeholder() {
        let mut station = station();
        station.parts_mut().light = MockLight(Err(SensorError::NotFound { sensor: "VEML7700" }));
        let report = block_on(station.run_cycle());
        assert_eq!(report.record.as_str(), "090503-r1s4z12b412cFF");
        assert_eq!(station.parts().uploader.fields[3], 0.0);
    }

    #[test]
    fn test_upload_rejected_is_reported() {
        let mut station = station();
        station.parts_mut().uploader = MockUploader::answering(StatusCode::TIMEOUT);
        let report = block_on(station.run_cycle());

        assert_eq!(report.upload, Some(StatusCode(-304)));
        assert!(!report.uploaded());
        assert_eq!(
            report.issues.as_slice(),
            &[CycleIssue::UploadRejected {
                code: StatusCode::TIMEOUT
            }]
        );
        assert_eq!(station.parts().network.disconnects, 1);
    }

    #[test]
    fn test_offline_skips_upload() {
        let mut station = station();
        station.parts_mut().network.offline = true;
        let report = block_on(station.run_cycle());

        assert_eq!(report.upload, None);
        assert_eq!(station.parts().uploader.calls, 0);
        assert_eq!(
            report.issues.as_slice(),
            &[CycleIssue::ConnectivityUnavailable]
        );
        // Measurements still happen.
        assert_eq!(station.parts().climate.triggers, 1);
        assert_eq!(station.parts().network.disconnects, 1);
    }

    #[test]
    fn test_sleep_counter_advances_and_wraps() {
        let mut station = station();
        assert_eq!(station.wake().value(), 19);
        let report = block_on(station.run_cycle());
        assert_eq!(report.snapshot.sleep_cycle_count, 19);
        assert_eq!(report.record.as_str(), "090503-r1s4z13b412c02");

        let parts = station.parts;
        let mut station = Station::new(parts, StationConfig::default(), SleepCounter::restore(255));
        assert_eq!(station.wake(), SleepCounter::cold_boot());
        let report = block_on(station.run_cycle());
        assert_eq!(report.snapshot.sleep_cycle_count, 0);
        assert_eq!(
            report.record.field(&FieldLayout::EXTENDED, FieldSource::SleepCycles),
            Ok(Some(0))
        );
    }

    #[test]
    fn test_sleep_duration_from_config() {
        assert_eq!(station().sleep_duration(), Duration::from_secs(600));
    }
}

//! Synthetic collaborators for the station core.
//!
//! Everything shares one [`SimWorld`], a virtual clock that advances by the
//! configured sleep interval after each cycle, so a day of operation runs in
//! a few seconds.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info};

use station_core::clock::{Clock, SyncedClock, TimeOfDay, UtcOffset};
use station_core::cycle::Connectivity;
use station_core::device::{ResetReason, SystemInfo, WakeCause};
use station_core::sensors::light::auto_range;
use station_core::sensors::{
    BatteryProbe, ClimateReading, LightReading, LightSensor, RawClimate, SensorError,
    TriggeredSensor,
};
use station_core::status::{StatusRecord, decode};
use station_core::upload::{StatusCode, ThingSpeakUpdate, UploadClient, parse_response};

use embassy_time::Instant;

/// Shared virtual time and cycle number.
#[derive(Clone, Default)]
pub struct SimWorld {
    seconds: Rc<Cell<u64>>,
    cycle: Rc<Cell<u32>>,
}

impl SimWorld {
    pub fn elapsed_secs(&self) -> u64 {
        self.seconds.get()
    }

    pub fn cycle(&self) -> u32 {
        self.cycle.get()
    }

    pub fn advance(&self, secs: u64) {
        self.seconds.set(self.seconds.get() + secs);
        self.cycle.set(self.cycle.get() + 1);
    }

    fn now(&self) -> Instant {
        Instant::from_secs(self.elapsed_secs())
    }

    /// Fraction of a day, used to shape the synthetic signals.
    fn day_phase(&self) -> f64 {
        (self.elapsed_secs() % 86_400) as f64 / 86_400.0 * std::f64::consts::TAU
    }
}

/// WiFi that drops out every `outage_every` cycles.
pub struct SimNetwork {
    pub world: SimWorld,
    pub outage_every: u32,
    connected: bool,
}

impl SimNetwork {
    pub fn new(world: SimWorld, outage_every: u32) -> Self {
        Self {
            world,
            outage_every,
            connected: false,
        }
    }
}

impl Connectivity for SimNetwork {
    async fn connect(&mut self) -> bool {
        let cycle = self.world.cycle();
        self.connected = self.outage_every == 0 || (cycle + 1) % self.outage_every != 0;
        if self.connected {
            info!("WiFi connected");
        } else {
            info!("WiFi didn't connect");
        }
        self.connected
    }

    async fn disconnect(&mut self) {
        if self.connected {
            debug!("WiFi disconnect");
        }
        self.connected = false;
    }
}

/// SNTP-anchored clock that only syncs once the network has come up.
pub struct SimClock {
    world: SimWorld,
    clock: SyncedClock,
    boot_unix_secs: u64,
}

impl SimClock {
    pub fn new(world: SimWorld, offset: UtcOffset, boot_unix_secs: u64) -> Self {
        Self {
            world,
            clock: SyncedClock::new(offset),
            boot_unix_secs,
        }
    }
}

impl Clock for SimClock {
    async fn try_get_local_time(&mut self) -> Option<TimeOfDay> {
        // The first cycle runs before any time server has answered.
        if !self.clock.is_synced() && self.world.cycle() > 0 {
            let now = self.world.now();
            self.clock
                .sync(self.boot_unix_secs + self.world.elapsed_secs(), now);
        }
        self.clock.time_at(self.world.now())
    }
}

/// BME280 stand-in reporting through the fixed-point interface.
pub struct SimBme280 {
    world: SimWorld,
    busy_checks: u32,
    checks: u32,
}

impl SimBme280 {
    pub fn new(world: SimWorld, busy_checks: u32) -> Self {
        Self {
            world,
            busy_checks,
            checks: 0,
        }
    }
}

impl TriggeredSensor for SimBme280 {
    type Reading = ClimateReading;
    const NAME: &'static str = "BME280";

    fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        self.checks = 0;
        Ok(())
    }

    fn is_measurement_complete(&mut self) -> Result<bool, SensorError> {
        self.checks += 1;
        Ok(self.checks > self.busy_checks)
    }

    fn read_result(&mut self) -> Result<ClimateReading, SensorError> {
        let phase = self.world.day_phase();
        let temperature = 14.0 - 6.0 * phase.cos();
        let pressure_pa = 100_400.0 + 350.0 * (phase / 3.0).sin();
        let humidity = 62.0 + 18.0 * phase.cos();

        Ok(ClimateReading::from_raw(RawClimate {
            temperature_centi_c: (temperature * 100.0) as i32,
            pressure_centi_pa: (pressure_pa * 100.0) as u32,
            humidity_milli_pct: (humidity * 1000.0) as u32,
        }))
    }
}

/// VEML7700 stand-in: converts a synthetic lux level to counts for whatever
/// setting auto ranging asks for.
pub struct SimVeml7700 {
    world: SimWorld,
}

impl SimVeml7700 {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }

    fn ambient_lux(&self) -> f64 {
        // Daylight between 06:00 and 18:00, a little stray light at night.
        let daylight = (self.world.day_phase() - std::f64::consts::FRAC_PI_2).sin();
        if daylight > 0.0 { 40_000.0 * daylight } else { 0.2 }
    }
}

impl LightSensor for SimVeml7700 {
    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        let lux = self.ambient_lux();
        auto_range(|setting| {
            let counts = lux / f64::from(setting.resolution());
            Ok(counts.min(f64::from(u16::MAX)) as u16)
        })
    }
}

/// Battery slowly discharging from 4.2 V.
pub struct SimBattery {
    world: SimWorld,
}

impl SimBattery {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl BatteryProbe for SimBattery {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let volts = 4.2 - self.world.elapsed_secs() as f64 * 1.0e-6;
        Ok((volts.max(0.0) * 4096.0 / 5.8) as u16)
    }
}

pub struct SimSystem {
    world: SimWorld,
}

impl SimSystem {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl SystemInfo for SimSystem {
    fn reset_reason(&self) -> ResetReason {
        ResetReason::PowerOn
    }

    fn wake_cause(&self) -> WakeCause {
        if self.world.cycle() == 0 {
            WakeCause::Undefined
        } else {
            WakeCause::Timer
        }
    }
}

/// Builds the real request, then answers like the ThingSpeak server would.
pub struct SimUploader {
    api_key: String,
    entry_id: u32,
    layout: &'static station_core::status::FieldLayout,
}

impl SimUploader {
    pub fn new(api_key: &str, layout: &'static station_core::status::FieldLayout) -> Self {
        Self {
            api_key: api_key.to_owned(),
            entry_id: 0,
            layout,
        }
    }
}

impl UploadClient for SimUploader {
    async fn publish(&mut self, status: &StatusRecord, fields: &[f32]) -> StatusCode {
        let update = ThingSpeakUpdate {
            api_key: &self.api_key,
            fields,
            status: status.as_str(),
        };
        let request = match update.to_request() {
            Ok(request) => request,
            Err(e) => {
                log::error!("request not built: {}", e);
                return StatusCode::UNEXPECTED_RESPONSE;
            }
        };
        debug!("request: {}", request.lines().next().unwrap_or_default());

        match decode(status.as_str(), self.layout) {
            Ok(decoded) => debug!("receiver sees {:?}", decoded),
            Err(e) => log::error!("status record does not decode: {}", e),
        }

        self.entry_id += 1;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n{}",
            self.entry_id
        );
        parse_response(response.as_bytes())
    }
}

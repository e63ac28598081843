//! Run state, per-cycle issues and the readings carried between cycles.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::sensors::{ClimateReading, LightReading};
use crate::upload::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRunState {
    #[default]
    Uninitialized,
    Connecting,
    Measuring,
    Uploading,
    Sleeping,
}

/// Something that went wrong during a cycle without stopping it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleIssue {
    #[error("network connection unavailable")]
    ConnectivityUnavailable,
    #[error("local time unavailable")]
    TimeUnavailable,
    #[error("{sensor} did not report completion in time")]
    PollTimeout { sensor: &'static str },
    #[error("{sensor} unavailable, previous reading reused")]
    SensorAbsent { sensor: &'static str },
    #[error("upload rejected with code {code}")]
    UploadRejected { code: StatusCode },
}

/// Room for every issue one cycle can raise.
pub const MAX_CYCLE_ISSUES: usize = 8;

pub type CycleIssues = Vec<CycleIssue, MAX_CYCLE_ISSUES>;

/// Last good readings.
///
/// A sensor that fails leaves its previous value in place, so the upload
/// still carries the most recent data the station has.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleState {
    pub climate: ClimateReading,
    pub light: Option<LightReading>,
    pub battery_voltage: f32,
}

impl CycleState {
    pub fn lux(&self) -> f32 {
        self.light.map_or(0.0, |reading| reading.lux)
    }

    pub fn light_gain_time_index(&self) -> Option<u8> {
        self.light.map(|reading| reading.gain_time_index())
    }

    /// Channel fields in upload order.
    pub fn fields(&self) -> [f32; 5] {
        [
            self.climate.temperature_c,
            self.climate.pressure_mmhg,
            self.climate.humidity_pct,
            self.lux(),
            self.battery_voltage,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::LightSetting;

    #[test]
    fn test_fields_in_upload_order() {
        let state = CycleState {
            climate: ClimateReading {
                temperature_c: 1.0,
                pressure_mmhg: 2.0,
                humidity_pct: 3.0,
            },
            light: Some(LightReading {
                lux: 4.0,
                setting: LightSetting::INITIAL,
            }),
            battery_voltage: 5.0,
        };
        assert_eq!(state.fields(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(state.light_gain_time_index(), Some(0x02));
    }

    #[test]
    fn test_no_light_reading_yet() {
        let state = CycleState::default();
        assert_eq!(state.lux(), 0.0);
        assert_eq!(state.light_gain_time_index(), None);
    }
}

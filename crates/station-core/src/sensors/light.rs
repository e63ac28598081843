//! Ambient light (VEML7700) gain and integration time handling.
//!
//! The sensor's useful range spans several decades, so each reading picks a
//! gain and integration time first. [`AutoRange`] does that selection as a
//! pure state machine; the firmware adapter only applies settings and reads
//! raw counts.

use core::fmt;

use super::SensorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Gain {
    OneEighth = 0,
    OneQuarter = 1,
    One = 2,
    Two = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum IntegrationTime {
    Ms25 = 0,
    Ms50 = 1,
    Ms100 = 2,
    Ms200 = 3,
    Ms400 = 4,
    Ms800 = 5,
}

struct GainEntry {
    gain: Gain,
    label: &'static str,
    factor: f32,
}

struct IntegrationEntry {
    time: IntegrationTime,
    label: &'static str,
    millis: u16,
}

// Indexed by discriminant, ascending sensitivity.
const GAIN_TABLE: [GainEntry; 4] = [
    GainEntry {
        gain: Gain::OneEighth,
        label: "1/8",
        factor: 0.125,
    },
    GainEntry {
        gain: Gain::OneQuarter,
        label: "1/4",
        factor: 0.25,
    },
    GainEntry {
        gain: Gain::One,
        label: "1",
        factor: 1.0,
    },
    GainEntry {
        gain: Gain::Two,
        label: "2",
        factor: 2.0,
    },
];

const INTEGRATION_TABLE: [IntegrationEntry; 6] = [
    IntegrationEntry {
        time: IntegrationTime::Ms25,
        label: "25",
        millis: 25,
    },
    IntegrationEntry {
        time: IntegrationTime::Ms50,
        label: "50",
        millis: 50,
    },
    IntegrationEntry {
        time: IntegrationTime::Ms100,
        label: "100",
        millis: 100,
    },
    IntegrationEntry {
        time: IntegrationTime::Ms200,
        label: "200",
        millis: 200,
    },
    IntegrationEntry {
        time: IntegrationTime::Ms400,
        label: "400",
        millis: 400,
    },
    IntegrationEntry {
        time: IntegrationTime::Ms800,
        label: "800",
        millis: 800,
    },
];

impl Gain {
    pub const MAX: Gain = Gain::Two;

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        GAIN_TABLE.get(usize::from(index)).map(|entry| entry.gain)
    }

    pub fn label(self) -> &'static str {
        GAIN_TABLE[self as usize].label
    }

    pub fn factor(self) -> f32 {
        GAIN_TABLE[self as usize].factor
    }
}

impl IntegrationTime {
    pub const MAX: IntegrationTime = IntegrationTime::Ms800;

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        INTEGRATION_TABLE
            .get(usize::from(index))
            .map(|entry| entry.time)
    }

    pub fn label(self) -> &'static str {
        INTEGRATION_TABLE[self as usize].label
    }

    pub fn millis(self) -> u16 {
        INTEGRATION_TABLE[self as usize].millis
    }
}

/// Lux per count at maximum gain and integration time.
const RESOLUTION_AT_MAX: f32 = 0.0036;

/// Below this many counts the range is too coarse; raise sensitivity.
const LOW_COUNTS: u16 = 100;
/// Above this many counts the sensor nears saturation; shorten integration.
const HIGH_COUNTS: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSetting {
    pub gain: Gain,
    pub integration_time: IntegrationTime,
}

impl LightSetting {
    /// Starting point of auto ranging: gain 1/8, 100 ms.
    pub const INITIAL: LightSetting = LightSetting {
        gain: Gain::OneEighth,
        integration_time: IntegrationTime::Ms100,
    };

    /// Gain index in the high nibble, integration time index in the low one.
    ///
    /// Never `0xFF`, which status records reserve for "no reading".
    pub const fn gain_time_index(&self) -> u8 {
        (self.gain.index() << 4) | self.integration_time.index()
    }

    pub fn from_gain_time_index(index: u8) -> Option<Self> {
        Some(Self {
            gain: Gain::from_index(index >> 4)?,
            integration_time: IntegrationTime::from_index(index & 0x0F)?,
        })
    }

    /// Lux per raw count for this setting.
    pub fn resolution(&self) -> f32 {
        RESOLUTION_AT_MAX
            * (f32::from(IntegrationTime::MAX.millis()) / f32::from(self.integration_time.millis()))
            * (Gain::MAX.factor() / self.gain.factor())
    }

    /// Convert raw ALS counts to lux, optionally with the high-lux
    /// non-linearity correction.
    pub fn lux_from_counts(&self, counts: u16, corrected: bool) -> f32 {
        let lux = self.resolution() * f32::from(counts);
        if corrected {
            (((6.0135e-13 * lux - 9.3924e-9) * lux + 8.1488e-5) * lux + 1.0023) * lux
        } else {
            lux
        }
    }
}

impl fmt::Display for LightSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gain {}, integration {} ms",
            self.gain.label(),
            self.integration_time.label()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReading {
    pub lux: f32,
    pub setting: LightSetting,
}

impl LightReading {
    pub const fn gain_time_index(&self) -> u8 {
        self.setting.gain_time_index()
    }
}

pub trait LightSensor {
    fn read_light(&mut self) -> Result<LightReading, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initial,
    Raising,
    Lowering,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoRangeStep {
    /// Apply this setting, wait one integration period and feed back the counts.
    Measure(LightSetting),
    Done(LightReading),
}

/// Automatic gain/integration selection.
///
/// Feed the counts measured at [`AutoRange::setting`] into
/// [`AutoRange::next`] until it returns [`AutoRangeStep::Done`]. Terminates
/// after at most nine measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRange {
    setting: LightSetting,
    phase: Phase,
}

impl Default for AutoRange {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoRange {
    pub const fn new() -> Self {
        Self {
            setting: LightSetting::INITIAL,
            phase: Phase::Initial,
        }
    }

    pub const fn setting(&self) -> LightSetting {
        self.setting
    }

    pub fn next(&mut self, counts: u16) -> AutoRangeStep {
        if self.phase == Phase::Initial {
            self.phase = if counts <= LOW_COUNTS {
                Phase::Raising
            } else {
                Phase::Lowering
            };
        }

        let stepped = match self.phase {
            Phase::Raising if counts <= LOW_COUNTS => self.raise(),
            Phase::Lowering if counts > HIGH_COUNTS => self.lower(),
            _ => None,
        };

        match stepped {
            Some(setting) => {
                self.setting = setting;
                AutoRangeStep::Measure(setting)
            }
            None => AutoRangeStep::Done(LightReading {
                lux: self
                    .setting
                    .lux_from_counts(counts, self.phase == Phase::Lowering),
                setting: self.setting,
            }),
        }
    }

    // Gain first, then integration time.
    fn raise(&self) -> Option<LightSetting> {
        let LightSetting { gain, integration_time } = self.setting;
        if let Some(gain) = Gain::from_index(gain.index() + 1) {
            return Some(LightSetting { gain, ..self.setting });
        }
        IntegrationTime::from_index(integration_time.index() + 1)
            .map(|integration_time| LightSetting { integration_time, ..self.setting })
    }

    fn lower(&self) -> Option<LightSetting> {
        let index = self.setting.integration_time.index().checked_sub(1)?;
        IntegrationTime::from_index(index)
            .map(|integration_time| LightSetting { integration_time, ..self.setting })
    }
}

/// Run [`AutoRange`] to completion with `measure` returning raw counts for a
/// setting.
pub fn auto_range<F>(mut measure: F) -> Result<LightReading, SensorError>
where
    F: FnMut(LightSetting) -> Result<u16, SensorError>,
{
    let mut range = AutoRange::new();
    let mut counts = measure(range.setting())?;
    loop {
        match range.next(counts) {
            AutoRangeStep::Measure(setting) => counts = measure(setting)?,
            AutoRangeStep::Done(reading) => return Ok(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec::Vec;

    fn run(mut counts_for: impl FnMut(LightSetting) -> u16) -> (LightReading, Vec<LightSetting>) {
        let mut seen = Vec::new();
        let reading = auto_range(|setting| {
            seen.push(setting);
            Ok(counts_for(setting))
        })
        .unwrap();
        (reading, seen)
    }

    #[test]
    fn test_gain_time_index_round_trip() {
        for gain in [Gain::OneEighth, Gain::OneQuarter, Gain::One, Gain::Two] {
            for it in 0..6 {
                let setting = LightSetting {
                    gain,
                    integration_time: IntegrationTime::from_index(it).unwrap(),
                };
                let index = setting.gain_time_index();
                assert_eq!(index >> 4, gain.index());
                assert_eq!(LightSetting::from_gain_time_index(index), Some(setting));
            }
        }
        assert_eq!(LightSetting::INITIAL.gain_time_index(), 0x02);
        assert_eq!(LightSetting::from_gain_time_index(0x40), None);
        assert_eq!(LightSetting::from_gain_time_index(0x06), None);
        assert_eq!(LightSetting::from_gain_time_index(0xFF), None);
    }

    #[test]
    fn test_labels_from_tables() {
        let setting = LightSetting {
            gain: Gain::OneQuarter,
            integration_time: IntegrationTime::Ms400,
        };
        assert_eq!(
            std::format!("{setting}"),
            "gain 1/4, integration 400 ms"
        );
        assert_eq!(IntegrationTime::Ms25.millis(), 25);
        assert_eq!(Gain::One.factor(), 1.0);
    }

    #[test]
    fn test_resolution_extremes() {
        let max = LightSetting {
            gain: Gain::Two,
            integration_time: IntegrationTime::Ms800,
        };
        assert!((max.resolution() - 0.0036).abs() < 1e-7);

        let min = LightSetting {
            gain: Gain::OneEighth,
            integration_time: IntegrationTime::Ms25,
        };
        assert!((min.resolution() - 1.8432).abs() < 1e-4);
    }

    #[test]
    fn test_bright_light_stays_at_initial_setting() {
        let (reading, seen) = run(|_| 5_000);
        assert_eq!(seen, [LightSetting::INITIAL]);
        assert_eq!(reading.setting, LightSetting::INITIAL);
        // Corrected, so slightly above the linear value.
        let linear = LightSetting::INITIAL.lux_from_counts(5_000, false);
        assert!(reading.lux > linear);
    }

    #[test]
    fn test_dark_raises_gain_then_time() {
        let (reading, seen) = run(|_| 0);
        let indices: Vec<u8> = seen.iter().map(LightSetting::gain_time_index).collect();
        assert_eq!(indices, [0x02, 0x12, 0x22, 0x32, 0x33, 0x34, 0x35]);
        assert_eq!(reading.gain_time_index(), 0x35);
        assert_eq!(reading.lux, 0.0);
    }

    #[test]
    fn test_raising_stops_when_counts_sufficient() {
        let (reading, seen) = run(|setting| {
            if setting.gain == Gain::One { 500 } else { 50 }
        });
        assert_eq!(seen.len(), 3);
        assert_eq!(reading.setting.gain, Gain::One);
        assert_eq!(reading.lux, reading.setting.lux_from_counts(500, false));
    }

    #[test]
    fn test_saturation_shortens_integration() {
        let (reading, seen) = run(|setting| {
            if setting.integration_time == IntegrationTime::Ms25 { 9_000 } else { 30_000 }
        });
        let times: Vec<IntegrationTime> = seen.iter().map(|s| s.integration_time).collect();
        assert_eq!(
            times,
            [IntegrationTime::Ms100, IntegrationTime::Ms50, IntegrationTime::Ms25]
        );
        assert_eq!(reading.setting.gain, Gain::OneEighth);
        assert_eq!(reading.lux, reading.setting.lux_from_counts(9_000, true));
    }

    #[test]
    fn test_saturated_at_shortest_time_finishes() {
        let (reading, seen) = run(|_| u16::MAX);
        assert_eq!(seen.len(), 3);
        assert_eq!(reading.setting.integration_time, IntegrationTime::Ms25);
    }

    #[test]
    fn test_measure_error_propagates() {
        let err = auto_range(|_| {
            Err(SensorError::ReadFailed {
                sensor: "VEML7700",
                operation: "read ALS",
                details: "nack",
            })
        })
        .unwrap_err();
        assert_eq!(err.sensor(), "VEML7700");
    }
}

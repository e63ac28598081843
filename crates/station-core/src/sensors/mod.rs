//! Sensor traits, errors and the shared measure-then-poll sequence.
//!
//! Register-level drivers live outside this crate. The firmware wraps each
//! driver in one of the traits below and the simulator provides synthetic
//! implementations.

pub mod battery;
pub mod climate;
pub mod light;

pub use battery::{BatteryMonitor, BatteryProbe};
pub use climate::{ClimateReading, RawClimate};
pub use light::{Gain, IntegrationTime, LightReading, LightSensor, LightSetting};

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::config::SamplingConfig;
use crate::poll::{PollOutcome, poll_until_ready};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} not found")]
    NotFound { sensor: &'static str },
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} {operation} failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} timed out during {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

impl SensorError {
    pub const fn sensor(&self) -> &'static str {
        match self {
            Self::NotFound { sensor }
            | Self::InitializationFailed { sensor, .. }
            | Self::ReadFailed { sensor, .. }
            | Self::Timeout { sensor, .. } => sensor,
        }
    }
}

/// A sensor that measures on command and raises a flag when done.
///
/// `is_measurement_complete` is the predicate handed to the bounded poll.
pub trait TriggeredSensor {
    type Reading;

    /// Short name used in logs and cycle issues.
    const NAME: &'static str;

    fn trigger_measurement(&mut self) -> Result<(), SensorError>;

    fn is_measurement_complete(&mut self) -> Result<bool, SensorError>;

    fn read_result(&mut self) -> Result<Self::Reading, SensorError>;
}

/// Timing for one triggered measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementTiming {
    /// Unconditional wait between trigger and the first readiness check.
    pub settle: Duration,
    pub poll_attempts: u32,
    pub poll_delay: Duration,
}

impl Default for MeasurementTiming {
    fn default() -> Self {
        Self::from(&SamplingConfig::default())
    }
}

impl From<&SamplingConfig> for MeasurementTiming {
    fn from(config: &SamplingConfig) -> Self {
        Self {
            settle: Duration::from_millis(u64::from(config.settle_ms)),
            poll_attempts: config.poll_attempts,
            poll_delay: Duration::from_millis(u64::from(config.poll_delay_ms)),
        }
    }
}

/// Trigger a measurement, wait for completion, then read it.
///
/// The result is read even if the wait times out; the outcome is returned so
/// the caller can note the timing. A failing readiness check counts as "not
/// ready yet".
pub fn measure_triggered<S, D>(
    sensor: &mut S,
    timing: &MeasurementTiming,
    delay: &mut D,
) -> Result<(S::Reading, PollOutcome), SensorError>
where
    S: TriggeredSensor,
    D: DelayNs,
{
    sensor.trigger_measurement()?;
    delay.delay_ms(u32::try_from(timing.settle.as_millis()).unwrap_or(u32::MAX));

    let outcome = poll_until_ready(
        || match sensor.is_measurement_complete() {
            Ok(complete) => complete,
            Err(e) => {
                debug!("{}: status check failed: {}", S::NAME, e);
                false
            }
        },
        timing.poll_attempts,
        timing.poll_delay,
        delay,
    );

    if outcome == PollOutcome::TimedOut {
        warn!(
            "{}: measurement still busy after {} checks, reading anyway",
            S::NAME,
            timing.poll_attempts
        );
    }

    let reading = sensor.read_result()?;
    Ok((reading, outcome))
}

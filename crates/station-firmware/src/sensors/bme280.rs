//! BME280 climate sensor on top of the `bme280` crate.
//!
//! The crate runs a forced conversion and waits for it inside `measure`, so
//! the conversion happens in `trigger_measurement` and completion is simply
//! whether a result is held.

use bme280::i2c::BME280;
use embassy_time::Delay;
use embedded_hal::i2c::I2c;
use log::{debug, error};

use station_core::sensors::{ClimateReading, SensorError, TriggeredSensor};

const NAME: &str = "BME280";

pub struct Bme280Sensor<I2C> {
    device: BME280<I2C>,
    delay: Delay,
    present: bool,
    pending: Option<ClimateReading>,
}

impl<I2C: I2c> Bme280Sensor<I2C> {
    /// Driver for a BME280 at the primary address (0x76).
    pub fn new(i2c: I2C) -> Self {
        Self {
            device: BME280::new_primary(i2c),
            delay: Delay,
            present: false,
            pending: None,
        }
    }

    pub fn init(&mut self) -> Result<(), SensorError> {
        match self.device.init(&mut self.delay) {
            Ok(()) => {
                self.present = true;
                debug!("{} initialised", NAME);
                Ok(())
            }
            Err(_) => {
                self.present = false;
                error!("Could not find a valid {} sensor, check wiring!", NAME);
                Err(SensorError::NotFound { sensor: NAME })
            }
        }
    }
}

impl<I2C: I2c> TriggeredSensor for Bme280Sensor<I2C> {
    type Reading = ClimateReading;
    const NAME: &'static str = NAME;

    fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        if !self.present {
            // Retry once per cycle; the sensor may have been reconnected.
            self.init()?;
        }

        let measurement = self
            .device
            .measure(&mut self.delay)
            .map_err(|_| SensorError::ReadFailed {
                sensor: NAME,
                operation: "forced measurement",
                details: "I2C transfer failed",
            })?;
        self.pending = Some(ClimateReading::from_si(
            measurement.temperature,
            measurement.pressure,
            measurement.humidity,
        ));
        Ok(())
    }

    fn is_measurement_complete(&mut self) -> Result<bool, SensorError> {
        Ok(self.pending.is_some())
    }

    fn read_result(&mut self) -> Result<ClimateReading, SensorError> {
        self.pending.take().ok_or(SensorError::ReadFailed {
            sensor: NAME,
            operation: "read",
            details: "no measurement pending",
        })
    }
}

//! VEML7700 ambient light sensor, driven at register level.
//!
//! Gain and integration time are chosen per reading by
//! [`station_core::sensors::light::auto_range`].

use embassy_time::Delay;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use station_core::sensors::light::auto_range;
use station_core::sensors::{LightReading, LightSensor, LightSetting, SensorError};

const NAME: &str = "VEML7700";
const ADDRESS: u8 = 0x10;

const REG_ALS_CONF: u8 = 0x00;
const REG_ALS: u8 = 0x04;

/// ALS_GAIN field (bits 12:11), indexed by `Gain::index`.
const GAIN_BITS: [u16; 4] = [0b10, 0b11, 0b00, 0b01];
/// ALS_IT field (bits 9:6), indexed by `IntegrationTime::index`.
const INTEGRATION_BITS: [u16; 6] = [0b1100, 0b1000, 0b0000, 0b0001, 0b0010, 0b0011];

/// Extra wait after an integration period before the result register is valid.
const SETTLE_MARGIN_MS: u32 = 10;

fn conf_word(setting: LightSetting) -> u16 {
    let gain = GAIN_BITS[usize::from(setting.gain.index())];
    let time = INTEGRATION_BITS[usize::from(setting.integration_time.index())];
    (gain << 11) | (time << 6)
}

pub struct Veml7700<I2C> {
    i2c: I2C,
    delay: Delay,
}

impl<I2C: I2c> Veml7700<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c, delay: Delay }
    }

    /// Power the sensor on (ALS_SD clear) with the initial range.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.write_register(REG_ALS_CONF, conf_word(LightSetting::INITIAL))
            .map_err(|_| SensorError::NotFound { sensor: NAME })
    }

    /// Apply `setting`, wait one integration period and return raw counts.
    pub fn measure(&mut self, setting: LightSetting) -> Result<u16, SensorError> {
        self.write_register(REG_ALS_CONF, conf_word(setting))?;
        self.delay
            .delay_ms(u32::from(setting.integration_time.millis()) + SETTLE_MARGIN_MS);
        let counts = self.read_register(REG_ALS)?;
        debug!("{}: {} counts at {}", NAME, counts, setting);
        Ok(counts)
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), SensorError> {
        let [low, high] = value.to_le_bytes();
        self.i2c
            .write(ADDRESS, &[register, low, high])
            .map_err(|_| SensorError::ReadFailed {
                sensor: NAME,
                operation: "register write",
                details: "I2C transfer failed",
            })
    }

    fn read_register(&mut self, register: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[register], &mut buf)
            .map_err(|_| SensorError::ReadFailed {
                sensor: NAME,
                operation: "register read",
                details: "I2C transfer failed",
            })?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl<I2C: I2c> LightSensor for Veml7700<I2C> {
    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        let reading = auto_range(|setting| self.measure(setting));
        if let Err(e) = &reading {
            warn!("{}", e);
        }
        reading
    }
}


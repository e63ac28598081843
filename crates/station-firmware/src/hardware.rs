//! Bus setup for the sensors.
//!
//! The BME280 and VEML7700 share I2C0 on the ESP32-C3's default pins
//! (SDA GPIO8, SCL GPIO9). Both drivers are blocking, so the bus is shared
//! through a `RefCell` rather than an async mutex.

use core::cell::RefCell;

use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::Blocking;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::time::Rate;
use static_cell::StaticCell;

pub type I2cBus = I2c<'static, Blocking>;

/// One sensor's handle on the shared bus.
pub type SharedI2c = RefCellDevice<'static, I2cBus>;

/// Create the I2C peripheral at standard mode speed.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO8<'static>,
    scl: esp_hal::peripherals::GPIO9<'static>,
) -> Result<I2cBus, ConfigError> {
    Ok(
        I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(100)))?
            .with_sda(sda)
            .with_scl(scl),
    )
}

/// Move the bus into static storage. Call once.
pub fn share_i2c_bus(bus: I2cBus) -> &'static RefCell<I2cBus> {
    static I2C0_BUS: StaticCell<RefCell<I2cBus>> = StaticCell::new();
    I2C0_BUS.init(RefCell::new(bus))
}

pub fn i2c_device(bus: &'static RefCell<I2cBus>) -> SharedI2c {
    RefCellDevice::new(bus)
}

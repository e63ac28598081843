//! Register-level adapters implementing the `station-core` sensor traits.

pub mod battery;
pub mod bme280;
pub mod veml7700;

pub use battery::AdcBattery;
pub use bme280::Bme280Sensor;
pub use veml7700::Veml7700;

//! Battery voltage through ADC1 on GPIO0.

use embassy_time::{Delay, Duration};
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO0};

use station_core::poll::poll_for_value;
use station_core::sensors::{BatteryProbe, SensorError};

/// A oneshot conversion takes a few tens of microseconds; allow ~10 ms.
const READ_ATTEMPTS: u32 = 200;
const READ_RETRY_DELAY: Duration = Duration::from_micros(50);

pub struct AdcBattery<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO0<'d>, ADC1<'d>>,
}

impl<'d> AdcBattery<'d> {
    /// 11 dB attenuation covers the divided-down cell voltage.
    pub fn new(adc1: ADC1<'d>, gpio: GPIO0<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }
}

impl BatteryProbe for AdcBattery<'_> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let Self { adc, pin } = self;
        // read_oneshot answers WouldBlock while the conversion is running.
        poll_for_value(
            || adc.read_oneshot(pin).ok(),
            READ_ATTEMPTS,
            READ_RETRY_DELAY,
            &mut Delay,
        )
        .ok_or(SensorError::Timeout {
            sensor: "battery ADC",
            operation: "oneshot read",
        })
    }
}

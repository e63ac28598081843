//! Battery voltage through a resistor divider on an ADC pin.

use super::SensorError;
use crate::config::BatteryConfig;

/// Raw access to the ADC channel wired to the battery divider.
pub trait BatteryProbe {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryMonitor {
    /// Divider ratio multiplied by the ADC reference voltage.
    pub divider_scale: f32,
    /// ADC counts at full scale.
    pub full_scale: u16,
}

impl BatteryMonitor {
    pub const fn new(divider_scale: f32, full_scale: u16) -> Self {
        Self {
            divider_scale,
            full_scale,
        }
    }

    pub fn volts(&self, raw: u16) -> f32 {
        if self.full_scale == 0 {
            return 0.0;
        }
        f32::from(raw) * self.divider_scale / f32::from(self.full_scale)
    }

    pub fn read<P: BatteryProbe>(&self, probe: &mut P) -> Result<f32, SensorError> {
        Ok(self.volts(probe.read_raw()?))
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::from(&BatteryConfig::default())
    }
}

impl From<&BatteryConfig> for BatteryMonitor {
    fn from(config: &BatteryConfig) -> Self {
        Self::new(config.divider_scale, config.full_scale)
    }
}

/// Volts to hundredths of a volt, rounded half-up.
///
/// Negative and NaN inputs become 0.
pub fn centivolts(volts: f32) -> u32 {
    (volts * 100.0 + 0.5) as u32
}

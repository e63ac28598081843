//! Temperature, pressure and humidity from the BME280.

/// Pascals to millimetres of mercury.
pub const PASCAL_TO_MMHG: f32 = 0.007_500_616_83;

pub fn pascal_to_mmhg(pascal: f32) -> f32 {
    pascal * PASCAL_TO_MMHG
}

/// Fixed-point compensated output as produced by the Bosch reference code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawClimate {
    /// Hundredths of a degree Celsius.
    pub temperature_centi_c: i32,
    /// Hundredths of a pascal.
    pub pressure_centi_pa: u32,
    /// Thousandths of a percent relative humidity.
    pub humidity_milli_pct: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub pressure_mmhg: f32,
    pub humidity_pct: f32,
}

impl ClimateReading {
    /// Build a reading from floating point SI values, pressure in pascals.
    pub fn from_si(temperature_c: f32, pressure_pa: f32, humidity_pct: f32) -> Self {
        Self {
            temperature_c,
            pressure_mmhg: pascal_to_mmhg(pressure_pa),
            humidity_pct,
        }
    }

    pub fn from_raw(raw: RawClimate) -> Self {
        Self::from_si(
            raw.temperature_centi_c as f32 / 100.0,
            raw.pressure_centi_pa as f32 / 100.0,
            raw.humidity_milli_pct as f32 / 1000.0,
        )
    }
}

impl From<RawClimate> for ClimateReading {
    fn from(raw: RawClimate) -> Self {
        Self::from_raw(raw)
    }
}

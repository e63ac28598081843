//! Fixed-width status record sent alongside each telemetry upload.
//!
//! The record packs the time of day, reset reason, wake cause, sleep counter,
//! battery voltage and light sensor setting into a short ASCII string that
//! fits a single channel annotation. Positions come from a [`FieldLayout`].
//!
//! Encoding never fails. Out-of-range values wrap to their field width, and
//! values that are missing from the snapshot leave the template placeholder
//! in place (`______` for an unknown time of day, `FF` for an unknown light
//! setting).

mod hex;
mod layout;

pub use hex::*;
pub use layout::*;

use core::fmt;

use thiserror_no_std::Error;

use crate::clock::TimeOfDay;
use crate::sensors::battery::centivolts;

/// Device state captured once per upload cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSnapshot {
    /// `None` until a valid local time has been obtained.
    pub time: Option<TimeOfDay>,
    pub reset_reason_code: u8,
    pub wake_cause_code: u8,
    pub sleep_cycle_count: u8,
    pub battery_voltage: f32,
    pub light_gain_time_index: Option<u8>,
}

impl DeviceSnapshot {
    fn value_of(&self, source: FieldSource) -> Option<u32> {
        match source {
            FieldSource::Hour => self.time.map(|t| u32::from(t.hour)),
            FieldSource::Minute => self.time.map(|t| u32::from(t.minute)),
            FieldSource::Second => self.time.map(|t| u32::from(t.second)),
            FieldSource::ResetReason => Some(u32::from(self.reset_reason_code)),
            FieldSource::WakeCause => Some(u32::from(self.wake_cause_code)),
            FieldSource::SleepCycles => Some(u32::from(self.sleep_cycle_count)),
            FieldSource::BatteryCentivolts => Some(centivolts(self.battery_voltage)),
            FieldSource::LightGainTime => self.light_gain_time_index.map(u32::from),
        }
    }
}

/// An encoded status string. Always ASCII, always the length of its layout.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    bytes: [u8; STATUS_RECORD_CAPACITY],
    len: usize,
}

impl StatusRecord {
    fn from_template(template: &str) -> Self {
        let mut bytes = [0u8; STATUS_RECORD_CAPACITY];
        bytes[..template.len()].copy_from_slice(template.as_bytes());
        Self {
            bytes,
            len: template.len(),
        }
    }

    fn write_field(&mut self, spec: &FieldSpec, value: u32) {
        let radix = spec.encoding.radix();
        let mut remaining = value % spec.modulus();

        // Least significant digit goes in the rightmost slot.
        for slot in self.bytes[spec.offset..spec.end()].iter_mut().rev() {
            let digit = (remaining % radix) as u8;
            *slot = match spec.encoding {
                FieldEncoding::Decimal => b'0' + digit,
                FieldEncoding::HexNibble | FieldEncoding::HexByte => nibble_to_hex(digit),
            };
            remaining /= radix;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Layout templates are checked to be ASCII and only ASCII digits are
        // written over them.
        core::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decode a single field of this record.
    ///
    /// Fails with [`DecodeError::LengthMismatch`] when the record was not
    /// produced with a layout of the same length.
    pub fn field(
        &self,
        layout: &FieldLayout,
        source: FieldSource,
    ) -> Result<Option<u32>, DecodeError> {
        if self.len != layout.len() {
            return Err(DecodeError::LengthMismatch {
                expected: layout.len(),
                actual: self.len,
            });
        }
        match layout.field(source) {
            Some(spec) => decode_field(self.as_bytes(), layout.template().as_bytes(), spec),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusRecord").field(&self.as_str()).finish()
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a snapshot with the given layout.
///
/// Values are not range checked. Each is reduced modulo its field range, so
/// a sleep counter of 0x112 in a hex byte field is written as `12`.
pub fn encode(snapshot: &DeviceSnapshot, layout: &FieldLayout) -> StatusRecord {
    let mut record = StatusRecord::from_template(layout.template());
    for spec in layout.fields() {
        if let Some(value) = snapshot.value_of(spec.source) {
            record.write_field(spec, value);
        }
    }
    record
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("status record is {actual} characters, layout expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid digit at offset {offset}")]
    InvalidDigit { offset: usize },
}

/// Field values recovered from a status record.
///
/// A field is `None` when the layout does not carry it, or when an optional
/// field still holds its template placeholder.
///
/// The light placeholder `FF` is also a valid encoding of gain/time index
/// `0xFF`, so that index decodes as `None`. Real settings never reach it: the
/// largest index is `0x35`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedStatus {
    pub time: Option<TimeOfDay>,
    pub reset_reason_code: Option<u8>,
    pub wake_cause_code: Option<u8>,
    pub sleep_cycle_count: Option<u8>,
    pub battery_centivolts: Option<u16>,
    pub light_gain_time_index: Option<u8>,
}

impl DecodedStatus {
    /// Battery voltage in volts, if the layout carries it.
    pub fn battery_voltage(&self) -> Option<f32> {
        self.battery_centivolts.map(|cv| f32::from(cv) / 100.0)
    }
}

fn decode_field(
    text: &[u8],
    template: &[u8],
    spec: &FieldSpec,
) -> Result<Option<u32>, DecodeError> {
    let chars = &text[spec.offset..spec.end()];
    if spec.source.is_optional() && chars == &template[spec.offset..spec.end()] {
        return Ok(None);
    }

    let radix = spec.encoding.radix();
    let mut value = 0u32;
    for (i, &c) in chars.iter().enumerate() {
        let digit = match spec.encoding {
            FieldEncoding::Decimal if c.is_ascii_digit() => Some(c - b'0'),
            FieldEncoding::Decimal => None,
            FieldEncoding::HexNibble | FieldEncoding::HexByte => hex_to_nibble(c),
        };
        let digit = digit.ok_or(DecodeError::InvalidDigit {
            offset: spec.offset + i,
        })?;
        value = value * radix + u32::from(digit);
    }
    Ok(Some(value))
}

/// Decode a status record produced with `layout`.
pub fn decode(text: &str, layout: &FieldLayout) -> Result<DecodedStatus, DecodeError> {
    if text.len() != layout.len() {
        return Err(DecodeError::LengthMismatch {
            expected: layout.len(),
            actual: text.len(),
        });
    }

    let bytes = text.as_bytes();
    let template = layout.template().as_bytes();
    let mut decoded = DecodedStatus::default();
    let (mut hour, mut minute, mut second) = (None, None, None);

    for spec in layout.fields() {
        let Some(value) = decode_field(bytes, template, spec)? else {
            continue;
        };
        match spec.source {
            FieldSource::Hour => hour = Some(value as u8),
            FieldSource::Minute => minute = Some(value as u8),
            FieldSource::Second => second = Some(value as u8),
            FieldSource::ResetReason => decoded.reset_reason_code = Some(value as u8),
            FieldSource::WakeCause => decoded.wake_cause_code = Some(value as u8),
            FieldSource::SleepCycles => decoded.sleep_cycle_count = Some(value as u8),
            FieldSource::BatteryCentivolts => decoded.battery_centivolts = Some(value as u16),
            FieldSource::LightGainTime => decoded.light_gain_time_index = Some(value as u8),
        }
    }

    if let (Some(hour), Some(minute), Some(second)) = (hour, minute, second) {
        decoded.time = Some(TimeOfDay::new(hour, minute, second));
    }
    Ok(decoded)
}

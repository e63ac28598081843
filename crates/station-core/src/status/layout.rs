//! Field layouts for the fixed-width status record.
//!
//! A layout is a template string plus the list of numeric fields written over
//! it. Characters not covered by a field are literal separators and are
//! copied verbatim. Layouts are validated by [`FieldLayout::new`], which is a
//! `const fn`; binding a layout to a `const` turns every inconsistency into a
//! compile error.

use serde::{Deserialize, Serialize};

/// Upper bound on the length of any status record template.
pub const STATUS_RECORD_CAPACITY: usize = 32;

/// Which part of a [`DeviceSnapshot`](super::DeviceSnapshot) a field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Hour,
    Minute,
    Second,
    ResetReason,
    WakeCause,
    SleepCycles,
    BatteryCentivolts,
    LightGainTime,
}

impl FieldSource {
    /// Optional sources leave the template placeholder in place when absent.
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            Self::Hour | Self::Minute | Self::Second | Self::LightGainTime
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Zero-padded decimal digits, any width up to 9.
    Decimal,
    /// A single uppercase hex digit.
    HexNibble,
    /// Two uppercase hex digits, high nibble first.
    HexByte,
}

impl FieldEncoding {
    pub const fn radix(self) -> u32 {
        match self {
            Self::Decimal => 10,
            Self::HexNibble | Self::HexByte => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub source: FieldSource,
    pub offset: usize,
    pub width: usize,
    pub encoding: FieldEncoding,
}

impl FieldSpec {
    pub const fn decimal(source: FieldSource, offset: usize, width: usize) -> Self {
        Self {
            source,
            offset,
            width,
            encoding: FieldEncoding::Decimal,
        }
    }

    pub const fn hex_nibble(source: FieldSource, offset: usize) -> Self {
        Self {
            source,
            offset,
            width: 1,
            encoding: FieldEncoding::HexNibble,
        }
    }

    pub const fn hex_byte(source: FieldSource, offset: usize) -> Self {
        Self {
            source,
            offset,
            width: 2,
            encoding: FieldEncoding::HexByte,
        }
    }

    /// One past the last character of this field.
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Number of distinct values the field can hold. Values are reduced
    /// modulo this before encoding.
    pub const fn modulus(&self) -> u32 {
        self.encoding.radix().pow(self.width as u32)
    }
}

const LEGACY_FIELDS: &[FieldSpec] = &[
    FieldSpec::decimal(FieldSource::Hour, 0, 2),
    FieldSpec::decimal(FieldSource::Minute, 2, 2),
    FieldSpec::decimal(FieldSource::Second, 4, 2),
    FieldSpec::hex_byte(FieldSource::LightGainTime, 8),
    FieldSpec::hex_nibble(FieldSource::ResetReason, 11),
    FieldSpec::hex_nibble(FieldSource::WakeCause, 13),
    FieldSpec::hex_byte(FieldSource::SleepCycles, 15),
];

const EXTENDED_FIELDS: &[FieldSpec] = &[
    FieldSpec::decimal(FieldSource::Hour, 0, 2),
    FieldSpec::decimal(FieldSource::Minute, 2, 2),
    FieldSpec::decimal(FieldSource::Second, 4, 2),
    FieldSpec::hex_nibble(FieldSource::ResetReason, 8),
    FieldSpec::hex_nibble(FieldSource::WakeCause, 10),
    FieldSpec::hex_byte(FieldSource::SleepCycles, 12),
    FieldSpec::decimal(FieldSource::BatteryCentivolts, 15, 3),
    FieldSpec::hex_byte(FieldSource::LightGainTime, 19),
];

/// Template plus field positions for one status record format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    template: &'static str,
    fields: &'static [FieldSpec],
}

impl FieldLayout {
    /// Build a layout, panicking if the fields do not fit the template.
    ///
    /// In a `const` context the panic is reported at compile time.
    pub const fn new(template: &'static str, fields: &'static [FieldSpec]) -> Self {
        assert!(
            template.len() <= STATUS_RECORD_CAPACITY,
            "status template exceeds record capacity"
        );
        assert!(template.is_ascii(), "status template must be ASCII");

        let mut i = 0;
        while i < fields.len() {
            let field = &fields[i];
            assert!(field.width > 0, "status field has zero width");
            assert!(field.end() <= template.len(), "status field runs past template");
            match field.encoding {
                FieldEncoding::Decimal => assert!(field.width <= 9, "decimal field too wide"),
                FieldEncoding::HexNibble => assert!(field.width == 1, "hex nibble must be 1 wide"),
                FieldEncoding::HexByte => assert!(field.width == 2, "hex byte must be 2 wide"),
            }

            let mut j = i + 1;
            while j < fields.len() {
                let other = &fields[j];
                assert!(
                    field.end() <= other.offset || other.end() <= field.offset,
                    "status fields overlap"
                );
                j += 1;
            }
            i += 1;
        }

        Self { template, fields }
    }

    /// The first-generation station record format.
    ///
    /// `hhmmss-cGGrRsWzCC`: time, light gain/time index, reset reason, wake
    /// cause and sleep counter. Battery voltage is not part of this format.
    pub const LEGACY: FieldLayout = FieldLayout::new("______-cFFrFsFzFF", LEGACY_FIELDS);

    /// `hhmmss-rRsWzCCbVVVcGG`: the legacy fields plus battery centivolts.
    pub const EXTENDED: FieldLayout = FieldLayout::new("______-rFsFzFFb000cFF", EXTENDED_FIELDS);

    pub const fn template(&self) -> &'static str {
        self.template
    }

    pub const fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Length of every record produced with this layout.
    pub const fn len(&self) -> usize {
        self.template.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.template.is_empty()
    }

    pub fn field(&self, source: FieldSource) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.source == source)
    }
}

/// Serializable selector for the shipped layouts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutVersion {
    Legacy,
    #[default]
    Extended,
}

impl LayoutVersion {
    pub const fn layout(self) -> &'static FieldLayout {
        match self {
            Self::Legacy => &FieldLayout::LEGACY,
            Self::Extended => &FieldLayout::EXTENDED,
        }
    }
}

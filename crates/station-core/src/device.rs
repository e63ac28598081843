//! Reset reasons, wake causes and the sleep-cycle counter.
//!
//! Codes follow the ESP-IDF numbering (`esp_reset_reason_t`,
//! `esp_sleep_source_t`) so records stay comparable with older firmware.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetReason {
    Unknown = 0,
    PowerOn = 1,
    External = 2,
    Software = 3,
    Panic = 4,
    InterruptWatchdog = 5,
    TaskWatchdog = 6,
    OtherWatchdog = 7,
    DeepSleep = 8,
    Brownout = 9,
    Sdio = 10,
}

const RESET_REASONS: [(ResetReason, &str); 11] = [
    (ResetReason::Unknown, "unknown"),
    (ResetReason::PowerOn, "power-on"),
    (ResetReason::External, "external pin"),
    (ResetReason::Software, "software"),
    (ResetReason::Panic, "panic"),
    (ResetReason::InterruptWatchdog, "interrupt watchdog"),
    (ResetReason::TaskWatchdog, "task watchdog"),
    (ResetReason::OtherWatchdog, "other watchdog"),
    (ResetReason::DeepSleep, "deep sleep exit"),
    (ResetReason::Brownout, "brownout"),
    (ResetReason::Sdio, "SDIO"),
];

impl ResetReason {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Unrecognised codes map to [`ResetReason::Unknown`].
    pub fn from_code(code: u8) -> Self {
        RESET_REASONS
            .get(usize::from(code))
            .map_or(Self::Unknown, |(reason, _)| *reason)
    }

    pub fn label(self) -> &'static str {
        RESET_REASONS[self as usize].1
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WakeCause {
    /// Not a wake from sleep, e.g. the first cycle after reset.
    Undefined = 0,
    All = 1,
    Ext0 = 2,
    Ext1 = 3,
    Timer = 4,
    Touchpad = 5,
    Ulp = 6,
    Gpio = 7,
    Uart = 8,
    Wifi = 9,
    Cocpu = 10,
    CocpuTrap = 11,
    Bluetooth = 12,
}

const WAKE_CAUSES: [(WakeCause, &str); 13] = [
    (WakeCause::Undefined, "undefined"),
    (WakeCause::All, "all"),
    (WakeCause::Ext0, "ext0"),
    (WakeCause::Ext1, "ext1"),
    (WakeCause::Timer, "timer"),
    (WakeCause::Touchpad, "touchpad"),
    (WakeCause::Ulp, "ULP"),
    (WakeCause::Gpio, "GPIO"),
    (WakeCause::Uart, "UART"),
    (WakeCause::Wifi, "WiFi"),
    (WakeCause::Cocpu, "co-processor"),
    (WakeCause::CocpuTrap, "co-processor trap"),
    (WakeCause::Bluetooth, "Bluetooth"),
];

impl WakeCause {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Unrecognised codes map to [`WakeCause::Undefined`].
    pub fn from_code(code: u8) -> Self {
        WAKE_CAUSES
            .get(usize::from(code))
            .map_or(Self::Undefined, |(cause, _)| *cause)
    }

    pub fn label(self) -> &'static str {
        WAKE_CAUSES[self as usize].1
    }
}

impl fmt::Display for WakeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Why the chip last reset and what woke it.
pub trait SystemInfo {
    fn reset_reason(&self) -> ResetReason;

    fn wake_cause(&self) -> WakeCause;
}

/// Count of completed sleep periods since cold boot. Wraps at 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepCounter(u8);

impl SleepCounter {
    pub const fn cold_boot() -> Self {
        Self(0)
    }

    /// Resume from a value kept in retained memory.
    pub const fn restore(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) -> u8 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

//! Chip reset/wake information and the retained sleep counter.

use core::sync::atomic::{AtomicU8, Ordering};

use esp_hal::rtc_cntl::{SocResetReason, reset_reason, wakeup_cause};
use esp_hal::system::Cpu;

use station_core::device::{ResetReason, SleepCounter, SystemInfo, WakeCause};

/// Survives light sleep and software resets; cleared on power-on.
#[esp_hal::ram(unstable(rtc_fast))]
static SLEEP_COUNT: AtomicU8 = AtomicU8::new(0);

pub fn restore_sleep_counter() -> SleepCounter {
    SleepCounter::restore(SLEEP_COUNT.load(Ordering::Relaxed))
}

pub fn retain_sleep_counter(counter: SleepCounter) {
    SLEEP_COUNT.store(counter.value(), Ordering::Relaxed);
}

/// Collapse the SoC-level reset cause onto the ESP-IDF reset reasons.
fn map_reset_reason(reason: Option<SocResetReason>) -> ResetReason {
    match reason {
        Some(SocResetReason::ChipPowerOn) => ResetReason::PowerOn,
        Some(SocResetReason::CoreSw | SocResetReason::Cpu0Sw) => ResetReason::Software,
        Some(SocResetReason::CoreDeepSleep) => ResetReason::DeepSleep,
        Some(SocResetReason::CoreMwdt0 | SocResetReason::Cpu0Mwdt0) => ResetReason::TaskWatchdog,
        Some(SocResetReason::CoreMwdt1 | SocResetReason::Cpu0Mwdt1) => {
            ResetReason::InterruptWatchdog
        }
        Some(
            SocResetReason::CoreRtcWdt
            | SocResetReason::Cpu0RtcWdt
            | SocResetReason::SysRtcWdt
            | SocResetReason::SysSuperWdt,
        ) => ResetReason::OtherWatchdog,
        Some(SocResetReason::SysBrownOut) => ResetReason::Brownout,
        _ => ResetReason::Unknown,
    }
}

/// Reset reason is fixed at boot; the wake cause is read live since it
/// changes with every light sleep.
pub struct ChipInfo {
    reset: ResetReason,
}

impl ChipInfo {
    pub fn capture() -> Self {
        Self {
            reset: map_reset_reason(reset_reason(Cpu::ProCpu)),
        }
    }
}

impl SystemInfo for ChipInfo {
    fn reset_reason(&self) -> ResetReason {
        self.reset
    }

    fn wake_cause(&self) -> WakeCause {
        // esp-hal numbers sleep sources the way ESP-IDF does.
        WakeCause::from_code(wakeup_cause() as u8)
    }
}

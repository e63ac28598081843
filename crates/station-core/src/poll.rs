//! Bounded polling for asynchronous hardware completion.
//!
//! Used after a sensor measurement is triggered, or a radio association is
//! started, to wait for a "ready" flag without blocking forever. The attempt
//! budget is the only cancellation mechanism; a caller wanting an early abort
//! folds that into its predicate.
//!
//! [`PollOutcome::TimedOut`] is not an error. Callers usually go on to read
//! the hardware anyway and just log that the wait ran out.

use core::future::Future;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    TimedOut,
}

impl PollOutcome {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Ready,
    TimedOut,
}

/// Attempt-counting state machine behind [`poll_until_ready`].
///
/// `Polling` is the initial state; `Ready` and `TimedOut` are terminal. Exposed
/// for callers that drive their own loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoll {
    attempts_left: u32,
    state: PollState,
}

impl BoundedPoll {
    /// A zero budget starts out timed out.
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            attempts_left: max_attempts,
            state: if max_attempts == 0 {
                PollState::TimedOut
            } else {
                PollState::Polling
            },
        }
    }

    pub const fn state(&self) -> PollState {
        self.state
    }

    pub const fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    /// Record the result of one readiness check.
    ///
    /// Has no effect once a terminal state is reached.
    pub fn record(&mut self, ready: bool) -> PollState {
        if self.state != PollState::Polling {
            return self.state;
        }

        self.attempts_left -= 1;
        self.state = if ready {
            PollState::Ready
        } else if self.attempts_left == 0 {
            PollState::TimedOut
        } else {
            PollState::Polling
        };
        self.state
    }

    /// Terminal outcome, or `None` while still polling.
    pub const fn outcome(&self) -> Option<PollOutcome> {
        match self.state {
            PollState::Polling => None,
            PollState::Ready => Some(PollOutcome::Ready),
            PollState::TimedOut => Some(PollOutcome::TimedOut),
        }
    }
}

fn delay_micros(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}

/// Call `is_ready` up to `max_attempts` times, sleeping `per_attempt_delay`
/// between attempts.
///
/// Returns as soon as the predicate reports ready. There is no delay after the
/// final attempt, so the total wait never exceeds
/// `(max_attempts - 1) * per_attempt_delay`.
pub fn poll_until_ready<F, D>(
    mut is_ready: F,
    max_attempts: u32,
    per_attempt_delay: Duration,
    delay: &mut D,
) -> PollOutcome
where
    F: FnMut() -> bool,
    D: DelayNs,
{
    let mut poll = BoundedPoll::new(max_attempts);
    loop {
        if let Some(outcome) = poll.outcome() {
            return outcome;
        }
        if poll.record(is_ready()) == PollState::Polling {
            delay.delay_us(delay_micros(per_attempt_delay));
        }
    }
}

/// [`poll_until_ready`] for drivers that report readiness by returning the
/// value, such as an ADC oneshot read that answers `WouldBlock` until the
/// conversion is done.
///
/// Returns `None` when every attempt came back empty.
pub fn poll_for_value<T, F, D>(
    mut try_read: F,
    max_attempts: u32,
    per_attempt_delay: Duration,
    delay: &mut D,
) -> Option<T>
where
    F: FnMut() -> Option<T>,
    D: DelayNs,
{
    let mut value = None;
    poll_until_ready(
        || {
            value = try_read();
            value.is_some()
        },
        max_attempts,
        per_attempt_delay,
        delay,
    );
    value
}

/// Async twin of [`poll_until_ready`] for predicates that talk to a bus or
/// radio driver.
pub async fn poll_until_ready_async<F, Fut, D>(
    mut is_ready: F,
    max_attempts: u32,
    per_attempt_delay: Duration,
    delay: &mut D,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
    D: AsyncDelayNs,
{
    let mut poll = BoundedPoll::new(max_attempts);
    loop {
        if let Some(outcome) = poll.outcome() {
            return outcome;
        }
        if poll.record(is_ready().await) == PollState::Polling {
            delay.delay_us(delay_micros(per_attempt_delay)).await;
        }
    }
}

//! RetryBudget value object
//! Timeout/interval pair governing how long and how often a probe is retried

use crate::constants::retry::{DEFAULT_DELAY, DEFAULT_TIMEOUT};
use std::time::Duration;

/// Total timeout, fixed inter-attempt delay, and the elapsed-time accumulator.
///
/// `elapsed` is the sum of the delays already waited, not wall-clock time, and
/// only ever grows. It is compared against the timeout *before* each attempt,
/// so the first attempt always runs, even with a zero timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    timeout: Duration,
    delay: Duration,
    elapsed: Duration,
}

impl RetryBudget {
    pub fn new(timeout: Duration, delay: Duration) -> Self {
        Self {
            timeout,
            delay,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Strictly greater: an attempt at exactly `elapsed == timeout` still runs.
    pub fn is_exhausted(&self) -> bool {
        self.elapsed > self.timeout
    }

    /// Account for one inter-attempt wait.
    pub fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(self.delay);
    }

    /// Attempts an always-failing probe gets: `floor(timeout / delay) + 1`.
    /// `None` when the delay is zero and the budget can never run out.
    pub fn max_attempts(&self) -> Option<u128> {
        if self.delay.is_zero() {
            return None;
        }
        Some(self.timeout.as_nanos() / self.delay.as_nanos() + 1)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_DELAY)
    }
}

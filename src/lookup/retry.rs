//! Bounded retry policy with linear backoff.

use std::time::Duration;

/// How many times to call upstream and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n * backoff_base`.
    backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Linear backoff policy. `max_attempts` is clamped to at least 1.
    pub fn linear(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the failed 1-based `attempt`, or `None` when it was
    /// the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff_base.saturating_mul(attempt))
    }
}

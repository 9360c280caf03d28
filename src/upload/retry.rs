//! Bounded retry policy for upload steps.

use std::time::Duration;

use crate::config::UploadConfig;
use crate::error::Error;

/// Attempts, backoff schedule and the errors worth retrying.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial: Duration,
    pub max: Duration,
    retry_on: fn(&Error) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial: Duration, max: Duration, retry_on: fn(&Error) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial,
            max: max.max(initial),
            retry_on,
        }
    }

    /// Chunk sends: transient failures only, exponential backoff.
    pub fn chunk(config: &UploadConfig) -> Self {
        Self::new(
            config.chunk_attempts,
            Duration::from_millis(config.backoff_initial_ms),
            Duration::from_millis(config.backoff_max_ms),
            Error::is_transient,
        )
    }

    /// Configure calls: transient failures and "not ready yet" rejections,
    /// spaced by the finalize interval.
    pub fn finalize(config: &UploadConfig) -> Self {
        let interval = Duration::from_millis(config.finalize_interval_ms);
        Self::new(config.finalize_attempts, interval, interval, |e| {
            e.is_transient() || matches!(e, Error::Configuration(_))
        })
    }

    /// Delay before the next attempt, or `None` when `attempt` (1-based) was
    /// the last one allowed or the error is not retryable.
    pub fn next_delay(&self, attempt: u32, error: &Error) -> Option<Duration> {
        if attempt >= self.max_attempts || !(self.retry_on)(error) {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Some(self.initial.saturating_mul(factor).min(self.max))
    }
}

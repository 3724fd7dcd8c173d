//! Linear retry backoff for the poll loop.
//!
//! There is no cap and no jitter: a job whose event endpoint keeps failing
//! with server errors is retried forever, each time waiting one interval
//! longer than the last.

use std::time::Duration;

/// Extra delay after `level` consecutive transient failures.
///
/// Equals `level * interval`, so level 0 adds nothing.
#[must_use]
pub fn backoff_delay(interval: Duration, level: u32) -> Duration {
    interval.saturating_mul(level)
}

/// Total wait before the next attempt: the base interval plus the backoff.
#[must_use]
pub fn retry_wait(interval: Duration, level: u32) -> Duration {
    interval.saturating_add(backoff_delay(interval, level))
}

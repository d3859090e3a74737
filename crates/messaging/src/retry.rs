//! Bounded retry for handler invocations that lose an optimistic-concurrency
//! race.

use std::thread;
use std::time::Duration;

use tracing::warn;

/// Retry policy for one handler invocation. `max_attempts` counts the first
/// try; the delay doubles after each failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    /// Policy without sleeps, for tests that only exercise attempt counts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    // Delay before the given 1-based attempt. Only called for attempt >= 2.
    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(2))
    }
}

/// Classifies failures worth re-running against fresh state.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

/// Run `op` up to `policy.max_attempts` times. Only retryable errors re-run,
/// and each attempt must begin from fresh state: the caller opens a new unit
/// of work inside `op`, never outside it.
pub fn run<T, E, F>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "retrying with fresh state");
                attempt += 1;
                let delay = policy.delay_before(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

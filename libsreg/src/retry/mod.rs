//! Bounded retries for remote calls.
//!
//! Only transient transport failures are retried (see
//! [`SregError::is_retryable`]). Delays grow exponentially from
//! `initial_backoff_ms` and never exceed `max_backoff_ms`; a server supplied
//! `Retry-After` replaces the computed delay but is capped the same way.

use crate::config::RetryPolicy;
use crate::error::{Result, SregError};
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempts are exhausted. The last error is returned.
pub fn with_retry<T, F>(policy: &RetryPolicy, what: &str, operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_and_sleep(policy, what, operation, std::thread::sleep)
}

/// Same as [`with_retry`] with an injectable sleep function.
pub(crate) fn with_retry_and_sleep<T, F, S>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
    mut sleep: S,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    S: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = delay_for(policy, attempt, &err);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, max_attempts, err, delay
                );
                sleep(delay);
                attempt += 1;
            }
            Err(err) => {
                debug!("{} failed after {} attempt(s): {}", what, attempt, err);
                return Err(err);
            }
        }
    }
}

fn delay_for(policy: &RetryPolicy, attempt: u32, err: &SregError) -> Duration {
    let cap = Duration::from_millis(policy.max_backoff_ms);
    match err {
        SregError::RateLimit {
            retry_after: Some(seconds),
            ..
        } => Duration::from_secs(*seconds).min(cap),
        _ => policy.backoff(attempt),
    }
}

//! Bounded retry for rate-limited store calls
//!
//! The record store signals rate limiting with [`Error::RateLimited`],
//! optionally carrying a retry hint. [`retry_rate_limited`] waits and tries
//! again until the call succeeds, fails for some other reason, or the policy
//! runs out of attempts or time.
//!
//! Cancellation is by drop: if the request future is dropped (for example
//! because the client went away) the pending sleep is dropped with it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{Error, Result};

/// Retry policy for rate-limited operations
///
/// # Default Values
///
/// - `max_attempts`: 6 (one call plus five retries)
/// - `initial_delay`: 1 second
/// - `max_delay`: 10 seconds
/// - `multiplier`: 2.0
/// - `deadline`: 30 seconds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum calls per operation, including the first
    pub max_attempts: usize,
    /// Wait before the first retry when the backend gives no hint
    pub initial_delay: Duration,
    /// Cap on any single wait, hinted or computed
    pub max_delay: Duration,
    /// Growth factor for computed waits
    pub multiplier: f64,
    /// Total time budget for the operation, waits included
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        crate::config::EngineConfig::default().retry_policy()
    }
}

impl RetryPolicy {
    /// A policy that never waits, for tests and local stores
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            deadline: Duration::from_secs(60),
        }
    }

    /// Computed delay before retry number `retry` (0-based)
    ///
    /// `initial_delay * multiplier ^ retry`, capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }

    /// Delay to use given the backend's hint, capped at `max_delay`
    fn delay(&self, retry: usize, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for_retry(retry),
        }
    }
}

/// Run `op` until it stops being rate limited
///
/// Only [`Error::RateLimited`] is retried; every other error is returned
/// immediately. When attempts or the deadline run out the result is
/// [`Error::RetriesExhausted`].
///
/// # Parameters
///
/// - `policy`: Attempt and time budget
/// - `operation`: Name used in logs and in the exhaustion error
/// - `op`: Produces one backend call per invocation
pub async fn retry_rate_limited<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let retry_after = match op().await {
            Err(Error::RateLimited { retry_after }) => retry_after,
            other => return other,
        };

        if attempt == max_attempts {
            break;
        }

        let delay = policy.delay(attempt - 1, retry_after);
        if started.elapsed() + delay > policy.deadline {
            warn!(
                "{} rate limited, next wait of {:?} would pass the {:?} deadline",
                operation, delay, policy.deadline
            );
            return Err(Error::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
            });
        }

        warn!(
            "{} rate limited (attempt {}/{}), retrying in {:?}",
            operation, attempt, max_attempts, delay
        );
        tokio::time::sleep(delay).await;
    }

    Err(Error::RetriesExhausted {
        operation: operation.to_string(),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn computed_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
            deadline: Duration::from_secs(60),
        };

        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(500));
    }

    #[test]
    fn hint_is_honored_but_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.delay(0, Some(Duration::from_secs(2))), Duration::from_secs(2));
        assert_eq!(policy.delay(0, Some(Duration::from_secs(60))), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_rate_limits() {
        let calls = &AtomicUsize::new(0);

        let result = retry_rate_limited(&RetryPolicy::default(), "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::rate_limited(Some(Duration::from_secs(1))))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicUsize::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };

        let result: Result<()> = retry_rate_limited(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::rate_limited(None))
        })
        .await;

        assert!(matches!(
            result,
            Err(Error::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let calls = &AtomicUsize::new(0);
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(4),
            multiplier: 1.0,
            deadline: Duration::from_secs(10),
        };

        let result: Result<()> = retry_rate_limited(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::rate_limited(None))
        })
        .await;

        // Waits at 0s and 4s fit; the third wait would end at 12s.
        assert!(matches!(result, Err(Error::RetriesExhausted { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicUsize::new(0);

        let result: Result<()> = retry_rate_limited(&RetryPolicy::immediate(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::backend("notion", "validation_error"))
        })
        .await;

        assert!(matches!(result, Err(Error::Backend { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

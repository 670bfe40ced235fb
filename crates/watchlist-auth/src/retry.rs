//! Bounded exponential backoff.
//!
//! One policy owns all retry delay math in the SDK: the token cache retries a
//! bounded number of times, while the subscription channel reuses
//! [`BackoffPolicy::delay_for_attempt`] with its own fixed schedule.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Maximum delay between attempts (60s).
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Policy for retrying a fallible asynchronous operation.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry; doubles on each subsequent attempt.
    pub base_delay: Duration,
    /// Maximum total tries. `None` means unlimited.
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Compute the delay preceding a given retry (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(30);
        let millis = u64::try_from(self.base_delay.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(1u64 << exp);
        Duration::from_millis(millis).min(MAX_BACKOFF)
    }
}

/// Invoke `op` until it succeeds or the policy's attempts are exhausted.
///
/// The final rejection propagates the last error unchanged; intermediate
/// failures are logged and retried after an exponentially growing delay.
///
/// # Errors
/// Returns the last error produced by `op` once no further attempt is
/// permitted.
pub async fn retry_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;

                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    warn!(label, attempt, error = %e, "attempts exhausted");
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt - 1);
                warn!(label, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = BackoffPolicy::new(Duration::from_millis(750), Some(3));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(750));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(3000));
    }

    #[test]
    fn delay_is_capped() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), None);
        assert_eq!(policy.delay_for_attempt(30), MAX_BACKOFF);
        assert_eq!(policy.delay_for_attempt(63), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn no_retry_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = BackoffPolicy::new(Duration::from_millis(10), Some(3));
        let result: Result<u32, String> = retry_backoff(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_attempts_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = BackoffPolicy::new(Duration::from_millis(10), Some(3));
        let result: Result<u32, String> = retry_backoff(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {n}"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = BackoffPolicy::new(Duration::from_millis(10), Some(3));
        let result: Result<u32, String> = retry_backoff(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

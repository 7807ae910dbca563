//! Retry Orchestration
//!
//! Exponential backoff with jitter for transient-prone dependencies.
//! Only classified-transient errors are retried; rate-limit errors with an
//! explicit retry-after hint override the computed delay.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RagError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub exponential_base: f64,
    /// Scale each delay by a random factor to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy tuned for rate-limited APIs (slow, patient)
    pub fn rate_limit_aware() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
            exponential_base: 2.5,
            jitter: true,
        }
    }

    /// Policy for fast local dependencies (many quick retries)
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            exponential_base: 1.5,
            jitter: true,
        }
    }

    /// Backoff delay for a given attempt (0-based), before any hint
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.exponential_base.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }
}

/// Run an operation with backoff retry.
///
/// Invokes `op` up to `max_retries + 1` times. Non-retryable errors
/// propagate immediately with no delay; the last error is returned
/// unchanged once attempts are exhausted. A retry-after hint on the error
/// raises the computed delay to at least that long.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RagError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RagError>>,
{
    for attempt in 0..=policy.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    debug!("Not retrying {} error: {}", err.kind(), err);
                    return Err(err);
                }
                if attempt == policy.max_retries {
                    warn!(
                        "Giving up after {} attempts, last error: {}",
                        attempt + 1,
                        err
                    );
                    return Err(err);
                }

                let mut delay = policy.delay_for_attempt(attempt);
                if let Some(hint) = err.retry_after() {
                    delay = delay.max(hint);
                }

                warn!(
                    "Retry {}/{} after {:.1}s delay. Error: {}",
                    attempt + 1,
                    policy.max_retries,
                    delay.as_secs_f64(),
                    err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop returns from its final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            exponential_base: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_progression() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            exponential_base: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            exponential_base: 10.0,
            max_delay: Duration::from_secs(5),
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_range() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            exponential_base: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: true,
            ..Default::default()
        };
        for _ in 0..100 {
            let d = policy.delay_for_attempt(0).as_secs_f64();
            assert!((0.5..=1.0).contains(&d), "jitter out of range: {d}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_backoff(&fast_policy(3), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(RagError::Timeout(Duration::from_secs(1)))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = retry_with_backoff(&fast_policy(3), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RagError::GraphSearch("node down".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(RagError::GraphSearch(_))));
        // Initial attempt plus max_retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = retry_with_backoff(&fast_policy(5), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RagError::InvalidRequest("bad query".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(RagError::InvalidRequest(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_extends_delay() {
        let started = tokio::time::Instant::now();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_backoff(&fast_policy(2), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RagError::RateLimited {
                        retry_after: Duration::from_secs(30),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        // Hint (30s) dominates the 10ms computed backoff
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}

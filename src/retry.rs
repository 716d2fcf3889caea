//! Bounded retry with exponential, clamped backoff

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::ResearchError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn from_millis(max_attempts: u32, min_ms: u64, max_ms: u64) -> Self {
        Self::new(
            max_attempts,
            Duration::from_millis(min_ms),
            Duration::from_millis(max_ms),
        )
    }

    /// A single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based): `min * 2^(attempt-1)`, clamped to `max`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, returns a non-transient error, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<ResearchError> = None;

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "⚠️  {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        what, attempt, self.max_attempts, e, delay
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ResearchError::Custom(format!("{what}: no attempts were made"))))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(3, 1000, 8000)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn test_delay_grows_and_clamps() {
        let policy = RetryPolicy::from_millis(5, 4000, 10000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(10000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(10000));
    }

    #[test]
    fn test_attempts_never_zero() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(3, 1, 2);

        let result = policy
            .run("flaky op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ResearchError::HttpError("connection reset".into()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(3, 1, 2);

        let result: Result<()> = policy
            .run("always failing", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ResearchError::Upstream {
                    service: "Test",
                    status: 503,
                    message: "down".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(3, 1, 2);

        let result: Result<()> = policy
            .run("bad request", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ResearchError::Upstream {
                    service: "Test",
                    status: 400,
                    message: "bad".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

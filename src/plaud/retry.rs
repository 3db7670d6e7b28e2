// Retry with exponential backoff for Plaud calls

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use super::error::PlaudError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Longest server-requested wait we sit out. Anything above gives up.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. A `Retry-After` hint from the server replaces the
/// computed delay in full; a hint longer than `max_retry_after` ends the
/// retries with the rate-limit error instead of calling back early.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, PlaudError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlaudError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = match e.retry_after() {
                    Some(wait) if wait > policy.max_retry_after => {
                        log::warn!("{} rate limited for {:?}, not waiting that long", what, wait);
                        return Err(e);
                    }
                    Some(wait) => wait,
                    None => policy.delay_for(attempt),
                };
                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_retry_after: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_policy(), "list", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PlaudError::Transient("503".to_string()))
            } else {
                Ok(42)
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast_policy(), "list", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PlaudError::Auth(401))
        }).await;

        assert!(matches!(result, Err(PlaudError::Auth(401))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast_policy(), "list", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PlaudError::Transient("502".to_string()))
        }).await;

        assert!(matches!(result, Err(PlaudError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_longer_than_max_delay_is_waited_in_full() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = std::time::Instant::now();
        let result = with_retry(&fast_policy(), "list", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PlaudError::RateLimited { retry_after: Some(Duration::from_millis(50)) })
            } else {
                Ok("page")
            }
        }).await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_retry_after_beyond_limit_gives_up_without_retrying() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast_policy(), "list", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PlaudError::RateLimited { retry_after: Some(Duration::from_secs(60)) })
        }).await;

        match result {
            Err(PlaudError::RateLimited { retry_after }) => assert_eq!(retry_after, Some(Duration::from_secs(60))),
            other => panic!("expected RateLimited, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

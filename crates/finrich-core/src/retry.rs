//! Bounded retry with doubling backoff.
//!
//! The delay slept after failed attempt `k` (0-based) is
//! `base * 2^k + linear_step * k`. With the defaults (1 s, 100 ms) that is
//! `2^k + 0.1k` seconds: 1.0 s, 2.1 s, 4.2 s, ... The linear term keeps
//! parallel callers from waking on exact powers of two.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::data_source::SourceError;
use crate::ValidationError;

/// Backoff schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after the first failed attempt; doubled for each later attempt.
    pub base: Duration,
    /// Added once per prior failed attempt.
    pub linear_step: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            linear_step: Duration::from_millis(100),
        }
    }
}

impl Backoff {
    /// Delay to sleep after failed attempt `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .saturating_mul(factor)
            .saturating_add(self.linear_step.saturating_mul(attempt))
    }
}

/// Configuration for the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first. Always at least one.
    max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Result<Self, ValidationError> {
        if max_attempts == 0 {
            return Err(ValidationError::ZeroMaxAttempts);
        }
        Ok(Self {
            max_attempts,
            ..Self::default()
        })
    }

    /// Single attempt, no retry.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Suspension seam for retry backoff and batch pacing.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|sleeps| sleeps.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        Box::pin(std::future::ready(()))
    }
}

/// Reported when every attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: SourceError,
}

/// Runs one idempotent operation up to `max_attempts` times.
///
/// Every error is treated as transient at this layer. Retry state lives on the
/// stack of a single [`execute`](RetryExecutor::execute) call, so one executor
/// can be shared by any number of concurrent operations.
#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0_u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    warn!(
                        target: "finrich::retry",
                        label,
                        attempt,
                        max_attempts,
                        error = %error,
                        "attempt failed"
                    );

                    if attempt >= max_attempts {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let delay = self.config.delay_for_attempt(attempt - 1);
                    debug!(
                        target: "finrich::retry",
                        label,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_backoff_matches_doubling_plus_linear_step() {
        let backoff = Backoff::default();

        assert_eq!(backoff.delay(0), Duration::from_millis(1_000));
        assert_eq!(backoff.delay(1), Duration::from_millis(2_100));
        assert_eq!(backoff.delay(2), Duration::from_millis(4_200));
        assert_eq!(backoff.delay(3), Duration::from_millis(8_300));
    }

    #[test]
    fn backoff_is_strictly_increasing() {
        let backoff = Backoff::default();
        for attempt in 0..16 {
            assert!(backoff.delay(attempt + 1) > backoff.delay(attempt));
        }
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let delay = Backoff::default().delay(200);
        assert!(delay >= Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        assert_eq!(RetryConfig::new(0), Err(ValidationError::ZeroMaxAttempts));
        assert_eq!(RetryConfig::default().max_attempts(), 3);
        assert_eq!(RetryConfig::no_retry().max_attempts(), 1);
    }

    #[tokio::test]
    async fn always_failing_operation_runs_exactly_max_attempts() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let executor = RetryExecutor::with_sleeper(RetryConfig::default(), sleeper.clone());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute("ALWAYS-FAILS", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::unavailable("boom")) }
            })
            .await;

        let exhausted = result.expect_err("must report failure");
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(1_000), Duration::from_millis(2_100)]
        );
    }

    #[tokio::test]
    async fn single_attempt_fails_without_sleeping() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let executor = RetryExecutor::with_sleeper(RetryConfig::no_retry(), sleeper.clone());

        let result: Result<(), _> = executor
            .execute("ONCE", || async { Err(SourceError::rate_limited("429")) })
            .await;

        assert_eq!(result.expect_err("must fail").attempts, 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let executor = RetryExecutor::with_sleeper(RetryConfig::default(), sleeper.clone());
        let calls = AtomicU32::new(0);

        let value = executor
            .execute("FLAKY", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(SourceError::unavailable("reset by peer"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 42);
        assert_eq!(sleeper.recorded().len(), 2);
    }
}

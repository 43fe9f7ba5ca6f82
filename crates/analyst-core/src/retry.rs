//! Retry logic with exponential backoff and jitter
//!
//! Shared by the model provider (transport and rate-limit failures) and the
//! data collector (every failure is retried).

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Wait before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for the deterministic part of the wait
    pub max_backoff: Duration,

    /// Backoff multiplier (typically 2.0 for exponential backoff)
    pub backoff_multiplier: f64,

    /// Uniform random delay in `[0, jitter)` added to every wait
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Exponential policy with `max_attempts` total attempts and no jitter
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            backoff_multiplier: 2.0,
            jitter: Duration::ZERO,
        }
    }

    /// Add random jitter to every wait
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    #[cfg(test)]
    fn fast(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
    }

    /// Deterministic wait before retry number `retry` (1-based)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let backoff = Duration::try_from_secs_f64(secs).unwrap_or(self.max_backoff);

        backoff.min(self.max_backoff)
    }

    fn jittered(&self, retry: u32) -> Duration {
        let base = self.backoff_duration(retry);
        if self.jitter.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter.as_secs_f64());
        base + Duration::from_secs_f64(extra)
    }

    /// Execute an async operation, retrying errors accepted by `is_retryable`
    ///
    /// Returns the first success, the first non-retryable error, or the last
    /// error once `max_attempts` calls have failed.
    pub async fn execute<F, Fut, T, E, R>(
        &self,
        operation_name: &str,
        mut operation: F,
        is_retryable: R,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("Attempt {attempt}/{attempts} for operation: {operation_name}");

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Operation '{operation_name}' succeeded after {} retries", attempt - 1);
                    }
                    return Ok(result);
                }
                Err(e) if !is_retryable(&e) => {
                    debug!("Operation '{operation_name}' failed with non-retryable error: {e}");
                    return Err(e);
                }
                Err(e) if attempt >= attempts => {
                    warn!("Operation '{operation_name}' failed after {attempts} attempts: {e}");
                    return Err(e);
                }
                Err(e) => {
                    let wait = self.jittered(attempt);
                    warn!(
                        "Operation '{operation_name}' failed (attempt {attempt}/{attempts}): {e}. Retrying in {wait:?}"
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

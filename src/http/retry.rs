//! Retry with exponential backoff and jitter for transient upstream errors.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::FetchError;

/// Default number of attempts, including the first.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 200;

/// Upper bound for a single backoff (ms). Doubled after a 429.
const MAX_BACKOFF_MS: u64 = 4000;

/// Fraction of the delay added as random jitter.
const JITTER_FRACTION: f64 = 0.25;

/// Transient failures: throttling, server errors, timeouts and broken
/// connections. Other 4xx, decode failures and bad requests are final.
pub fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        FetchError::Timeout(_) | FetchError::Connection(_) => true,
        FetchError::Decode { .. } | FetchError::InvalidRequest(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            jitter: JITTER_FRACTION,
        }
    }
}

impl RetryPolicy {
    /// Same backoff, different attempt budget. Zero is treated as one.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self.clone()
        }
    }

    /// Backoff before retry number `retry` (1-based), without jitter.
    pub fn base_delay_for(&self, retry: u32, last_error: &FetchError) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay);
        if last_error.status() == Some(429) {
            delay.saturating_mul(2).min(self.max_delay.saturating_mul(2))
        } else {
            delay
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(extra)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The closure receives the 0-based attempt
    /// number. On exhaustion the last error is returned.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !is_retryable(&err) => {
                    debug!(attempt, error = %err, "non-retryable upstream error");
                    return Err(err);
                }
                Err(err) if attempt + 1 >= max_attempts => {
                    warn!(attempts = attempt + 1, error = %err, "upstream retries exhausted");
                    return Err(err);
                }
                Err(err) => {
                    attempt += 1;
                    let delay = self.jittered(self.base_delay_for(attempt, &err));
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying upstream request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

//! Bounded retry with exponential backoff
//!
//! Used where a failure must not be silently absorbed by a retry budget:
//! the first basin scan at startup and webhook delivery.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempts and backoff for [`with_retry_if`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::with_delays(3, 1_000, 30_000)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Retry configuration with delays given in milliseconds
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation`, retrying failures for which `should_retry` holds
///
/// Returns the first non-retryable error, or the last error once every
/// attempt has failed.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut retry = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retry > 0 {
                    tracing::debug!(retry, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            tracing::warn!(error = %error, "Giving up on non-retryable error");
            return Err(error);
        }
        if retry >= config.max_retries {
            tracing::warn!(attempts = retry + 1, error = %error, "Retries exhausted");
            return Err(error);
        }

        retry += 1;
        let delay = config.backoff(retry);
        tracing::warn!(
            retry,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

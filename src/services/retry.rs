use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Fixed,
    Exponential,
}

/// Bounded retry policy for outbound calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

const MAX_DELAY: Duration = Duration::from_secs(60);

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, base_delay: delay, backoff: Backoff::Fixed }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay, backoff: Backoff::Exponential }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.base_delay.saturating_mul(factor).min(MAX_DELAY)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(2, Duration::from_secs(3))
    }
}

/// Run `call`, retrying transient failures per `policy`.
///
/// Errors for which `is_retryable` returns false are returned immediately.
/// After `max_retries` retries the last error is returned.
pub async fn call_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut retries = 0u32;

    loop {
        match call().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::debug!(operation, retries, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if retries < policy.max_retries && is_retryable(&e) => {
                retries += 1;
                let delay = policy.delay_for(retries);
                tracing::warn!(
                    operation,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if retries > 0 {
                    tracing::error!(operation, retries, error = %e, "Giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

//! Connect retry policy with exponential backoff.
//!
//! Retries exist only to ride out a server that is still binding its port.
//! They never apply to failed assertions and are capped at
//! [`MAX_CONNECT_RETRIES`] so real instability is not masked.

use crate::HarnessError;
use std::time::Duration;

/// Hard cap on connect retries.
pub const MAX_CONNECT_RETRIES: u32 = 1;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (never above [`MAX_CONNECT_RETRIES`])
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_CONNECT_RETRIES,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Set max retries, clamped to [`MAX_CONNECT_RETRIES`].
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_CONNECT_RETRIES);
        self
    }

    /// Create a new retry config with custom initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Create a new retry config with custom max delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Create a new retry config without jitter.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Retry policy for executing operations with automatic retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        })
    }

    /// Calculate the delay for a given attempt number.
    ///
    /// Uses exponential backoff with optional jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay =
            self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let delay = base_delay.min(self.config.max_delay.as_secs_f64());

        let final_delay = if self.config.jitter {
            // Add up to 25% jitter
            delay * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            delay
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Check if an error should be retried.
    #[must_use]
    pub const fn should_retry(&self, error: &HarnessError, attempt: u32) -> bool {
        attempt < self.config.max_retries && error.is_retryable()
    }

    /// Execute an async operation with retries.
    ///
    /// # Errors
    ///
    /// Returns the last error if all retries are exhausted or the error is not retryable.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, HarnessError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarnessError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        return Err(error);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        %error,
                        "retrying connect"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get the maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SubCheck, TransportError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn connect_error() -> HarnessError {
        HarnessError::from(TransportError::Connect {
            url: "http://127.0.0.1:9".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_max_retries_capped() {
        let config = RetryConfig::default().with_max_retries(5);
        assert_eq!(config.max_retries, MAX_CONNECT_RETRIES);
        assert_eq!(RetryPolicy::disabled().max_retries(), 0);
    }

    #[test]
    fn test_delay_calculation_no_jitter() {
        let policy = RetryPolicy::new(RetryConfig::default().without_jitter());

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig::default()
            .without_jitter()
            .with_max_delay(Duration::from_millis(300));
        let policy = RetryPolicy::new(config);

        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::with_defaults();

        assert!(policy.should_retry(&connect_error(), 0));
        assert!(!policy.should_retry(&connect_error(), 1));
        assert!(!policy.should_retry(&HarnessError::violation(SubCheck::Status, "500"), 0));
    }

    #[tokio::test]
    async fn test_execute_retries_connect_once() {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .without_jitter()
                .with_initial_delay(Duration::from_millis(1)),
        );
        let calls = AtomicU32::new(0);

        let result: Result<(), HarnessError> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connect_error()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_assertions() {
        let policy = RetryPolicy::with_defaults();
        let calls = AtomicU32::new(0);

        let result: Result<(), HarnessError> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HarnessError::violation(SubCheck::Schema, "missing id")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let policy = RetryPolicy::with_defaults();
        let result = policy.execute(|| async { Ok::<_, HarnessError>(42) }).await;
        assert_eq!(result, Ok(42));
    }
}

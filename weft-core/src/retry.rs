//! Retry strategy configuration.

use crate::error::WeftError;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether an error is worth retrying.
pub type RetryPredicate = Arc<dyn Fn(&WeftError) -> bool + Send + Sync>;

/// Configuration for bounded retry with exponential backoff.
///
/// The delay before attempt *n* (1-based) is
/// `backoff_base * backoff_multiplier^(n-1)`, optionally jittered by ±50%.
#[derive(Clone)]
pub struct RetryStrategy {
    /// Maximum number of re-executions after the first attempt.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub backoff_base: Duration,
    /// Multiplier applied per attempt; clamped to at least 1.0.
    pub backoff_multiplier: f64,
    /// Whether to jitter delays by ±50%.
    pub jitter: bool,
    retryable: RetryPredicate,
}

impl RetryStrategy {
    /// Create a strategy with the given retry budget and defaults for the
    /// rest: 100ms base, 2x multiplier, jitter on, retry `Transient` only.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable: Arc::new(WeftError::is_retriable),
        }
    }

    /// Set the base backoff delay.
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set the backoff multiplier (values below 1.0 are clamped to 1.0).
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the retryable predicate.
    #[must_use]
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&WeftError) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Check whether the strategy retries this error.
    #[must_use]
    pub fn should_retry(&self, error: &WeftError) -> bool {
        (self.retryable)(error)
    }

    /// Delay to sleep before the retry following `attempt` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let multiplier = self.backoff_multiplier.max(1.0).powi(exponent as i32);
        let base = self.backoff_base.as_secs_f64() * multiplier;

        let seconds = if self.jitter {
            // ±50% jitter
            base * (0.5 + rand::random::<f64>())
        } else {
            base
        };

        Duration::from_secs_f64(seconds)
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl std::fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .finish()
    }
}

//! Retry budget and backoff calculation for transient failures.

use crate::errors::TelegramError;
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a failed attempt may be retried
pub type RetryPredicate = Arc<dyn Fn(&TelegramError) -> bool + Send + Sync>;

/// Default retry classification
///
/// Cancellation, deadline and circuit-open errors are never retried. API
/// errors are retried only on 429 or a 5xx code. Transport failures are
/// retried.
pub fn default_retry_predicate() -> RetryPredicate {
    Arc::new(|error: &TelegramError| error.is_retryable())
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Fraction of the computed delay used as the jitter range (0.2 = ±20%)
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_fraction: 0.2,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set initial delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub fn multiplier(mut self, m: f64) -> Self {
        self.multiplier = m;
        self
    }

    /// Set jitter fraction, clamped to `[0, 1]`
    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Capped exponential delay for a 1-based retry attempt, before jitter
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
        } else if capped > 0.0 {
            self.max_delay
        } else {
            Duration::ZERO
        }
    }

    /// Jittered delay for a 1-based retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt).as_secs_f64();
        if self.jitter_fraction <= 0.0 || base == 0.0 {
            return self.base_delay_for_attempt(attempt);
        }
        let spread = base * self.jitter_fraction;
        let jitter = OsRng.gen_range(-spread..=spread);
        Duration::try_from_secs_f64((base + jitter).max(0.0)).unwrap_or(self.max_delay)
    }

    /// Wait before retry `attempt` (1-based) after `error`
    ///
    /// A server-supplied retry hint is used verbatim and takes precedence
    /// over the computed backoff.
    pub fn backoff(&self, attempt: u32, error: &TelegramError) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ApiError, NetworkError};

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .jitter_fraction(0.0);

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_with_max() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5))
            .multiplier(10.0)
            .jitter_fraction(0.0);

        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(500), Duration::from_secs(5));
    }

    #[test]
    fn test_unbounded_max_delay_saturates() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::MAX)
            .multiplier(10.0)
            .jitter_fraction(0.5);

        assert_eq!(config.base_delay_for_attempt(500), Duration::MAX);
        for _ in 0..50 {
            assert!(config.delay_for_attempt(500) >= Duration::from_secs(1));
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::new().initial_delay(Duration::from_secs(1));
        let error = TelegramError::Api(ApiError::new(500, "Internal Server Error"));

        for _ in 0..200 {
            let delay = config.backoff(1, &error);
            assert!(delay >= Duration::from_millis(800), "{delay:?}");
            assert!(delay <= Duration::from_millis(1200), "{delay:?}");
        }
    }

    #[test]
    fn test_retry_hint_is_verbatim() {
        let config = RetryConfig::new();
        let error = TelegramError::Api(
            ApiError::new(429, "Too Many Requests: retry after 5")
                .with_retry_after(Some(Duration::from_secs(5))),
        );

        for attempt in 1..4 {
            assert_eq!(config.backoff(attempt, &error), Duration::from_secs(5));
        }
    }

    #[test]
    fn test_default_predicate() {
        let predicate = default_retry_predicate();

        assert!(predicate(&TelegramError::Network(NetworkError::Timeout)));
        assert!(predicate(&TelegramError::Api(ApiError::new(502, "Bad Gateway"))));
        assert!(!predicate(&TelegramError::Api(ApiError::new(
            400,
            "Bad Request: chat not found"
        ))));
        assert!(!predicate(&TelegramError::CircuitOpen));
        assert!(!predicate(&TelegramError::DeadlineExceeded));
    }
}

//! Resilience orchestrator combining retry, circuit breaker, and rate limiting.

use super::{
    default_failure_predicate, default_retry_predicate, CircuitBreaker, CircuitBreakerConfig,
    CircuitState, FailurePredicate, RateLimiter, RateLimiterConfig, RetryConfig, RetryPredicate,
};
use crate::context::CallContext;
use crate::errors::{TelegramError, TelegramResult};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Configuration for resilience orchestrator
#[derive(Debug, Clone, Default)]
pub struct ResilienceOrchestratorConfig {
    /// Retry configuration
    pub retry: RetryConfig,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
    /// Rate limiter configuration
    pub rate_limiter: RateLimiterConfig,
}

impl ResilienceOrchestratorConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set retry configuration
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set circuit breaker configuration
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Set rate limiter configuration
    pub fn rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limiter = config;
        self
    }
}

/// Orchestrator for combining resilience patterns
///
/// One instance is shared by every call a client makes: the breaker and the
/// limiter registry are process-local, per-client state.
pub struct ResilienceOrchestrator {
    retry: RetryConfig,
    is_retryable: RetryPredicate,
    circuit_breaker: CircuitBreaker,
    rate_limiter: RateLimiter,
}

impl ResilienceOrchestrator {
    /// Create a new orchestrator with default configuration
    pub fn new() -> Self {
        Self::with_config(ResilienceOrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration
    pub fn with_config(config: ResilienceOrchestratorConfig) -> Self {
        Self::with_predicates(config, default_retry_predicate(), default_failure_predicate())
    }

    /// Create an orchestrator with custom retry and breaker classifiers
    pub fn with_predicates(
        config: ResilienceOrchestratorConfig,
        is_retryable: RetryPredicate,
        is_failure: FailurePredicate,
    ) -> Self {
        Self {
            retry: config.retry,
            is_retryable,
            circuit_breaker: CircuitBreaker::with_predicate(config.circuit_breaker, is_failure),
            rate_limiter: RateLimiter::with_config(config.rate_limiter),
        }
    }

    /// Execute an operation with all resilience patterns applied
    ///
    /// Each attempt is admitted by the rate limiter (when `destination` is
    /// set), then run through the circuit breaker. Non-retryable failures are
    /// returned as-is; once the budget is spent the last failure is wrapped in
    /// [`TelegramError::MaxRetriesExceeded`].
    #[instrument(skip(self, ctx, operation), fields(destination = destination.unwrap_or("-")))]
    pub async fn run<F, Fut, T>(
        &self,
        ctx: &CallContext,
        destination: Option<&str>,
        mut operation: F,
    ) -> TelegramResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TelegramResult<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt: u32 = 0;

        loop {
            if let Some(destination) = destination {
                self.rate_limiter.admit(ctx, destination).await?;
            }

            let result = self
                .circuit_breaker
                .execute(|| ctx.run(operation()))
                .await;

            let error = match result {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(&error) {
                debug!(attempt, error = %error, "Operation failed with non-retryable error");
                return Err(error);
            }

            if attempt >= max_retries {
                warn!(
                    attempts = attempt + 1,
                    max_retries,
                    error = %error,
                    "Operation failed permanently"
                );
                return Err(TelegramError::MaxRetriesExceeded {
                    attempts: attempt + 1,
                    last: Box::new(error),
                });
            }

            attempt += 1;
            let delay = self.retry.backoff(attempt, &error);
            debug!(
                attempt,
                delay_ms = delay.as_millis(),
                hinted = error.retry_after().is_some(),
                error = %error,
                "Retrying operation"
            );
            ctx.sleep(delay).await?;
        }
    }

    fn should_retry(&self, error: &TelegramError) -> bool {
        match error {
            TelegramError::Cancelled
            | TelegramError::DeadlineExceeded
            | TelegramError::CircuitOpen => false,
            other => (self.is_retryable)(other),
        }
    }

    /// Start background maintenance (idle bucket sweep)
    pub fn start(&self) -> bool {
        self.rate_limiter.start()
    }

    /// Stop background maintenance. Safe to call repeatedly.
    pub fn stop(&self) {
        self.rate_limiter.stop();
    }

    /// Get the circuit breaker state
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// The shared circuit breaker
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// The shared rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// The retry configuration
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Get circuit breaker metrics
    pub fn circuit_metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.circuit_breaker.state(),
            total_calls: self.circuit_breaker.total_calls(),
            total_failures: self.circuit_breaker.total_failures(),
            total_rejections: self.circuit_breaker.total_rejections(),
        }
    }
}

impl Default for ResilienceOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResilienceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceOrchestrator")
            .field("retry", &self.retry)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}

/// Circuit breaker metrics
#[derive(Debug, Clone)]
pub struct CircuitMetrics {
    /// Current state
    pub state: CircuitState,
    /// Total calls
    pub total_calls: u64,
    /// Total failures
    pub total_failures: u64,
    /// Total rejections
    pub total_rejections: u64,
}

/// Create a shared orchestrator with custom configuration
pub fn create_orchestrator_with_config(
    config: ResilienceOrchestratorConfig,
) -> Arc<ResilienceOrchestrator> {
    Arc::new(ResilienceOrchestrator::with_config(config))
}

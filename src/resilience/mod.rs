//! Resilience patterns for outbound calls.
//!
//! Provides the per-destination rate limiter, circuit breaker, backoff
//! calculation, and the orchestrator that combines them.

pub mod circuit_breaker;
pub mod orchestrator;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    default_failure_predicate, CircuitBreaker, CircuitBreakerConfig, CircuitState, Counts,
    FailurePredicate,
};
pub use orchestrator::{CircuitMetrics, ResilienceOrchestrator, ResilienceOrchestratorConfig};
pub use rate_limiter::{DestinationClass, RateLimiter, RateLimiterConfig, TokenBucket};
pub use retry::{default_retry_predicate, RetryConfig, RetryPredicate};

//! Circuit breaker pattern for fault tolerance.
//!
//! Closed counts outcomes in a rolling window and trips to Open once enough
//! calls have been seen and at least the configured ratio of them failed.
//! Open rejects every call until the cool-down elapses, then moves to
//! Half-Open, which admits a bounded number of trial calls: one failing trial
//! re-opens, enough consecutive successes close and reset the window.

use crate::errors::{TelegramError, TelegramResult};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Predicate deciding whether an error counts against the breaker
pub type FailurePredicate = Arc<dyn Fn(&TelegramError) -> bool + Send + Sync>;

/// Default failure classification
///
/// Only server-side API errors and transport failures count. Client-side
/// rejections (including 429), cancellation and deadline errors do not.
pub fn default_failure_predicate() -> FailurePredicate {
    Arc::new(|error: &TelegramError| error.is_service_failure())
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests pass through
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, testing if service is healthy
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Configuration for circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Minimum calls in the window before the failure ratio is evaluated
    pub min_requests: u32,
    /// Failure ratio at or above which the circuit trips
    pub failure_ratio: f64,
    /// Period after which Closed-state counters are cleared
    pub window: Duration,
    /// How long to stay open before admitting trial calls
    pub open_timeout: Duration,
    /// Trial calls admitted in half-open; this many successes close the circuit
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: 3,
            failure_ratio: 0.5,
            window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            half_open_max_requests: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set minimum request count
    pub fn min_requests(mut self, n: u32) -> Self {
        self.min_requests = n;
        self
    }

    /// Set failure ratio
    pub fn failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio;
        self
    }

    /// Set rolling window length
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set open timeout
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Set half-open max requests
    pub fn half_open_max_requests(mut self, n: u32) -> Self {
        self.half_open_max_requests = n;
        self
    }
}

/// Counters for the current generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Calls admitted
    pub requests: u32,
    /// Calls that succeeded
    pub successes: u32,
    /// Calls that failed
    pub failures: u32,
    /// Successes since the last failure
    pub consecutive_successes: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests += 1;
    }

    fn on_success(&mut self) {
        self.successes += 1;
        self.consecutive_successes += 1;
    }

    fn on_failure(&mut self) {
        self.failures += 1;
        self.consecutive_successes = 0;
    }

    fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            f64::from(self.failures) / f64::from(self.requests)
        }
    }
}

/// Internal circuit breaker state
struct CircuitBreakerState {
    state: CircuitState,
    counts: Counts,
    /// Bumped on every state change and window reset
    generation: u64,
    /// Closed: when the window resets. Open: when probing may start.
    expiry: Option<Instant>,
}

/// Circuit breaker implementation
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    is_failure: FailurePredicate,
    state: Mutex<CircuitBreakerState>,
    // Metrics
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self::with_predicate(config, default_failure_predicate())
    }

    /// Create a circuit breaker with a custom failure classifier
    pub fn with_predicate(config: CircuitBreakerConfig, is_failure: FailurePredicate) -> Self {
        let expiry = Some(Instant::now() + config.window);
        Self {
            config,
            is_failure,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                counts: Counts::default(),
                generation: 0,
                expiry,
            }),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    /// Get the current circuit state
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock();
        self.refresh(&mut state, Instant::now());
        state.state
    }

    /// Counters of the current generation
    pub fn counts(&self) -> Counts {
        let mut state = self.state.lock();
        self.refresh(&mut state, Instant::now());
        state.counts
    }

    /// Check if circuit allows requests
    pub fn is_available(&self) -> bool {
        matches!(self.state(), CircuitState::Closed | CircuitState::HalfOpen)
    }

    /// Execute an operation through the circuit breaker
    pub async fn execute<F, Fut, T>(&self, operation: F) -> TelegramResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TelegramResult<T>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let generation = match self.before_call() {
            Ok(generation) => generation,
            Err(error) => {
                self.total_rejections.fetch_add(1, Ordering::Relaxed);
                return Err(error);
            }
        };

        let call = AdmittedCall {
            breaker: self,
            generation,
            finished: false,
        };
        let result = operation().await;
        let failed = match &result {
            Ok(_) => false,
            Err(error) => (self.is_failure)(error),
        };
        call.finish(failed);
        result
    }

    /// Admit a call, returning the generation it belongs to
    fn before_call(&self) -> TelegramResult<u64> {
        let mut state = self.state.lock();
        self.refresh(&mut state, Instant::now());

        match state.state {
            CircuitState::Open => Err(TelegramError::CircuitOpen),
            CircuitState::HalfOpen
                if state.counts.requests >= self.config.half_open_max_requests =>
            {
                Err(TelegramError::CircuitOpen)
            }
            _ => {
                state.counts.on_request();
                Ok(state.generation)
            }
        }
    }

    /// Record the outcome of a call admitted in `generation`
    fn after_call(&self, generation: u64, failed: bool) {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.refresh(&mut state, now);

        if state.generation != generation {
            debug!(generation, current = state.generation, "Ignoring stale outcome");
            return;
        }

        if failed {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
            self.on_failure(&mut state, now);
        } else {
            self.on_success(&mut state, now);
        }
    }

    /// Release a call that was dropped before it produced an outcome
    fn abandon(&self, generation: u64) {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.refresh(&mut state, now);

        if state.generation != generation {
            return;
        }

        match state.state {
            CircuitState::HalfOpen => {
                state.counts.requests = state.counts.requests.saturating_sub(1);
            }
            CircuitState::Closed => self.on_success(&mut state, now),
            CircuitState::Open => {}
        }
        debug!(generation, state = %state.state, "Released abandoned call");
    }

    fn on_success(&self, state: &mut CircuitBreakerState, now: Instant) {
        match state.state {
            CircuitState::Closed => state.counts.on_success(),
            CircuitState::HalfOpen => {
                state.counts.on_success();
                if state.counts.consecutive_successes >= self.config.half_open_max_requests {
                    self.transition(state, CircuitState::Closed, now);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, state: &mut CircuitBreakerState, now: Instant) {
        match state.state {
            CircuitState::Closed => {
                state.counts.on_failure();
                if self.should_trip(&state.counts) {
                    warn!(
                        requests = state.counts.requests,
                        failures = state.counts.failures,
                        "Circuit breaker tripped"
                    );
                    self.transition(state, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => self.transition(state, CircuitState::Open, now),
            CircuitState::Open => {}
        }
    }

    fn should_trip(&self, counts: &Counts) -> bool {
        counts.requests >= self.config.min_requests
            && counts.failure_ratio() >= self.config.failure_ratio
    }

    /// Apply time-driven transitions: window reset and Open → Half-Open
    fn refresh(&self, state: &mut CircuitBreakerState, now: Instant) {
        match state.state {
            CircuitState::Closed => {
                if state.expiry.is_some_and(|expiry| expiry <= now) {
                    self.new_generation(state, now);
                }
            }
            CircuitState::Open => {
                if state.expiry.is_some_and(|expiry| expiry <= now) {
                    self.transition(state, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState, now: Instant) {
        if state.state == to {
            return;
        }
        let from = state.state;
        state.state = to;
        self.new_generation(state, now);

        match to {
            CircuitState::Open => warn!(%from, %to, "Circuit breaker state change"),
            _ => info!(%from, %to, "Circuit breaker state change"),
        }
    }

    fn new_generation(&self, state: &mut CircuitBreakerState, now: Instant) {
        state.generation += 1;
        state.counts = Counts::default();
        state.expiry = match state.state {
            CircuitState::Closed => Some(now + self.config.window),
            CircuitState::Open => Some(now + self.config.open_timeout),
            CircuitState::HalfOpen => None,
        };
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.state = CircuitState::Closed;
        self.new_generation(&mut state, now);
        debug!("Circuit breaker reset to CLOSED");
    }

    /// Get total call count
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Get total failure count
    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    /// Get total rejection count
    pub fn total_rejections(&self) -> u64 {
        self.total_rejections.load(Ordering::Relaxed)
    }
}

/// An admitted call; releases its slot if dropped before finishing
struct AdmittedCall<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    finished: bool,
}

impl AdmittedCall<'_> {
    fn finish(mut self, failed: bool) {
        self.finished = true;
        self.breaker.after_call(self.generation, failed);
    }
}

impl Drop for AdmittedCall<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.breaker.abandon(self.generation);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("total_calls", &self.total_calls())
            .field("total_failures", &self.total_failures())
            .field("total_rejections", &self.total_rejections())
            .finish()
    }
}

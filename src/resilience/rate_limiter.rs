//! Two-tier rate limiter using token buckets.
//!
//! One global bucket caps the bot's overall send rate. Each destination chat
//! gets its own bucket, created lazily and held in a bounded registry that is
//! swept for idle entries in the background.

use crate::context::CallContext;
use crate::errors::TelegramResult;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Global refill rate (tokens per second)
    pub global_rate: f64,
    /// Global burst capacity
    pub global_burst: u32,
    /// Refill rate for private chats
    pub chat_rate: f64,
    /// Burst capacity for private chats
    pub chat_burst: u32,
    /// Refill rate for groups, supergroups and channels
    pub group_rate: f64,
    /// Burst capacity for groups, supergroups and channels
    pub group_burst: u32,
    /// Maximum number of live destination buckets
    pub max_destinations: usize,
    /// Destination buckets unused for longer than this are swept
    pub idle_timeout: Duration,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            global_rate: 30.0,
            global_burst: 30,
            chat_rate: 1.0,
            chat_burst: 3,
            group_rate: 20.0 / 60.0,
            group_burst: 3,
            max_destinations: 10_000,
            idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set global rate and burst
    pub fn global(mut self, rate: f64, burst: u32) -> Self {
        self.global_rate = rate;
        self.global_burst = burst;
        self
    }

    /// Set private chat rate and burst
    pub fn chat(mut self, rate: f64, burst: u32) -> Self {
        self.chat_rate = rate;
        self.chat_burst = burst;
        self
    }

    /// Set group/channel rate and burst
    pub fn group(mut self, rate: f64, burst: u32) -> Self {
        self.group_rate = rate;
        self.group_burst = burst;
        self
    }

    /// Set registry size cap
    pub fn max_destinations(mut self, n: usize) -> Self {
        self.max_destinations = n;
        self
    }

    /// Set idle eviction threshold
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Check that every rate, burst and bound is usable
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("global_rate", self.global_rate),
            ("chat_rate", self.chat_rate),
            ("group_rate", self.group_rate),
        ];
        for (name, rate) in rates {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(format!("{name} must be a positive number"));
            }
        }
        if self.global_burst == 0 || self.chat_burst == 0 || self.group_burst == 0 {
            return Err("burst capacities must be at least 1".to_string());
        }
        if self.max_destinations == 0 {
            return Err("max_destinations must be at least 1".to_string());
        }
        if self.sweep_interval.is_zero() {
            return Err("sweep_interval must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Rate class of a destination, inferred from the shape of its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationClass {
    /// One-to-one chat with a user (positive numeric id)
    Private,
    /// Group, supergroup or channel (negative id or `@username`)
    MultiParty,
}

impl DestinationClass {
    /// Classify a destination key
    pub fn of(key: &str) -> Self {
        if key.starts_with('@') {
            return Self::MultiParty;
        }
        match key.parse::<i64>() {
            Ok(id) if id < 0 => Self::MultiParty,
            _ => Self::Private,
        }
    }
}

/// Continuous-refill token bucket
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(capacity: u32, rate: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            rate,
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - self.tokens;
            Err(Duration::try_from_secs_f64(needed / self.rate).unwrap_or(Duration::MAX))
        }
    }

    /// Return a token taken by `try_acquire`
    pub fn refund(&mut self) {
        self.refill(Instant::now());
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }

    /// Tokens currently available
    pub fn available(&mut self) -> f64 {
        self.refill(Instant::now());
        self.tokens
    }

    /// Bucket capacity
    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}

/// Registry entry for one destination
struct Destination {
    bucket: Mutex<TokenBucket>,
    /// Nanoseconds since the registry epoch
    last_used: AtomicU64,
}

impl Destination {
    fn touch(&self, at: u64) {
        self.last_used.store(at, Ordering::Relaxed);
    }
}

/// Bounded map of destination buckets
struct Registry {
    entries: RwLock<HashMap<String, Arc<Destination>>>,
    epoch: Instant,
    config: RateLimiterConfig,
}

impl Registry {
    fn new(config: RateLimiterConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
            config,
        }
    }

    fn now_nanos(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.epoch);
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }

    fn bucket_for(&self, key: &str) -> TokenBucket {
        match DestinationClass::of(key) {
            DestinationClass::Private => {
                TokenBucket::new(self.config.chat_burst, self.config.chat_rate)
            }
            DestinationClass::MultiParty => {
                TokenBucket::new(self.config.group_burst, self.config.group_rate)
            }
        }
    }

    /// Look up or lazily create the entry for `key`, refreshing its timestamp
    fn get_or_insert(&self, key: &str) -> Arc<Destination> {
        let now = self.now_nanos();

        if let Some(entry) = self.entries.read().get(key) {
            entry.touch(now);
            return entry.clone();
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(key) {
            entry.touch(now);
            return entry.clone();
        }

        if entries.len() >= self.config.max_destinations {
            let lru = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(lru) = lru {
                debug!(evicted = %lru, "Evicting least recently used destination bucket");
                entries.remove(&lru);
            }
        }

        let entry = Arc::new(Destination {
            bucket: Mutex::new(self.bucket_for(key)),
            last_used: AtomicU64::new(now),
        });
        entries.insert(key.to_string(), entry.clone());
        entry
    }

    fn sweep_idle(&self) -> usize {
        let idle = u64::try_from(self.config.idle_timeout.as_nanos()).unwrap_or(u64::MAX);
        let now = self.now_nanos();

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| {
            now.saturating_sub(entry.last_used.load(Ordering::Relaxed)) <= idle
        });
        before - entries.len()
    }
}

/// Handle of the background sweep task
struct Sweeper {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Layered rate limiter: per-destination buckets in front of a global bucket
pub struct RateLimiter {
    global: Mutex<TokenBucket>,
    registry: Arc<Registry>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter {
    /// Create a new rate limiter with default configuration
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    /// Create a new rate limiter with custom configuration
    pub fn with_config(config: RateLimiterConfig) -> Self {
        Self {
            global: Mutex::new(TokenBucket::new(config.global_burst, config.global_rate)),
            registry: Arc::new(Registry::new(config)),
            sweeper: Mutex::new(None),
        }
    }

    /// Wait until both the destination's bucket and the global bucket grant a token
    ///
    /// Fails only when `ctx` fires while waiting. A destination token already
    /// taken is returned if the global wait fails; dropping the future
    /// mid-wait forfeits it.
    pub async fn admit(&self, ctx: &CallContext, destination: &str) -> TelegramResult<()> {
        let entry = self.registry.get_or_insert(destination);
        Self::acquire(ctx, &entry.bucket, destination).await?;
        if let Err(error) = Self::acquire(ctx, &self.global, "global").await {
            entry.bucket.lock().refund();
            return Err(error);
        }
        Ok(())
    }

    async fn acquire(
        ctx: &CallContext,
        bucket: &Mutex<TokenBucket>,
        scope: &str,
    ) -> TelegramResult<()> {
        loop {
            let wait = match bucket.lock().try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };
            debug!(scope, wait_ms = wait.as_millis(), "Waiting for rate limit");
            ctx.sleep(wait).await?;
        }
    }

    /// Start the background idle sweep
    ///
    /// Returns `false` if the sweep was already running or no Tokio runtime is
    /// available.
    pub fn start(&self) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No Tokio runtime available, idle sweep not started");
                return false;
            }
        };

        let token = CancellationToken::new();
        let registry = self.registry.clone();
        let cancelled = token.clone();
        let interval = registry.config.sweep_interval;

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = registry.sweep_idle();
                        if removed > 0 {
                            debug!(removed, "Swept idle destination buckets");
                        }
                    }
                }
            }
        });

        *sweeper = Some(Sweeper {
            token,
            _handle: handle,
        });
        true
    }

    /// Stop the background sweep. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.token.cancel();
            debug!("Rate limiter sweep stopped");
        }
    }

    /// Whether the background sweep is running
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Run one idle sweep now, returning the number of evicted entries
    pub fn sweep_idle(&self) -> usize {
        self.registry.sweep_idle()
    }

    /// Number of live destination buckets
    pub fn len(&self) -> usize {
        self.registry.entries.read().len()
    }

    /// Whether no destination buckets are live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a bucket exists for `destination`
    pub fn contains(&self, destination: &str) -> bool {
        self.registry.entries.read().contains_key(destination)
    }

    /// Tokens left in a destination's bucket, if it exists
    pub fn remaining(&self, destination: &str) -> Option<f64> {
        let entry = self.registry.entries.read().get(destination).cloned();
        entry.map(|entry| entry.bucket.lock().available())
    }

    /// Tokens left in the global bucket
    pub fn remaining_global(&self) -> f64 {
        self.global.lock().available()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.registry.config)
            .field("destinations", &self.len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

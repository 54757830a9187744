//! Call metrics for the Bot API client.

use crate::errors::TelegramError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-method counters plus outcome totals
#[derive(Debug, Default)]
pub struct MetricsCollector {
    requests: RwLock<HashMap<String, AtomicU64>>,
    errors: RwLock<HashMap<String, AtomicU64>>,
    rate_limited: AtomicU64,
    circuit_rejections: AtomicU64,
    retries_exhausted: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(map: &RwLock<HashMap<String, AtomicU64>>, method: &str) {
        if let Some(counter) = map.read().get(method) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        map.write()
            .entry(method.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record one logical call and its outcome
    pub fn record(&self, method: &str, outcome: Result<(), &TelegramError>) {
        Self::bump(&self.requests, method);
        let Err(error) = outcome else {
            return;
        };
        Self::bump(&self.errors, method);
        if error.is_rate_limited() {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
        if error.is_circuit_open() {
            self.circuit_rejections.fetch_add(1, Ordering::Relaxed);
        }
        if error.is_max_retries_exceeded() {
            self.retries_exhausted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Calls made to `method`
    pub fn requests(&self, method: &str) -> u64 {
        Self::read(&self.requests, method)
    }

    /// Failed calls to `method`
    pub fn errors(&self, method: &str) -> u64 {
        Self::read(&self.errors, method)
    }

    fn read(map: &RwLock<HashMap<String, AtomicU64>>, method: &str) -> u64 {
        map.read()
            .get(method)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Take a snapshot of the totals
    pub fn snapshot(&self) -> MetricsSnapshot {
        let sum = |map: &RwLock<HashMap<String, AtomicU64>>| -> u64 {
            map.read().values().map(|c| c.load(Ordering::Relaxed)).sum()
        };
        MetricsSnapshot {
            total_requests: sum(&self.requests),
            total_errors: sum(&self.errors),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            circuit_rejections: self.circuit_rejections.load(Ordering::Relaxed),
            retries_exhausted: self.retries_exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Logical calls
    pub total_requests: u64,
    /// Failed logical calls
    pub total_errors: u64,
    /// Calls that ended throttled by the API
    pub rate_limited: u64,
    /// Calls rejected by the open circuit
    pub circuit_rejections: u64,
    /// Calls that exhausted the retry budget
    pub retries_exhausted: u64,
}

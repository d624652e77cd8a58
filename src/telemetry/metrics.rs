use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the refresh pipeline
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Breakdowns recomputed and stored
    refreshes: Arc<AtomicU64>,

    /// Provider reads performed while building breakdowns
    provider_fetches: Arc<AtomicU64>,

    /// Refreshes that failed and kept serving the previous snapshot
    stale_retained: Arc<AtomicU64>,

    /// Display text pushes
    renders: Arc<AtomicU64>,

    /// Cache entries dropped for lack of observers
    evictions: Arc<AtomicU64>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            refreshes: Arc::new(AtomicU64::new(0)),
            provider_fetches: Arc::new(AtomicU64::new(0)),
            stale_retained: Arc::new(AtomicU64::new(0)),
            renders: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_fetch(&self) {
        self.provider_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_retained(&self) {
        self.stale_retained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_provider_fetches(&self) -> u64 {
        self.provider_fetches.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            provider_fetches: self.provider_fetches.load(Ordering::Relaxed),
            stale_retained: self.stale_retained.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counters at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub refreshes: u64,
    pub provider_fetches: u64,
    pub stale_retained: u64,
    pub renders: u64,
    pub evictions: u64,
}

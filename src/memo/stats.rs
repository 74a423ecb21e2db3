//! Wrapper Statistics Module
//!
//! Tracks hits and misses of one memoized function.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Wrapper Stats ==
/// Hit and miss counters, safe to update from many threads.
#[derive(Debug, Default)]
pub struct WrapperStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl WrapperStats {
    // == Constructor ==
    /// Creates a new WrapperStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Reset ==
    /// Sets both counters back to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Combines the counters with a size reported by the store.
    pub fn info(&self, current_size: usize) -> CacheInfo {
        CacheInfo {
            hits: self.hits(),
            misses: self.misses(),
            current_size,
        }
    }
}

// == Cache Info ==
/// Statistics reported by `cache_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Calls answered from the store
    pub hits: u64,
    /// Calls that ran the wrapped function
    pub misses: u64,
    /// Live entries in the wrapper's namespace
    pub current_size: usize,
}

impl CacheInfo {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

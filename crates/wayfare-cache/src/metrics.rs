use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running counters kept by an [`AiResultCache`](crate::AiResultCache).
#[derive(Debug, Default)]
pub(crate) struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    lookup_errors: AtomicU64,
    stores: AtomicU64,
    store_failures: AtomicU64,
    swept: AtomicU64,
    tokens_saved: AtomicU64,
}

impl CacheMetrics {
    pub(crate) fn record_hit(&self, tokens_used: Option<u32>) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if let Some(tokens) = tokens_used {
            self.tokens_saved
                .fetch_add(u64::from(tokens), Ordering::Relaxed);
        }
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed lookup also counts as a miss.
    pub(crate) fn record_lookup_error(&self) {
        self.lookup_errors.fetch_add(1, Ordering::Relaxed);
        self.record_miss();
    }

    pub(crate) fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, removed: u64) {
        self.swept.fetch_add(removed, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            lookup_errors: self.lookup_errors.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            tokens_saved: self.tokens_saved.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    /// Includes lookups that failed in the backend.
    pub misses: u64,
    pub lookup_errors: u64,
    pub stores: u64,
    pub store_failures: u64,
    /// Rows removed by cleanup sweeps and scope purges.
    pub swept: u64,
    /// Sum of `tokens_used` over every hit.
    pub tokens_saved: u64,
}

impl CacheMetricsSnapshot {
    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

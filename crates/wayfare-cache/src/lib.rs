//! AI result caching for the Wayfare trip planner.
//!
//! [`AiResultCache`] deduplicates identical AI queries per trip scope and per
//! [`QueryType`], each type carrying its own TTL (see [`TtlPolicy`]). Storage
//! is injected through the [`CacheBackend`] trait; [`InMemoryBackend`] ships
//! here and a SQLite backend lives in `wayfare-sqlite`.
//!
//! The cache is strictly best-effort: lookups fail open to a miss, and write
//! or sweep failures are logged and swallowed.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use wayfare_cache::{AiResultCache, InMemoryBackend, QueryType, Usage};
//!
//! # async fn example() {
//! let cache = AiResultCache::new(Arc::new(InMemoryBackend::new()));
//! if cache.lookup(Some("trip-42"), "best beaches", QueryType::Research).await.is_none() {
//!     let answer = json!({"beaches": ["Nusa Dua", "Padang Padang"]});
//!     cache
//!         .store(Some("trip-42"), "best beaches", QueryType::Research, answer, Usage::default())
//!         .await;
//! }
//! # }
//! ```

mod cache;
mod in_memory;
mod key;
mod metrics;
mod sweeper;
mod ttl;

pub use cache::{AiResultCache, CachedResult, Computed, StoreOutcome, Usage};
pub use in_memory::InMemoryBackend;
pub use key::{cache_key, cache_key_from};
pub use metrics::CacheMetricsSnapshot;
pub use sweeper::{CacheSweeper, SweeperHandle};
pub use ttl::{CacheConfig, TtlPolicy, DEFAULT_TTLS};

// Re-export the core types callers need alongside the cache.
pub use wayfare_core::{
    CacheBackend, CacheEntry, CacheLookup, Clock, ManualClock, QueryType, SystemClock,
    WayfareError,
};

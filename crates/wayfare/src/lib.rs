//! Wayfare — AI result caching for the Wayfare trip planner.
//!
//! This crate re-exports the Wayfare sub-crates for single-import usage.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `core` + `cache` (in-memory backend) |
//! | `sqlite` | `SqliteCacheBackend` for persistent storage |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wayfare::cache::{AiResultCache, InMemoryBackend, QueryType, Usage};
//! use wayfare::core::CacheBackend;
//! ```

/// Core types: QueryType, CacheEntry, CacheBackend, Clock, WayfareError.
/// Always available.
pub use wayfare_core as core;

/// AiResultCache, TtlPolicy, CacheConfig, cache_key, InMemoryBackend, CacheSweeper.
/// Always available.
pub use wayfare_cache as cache;

/// SQLite-backed CacheBackend.
#[cfg(feature = "sqlite")]
pub use wayfare_sqlite as sqlite;

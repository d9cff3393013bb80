//! SQLite storage for the Wayfare AI result cache.
//!
//! [`SqliteCacheBackend`] implements [`CacheBackend`](wayfare_core::CacheBackend)
//! over a single table. Statements run on tokio's blocking pool so the async
//! runtime is never stalled by disk I/O.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayfare_cache::AiResultCache;
//! use wayfare_sqlite::{SqliteCacheBackend, SqliteCacheConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory database (great for testing)
//! let backend = SqliteCacheBackend::new(SqliteCacheConfig::in_memory())?;
//!
//! // File-based database with a custom table name
//! let config = SqliteCacheConfig::new("/var/lib/wayfare/ai_cache.db").with_table("ai_cache");
//! let cache = AiResultCache::new(Arc::new(SqliteCacheBackend::new(config)?));
//! # Ok(())
//! # }
//! ```

mod cache;

pub use cache::{SqliteCacheBackend, SqliteCacheConfig};

// Re-export core types for convenience.
pub use wayfare_core::{CacheBackend, CacheEntry, CacheLookup, WayfareError};

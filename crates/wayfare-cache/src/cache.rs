use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wayfare_core::{
    expiry_after, CacheBackend, CacheEntry, CacheLookup, Clock, QueryType, SystemClock,
    WayfareError,
};

use crate::metrics::{CacheMetrics, CacheMetricsSnapshot};
use crate::ttl::{CacheConfig, TtlPolicy};

/// Optional usage metadata recorded with a stored result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

impl Usage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tokens_used(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// Output of the expensive computation passed to
/// [`AiResultCache::get_or_compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    pub result: Value,
    pub usage: Usage,
}

impl Computed {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// A result as handed back to the caller, flagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub result: Value,
    /// `true` when served from the cache rather than freshly computed.
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Set on hits only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedResult {
    fn hit(entry: CacheEntry) -> Self {
        Self {
            result: entry.result,
            cached: true,
            model: entry.model,
            tokens_used: entry.tokens_used,
            cached_at: Some(entry.created_at),
            expires_at: Some(entry.expires_at),
        }
    }

    fn fresh(computed: Computed) -> Self {
        Self {
            result: computed.result,
            cached: false,
            model: computed.usage.model,
            tokens_used: computed.usage.tokens_used,
            cached_at: None,
            expires_at: None,
        }
    }
}

/// What happened to a [`AiResultCache::store`] call.
///
/// Failures are already logged; callers are free to ignore this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    Failed,
}

impl StoreOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored)
    }
}

/// Best-effort cache for AI results, keyed by `(scope, query, query_type)`.
///
/// No operation on this type ever returns a storage error to the caller:
/// lookups fail open to a miss, writes and sweeps log and carry on.
pub struct AiResultCache {
    backend: Arc<dyn CacheBackend>,
    ttl: TtlPolicy,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
}

impl AiResultCache {
    /// Create a cache with the default TTL table and wall-clock time.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            ttl: TtlPolicy::default(),
            clock: Arc::new(SystemClock),
            metrics: CacheMetrics::default(),
        }
    }

    /// Create a cache whose TTL table comes from `config`.
    pub fn from_config(
        backend: Arc<dyn CacheBackend>,
        config: &CacheConfig,
    ) -> Result<Self, WayfareError> {
        Ok(Self::new(backend).with_policy(config.validate()?))
    }

    pub fn with_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Return an unexpired result for the trimmed query, if one is stored.
    pub async fn lookup(
        &self,
        scope: Option<&str>,
        query: &str,
        query_type: QueryType,
    ) -> Option<CachedResult> {
        let lookup = CacheLookup::new(scope, query, query_type);
        match self.backend.find_valid(&lookup, self.clock.now()).await {
            Ok(Some(entry)) => {
                tracing::debug!(query_type = %query_type, scope = ?scope, "ai cache hit");
                self.metrics.record_hit(entry.tokens_used);
                Some(CachedResult::hit(entry))
            }
            Ok(None) => {
                tracing::debug!(query_type = %query_type, scope = ?scope, "ai cache miss");
                self.metrics.record_miss();
                None
            }
            Err(e) => {
                tracing::warn!(
                    query_type = %query_type,
                    scope = ?scope,
                    error = %e,
                    "ai cache lookup failed, treating as miss"
                );
                self.metrics.record_lookup_error();
                None
            }
        }
    }

    /// Persist a freshly computed result under the query type's TTL.
    ///
    /// Existing rows for the same key are not replaced.
    pub async fn store(
        &self,
        scope: Option<&str>,
        query: &str,
        query_type: QueryType,
        result: Value,
        usage: Usage,
    ) -> StoreOutcome {
        match self.try_store(scope, query, query_type, result, usage).await {
            Ok(()) => {
                tracing::debug!(query_type = %query_type, scope = ?scope, "ai result cached");
                self.metrics.record_store();
                StoreOutcome::Stored
            }
            Err(e) => {
                tracing::warn!(
                    query_type = %query_type,
                    scope = ?scope,
                    error = %e,
                    "failed to cache ai result"
                );
                self.metrics.record_store_failure();
                StoreOutcome::Failed
            }
        }
    }

    async fn try_store(
        &self,
        scope: Option<&str>,
        query: &str,
        query_type: QueryType,
        result: Value,
        usage: Usage,
    ) -> Result<(), WayfareError> {
        let lookup = CacheLookup::new(scope, query, query_type);
        let created_at = self.clock.now();
        let expires_at = expiry_after(created_at, self.ttl.ttl(query_type))?;
        let entry = CacheEntry {
            id: uuid::Uuid::new_v4().to_string(),
            scope: lookup.scope,
            query: lookup.query,
            query_type,
            result,
            model: usage.model,
            tokens_used: usage.tokens_used,
            created_at,
            expires_at,
        };
        self.backend.insert(&entry).await
    }

    /// Delete every expired row. Returns the number removed, or 0 on failure.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.backend.delete_expired(self.clock.now()).await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!(removed, "swept expired ai cache entries");
                }
                self.metrics.record_swept(removed);
                removed
            }
            Err(e) => {
                tracing::warn!(error = %e, "ai cache cleanup failed");
                0
            }
        }
    }

    /// Drop every cached result for one trip (or the global partition).
    pub async fn purge_scope(&self, scope: Option<&str>) -> u64 {
        match self.backend.delete_scope(scope).await {
            Ok(removed) => {
                tracing::info!(scope = ?scope, removed, "purged ai cache scope");
                self.metrics.record_swept(removed);
                removed
            }
            Err(e) => {
                tracing::warn!(scope = ?scope, error = %e, "ai cache scope purge failed");
                0
            }
        }
    }

    /// Serve from the cache, or run `compute` and cache its output.
    ///
    /// Errors from `compute` are returned unchanged and nothing is stored.
    /// Concurrent misses on the same key each run `compute`.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        scope: Option<&str>,
        query: &str,
        query_type: QueryType,
        compute: F,
    ) -> Result<CachedResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed, E>>,
    {
        if let Some(hit) = self.lookup(scope, query, query_type).await {
            return Ok(hit);
        }

        let computed = compute().await?;
        self.store(
            scope,
            query,
            query_type,
            computed.result.clone(),
            computed.usage.clone(),
        )
        .await;
        Ok(CachedResult::fresh(computed))
    }
}

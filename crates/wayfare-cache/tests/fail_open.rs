use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use wayfare_cache::{
    AiResultCache, CacheBackend, CacheEntry, CacheLookup, Computed, QueryType, StoreOutcome,
    Usage, WayfareError,
};

/// A backend whose every operation fails, counting the attempts.
#[derive(Default)]
struct UnreachableBackend {
    calls: AtomicUsize,
}

impl UnreachableBackend {
    fn fail<T>(&self, op: &str) -> Result<T, WayfareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WayfareError::Storage(format!("{op}: connection refused")))
    }
}

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn find_valid(
        &self,
        _lookup: &CacheLookup,
        _now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, WayfareError> {
        self.fail("find_valid")
    }

    async fn insert(&self, _entry: &CacheEntry) -> Result<(), WayfareError> {
        self.fail("insert")
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, WayfareError> {
        self.fail("delete_expired")
    }

    async fn delete_scope(&self, _scope: Option<&str>) -> Result<u64, WayfareError> {
        self.fail("delete_scope")
    }
}

fn failing_cache() -> (AiResultCache, Arc<UnreachableBackend>) {
    let backend = Arc::new(UnreachableBackend::default());
    (AiResultCache::new(backend.clone()), backend)
}

#[tokio::test]
async fn store_failure_is_swallowed() {
    let (cache, backend) = failing_cache();
    let outcome = cache
        .store(Some("trip-1"), "q", QueryType::Research, json!({"a": 1}), Usage::default())
        .await;
    assert_eq!(outcome, StoreOutcome::Failed);
    assert!(!outcome.is_stored());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1, "no synchronous retry");
}

#[tokio::test]
async fn lookup_failure_is_a_miss() {
    let (cache, _) = failing_cache();
    assert!(cache.lookup(Some("trip-1"), "q", QueryType::Research).await.is_none());

    let metrics = cache.metrics();
    assert_eq!(metrics.lookup_errors, 1);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.hits, 0);
}

#[tokio::test]
async fn cleanup_failure_reports_zero() {
    let (cache, _) = failing_cache();
    assert_eq!(cache.cleanup_expired().await, 0);
    assert_eq!(cache.purge_scope(Some("trip-1")).await, 0);
}

#[tokio::test]
async fn primary_result_survives_a_dead_cache() {
    let (cache, backend) = failing_cache();
    let result: Result<_, WayfareError> = cache
        .get_or_compute(None, "packing list", QueryType::Suggestions, || async {
            Ok(Computed::new(json!({"items": ["passport"]})))
        })
        .await;

    let result = result.unwrap();
    assert!(!result.cached);
    assert_eq!(result.result, json!({"items": ["passport"]}));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.metrics().store_failures, 1);
}

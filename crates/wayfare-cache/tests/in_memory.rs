use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use serde_json::json;
use wayfare_cache::{CacheBackend, CacheEntry, CacheLookup, InMemoryBackend, QueryType};

fn entry(id: &str, scope: Option<&str>, query: &str, created_offset_secs: i64) -> CacheEntry {
    let base = Utc.with_ymd_and_hms(2026, 4, 4, 10, 0, 0).unwrap();
    let created_at = base + TimeDelta::seconds(created_offset_secs);
    CacheEntry {
        id: id.to_string(),
        scope: scope.map(str::to_string),
        query: query.to_string(),
        query_type: QueryType::Research,
        result: json!(id),
        model: None,
        tokens_used: None,
        created_at,
        expires_at: created_at + TimeDelta::hours(1),
    }
}

#[tokio::test]
async fn find_valid_prefers_newest_duplicate() {
    let backend = InMemoryBackend::new();
    backend.insert(&entry("older", None, "q", 0)).await.unwrap();
    backend.insert(&entry("newer", None, "q", 30)).await.unwrap();
    backend.insert(&entry("middle", None, "q", 10)).await.unwrap();

    let now = Utc.with_ymd_and_hms(2026, 4, 4, 10, 5, 0).unwrap();
    let found = backend
        .find_valid(&CacheLookup::new(None, "q", QueryType::Research), now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "newer");
}

#[tokio::test]
async fn find_valid_skips_expired_duplicate() {
    let backend = InMemoryBackend::new();
    backend.insert(&entry("old", None, "q", 0)).await.unwrap();
    backend.insert(&entry("new", None, "q", 1800)).await.unwrap();

    // Past the first row's expiry, before the second's.
    let now = Utc.with_ymd_and_hms(2026, 4, 4, 11, 10, 0).unwrap();
    let found = backend
        .find_valid(&CacheLookup::new(None, "q", QueryType::Research), now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "new");
}

#[tokio::test]
async fn delete_scope_counts_rows() {
    let backend = InMemoryBackend::new();
    backend.insert(&entry("a", Some("t1"), "q", 0)).await.unwrap();
    backend.insert(&entry("b", Some("t1"), "r", 0)).await.unwrap();
    backend.insert(&entry("c", Some("t2"), "q", 0)).await.unwrap();

    assert_eq!(backend.delete_scope(Some("t1")).await.unwrap(), 2);
    assert_eq!(backend.delete_scope(Some("t1")).await.unwrap(), 0);
    assert_eq!(backend.len().await, 1);
}

#[tokio::test]
async fn concurrent_inserts_are_all_kept() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut handles = Vec::new();

    for i in 0..10 {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            backend
                .insert(&entry(&format!("id-{i}"), Some("trip"), "same key", i))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(backend.len().await, 10);
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use wayfare_cache::{AiResultCache, Computed, InMemoryBackend, QueryType, Usage};

#[derive(Debug, PartialEq)]
struct LlmError(String);

#[tokio::test]
async fn miss_computes_and_stores() {
    let backend = Arc::new(InMemoryBackend::new());
    let cache = AiResultCache::new(backend.clone());
    let calls = AtomicUsize::new(0);

    let result = cache
        .get_or_compute(Some("trip-3"), "things to do in Hanoi", QueryType::Research, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, LlmError>(
                Computed::new(json!({"ideas": ["Old Quarter walk"]}))
                    .with_usage(Usage::new().with_model("gpt-4o").with_tokens_used(420)),
            )
        })
        .await
        .unwrap();

    assert!(!result.cached);
    assert_eq!(result.model.as_deref(), Some("gpt-4o"));
    assert_eq!(result.tokens_used, Some(420));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.len().await, 1);
}

#[tokio::test]
async fn hit_skips_the_computation() {
    let cache = AiResultCache::new(Arc::new(InMemoryBackend::new()));
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let result = cache
            .get_or_compute(None, "  weather in June ", QueryType::Research, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LlmError>(Computed::new(json!("warm and humid")))
            })
            .await
            .unwrap();
        assert_eq!(result.result, json!("warm and humid"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 2);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.stores, 1);
}

#[tokio::test]
async fn compute_errors_propagate_and_are_not_cached() {
    let backend = Arc::new(InMemoryBackend::new());
    let cache = AiResultCache::new(backend.clone());

    let err = cache
        .get_or_compute(None, "q", QueryType::Comparison, || async {
            Err::<Computed, _>(LlmError("rate limited".into()))
        })
        .await
        .unwrap_err();

    assert_eq!(err, LlmError("rate limited".into()));
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn tokens_saved_accumulates_on_hits() {
    let cache = AiResultCache::new(Arc::new(InMemoryBackend::new()));
    cache
        .store(
            Some("trip-1"),
            "q",
            QueryType::Suggestions,
            json!([]),
            Usage::new().with_tokens_used(100),
        )
        .await;

    for _ in 0..3 {
        cache.lookup(Some("trip-1"), "q", QueryType::Suggestions).await;
    }

    let metrics = cache.metrics();
    assert_eq!(metrics.tokens_saved, 300);
    assert!((metrics.hit_rate() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn concurrent_misses_each_compute() {
    let cache = Arc::new(AiResultCache::new(Arc::new(InMemoryBackend::new())));
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(tokio::sync::Barrier::new(2));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let cache = cache.clone();
        let calls = calls.clone();
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(None, "shared", QueryType::Research, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Both tasks must be past their lookup before either stores.
                    gate.wait().await;
                    Ok::<_, LlmError>(Computed::new(json!("answer")))
                })
                .await
                .unwrap()
        }));
    }

    for result in futures::future::join_all(handles).await {
        assert_eq!(result.unwrap().result, json!("answer"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.metrics().stores, 2);
}

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use wayfare::cache::{
    cache_key_from, AiResultCache, CacheConfig, CacheSweeper, Computed, QueryType, Usage,
};
use wayfare::core::WayfareError;
use wayfare::sqlite::{SqliteCacheBackend, SqliteCacheConfig};

/// Stand-in for a real LLM call.
async fn ask_model(prompt: &str) -> Result<Computed, WayfareError> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(Computed::new(json!({
        "prompt": prompt,
        "items": ["passport", "sunscreen", "sarong", "reef shoes", "travel adapter"],
    }))
    .with_usage(Usage::new().with_model("demo-model").with_tokens_used(640)))
}

#[tokio::main]
async fn main() -> Result<(), WayfareError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wayfare_cache=debug")),
        )
        .init();

    // --- Setup: SQLite-backed cache with a short comparison TTL ---
    let config = CacheConfig::new()
        .with_ttl_secs(QueryType::Comparison, 15 * 60)
        .with_sweep_interval_secs(60);
    let backend = Arc::new(SqliteCacheBackend::new(SqliteCacheConfig::in_memory())?);
    let cache = Arc::new(AiResultCache::from_config(backend.clone(), &config)?);
    let sweeper = CacheSweeper::spawn(cache.clone(), config.sweep_interval());

    // --- First call: cache miss, the model is asked ---
    println!("=== Cache Miss (first call) ===");
    let prompt = "packing list for Bali, 7 days";
    let first = cache
        .get_or_compute(None, prompt, QueryType::Suggestions, || ask_model(prompt))
        .await?;
    println!("cached={} items={}", first.cached, first.result["items"]);

    // --- Second call: served from the cache ---
    println!("\n=== Cache Hit (same query, extra whitespace) ===");
    let second = cache
        .get_or_compute(None, "  packing list for Bali, 7 days ", QueryType::Suggestions, || {
            ask_model(prompt)
        })
        .await?;
    println!("cached={} items={}", second.cached, second.result["items"]);

    // --- Structured query: field order does not matter ---
    println!("\n=== Structured Query Key ===");
    let params = json!({"trip": "trip-42", "versions": [1, 2], "focus": null});
    let key = cache_key_from(&params)?;
    println!("key: {key}");
    let comparison = cache
        .get_or_compute(Some("trip-42"), &key, QueryType::Comparison, || ask_model(&key))
        .await?;
    println!("cached={}", comparison.cached);

    // --- Trip deleted: drop its cache lines ---
    println!("\n=== Purge Trip Scope ===");
    let removed = cache.purge_scope(Some("trip-42")).await;
    println!("removed {removed} row(s), {} left", backend.count().await?);

    let metrics = cache.metrics();
    println!(
        "\nhits={} misses={} stores={} tokens_saved={} hit_rate={:.2}",
        metrics.hits,
        metrics.misses,
        metrics.stores,
        metrics.tokens_saved,
        metrics.hit_rate()
    );

    sweeper.shutdown().await;
    println!("\nAI cache demo completed successfully!");
    Ok(())
}

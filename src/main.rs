//! KV LRU - demo entry point
//!
//! Builds a cache over in-memory storage from environment configuration,
//! replays a short access pattern and memoizes a slow computation,
//! logging the recency list after each step.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_lru::{CacheConfig, LruCache, MemoizeBuilder, MemoryStorage, TracingHooks};

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables (capacity defaults to 3)
/// 3. Run the access pattern against the cache
/// 4. Memoize a slow function over a second cache on the same storage
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // small default so the demo pattern evicts; LRU_CAPACITY still overrides
    let config = CacheConfig::from_env_with_capacity(3);
    info!(
        "Configuration loaded: capacity={}, byte_capacity={:?}, namespace={}",
        config.capacity, config.byte_capacity, config.namespace
    );

    let storage = MemoryStorage::new();
    let mut cache: LruCache<String, _> =
        LruCache::new(storage.clone(), config).context("invalid cache configuration")?;

    for (key, value) in [("1", "a"), ("2", "b"), ("3", "c"), ("4", "d")] {
        cache.set(key, value.to_string()).await?;
        info!("set {} -> order {:?}", key, cache.dump().await?.keys);
    }

    let hit = cache.get("2").await?;
    info!("get 2 = {:?} -> order {:?}", hit, cache.dump().await?.keys);

    cache.set("5", "e".to_string()).await?;
    let dump = cache.dump().await?;
    info!(
        "set 5 -> mru={:?} lru={:?} order {:?}",
        dump.most_recent, dump.least_recent, dump.keys
    );
    info!("stats: {}", serde_json::to_string(&cache.stats().await?)?);

    let squares: LruCache<u64, _> =
        LruCache::new(storage.clone(), CacheConfig::new(16).with_namespace("squares"))?;
    let slow_square = MemoizeBuilder::new(|n: &u64| {
        let n = *n;
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(n * n)
        }
    })
    .cache(squares)
    .hooks(TracingHooks)
    .build()?;

    for n in [3, 4, 3, 3] {
        let value = slow_square.call(n).await?;
        info!("square({}) = {}", n, value);
    }

    info!("storage holds {} records", storage.len().await);
    Ok(())
}

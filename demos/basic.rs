//! Basic usage of the TTL LRU cache.
//!
//! Run with `RUST_LOG=ttl_lru=debug` to see eviction and expiration events.

use std::thread::sleep;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ttl_lru::{CacheConfig, LruCache};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_lru=debug,basic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cache: LruCache<u32, String> =
        LruCache::with_config(CacheConfig::new(3).with_name("demo"))?;

    let lifespan = Duration::from_secs(2);
    cache.put(1, "one".to_string(), lifespan);
    cache.put(2, "two".to_string(), lifespan);
    cache.put(3, "three".to_string(), lifespan);

    let entry = cache.get(&1)?;
    info!(
        "key={} value={} accessed {} times",
        entry.key(),
        entry.value(),
        entry.access_count()
    );

    // Key 2 is now the least recently used and makes room for key 4
    cache.put(4, "four".to_string(), Duration::ZERO);
    info!("after eviction: keys={:?}", cache.keys());

    sleep(Duration::from_secs(3));
    info!("after expiry: keys={:?}", cache.keys());

    let stats = cache.stats();
    info!(
        "hits={} misses={} evictions={} expirations={} hit_rate={:.2}",
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.expirations,
        stats.hit_rate()
    );

    Ok(())
}

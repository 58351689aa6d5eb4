//! TTL LRU - A thread-safe in-memory cache
//!
//! Bounded key/value cache with least-recently-used eviction and optional
//! per-entry time-to-live. Expired entries are removed by a background timer
//! that wakes exactly when the next entry is due, instead of polling.
//!
//! ```ignore
//! use std::time::Duration;
//! use ttl_lru::LruCache;
//!
//! let cache = LruCache::new(3)?;
//! cache.put("a", 1, Duration::from_secs(2));
//! assert_eq!(*cache.get("a")?.value(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{CacheStats, Entry, LruCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};

//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod list;
mod stats;
mod store;


// Re-export public types
pub use entry::Entry;
pub use list::{EntryList, Iter, NodeId};
pub use stats::CacheStats;
pub use store::LruCache;

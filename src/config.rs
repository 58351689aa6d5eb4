//! Configuration Module
//!
//! Construction parameters for a cache instance. There is no global or
//! environment-driven configuration; host applications embed `CacheConfig`
//! in their own settings through serde.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Default capacity used by `CacheConfig::default()`.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default cache name used in log events.
pub const DEFAULT_NAME: &str = "ttl-lru";

/// Cache construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Name attached to tracing events and the timer thread
    pub name: String,
}

impl CacheConfig {
    /// Creates a config with the given capacity and the default name.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the cache name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Checks that the capacity is a positive integer.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            name: DEFAULT_NAME.to_string(),
        }
    }
}

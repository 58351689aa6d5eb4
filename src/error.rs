//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the cache (or already expired)
    #[error("Key not found")]
    KeyNotFound,

    /// Cache constructed with a non-positive capacity
    #[error("Invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    /// Background expiration timer could not be started
    #[error("Failed to start expiration timer: {0}")]
    Scheduler(#[from] std::io::Error),
}

// == List Error Enum ==
/// Structural misuse of the ordered entry list.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// Node is already linked into the list
    #[error("Node is already a member of the list")]
    AlreadyLinked,

    /// Handle belongs to another list or to a removed node
    #[error("Node handle is stale or belongs to another list")]
    StaleNode,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

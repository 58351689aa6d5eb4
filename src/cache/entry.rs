//! Cache Entry Module
//!
//! Defines the stored record for a key and the read-only snapshot handed to
//! callers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// == Cache Entry ==
/// A record owned by the cache.
///
/// `key`, `lifespan` and the creation timestamps are fixed at construction.
/// The value and access metadata sit behind the entry's own lock so that
/// refreshing one entry does not need the cache-wide structural lock.
#[derive(Debug)]
pub(crate) struct CacheEntry<K, V> {
    pub(crate) key: K,
    lifespan: Duration,
    created_at: Instant,
    created_at_utc: DateTime<Utc>,
    state: RwLock<EntryState<V>>,
}

#[derive(Debug)]
struct EntryState<V> {
    value: Arc<V>,
    accessed_at: Instant,
    access_count: u64,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new entry. A zero `lifespan` means the entry never expires.
    pub(crate) fn new(key: K, value: Arc<V>, lifespan: Duration) -> Self {
        let now = Instant::now();
        Self {
            key,
            lifespan,
            created_at: now,
            created_at_utc: Utc::now(),
            state: RwLock::new(EntryState {
                value,
                accessed_at: now,
                access_count: 0,
            }),
        }
    }

    // == Keep Alive ==
    /// Records an access: bumps the counter and moves `accessed_at` forward.
    pub(crate) fn keep_alive(&self) {
        let now = Instant::now();
        let mut state = self.state.write();
        state.accessed_at = state.accessed_at.max(now);
        state.access_count += 1;
    }

    /// Replaces the value in place.
    pub(crate) fn set_value(&self, value: Arc<V>) {
        self.state.write().value = value;
    }

    // == Expiration ==
    /// Instant at which the entry expires, or `None` if it never does.
    ///
    /// A lifespan too large to represent as an `Instant` is treated as
    /// unbounded.
    pub(crate) fn expires_at(&self) -> Option<Instant> {
        let accessed_at = self.state.read().accessed_at;
        expiry(accessed_at, self.lifespan)
    }

    /// An entry is expired once `now - accessed_at >= lifespan`.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }

    // == Snapshot ==
    /// Copies the entry's attributes into a caller-facing `Entry`.
    pub(crate) fn snapshot(&self) -> Entry<K, V>
    where
        K: Clone,
    {
        let state = self.state.read();
        Entry {
            key: self.key.clone(),
            value: Arc::clone(&state.value),
            lifespan: self.lifespan,
            created_at: self.created_at,
            created_at_utc: self.created_at_utc,
            accessed_at: state.accessed_at,
            access_count: state.access_count,
        }
    }

    /// Consumes a removed entry into its snapshot without cloning the key.
    pub(crate) fn into_snapshot(self) -> Entry<K, V> {
        let state = self.state.into_inner();
        Entry {
            key: self.key,
            value: state.value,
            lifespan: self.lifespan,
            created_at: self.created_at,
            created_at_utc: self.created_at_utc,
            accessed_at: state.accessed_at,
            access_count: state.access_count,
        }
    }
}

fn expiry(accessed_at: Instant, lifespan: Duration) -> Option<Instant> {
    if lifespan.is_zero() {
        return None;
    }
    accessed_at.checked_add(lifespan)
}

// == Entry Snapshot ==
/// Read-only view of a cache entry at the moment it was looked up.
///
/// Holding an `Entry` does not keep the record in the cache; the value is
/// shared through an `Arc`.
#[derive(Debug)]
pub struct Entry<K, V> {
    key: K,
    value: Arc<V>,
    lifespan: Duration,
    created_at: Instant,
    created_at_utc: DateTime<Utc>,
    accessed_at: Instant,
    access_count: u64,
}

impl<K: Clone, V> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
            lifespan: self.lifespan,
            created_at: self.created_at,
            created_at_utc: self.created_at_utc,
            accessed_at: self.accessed_at,
            access_count: self.access_count,
        }
    }
}

impl<K, V> Entry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Time-to-live measured from the last access; zero means no expiry.
    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wall-clock creation time, for reporting.
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at_utc
    }

    /// Number of successful reads and value refreshes.
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Time of the last successful read or value refresh.
    pub fn access_time(&self) -> Instant {
        self.accessed_at
    }

    pub fn expires_at(&self) -> Option<Instant> {
        expiry(self.accessed_at, self.lifespan)
    }

    // == Time To Live ==
    /// Remaining time before expiry as of this snapshot's view.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the TTL has elapsed
    /// - `Some(remaining)` if the entry has a TTL that hasn't elapsed
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

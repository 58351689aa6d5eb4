//! Cache Store Module
//!
//! Main cache engine combining a hash index with a recency-ordered entry list,
//! capacity-based LRU eviction and timer-driven TTL expiration.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::cache::entry::{CacheEntry, Entry};
use crate::cache::list::{EntryList, NodeId};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_expiration_task, ExpirationTarget, ExpirationTimer};

/// Upper bound on up-front allocation; larger caches grow on demand.
const PREALLOCATE_LIMIT: usize = 4096;

// == Structural State ==
/// Index and entry list, guarded together by the cache-wide lock.
///
/// Invariant: `index` and `entries` hold exactly the same set of entries.
#[derive(Debug)]
struct Inner<K, V> {
    index: HashMap<K, NodeId>,
    entries: EntryList<CacheEntry<K, V>>,
    /// Deadline the timer is currently armed for
    next_wake: Option<Instant>,
    last_expiration_at: Option<DateTime<Utc>>,
}

/// Outcome of one expiration sweep.
#[derive(Debug, Default, PartialEq, Eq)]
struct Sweep {
    removed: usize,
    next_deadline: Option<Instant>,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    fn new(capacity: usize) -> Self {
        let preallocate = capacity.min(PREALLOCATE_LIMIT);
        Self {
            index: HashMap::with_capacity(preallocate),
            entries: EntryList::with_capacity(preallocate),
            next_wake: None,
            last_expiration_at: None,
        }
    }

    fn lookup<Q>(&self, key: &Q) -> Option<(NodeId, &CacheEntry<K, V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| (id, entry))
    }

    /// Removes a node from both the list and the index.
    fn unlink(&mut self, id: NodeId) -> Option<CacheEntry<K, V>> {
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    /// Removes the least recently used entry.
    fn evict_lru(&mut self) -> Option<CacheEntry<K, V>> {
        let id = self.entries.back()?;
        self.unlink(id)
    }

    // == Sweep ==
    /// Walks from the back of the list to the front, removing every entry
    /// whose TTL has elapsed, and returns the soonest remaining deadline.
    fn sweep(&mut self, now: Instant) -> Sweep {
        let mut sweep = Sweep::default();
        let mut cursor = self.entries.back();

        while let Some(id) = cursor {
            cursor = self.entries.prev(id);
            let Some(deadline) = self.entries.get(id).and_then(CacheEntry::expires_at) else {
                continue;
            };
            if now >= deadline {
                if self.unlink(id).is_some() {
                    sweep.removed += 1;
                }
            } else if sweep.next_deadline.map_or(true, |next| deadline < next) {
                sweep.next_deadline = Some(deadline);
            }
        }

        sweep
    }
}

// == Shared State ==
struct Shared<K, V> {
    name: String,
    capacity: usize,
    inner: RwLock<Inner<K, V>>,
    stats: StatsRecorder,
    timer: ExpirationTimer,
}

impl<K: Eq + Hash, V> Shared<K, V> {
    /// Arms the timer for `deadline` if it is earlier than the pending wake.
    ///
    /// A refreshed or removed entry can only push the true minimum later, so
    /// a wake that turns out to be early just runs a sweep with nothing to do.
    fn schedule(&self, inner: &mut Inner<K, V>, deadline: Option<Instant>) {
        let Some(deadline) = deadline else {
            return;
        };
        if inner.next_wake.map_or(true, |armed| deadline < armed) {
            inner.next_wake = Some(deadline);
            self.timer.arm(deadline);
        }
    }

    /// Removes an entry found expired by a caller before the timer swept it.
    fn expire(&self, inner: &mut Inner<K, V>, id: NodeId) {
        if inner.unlink(id).is_some() {
            inner.last_expiration_at = Some(Utc::now());
            self.stats.record_expirations(1);
            trace!(cache = %self.name, "Removed expired entry on access");
        }
    }
}

impl<K, V> ExpirationTarget for Shared<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn expiration_check(&self) {
        let mut inner = self.inner.write();
        let sweep = inner.sweep(Instant::now());

        inner.next_wake = sweep.next_deadline;
        match sweep.next_deadline {
            Some(deadline) => self.timer.arm(deadline),
            None => self.timer.disarm(),
        }

        if sweep.removed > 0 {
            inner.last_expiration_at = Some(Utc::now());
            self.stats.record_expirations(sweep.removed);
            info!(
                cache = %self.name,
                "TTL expiration: removed {} expired entries",
                sweep.removed
            );
        } else {
            debug!(cache = %self.name, "TTL expiration: no expired entries found");
        }
    }
}

// == LRU Cache ==
/// Thread-safe bounded cache with LRU eviction and per-entry TTL.
///
/// Clones share the same underlying cache. Structural operations (insert,
/// evict, delete, reorder, expire) serialize on one reader/writer lock;
/// per-entry metadata has its own lock.
pub struct LruCache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for LruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .field("len", &self.shared.inner.read().index.len())
            .finish()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// `InvalidCapacity` if `capacity` is zero; `Scheduler` if the
    /// expiration timer could not be started.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(capacity))
    }

    /// Creates a cache from a `CacheConfig`.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let (timer, rx) = ExpirationTimer::channel();
        let shared = Arc::new(Shared {
            inner: RwLock::new(Inner::new(config.capacity)),
            stats: StatsRecorder::default(),
            capacity: config.capacity,
            timer,
            name: config.name,
        });
        spawn_expiration_task(
            Arc::downgrade(&shared),
            rx,
            format!("{}-expiration", shared.name),
        )?;

        debug!(cache = %shared.name, capacity = shared.capacity, "Cache created");
        Ok(Self { shared })
    }

    // == Put ==
    /// Stores a value under `key`, returning the resulting entry.
    ///
    /// An existing key keeps its original TTL: the value is replaced, access
    /// stats are refreshed (restarting the TTL countdown) and the entry moves
    /// to the front. A new key evicts the least recently used entry first if
    /// the cache is full. A zero `ttl` means the entry never expires.
    ///
    /// A key whose entry has expired but not been swept is treated as new: the
    /// dead entry is removed and a fresh one is created with `ttl`.
    pub fn put(&self, key: K, value: V, ttl: Duration) -> Entry<K, V> {
        let value = Arc::new(value);
        let mut guard = self.shared.inner.write();
        let inner = &mut *guard;

        if let Some((id, entry)) = inner.lookup(&key) {
            if !entry.is_expired(Instant::now()) {
                entry.set_value(value);
                entry.keep_alive();
                let snapshot = entry.snapshot();
                inner.entries.move_to_front(id);
                return snapshot;
            }
            self.shared.expire(inner, id);
        }

        // Evict before inserting so the size never exceeds capacity
        if inner.index.len() >= self.shared.capacity && inner.evict_lru().is_some() {
            self.shared.stats.record_eviction();
            debug!(cache = %self.shared.name, "Evicted least recently used entry");
        }

        let entry = CacheEntry::new(key.clone(), value, ttl);
        let snapshot = entry.snapshot();
        let deadline = entry.expires_at();
        let id = inner.entries.insert_front(entry);
        inner.index.insert(key, id);
        self.shared.schedule(inner, deadline);

        snapshot
    }

    // == Get ==
    /// Looks up `key`, refreshing its access stats and moving it to the front.
    ///
    /// The refresh and the reorder happen under one write lock, so list order
    /// always follows access time. An entry whose TTL has elapsed but which
    /// the timer has not swept yet is removed here and reported as missing.
    pub fn get<Q>(&self, key: &Q) -> Result<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.shared.inner.write();
        let inner = &mut *guard;

        let Some((id, entry)) = inner.lookup(key) else {
            self.shared.stats.record_miss();
            return Err(CacheError::KeyNotFound);
        };
        if entry.is_expired(Instant::now()) {
            self.shared.expire(inner, id);
            self.shared.stats.record_miss();
            return Err(CacheError::KeyNotFound);
        }

        entry.keep_alive();
        let snapshot = entry.snapshot();
        inner.entries.move_to_front(id);
        self.shared.stats.record_hit();
        Ok(snapshot)
    }

    // == Peek ==
    /// Looks up `key` without touching recency or access stats.
    pub fn peek<Q>(&self, key: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.shared.inner.read();
        let (_, entry) = inner.lookup(key)?;
        (!entry.is_expired(Instant::now())).then(|| entry.snapshot())
    }

    /// Returns the least recently used entry that has not expired.
    pub fn peek_lru(&self) -> Option<Entry<K, V>> {
        let now = Instant::now();
        let inner = self.shared.inner.read();
        inner
            .entries
            .iter()
            .rev()
            .map(|(_, entry)| entry)
            .find(|entry| !entry.is_expired(now))
            .map(CacheEntry::snapshot)
    }

    // == Delete ==
    /// Removes `key`, returning the removed entry.
    ///
    /// An expired entry is removed as well, but reported as `KeyNotFound`.
    pub fn delete<Q>(&self, key: &Q) -> Result<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.shared.inner.write();
        let inner = &mut *guard;

        let (id, expired) = inner
            .lookup(key)
            .map(|(id, entry)| (id, entry.is_expired(Instant::now())))
            .ok_or(CacheError::KeyNotFound)?;
        if expired {
            self.shared.expire(inner, id);
            return Err(CacheError::KeyNotFound);
        }

        let entry = inner.unlink(id).ok_or(CacheError::KeyNotFound)?;
        Ok(entry.into_snapshot())
    }

    // == Exists ==
    /// Membership check with no effect on recency or access stats.
    pub fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.shared.inner.read();
        inner
            .lookup(key)
            .is_some_and(|(_, entry)| !entry.is_expired(Instant::now()))
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    ///
    /// Expired entries count until the timer or a lookup removes them.
    pub fn len(&self) -> usize {
        self.shared.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // == Flush ==
    /// Removes every entry and cancels the pending expiration wake.
    pub fn flush(&self) {
        let mut inner = self.shared.inner.write();
        let removed = inner.index.len();
        inner.index.clear();
        inner.entries.clear();
        inner.next_wake = None;
        self.shared.timer.disarm();
        debug!(cache = %self.shared.name, "Flushed {} entries", removed);
    }

    // == For Each ==
    /// Visits every live entry from most to least recently used under the
    /// shared read lock. Expired entries awaiting the sweep are skipped.
    ///
    /// The visitor must not call back into this cache: mutating operations
    /// would deadlock on the structural lock.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &Entry<K, V>),
    {
        let now = Instant::now();
        let inner = self.shared.inner.read();
        for (_, entry) in inner.entries.iter() {
            if !entry.is_expired(now) {
                visitor(&entry.key, &entry.snapshot());
            }
        }
    }

    /// Keys of live entries from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let now = Instant::now();
        let inner = self.shared.inner.read();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.shared.inner.read();
        self.shared
            .stats
            .snapshot(inner.index.len(), self.shared.capacity, inner.last_expiration_at)
    }
}

#[cfg(test)]
impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Panics if the index and the entry list disagree.
    pub(crate) fn assert_consistent(&self) {
        let inner = self.shared.inner.read();
        assert_eq!(inner.index.len(), inner.entries.len(), "index/list size mismatch");
        assert!(inner.index.len() <= self.shared.capacity, "over capacity");
        for (id, entry) in inner.entries.iter() {
            assert_eq!(inner.index.get(&entry.key), Some(&id), "orphan {:?}", entry.key);
        }
    }

    /// Builds a cache with no timer task behind it, so expired entries stay
    /// in place until an operation removes them.
    pub(crate) fn without_timer(capacity: usize) -> Self {
        let (timer, _rx) = ExpirationTimer::channel();
        Self {
            shared: Arc::new(Shared {
                name: "unswept".to_string(),
                capacity,
                inner: RwLock::new(Inner::new(capacity)),
                stats: StatsRecorder::default(),
                timer,
            }),
        }
    }

    /// Deadline the expiration timer is currently armed for.
    pub(crate) fn armed_deadline(&self) -> Option<Instant> {
        self.shared.inner.read().next_wake
    }
}

//! Key-value store with per-entry expiry
//!
//! Entries record the instant they were stored and are considered live while
//! `now - stored_at < ttl`. Expired entries are evicted lazily on read, or in
//! bulk by [`TtlCache::sweep`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// A cache shared between a client and its sweeper task
pub type SharedCache<V> = Arc<Mutex<TtlCache<V>>>;

/// Locks a shared cache, recovering the data if a holder panicked
///
/// Every cache operation leaves the map consistent, so a poisoned lock
/// carries no broken state.
pub fn lock_cache<V>(cache: &SharedCache<V>) -> MutexGuard<'_, TtlCache<V>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single stored value with its insertion time
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

/// String-keyed store whose entries expire after a fixed duration
///
/// The TTL applies to every entry and can be changed at runtime; changing it
/// re-evaluates existing entries against the new duration on their next read
/// or sweep.
///
/// Every invalidation bumps a generation counter. A caller that reads the
/// generation before a slow fill can use [`TtlCache::set_if_current`] to avoid
/// storing a value that was invalidated in the meantime.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
    generation: u64,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            generation: 0,
        }
    }

    /// Wraps a new cache for sharing across tasks
    pub fn shared(ttl: Duration) -> SharedCache<V> {
        Arc::new(Mutex::new(Self::new(ttl)))
    }

    /// Current time-to-live applied to all entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replaces the time-to-live
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    /// Returns a live value for `key`
    ///
    /// An expired entry is removed and `None` is returned.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let ttl = self.ttl;

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now, ttl) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, stamped with the current instant
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Stores `value` only if nothing was invalidated since `generation`
    ///
    /// Returns whether the value was stored.
    pub fn set_if_current(&mut self, key: impl Into<String>, value: V, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.set(key, value);
        true
    }

    /// Removes the entry for `key`, live or not
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.generation = self.generation.wrapping_add(1);
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drops every expired entry and returns how many were removed
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();

        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));

        before - self.entries.len()
    }

    /// Removes all entries
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.entries.clear();
    }

    /// Invalidation counter, bumped by [`remove`](Self::remove) and
    /// [`clear`](Self::clear)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

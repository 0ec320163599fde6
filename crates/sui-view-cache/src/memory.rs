//! In-process cache tier.

use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::entry::{CacheEntry, Clock, Lookup};

/// Keyed TTL store for one entity category.
///
/// Reads return clones; expired entries are removed on first read past expiry.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Valid entry for `key`, if any.
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        match self.lookup(key) {
            Lookup::Fresh(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn lookup(&self, key: &K) -> Lookup<V> {
        let now = self.clock.now_ms();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Lookup::Missing,
                Some(entry) if entry.is_valid_at(now) => return Lookup::Fresh(entry.clone()),
                Some(_) => {}
            }
        }
        // Re-check under the write lock: a concurrent writer may have refreshed it.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Lookup::Fresh(entry.clone()),
            Some(_) => entries.remove(key).map_or(Lookup::Missing, Lookup::Stale),
            None => Lookup::Missing,
        }
    }

    pub fn set(&self, key: K, data: V) -> CacheEntry<V> {
        self.set_with_ttl(key, data, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: K, data: V, ttl: Duration) -> CacheEntry<V> {
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);
        self.entries.write().insert(key, entry.clone());
        entry
    }

    /// Insert an entry as-is, keeping its timestamp and TTL.
    pub fn insert_entry(&self, key: K, entry: CacheEntry<V>) {
        self.entries.write().insert(key, entry);
    }

    /// Put back an entry that [`Self::lookup`] handed out as stale. A value
    /// written for `key` in the meantime wins. Returns whether it went back.
    pub fn restore(&self, key: K, entry: CacheEntry<V>) -> bool {
        match self.entries.write().entry(key) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn delete(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all currently valid values.
    pub fn valid_values(&self) -> Vec<V> {
        let now = self.clock.now_ms();
        self.entries
            .read()
            .values()
            .filter(|e| e.is_valid_at(now))
            .map(|e| e.data.clone())
            .collect()
    }

    /// Apply `f` to the data of a valid entry. Timestamp and TTL are kept.
    ///
    /// Returns `false` when there is no valid entry for `key`.
    pub fn update_valid(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_valid_at(now) => {
                f(&mut entry.data);
                true
            }
            _ => false,
        }
    }

    /// Apply `f` to every valid entry. Returns the keys whose data `f` reports as changed.
    pub fn update_all_valid(&self, mut f: impl FnMut(&K, &mut V) -> bool) -> Vec<K> {
        let now = self.clock.now_ms();
        let mut changed = Vec::new();
        for (key, entry) in self.entries.write().iter_mut() {
            if entry.is_valid_at(now) && f(key, &mut entry.data) {
                changed.push(key.clone());
            }
        }
        changed
    }
}

/// A single named value with a TTL (collection count, platform stats).
#[derive(Debug)]
pub struct CacheSlot<V> {
    entry: Mutex<Option<CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl<V: Clone> CacheSlot<V> {
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            clock,
            default_ttl,
        }
    }

    pub fn get(&self) -> Option<CacheEntry<V>> {
        match self.lookup() {
            Lookup::Fresh(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn lookup(&self) -> Lookup<V> {
        let now = self.clock.now_ms();
        let mut slot = self.entry.lock();
        match slot.as_ref() {
            None => Lookup::Missing,
            Some(entry) if entry.is_valid_at(now) => Lookup::Fresh(entry.clone()),
            Some(_) => slot.take().map_or(Lookup::Missing, Lookup::Stale),
        }
    }

    pub fn set(&self, data: V) -> CacheEntry<V> {
        let entry = CacheEntry::new(data, self.clock.now_ms(), self.default_ttl);
        *self.entry.lock() = Some(entry.clone());
        entry
    }

    pub fn insert_entry(&self, entry: CacheEntry<V>) {
        *self.entry.lock() = Some(entry);
    }

    /// Slot counterpart of [`MemoryStore::restore`].
    pub fn restore(&self, entry: CacheEntry<V>) -> bool {
        let mut slot = self.entry.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(entry);
        true
    }

    pub fn clear(&self) {
        *self.entry.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.entry.lock().is_some()
    }
}

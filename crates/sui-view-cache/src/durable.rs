//! Durable cache tier over a [`KvStorage`] medium.
//!
//! Entries are JSON-encoded [`CacheEntry`] values stored under
//! `"{namespace}:{kind}:{key}"`. The store is best-effort: every storage
//! failure is logged and reported to the caller as a miss or a dropped write,
//! never as an error.
//!
//! When a write hits the quota, the oldest half of this namespace (by entry
//! timestamp) is evicted and the write retried exactly once.

use std::sync::Arc;
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, Clock, Lookup};
use crate::metrics::CacheMetrics;
use crate::storage::{KvStorage, StorageError};

pub struct DurableStore<S> {
    storage: S,
    namespace: String,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
}

impl<S: KvStorage> DurableStore<S> {
    pub fn new(storage: S, namespace: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            namespace: namespace.to_string(),
            clock,
            metrics: CacheMetrics::default(),
        }
    }

    /// Share counters with another component.
    pub fn with_metrics(mut self, metrics: CacheMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn full_key(&self, kind: &str, key: &str) -> String {
        format!("{}:{}:{}", self.namespace, kind, key)
    }

    fn namespace_prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    fn namespace_keys(&self) -> Vec<String> {
        let prefix = self.namespace_prefix();
        match self.storage.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(&prefix)).collect(),
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "durable cache: listing keys failed");
                Vec::new()
            }
        }
    }

    fn remove_quietly(&self, full_key: &str) {
        if let Err(e) = self.storage.remove(full_key) {
            debug!(key = full_key, error = %e, "durable cache: remove failed");
        }
    }

    /// Valid entry for `(kind, key)`, if any.
    pub fn get<V: DeserializeOwned>(&self, kind: &str, key: &str) -> Option<CacheEntry<V>> {
        match self.lookup(kind, key) {
            Lookup::Fresh(entry) => Some(entry),
            _ => None,
        }
    }

    /// Read an entry. Expired entries are removed and returned as `Stale`;
    /// unreadable ones are removed and reported `Missing`.
    pub fn lookup<V: DeserializeOwned>(&self, kind: &str, key: &str) -> Lookup<V> {
        let full_key = self.full_key(kind, key);
        let raw = match self.storage.get(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Missing,
            Err(e) => {
                warn!(key = %full_key, error = %e, "durable cache: read failed");
                return Lookup::Missing;
            }
        };
        let entry: CacheEntry<V> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %full_key, error = %e, "durable cache: dropping corrupt entry");
                self.remove_quietly(&full_key);
                return Lookup::Missing;
            }
        };
        if entry.is_valid_at(self.clock.now_ms()) {
            Lookup::Fresh(entry)
        } else {
            self.remove_quietly(&full_key);
            Lookup::Stale(entry)
        }
    }

    /// Write `data` with a fresh timestamp. Returns `false` if the write was dropped.
    pub fn set<V: Serialize>(&self, kind: &str, key: &str, data: &V, ttl: Duration) -> bool {
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);
        self.put_entry(kind, key, &entry)
    }

    /// Write an entry as-is, keeping its timestamp and TTL.
    pub fn put_entry<V: Serialize>(&self, kind: &str, key: &str, entry: &CacheEntry<V>) -> bool {
        let full_key = self.full_key(kind, key);
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %full_key, error = %e, "durable cache: serialization failed");
                self.metrics.record_write_drop();
                return false;
            }
        };

        match self.storage.set(&full_key, &raw) {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded { needed, quota }) => {
                let evicted = self.evict_oldest_half();
                debug!(key = %full_key, needed, quota, evicted, "durable cache: quota exceeded, retrying");
                match self.storage.set(&full_key, &raw) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key = %full_key, error = %e, "durable cache: write dropped");
                        self.metrics.record_write_drop();
                        false
                    }
                }
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "durable cache: write dropped");
                self.metrics.record_write_drop();
                false
            }
        }
    }

    pub fn delete(&self, kind: &str, key: &str) {
        self.remove_quietly(&self.full_key(kind, key));
    }

    /// Remove every entry of this namespace whose key (after the namespace)
    /// starts with `prefix`. Returns the number removed.
    pub fn clear_prefix(&self, prefix: &str) -> usize {
        let full_prefix = format!("{}{}", self.namespace_prefix(), prefix);
        let mut removed = 0;
        for key in self.namespace_keys() {
            if key.starts_with(&full_prefix) {
                self.remove_quietly(&key);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear_kind(&self, kind: &str) -> usize {
        self.clear_prefix(&format!("{}:", kind))
    }

    /// Remove everything in this namespace. Keys outside it are untouched.
    pub fn clear(&self) -> usize {
        self.clear_prefix("")
    }

    /// Sweep the namespace, removing entries that are expired or unreadable.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        for key in self.namespace_keys() {
            let keep = matches!(
                self.storage.get(&key),
                Ok(Some(raw)) if serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw)
                    .is_ok_and(|entry| entry.is_valid_at(now))
            );
            if !keep {
                self.remove_quietly(&key);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(namespace = %self.namespace, removed, "durable cache: cleared expired entries");
        }
        removed
    }

    /// All valid entries of one kind, keyed by their short key.
    pub fn valid_entries<V: DeserializeOwned>(&self, kind: &str) -> Vec<(String, CacheEntry<V>)> {
        let prefix = self.full_key(kind, "");
        let now = self.clock.now_ms();
        self.namespace_keys()
            .into_iter()
            .filter_map(|key| {
                let short = key.strip_prefix(&prefix)?.to_string();
                let raw = self.storage.get(&key).ok()??;
                let entry: CacheEntry<V> = serde_json::from_str(&raw).ok()?;
                entry.is_valid_at(now).then_some((short, entry))
            })
            .collect()
    }

    /// Evict the oldest half of this namespace by entry timestamp.
    /// Unreadable entries sort first.
    fn evict_oldest_half(&self) -> usize {
        let mut stamped: Vec<(u64, String)> = self
            .namespace_keys()
            .into_iter()
            .map(|key| {
                let timestamp = self
                    .storage
                    .get(&key)
                    .ok()
                    .flatten()
                    .and_then(|raw| serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw).ok())
                    .map_or(0, |entry| entry.timestamp);
                (timestamp, key)
            })
            .collect();
        stamped.sort();

        let count = stamped.len().div_ceil(2);
        for (_, key) in stamped.iter().take(count) {
            self.remove_quietly(key);
        }
        self.metrics.record_evictions(count as u64);
        count
    }
}

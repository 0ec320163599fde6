//! Cache entries, validity and the injectable clock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of "now" in unix milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now
            .fetch_add(duration_ms(by), Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// One cached value with its write time and lifetime, both in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now_ms: u64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: now_ms,
            ttl: duration_ms(ttl),
        }
    }

    /// Valid iff `now - timestamp < ttl`.
    ///
    /// An entry stamped in the future (clock skew between processes sharing a
    /// durable store) counts as age zero.
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) < self.ttl
    }
}

/// `entry != absent && now - entry.timestamp < entry.ttl`.
pub fn is_valid<T>(entry: Option<&CacheEntry<T>>, now_ms: u64) -> bool {
    entry.is_some_and(|e| e.is_valid_at(now_ms))
}

/// Result of a cache read.
///
/// `Stale` entries have already been removed from the store that produced
/// them; the caller decides whether to use the data as a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Fresh(CacheEntry<V>),
    Stale(CacheEntry<V>),
    Missing,
}

impl<V> Lookup<V> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    /// Data of a fresh entry.
    pub fn fresh(self) -> Option<V> {
        match self {
            Lookup::Fresh(entry) => Some(entry.data),
            _ => None,
        }
    }

    /// The entry regardless of freshness.
    pub fn into_entry(self) -> Option<CacheEntry<V>> {
        match self {
            Lookup::Fresh(entry) | Lookup::Stale(entry) => Some(entry),
            Lookup::Missing => None,
        }
    }
}

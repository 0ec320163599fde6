//! TTL cache entry stores for on-chain view reads.
//!
//! This crate provides:
//! - [`CacheEntry`] with `now - timestamp < ttl` validity and an injectable [`Clock`]
//! - [`MemoryStore`] / [`CacheSlot`]: the in-process tier, one store per key type
//! - [`DurableStore`]: a namespaced, quota-aware tier over any [`KvStorage`]
//!   (`MemoryKvStorage`, or `FsKvStorage` for one-file-per-key persistence)
//! - [`CacheMetrics`]: hit/miss/eviction counters shared across tiers

pub mod durable;
pub mod entry;
pub mod memory;
pub mod metrics;
pub mod paths;
pub mod storage;

pub use durable::DurableStore;
pub use entry::{is_valid, CacheEntry, Clock, Lookup, ManualClock, SystemClock};
pub use memory::{CacheSlot, MemoryStore};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use storage::{FsKvStorage, KvStorage, MemoryKvStorage, StorageError};

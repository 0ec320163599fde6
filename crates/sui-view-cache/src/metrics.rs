//! Metrics and reporting for cache operations.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache operation metrics (thread-safe counters).
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    /// Reads served from the in-memory tier
    pub memory_hits: Arc<AtomicU64>,
    /// Reads served from the durable tier (and promoted)
    pub durable_hits: Arc<AtomicU64>,
    /// Reads that went to the remote endpoint
    pub remote_fetches: Arc<AtomicU64>,
    /// Failed refreshes answered with stale data
    pub stale_fallbacks: Arc<AtomicU64>,
    /// Durable entries evicted to make room
    pub evictions: Arc<AtomicU64>,
    /// Durable writes dropped after a failed retry
    pub write_drops: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_durable_hit(&self) {
        self.durable_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_fetch(&self) {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_write_drop(&self) {
        self.write_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            write_drops: self.write_drops.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.memory_hits,
            &self.durable_hits,
            &self.remote_fetches,
            &self.stale_fallbacks,
            &self.evictions,
            &self.write_drops,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of metrics (for reporting).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub memory_hits: u64,
    pub durable_hits: u64,
    pub remote_fetches: u64,
    pub stale_fallbacks: u64,
    pub evictions: u64,
    pub write_drops: u64,
}

impl MetricsSnapshot {
    pub fn total_reads(&self) -> u64 {
        self.memory_hits + self.durable_hits + self.remote_fetches
    }

    /// Share of reads answered by either cache tier.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_reads();
        if total == 0 {
            return 0.0;
        }
        (self.memory_hits + self.durable_hits) as f64 / total as f64
    }

    /// Format a human-readable report.
    pub fn format_report(&self) -> String {
        let lines = [
            "Cache Metrics Report".to_string(),
            "=".repeat(40),
            format!("  Memory hits:     {}", self.memory_hits),
            format!("  Durable hits:    {}", self.durable_hits),
            format!("  Remote fetches:  {}", self.remote_fetches),
            format!("  Hit rate:        {:.1}%", self.hit_rate() * 100.0),
            format!("  Stale fallbacks: {}", self.stale_fallbacks),
            format!("  Evictions:       {}", self.evictions),
            format!("  Dropped writes:  {}", self.write_drops),
        ];
        lines.join("\n")
    }
}

//! Shared types for the sui-card-reader workspace.
//!
//! This crate provides the foundational types used by the transport, cache and
//! reader crates, breaking circular dependency chains:
//!
//! - [`address`]: canonical 32-byte Sui address normalization
//! - [`card`]: the profile card aggregate and its sub-records
//! - [`env_utils`]: typed environment variable parsing
//! - [`RetryConfig`] and [`TtlPolicy`]: tunables shared by every read path

pub mod address;
pub mod card;
pub mod env_utils;

pub use address::{normalize_address, SuiAddress};
pub use card::{
    CardAnalytics, CardId, FeaturedProject, PlatformStats, ProfileCard, Review, Skill,
    SocialLinks, WorkPreferences,
};
pub use env_utils::{env_string_or, env_var, env_var_or};

use std::time::Duration;

/// Configuration for retry behavior on network operations.
///
/// The delay before retry `n` (zero-based) is `initial_backoff * 2^n`, capped
/// at `max_backoff`. There is no jitter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of retry attempts after the first call.
    pub retries: usize,
    /// Initial backoff duration between retries.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl RetryConfig {
    /// Create a new RetryConfig with the specified parameters.
    pub fn new(retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// No retries, no waiting. Handy for tests and one-shot tools.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Backoff to sleep after the given zero-based failed attempt.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(8000),
        }
    }
}

/// Freshness class of a cached fact.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TtlTier {
    /// Volatile per-session data: live counters, analytics.
    Short,
    /// Entity reads: cards, owner views, search results, counts.
    Medium,
    /// Near-static facts: admin roles, platform constants.
    Long,
}

/// Concrete durations for each [`TtlTier`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
}

impl TtlPolicy {
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Short => self.short,
            TtlTier::Medium => self.medium,
            TtlTier::Long => self.long,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            medium: Duration::from_secs(5 * 60),
            long: Duration::from_secs(30 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_initial() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_for(0), Duration::from_millis(1000));
        assert_eq!(retry.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryConfig::new(10, 500, 3000);
        assert_eq!(retry.backoff_for(3), Duration::from_millis(3000));
        assert_eq!(retry.backoff_for(63), Duration::from_millis(3000));
    }

    #[test]
    fn test_ttl_policy_tiers_are_ordered() {
        let policy = TtlPolicy::default();
        assert!(policy.ttl(TtlTier::Short) < policy.ttl(TtlTier::Medium));
        assert!(policy.ttl(TtlTier::Medium) < policy.ttl(TtlTier::Long));
    }
}

//! Environment variable parsing utilities.
//!
//! Type-safe helpers for reading reader configuration from the environment
//! with default values, replacing the repeated pattern:
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```
//!
//! # Example
//!
//! ```
//! use card_reader_types::env_utils::{env_string_or, env_var_or};
//!
//! let quota: u64 = env_var_or("CARD_CACHE_QUOTA_BYTES", 5 * 1024 * 1024);
//! let module = env_string_or("CARD_MODULE", "profile_card");
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse an environment variable with a default value.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Get a non-empty environment variable as a string, or the default.
pub fn env_string_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("CARD_TEST_U64", " 42 ");
        let val: Option<u64> = env_var("CARD_TEST_U64");
        assert_eq!(val, Some(42));

        let missing: Option<u64> = env_var("CARD_TEST_NONEXISTENT_1");
        assert_eq!(missing, None);

        std::env::remove_var("CARD_TEST_U64");
    }

    #[test]
    fn test_env_var_or() {
        std::env::set_var("CARD_TEST_WITH_DEFAULT", "100");
        let val: u64 = env_var_or("CARD_TEST_WITH_DEFAULT", 50);
        assert_eq!(val, 100);

        let default_val: u64 = env_var_or("CARD_TEST_NONEXISTENT_2", 50);
        assert_eq!(default_val, 50);

        std::env::remove_var("CARD_TEST_WITH_DEFAULT");
    }

    #[test]
    fn test_env_string_or_ignores_blank() {
        std::env::set_var("CARD_TEST_BLANK", "   ");
        assert_eq!(env_string_or("CARD_TEST_BLANK", "default"), "default");
        assert_eq!(env_string_or("CARD_TEST_NONEXISTENT_4", "default"), "default");
        std::env::remove_var("CARD_TEST_BLANK");
    }
}

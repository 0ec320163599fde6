//! Address normalization utilities.
//!
//! This module is the canonical source for address normalization in the workspace.
//! Other crates should import from here rather than defining their own logic.
//!
//! Sui addresses are 32-byte values, but RPC transports hand them back in
//! different formats:
//! - Short form: "0x2"
//! - Full form: "0x0000000000000000000000000000000000000000000000000000000000000002"
//! - Without prefix: "2"
//! - Over-long hex where a type-tag byte leaked into the value
//!
//! The canonical form is lowercase, `0x`-prefixed and exactly 64 hex digits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex digits in a canonical address (32 bytes).
pub const ADDRESS_HEX_LEN: usize = 64;

/// Normalize an address to lowercase with 0x prefix and exactly 64 hex characters.
///
/// Short values are left-padded with zeros. Longer values keep their *last*
/// 64 digits, which drops a leading tag byte. Empty input stays empty.
///
/// # Examples
///
/// ```
/// use card_reader_types::address::normalize_address;
///
/// assert_eq!(
///     normalize_address("0x2"),
///     "0x0000000000000000000000000000000000000000000000000000000000000002"
/// );
/// assert_eq!(normalize_address(""), "");
/// ```
pub fn normalize_address(addr: &str) -> String {
    let addr = addr.trim();
    let hex = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr)
        .to_lowercase();
    if hex.is_empty() {
        return String::new();
    }
    let digits = hex.chars().count();
    if digits < ADDRESS_HEX_LEN {
        format!("0x{:0>64}", hex)
    } else {
        let tail: String = hex.chars().skip(digits - ADDRESS_HEX_LEN).collect();
        format!("0x{}", tail)
    }
}

/// A canonical Sui address (`0x` + 64 lowercase hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiAddress(String);

impl SuiAddress {
    /// Parse user input into a canonical address.
    ///
    /// Returns `None` for empty input or anything that is not hex.
    pub fn parse(addr: &str) -> Option<Self> {
        let normalized = normalize_address(addr);
        if normalized.is_empty() || !normalized[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(normalized))
    }

    /// Build an address from raw bytes. More than 32 bytes keeps the trailing 32.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Self::parse(&hex::encode(bytes))
    }

    /// `0x0`, the default dev-inspect sender.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(ADDRESS_HEX_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 32 raw bytes of this address.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        if let Ok(decoded) = hex::decode(&self.0[2..]) {
            if decoded.len() == out.len() {
                out.copy_from_slice(&decoded);
            }
        }
        out
    }
}

impl fmt::Display for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SuiAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

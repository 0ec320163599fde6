use card_reader_types::normalize_address;
use sui_transport::RawValue;

use super::text::decode_text;

/// Move `address` type-tag byte some transports leave in front of the 32 bytes.
const ADDRESS_TAG: u8 = 0x01;

/// Decode an address into `0x` + 64 lowercase hex digits. Empty input gives `""`.
pub fn decode_address(raw: &RawValue) -> String {
    if let RawValue::Text(s) = raw {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return normalize_address(trimmed);
        }
    }

    let bytes = raw.to_bytes();
    let bytes = match bytes.as_slice() {
        [] => return String::new(),
        [ADDRESS_TAG, rest @ ..] if rest.len() == 32 => rest,
        all => all,
    };
    normalize_address(&hex::encode(bytes))
}

/// `true` iff the value is `true`, `1`, `"1"`, `"true"` or a byte form starting with 1.
pub fn decode_bool(raw: &RawValue) -> bool {
    match raw {
        RawValue::Bool(b) => *b,
        RawValue::Number(n) => *n == 1,
        RawValue::Text(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        RawValue::Bytes(bytes) => bytes.first() == Some(&1),
        RawValue::List(items) => items.first().is_some_and(decode_bool),
        RawValue::Optional(inner) => inner.as_deref().is_some_and(decode_bool),
        RawValue::Null => false,
    }
}

fn le_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    Some(
        bytes
            .iter()
            .take(8)
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (u64::from(*b) << (8 * i))),
    )
}

/// Decode an unsigned integer from any of its wire shapes.
///
/// Byte forms are read little-endian (first 8 bytes). A two-element
/// `[0, value]` pair and a `[[bytes], ..]` wrapper are unwrapped first.
pub fn decode_u64(raw: &RawValue) -> Option<u64> {
    match raw {
        RawValue::Number(n) => Some(*n),
        RawValue::Bool(b) => Some(u64::from(*b)),
        RawValue::Text(s) => {
            s.trim().parse::<u64>().ok().or_else(|| {
                let bytes = raw.to_bytes();
                // Only hex or comma-joined forms; plain words are not numbers.
                (bytes.as_slice() != s.as_bytes())
                    .then(|| le_u64(&bytes))
                    .flatten()
            })
        }
        RawValue::Bytes(bytes) => match bytes.as_slice() {
            [0, value] => Some(u64::from(*value)),
            other => le_u64(other),
        },
        RawValue::List(items) => match items.as_slice() {
            [RawValue::Number(0), value] => decode_u64(value),
            [first @ (RawValue::Bytes(_) | RawValue::List(_)), ..] => decode_u64(first),
            _ => le_u64(&raw.to_bytes()),
        },
        RawValue::Optional(inner) => inner.as_deref().and_then(decode_u64),
        RawValue::Null => None,
    }
}

/// Decode a millisecond timestamp, falling back to `now_ms`.
pub fn decode_u64_timestamp(raw: &RawValue, now_ms: u64) -> u64 {
    decode_u64(raw).unwrap_or(now_ms)
}

/// Split an optional into present/absent.
///
/// Tagged forms (`{"Some": ..}`, `{"vec": [..]}`) and a `[tag, value]` pair
/// (`0` present, `1` absent) are recognized. Flat bytes follow BCS: a leading
/// `0` is absent, a leading `1` is present with the rest as payload.
pub fn decode_optional(raw: &RawValue) -> Option<RawValue> {
    match raw {
        RawValue::Optional(inner) => inner.as_deref().cloned(),
        RawValue::Null => None,
        RawValue::List(items) => match items.as_slice() {
            [] => None,
            [RawValue::Number(0) | RawValue::Bool(true), value] => Some(value.clone()),
            [RawValue::Number(1) | RawValue::Bool(false), _] => None,
            [single] => Some(single.clone()),
            _ => Some(raw.clone()),
        },
        RawValue::Bytes(bytes) => match bytes.as_slice() {
            [] | [0, ..] => None,
            [1, rest @ ..] => Some(RawValue::Bytes(rest.to_vec())),
            _ => Some(raw.clone()),
        },
        RawValue::Text(s) if s.trim().is_empty() => None,
        other => Some(other.clone()),
    }
}

/// Present, non-empty text.
pub fn decode_optional_text(raw: &RawValue) -> Option<String> {
    decode_optional(raw)
        .map(|value| decode_text(&value))
        .filter(|text| !text.is_empty())
}

pub fn decode_optional_u64(raw: &RawValue) -> Option<u64> {
    decode_optional(raw).and_then(|value| decode_u64(&value))
}

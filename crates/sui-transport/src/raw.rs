//! Raw return values from view-function reads.
//!
//! RPC clients disagree on how they hand back the "same" logical value: a flat
//! byte array, a hex string, a comma-joined list of numbers, a nested array, a
//! plain number or an already-decoded string. [`RawValue`] captures every shape
//! explicitly so field decoders can pattern-match instead of sniffing types.

use serde_json::Value;

/// One positional return value, in whatever shape the transport produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Flat byte sequence (the dev-inspect wire form).
    Bytes(Vec<u8>),
    /// A string: hex, comma-joined numbers, or already-decoded text.
    Text(String),
    /// A non-negative integer.
    Number(u64),
    Bool(bool),
    /// Heterogeneous or nested array.
    List(Vec<RawValue>),
    /// Explicitly tagged optional (`{"Some": ..}`, `{"None": ..}`, `{"vec": [..]}`).
    Optional(Option<Box<RawValue>>),
    Null,
}

impl RawValue {
    /// Map any JSON value onto a [`RawValue`]. Never fails.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .map(RawValue::Number)
                .unwrap_or(RawValue::Null),
            Value::String(s) => RawValue::Text(s.clone()),
            Value::Array(items) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => RawValue::Bytes(bytes),
                    None => RawValue::List(items.iter().map(RawValue::from_json).collect()),
                }
            }
            Value::Object(map) => {
                for key in ["Some", "some", "present", "value"] {
                    if let Some(inner) = map.get(key) {
                        return RawValue::Optional(Some(Box::new(RawValue::from_json(inner))));
                    }
                }
                for key in ["None", "none", "absent"] {
                    if map.contains_key(key) {
                        return RawValue::Optional(None);
                    }
                }
                // Move `Option<T>` rendered as JSON: `{"vec": []}` or `{"vec": [x]}`.
                if let Some(Value::Array(items)) = map.get("vec") {
                    return RawValue::Optional(
                        items.first().map(|v| Box::new(RawValue::from_json(v))),
                    );
                }
                RawValue::Null
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null | RawValue::Optional(None) => true,
            RawValue::Bytes(b) => b.is_empty(),
            RawValue::Text(s) => s.is_empty(),
            RawValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Normalize the value into a byte array, whatever its shape.
    ///
    /// - `Bytes` as-is
    /// - `Text` as hex (with or without `0x`) when it is valid hex, as
    ///   comma-joined numbers when it parses so, otherwise its UTF-8 bytes
    /// - `List` holding a single nested list is unwrapped one level; other
    ///   lists collect their numeric elements
    /// - `Number` as its 8 little-endian bytes, `Bool` as `[0|1]`
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawValue::Bytes(b) => b.clone(),
            RawValue::Text(s) => text_to_bytes(s),
            RawValue::Number(n) => n.to_le_bytes().to_vec(),
            RawValue::Bool(b) => vec![u8::from(*b)],
            RawValue::List(items) => match items.as_slice() {
                [single @ (RawValue::List(_) | RawValue::Bytes(_))] => single.to_bytes(),
                _ => items
                    .iter()
                    .filter_map(|item| match item {
                        RawValue::Number(n) => u8::try_from(*n).ok(),
                        RawValue::Bool(b) => Some(u8::from(*b)),
                        _ => None,
                    })
                    .collect(),
            },
            RawValue::Optional(Some(inner)) => inner.to_bytes(),
            RawValue::Optional(None) | RawValue::Null => Vec::new(),
        }
    }
}

fn text_to_bytes(s: &str) -> Vec<u8> {
    let trimmed = s.trim();
    if let Some(digits) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if let Some(bytes) = decode_hex(digits) {
            return bytes;
        }
    }
    if trimmed.contains(',') {
        let parsed: Option<Vec<u8>> = trimmed
            .split(',')
            .map(|part| part.trim().parse::<u8>().ok())
            .collect();
        if let Some(bytes) = parsed {
            return bytes;
        }
    }
    s.as_bytes().to_vec()
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 == 1 {
        hex::decode(format!("0{}", digits)).ok()
    } else {
        hex::decode(digits).ok()
    }
}

//! ULEB128 length prefixes.

/// Longest ULEB128 encoding of a `u64`.
const MAX_ULEB_BYTES: usize = 10;

/// Read one ULEB128 value from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input is truncated or the value overflows `u64`.
pub fn read_uleb128(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().take(MAX_ULEB_BYTES).enumerate() {
        let low = u64::from(byte & 0x7f);
        let shift = 7 * i as u32;
        let shifted = low.checked_shl(shift)?;
        if shifted >> shift != low {
            return None;
        }
        value |= shifted;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

pub fn encode_uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Strip a leading length prefix when it describes exactly the rest of `bytes`.
pub fn strip_length_prefix(bytes: &[u8]) -> &[u8] {
    match read_uleb128(bytes) {
        Some((len, consumed)) if (bytes.len() - consumed) as u64 == len => &bytes[consumed..],
        _ => bytes,
    }
}

/// Split `bytes` into `count` length-prefixed items.
///
/// Returns the items and the number of bytes consumed. Stops early, keeping the
/// complete items read so far, when the input runs out.
pub(crate) fn read_prefixed_items(bytes: &[u8], count: Option<u64>) -> (Vec<&[u8]>, usize) {
    let mut items = Vec::new();
    let mut pos = 0;
    while count.map_or(pos < bytes.len(), |n| (items.len() as u64) < n) {
        let Some((len, consumed)) = read_uleb128(&bytes[pos..]) else {
            break;
        };
        let start = pos + consumed;
        let Some(end) = usize::try_from(len).ok().and_then(|l| start.checked_add(l)) else {
            break;
        };
        if end > bytes.len() {
            break;
        }
        items.push(&bytes[start..end]);
        pos = end;
    }
    (items, pos)
}

//! String and URL fields.
//!
//! Text arrives length-prefixed, hex-encoded, as comma-joined numbers or
//! already decoded, and some upstream encoders leave stray characters at the
//! front. The leading-artifact stripping in [`decode_text`] matches
//! corruption observed from one such encoder. It is best-effort: it can strip a
//! legitimate leading character (`"3D Artist"` loses its `3`).

use sui_transport::RawValue;
use url::Url;

use super::uleb::{read_uleb128, strip_length_prefix};

/// Upper bound on cleaning passes. Each pass only shortens or normalizes
/// whitespace, so real inputs settle in two or three.
const MAX_CLEAN_PASSES: usize = 64;

/// Decode a string field into cleaned UTF-8. Never fails; garbage decodes to `""`.
///
/// Cleaning is repeated until it no longer changes the text, so
/// `decode_text(&RawValue::Text(decode_text(x))) == decode_text(x)`.
pub fn decode_text(raw: &RawValue) -> String {
    let mut text = decode_text_once(raw);
    for _ in 0..MAX_CLEAN_PASSES {
        let again = decode_text_once(&RawValue::Text(text.clone()));
        if again == text {
            break;
        }
        text = again;
    }
    text
}

fn decode_text_once(raw: &RawValue) -> String {
    match raw {
        RawValue::Text(s) => {
            let s = strip_char_length_prefix(s);
            match reinterpret_text(s) {
                Some(bytes) => clean_bytes(strip_length_prefix(&bytes)),
                None => clean_bytes(s.as_bytes()),
            }
        }
        other => clean_bytes(strip_length_prefix(&other.to_bytes())),
    }
}

/// A transport may merge a one-character length prefix into an already
/// decoded string: `"\u{5}hello"`. Only a control character is taken as a
/// prefix; a printable first character always belongs to the text.
fn strip_char_length_prefix(s: &str) -> &str {
    let mut chars = s.chars();
    match chars.next() {
        Some(first)
            if first < '\u{20}' && first as usize == chars.as_str().chars().count() =>
        {
            chars.as_str()
        }
        _ => s,
    }
}

/// Bytes behind a hex (`0x..`) or comma-joined text value. Taken only when
/// they decode to something string-like, so ordinary text such as `"0xCAFE"`
/// stays as it is.
fn reinterpret_text(s: &str) -> Option<Vec<u8>> {
    let reinterpreted = RawValue::Text(s.to_string()).to_bytes();
    if reinterpreted.as_slice() == s.as_bytes() {
        return None;
    }
    let prefixed = matches!(
        read_uleb128(&reinterpreted),
        Some((len, consumed)) if (reinterpreted.len() - consumed) as u64 == len
    );
    let readable = std::str::from_utf8(&reinterpreted)
        .is_ok_and(|t| !t.is_empty() && !t.chars().any(|c| c.is_control() && !matches!(c, '\r' | '\n')));
    (prefixed || readable).then_some(reinterpreted)
}

/// Lossy UTF-8, control characters dropped, whitespace collapsed, leading
/// artifact stripped.
///
/// Every non-control character is kept, so names in non-Latin scripts
/// (`"Łukasz"`, `"山田"`) survive instead of being filtered to Latin-1.
pub(crate) fn clean_bytes(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    let kept: String = decoded
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .filter(|&c| !c.is_control() || matches!(c, '\r' | '\n'))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_leading_artifact(&collapsed).to_string()
}

fn strip_leading_artifact(s: &str) -> &str {
    let mut chars = s.chars();
    let (Some(c0), Some(c1)) = (chars.next(), chars.next()) else {
        return s;
    };
    let c2 = chars.next();
    let rest = &s[c0.len_utf8()..];

    if (c0.is_ascii_punctuation() || c0.is_ascii_digit()) && c1.is_uppercase() {
        return rest;
    }
    if c0.is_uppercase() && c0 == c1 && c2.is_some_and(char::is_lowercase) {
        return rest;
    }
    s
}

/// Decode a URL field. Returns `""` unless the result parses as an http(s) URL.
pub fn decode_url(raw: &RawValue) -> String {
    let text = decode_text(raw);
    if text.is_empty() {
        return String::new();
    }

    let mut url = text.as_str();
    // "xhttps://..." -> "https://..."
    if !has_scheme(url) {
        if let Some((i, _)) = url.char_indices().nth(1) {
            if has_scheme(&url[i..]) {
                url = &url[i..];
            }
        }
    }
    // "https://https://..." -> "https://..."
    loop {
        let Some(rest) = strip_scheme(url) else { break };
        if has_scheme(rest) {
            url = rest;
        } else {
            break;
        }
    }

    let candidate = if has_scheme(url) {
        url.to_string()
    } else if url.contains("://") {
        return String::new();
    } else {
        format!("https://{}", url)
    };

    match Url::parse(&candidate) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            candidate
        }
        _ => String::new(),
    }
}

fn strip_scheme(s: &str) -> Option<&str> {
    s.strip_prefix("https://").or_else(|| s.strip_prefix("http://"))
}

fn has_scheme(s: &str) -> bool {
    strip_scheme(s).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::uleb::encode_uleb128;
    use proptest::prelude::*;

    fn prefixed(s: &str) -> Vec<u8> {
        let mut out = encode_uleb128(s.len() as u64);
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_length_prefixed_bytes() {
        assert_eq!(decode_text(&RawValue::Bytes(prefixed("Ada Lovelace"))), "Ada Lovelace");
        assert_eq!(decode_text(&RawValue::Bytes(vec![0])), "");
        let long = "x".repeat(200);
        assert_eq!(decode_text(&RawValue::Bytes(prefixed(&long))), long);
    }

    #[test]
    fn test_first_letter_matching_length_is_kept() {
        // 'T' is 84 and 'A' is 65: the first letter equals the remaining length.
        let title = format!("T{}", "x".repeat(84));
        let artist = format!("A{}", "b".repeat(65));
        for s in [title, artist] {
            assert_eq!(decode_text(&RawValue::Bytes(prefixed(&s))), s);
            assert_eq!(decode_text(&RawValue::Text(s.clone())), s);
        }
    }

    #[test]
    fn test_text_shapes() {
        assert_eq!(decode_text(&RawValue::Text("0x026869".into())), "hi");
        assert_eq!(decode_text(&RawValue::Text("2,104,105".into())), "hi");
        assert_eq!(decode_text(&RawValue::Text("\u{5}hello".into())), "hello");
        assert_eq!(
            decode_text(&RawValue::List(vec![RawValue::Bytes(prefixed("nested"))])),
            "nested"
        );
        // Text that only looks like an encoding is left alone.
        assert_eq!(decode_text(&RawValue::Text("0xCAFE".into())), "0xCAFE");
        assert_eq!(decode_text(&RawValue::Text("Tea, coffee".into())), "Tea, coffee");
    }

    #[test]
    fn test_cleaning() {
        assert_eq!(
            decode_text(&RawValue::Text("  Rust \t\n developer\u{7} ".into())),
            "Rust developer"
        );
        assert_eq!(decode_text(&RawValue::Bytes(vec![0xff, b'o', b'k'])), "ok");
        assert_eq!(decode_text(&RawValue::Text("Café".into())), "Café");
        assert_eq!(decode_text(&RawValue::Text("Łukasz 山田".into())), "Łukasz 山田");
    }

    #[test]
    fn test_leading_artifacts() {
        assert_eq!(decode_text(&RawValue::Text("'Senior Engineer".into())), "Senior Engineer");
        assert_eq!(decode_text(&RawValue::Text("7Berlin".into())), "Berlin");
        assert_eq!(decode_text(&RawValue::Text("JJohn".into())), "John");
        assert_eq!(decode_text(&RawValue::Text("AAA batteries".into())), "AAA batteries");
        assert_eq!(decode_text(&RawValue::Text("iOS dev".into())), "iOS dev");
    }

    #[test]
    fn test_garbage_is_empty_not_error() {
        assert_eq!(decode_text(&RawValue::Null), "");
        assert_eq!(decode_text(&RawValue::Bytes(vec![0x80, 0x80])), "");
        assert_eq!(decode_text(&RawValue::Optional(None)), "");
    }

    #[test]
    fn test_urls() {
        let url = |s: &str| decode_url(&RawValue::Text(s.into()));
        assert_eq!(url("https://example.com/a"), "https://example.com/a");
        assert_eq!(url("example.com"), "https://example.com");
        assert_eq!(url("xhttps://example.com"), "https://example.com");
        assert_eq!(url("https://https://example.com"), "https://example.com");
        assert_eq!(url("http://http://example.com"), "http://example.com");
        assert_eq!(url("ftp://example.com"), "");
        assert_eq!(url("not a url at all!"), "");
        assert_eq!(url(""), "");
        assert_eq!(
            decode_url(&RawValue::Bytes(prefixed("walrus.site/img.png"))),
            "https://walrus.site/img.png"
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_decode_text_is_idempotent(s in "\\PC{0,48}") {
            let once = decode_text(&RawValue::Text(s));
            let twice = decode_text(&RawValue::Text(once.clone()));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_decode_text_idempotent_on_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let once = decode_text(&RawValue::Bytes(bytes));
            let twice = decode_text(&RawValue::Text(once.clone()));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_prefixed_string_round_trips(s in "[A-Za-z][a-z]{0,20}( [a-z]{1,10}){0,16}") {
            prop_assert_eq!(decode_text(&RawValue::Bytes(prefixed(&s))), s.clone());
            prop_assert_eq!(decode_text(&RawValue::Text(s.clone())), s);
        }
    }
}

//! Vector fields: JSON documents, plain strings and card IDs.
//!
//! A `vector<String>` arrives as a ULEB128 item count followed by
//! length-prefixed items. Looser transports hand back the count-less form, a
//! `[[bytes]]` wrapper, a list of per-item byte arrays or a list of strings;
//! all of them go through the same per-item pipeline.

use serde::de::DeserializeOwned;
use sui_transport::RawValue;

use super::scalar::decode_u64;
use super::text::clean_bytes;
use super::uleb::{read_prefixed_items, read_uleb128, strip_length_prefix};

/// Substrings that only appear when a type tag leaked into item text.
const TYPE_TAG_ARTIFACTS: [&str; 2] = ["vector", "0x1::string::String"];

fn has_type_tag_artifact(text: &str) -> bool {
    TYPE_TAG_ARTIFACTS.iter().any(|tag| text.contains(tag))
}

/// Split a byte vector when one of its encodings accounts for every byte.
fn split_exact(bytes: &[u8]) -> Option<Vec<Vec<u8>>> {
    if let Some((count, consumed)) = read_uleb128(bytes) {
        let (items, used) = read_prefixed_items(&bytes[consumed..], Some(count));
        if items.len() as u64 == count && consumed + used == bytes.len() {
            return Some(items.into_iter().map(<[u8]>::to_vec).collect());
        }
    }
    let (items, used) = read_prefixed_items(bytes, None);
    (!items.is_empty() && used == bytes.len())
        .then(|| items.into_iter().map(<[u8]>::to_vec).collect())
}

/// Exact split, or as many complete count-prefixed items as the input holds.
fn split_bytes(bytes: &[u8]) -> Vec<Vec<u8>> {
    split_exact(bytes).unwrap_or_else(|| match read_uleb128(bytes) {
        Some((count, consumed)) => read_prefixed_items(&bytes[consumed..], Some(count))
            .0
            .into_iter()
            .map(<[u8]>::to_vec)
            .collect(),
        None => Vec::new(),
    })
}

fn vector_items(raw: &RawValue) -> Vec<Vec<u8>> {
    match raw {
        RawValue::Null | RawValue::Optional(None) => Vec::new(),
        RawValue::Optional(Some(inner)) => vector_items(inner),
        RawValue::List(items) => {
            if let [single @ (RawValue::Bytes(_) | RawValue::List(_))] = items.as_slice() {
                if let Some(split) = split_exact(&single.to_bytes()) {
                    return split;
                }
            }
            items
                .iter()
                .filter_map(|item| match item {
                    RawValue::Text(s) => Some(s.as_bytes().to_vec()),
                    RawValue::Bytes(_) | RawValue::List(_) => {
                        Some(strip_length_prefix(&item.to_bytes()).to_vec())
                    }
                    _ => None,
                })
                .collect()
        }
        RawValue::Text(s) => match serde_json::from_str::<Vec<String>>(s.trim()) {
            Ok(strings) => strings.into_iter().map(String::into_bytes).collect(),
            Err(_) => split_bytes(&raw.to_bytes()),
        },
        RawValue::Bytes(bytes) => split_bytes(bytes),
        RawValue::Number(_) | RawValue::Bool(_) => Vec::new(),
    }
}

/// Decode a vector of JSON documents, silently dropping items that fail to
/// parse or still carry type-tag text.
pub fn decode_json_vector<T: DeserializeOwned>(raw: &RawValue) -> Vec<T> {
    vector_items(raw)
        .iter()
        .filter_map(|item| {
            let text: String = String::from_utf8_lossy(item)
                .chars()
                .filter(|c| !c.is_control())
                .collect();
            let text = text.trim();
            if text.is_empty() || has_type_tag_artifact(text) {
                return None;
            }
            serde_json::from_str(text).ok()
        })
        .collect()
}

/// Decode a `vector<String>` into cleaned, non-empty strings.
pub fn decode_string_vector(raw: &RawValue) -> Vec<String> {
    vector_items(raw)
        .iter()
        .map(|item| clean_bytes(item))
        .filter(|text| !text.is_empty() && !has_type_tag_artifact(text))
        .collect()
}

fn bcs_ids(bytes: &[u8]) -> Option<Vec<u64>> {
    let (count, consumed) = read_uleb128(bytes)?;
    let rest = &bytes[consumed..];
    if count.checked_mul(8)? != rest.len() as u64 {
        return None;
    }
    Some(
        rest.chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect(),
    )
}

/// Decode a `vector<u64>` of card IDs.
///
/// Bytes that are not a well-formed BCS vector are read as one small ID per
/// byte, which is how a plain JSON array like `[1, 2, 3]` arrives.
pub fn decode_id_vector(raw: &RawValue) -> Vec<u64> {
    match raw {
        RawValue::Null | RawValue::Optional(None) | RawValue::Bool(_) => Vec::new(),
        RawValue::Optional(Some(inner)) => decode_id_vector(inner),
        RawValue::Number(n) => vec![*n],
        RawValue::Bytes(bytes) => {
            bcs_ids(bytes).unwrap_or_else(|| bytes.iter().map(|b| u64::from(*b)).collect())
        }
        RawValue::List(items) => {
            if let [single @ (RawValue::Bytes(_) | RawValue::List(_))] = items.as_slice() {
                if let Some(ids) = bcs_ids(&single.to_bytes()) {
                    return ids;
                }
            }
            items.iter().filter_map(decode_u64).collect()
        }
        RawValue::Text(s) => match serde_json::from_str::<Vec<serde_json::Value>>(s.trim()) {
            Ok(values) => values
                .iter()
                .filter_map(|v| decode_u64(&RawValue::from_json(v)))
                .collect(),
            Err(_) => {
                let bytes = raw.to_bytes();
                bcs_ids(&bytes).unwrap_or_default()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::uleb::encode_uleb128;
    use card_reader_types::{FeaturedProject, Skill};

    fn prefixed(s: &str) -> Vec<u8> {
        let mut out = encode_uleb128(s.len() as u64);
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_featured_projects_drop_artifact_item() {
        let good = r#"{"name":"Bridge","url":"https://bridge.example"}"#;
        let tainted = r#"{"name":"vector<0x1::string::String>"}"#;

        // Count-less: two length-prefixed strings back to back.
        let mut flat = prefixed(good);
        flat.extend(prefixed(tainted));
        let projects: Vec<FeaturedProject> = decode_json_vector(&RawValue::Bytes(flat));
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Bridge");

        // Canonical BCS vector<String>.
        let bcs = bcs::to_bytes(&vec![good.to_string(), tainted.to_string()]).unwrap();
        let projects: Vec<FeaturedProject> = decode_json_vector(&RawValue::Bytes(bcs));
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].url, "https://bridge.example");
    }

    #[test]
    fn test_json_vector_looser_shapes() {
        let skill = r#"{"name":"Move","proficiency":5,"years":2}"#;
        let as_strings = RawValue::List(vec![
            RawValue::Text(skill.into()),
            RawValue::Text("not json".into()),
        ]);
        let skills: Vec<Skill> = decode_json_vector(&as_strings);
        assert_eq!(skills, vec![Skill { name: "Move".into(), proficiency: 5, years: 2 }]);

        let as_arrays = RawValue::List(vec![RawValue::Bytes(prefixed(skill))]);
        assert_eq!(decode_json_vector::<Skill>(&as_arrays).len(), 1);

        let wrapped = RawValue::List(vec![RawValue::Bytes(
            bcs::to_bytes(&vec![skill.to_string(), skill.to_string()]).unwrap(),
        )]);
        assert_eq!(decode_json_vector::<Skill>(&wrapped).len(), 2);
    }

    #[test]
    fn test_json_vector_tolerates_garbage() {
        assert!(decode_json_vector::<Skill>(&RawValue::Null).is_empty());
        assert!(decode_json_vector::<Skill>(&RawValue::Bytes(vec![])).is_empty());
        assert!(decode_json_vector::<Skill>(&RawValue::Bytes(vec![5, 1, 2])).is_empty());
        assert!(decode_json_vector::<Skill>(&RawValue::Number(3)).is_empty());
    }

    #[test]
    fn test_truncated_vector_keeps_complete_items() {
        let mut bytes = bcs::to_bytes(&vec!["English".to_string(), "Deutsch".to_string()]).unwrap();
        bytes.truncate(bytes.len() - 2);
        assert_eq!(decode_string_vector(&RawValue::Bytes(bytes)), vec!["English"]);
    }

    #[test]
    fn test_string_vector() {
        let bcs = bcs::to_bytes(&vec![
            "English".to_string(),
            " Spanish ".to_string(),
            String::new(),
        ])
        .unwrap();
        assert_eq!(
            decode_string_vector(&RawValue::Bytes(bcs)),
            vec!["English", "Spanish"]
        );
        assert_eq!(
            decode_string_vector(&RawValue::Text(r#"["remote","hybrid"]"#.into())),
            vec!["remote", "hybrid"]
        );
    }

    #[test]
    fn test_id_vector() {
        let bcs = bcs::to_bytes(&vec![3u64, 17, 300]).unwrap();
        assert_eq!(decode_id_vector(&RawValue::Bytes(bcs.clone())), vec![3, 17, 300]);
        assert_eq!(
            decode_id_vector(&RawValue::List(vec![RawValue::Bytes(bcs)])),
            vec![3, 17, 300]
        );
        assert_eq!(decode_id_vector(&RawValue::Bytes(vec![0])), Vec::<u64>::new());
        assert_eq!(decode_id_vector(&RawValue::Bytes(vec![1, 2, 3])), vec![1, 2, 3]);
        assert_eq!(
            decode_id_vector(&RawValue::List(vec![RawValue::Number(400), RawValue::Text("7".into())])),
            vec![400, 7]
        );
        assert_eq!(decode_id_vector(&RawValue::Text("[1, \"2\"]".into())), vec![1, 2]);
        assert!(decode_id_vector(&RawValue::Null).is_empty());
    }
}

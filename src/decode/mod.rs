//! Byte Decoder: one raw view-call return value in, one normalized value out.
//!
//! Every decoder here is pure and total. Malformed input decodes to an empty
//! or default value; nothing panics and nothing returns an error. Whether an
//! empty value is acceptable is decided by the caller (see
//! [`crate::fetcher`]), not here.
//!
//! All shape handling funnels through [`RawValue::to_bytes`](sui_transport::RawValue::to_bytes)
//! so each field decoder only deals with bytes plus the few shapes that carry
//! extra meaning (tagged optionals, lists of items, already-decoded text).

mod scalar;
mod text;
pub mod uleb;
mod vector;

pub use scalar::{
    decode_address, decode_bool, decode_optional, decode_optional_text, decode_optional_u64,
    decode_u64, decode_u64_timestamp,
};
pub use text::{decode_text, decode_url};
pub use uleb::{encode_uleb128, read_uleb128};
pub use vector::{decode_id_vector, decode_json_vector, decode_string_vector};

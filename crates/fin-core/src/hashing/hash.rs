//! Hash helpers sobre blake3.
use blake3::Hasher;

use super::to_canonical_json;
use crate::value::Value;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

/// Fingerprint estable de un `Value` (NaN y null colapsan al mismo texto).
pub fn fingerprint_value(value: &Value) -> String {
    hash_str(&to_canonical_json(&value.to_json()))
}

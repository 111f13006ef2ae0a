//! Fingerprints deterministas de valores y ejecuciones.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{fingerprint_value, hash_str};

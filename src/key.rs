//! Cache Key Derivation
//!
//! Builds deterministic cache keys from an endpoint path and an optional
//! parameter bag. Keys are independent of parameter insertion order, so two
//! logically identical requests always map to the same cache slot.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in the key (128 bits as hex).
const KEY_DIGEST_BYTES: usize = 16;

// == Derive Key ==
/// Derives a cache key for `(endpoint, params)`.
///
/// - No params (or all params null): the endpoint string verbatim, which
///   keeps prefix-based invalidation trivial.
/// - Otherwise: null-valued entries are dropped, the remaining keys are
///   sorted lexicographically, the canonical JSON is hashed and the key is
///   `"{endpoint}:{hash_hex}"`.
///
/// Pure and deterministic: the same logical inputs always produce the same
/// key regardless of map insertion order.
pub fn derive_key(endpoint: &str, params: Option<&Map<String, Value>>) -> String {
    let canonical: BTreeMap<&str, &Value> = match params {
        Some(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
            .collect(),
        None => BTreeMap::new(),
    };

    if canonical.is_empty() {
        return endpoint.to_string();
    }

    // BTreeMap iteration is key-ordered, so this serialization is canonical.
    let json = serde_json::to_string(&canonical)
        .unwrap_or_else(|_| format!("{:?}", canonical));

    let digest = Sha256::digest(json.as_bytes());
    format!("{}:{}", endpoint, hex::encode(&digest[..KEY_DIGEST_BYTES]))
}

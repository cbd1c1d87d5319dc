use sha2::{Digest, Sha256};

use serde_json::Value as Json;

use super::BlockGraph;

/// SHA-256 over the canonical JSON encoding of `graph` plus `salt`.
///
/// Two graphs hash equal only if they compile identically under the same
/// salt, so the hash can key the compiled-procedure cache.
pub fn content_hash(graph: &BlockGraph, salt: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    // Serialization of a graph cannot fail: every field is a plain string,
    // map or JSON scalar.
    let encoded = serde_json::to_vec(graph).unwrap_or_default();
    hasher.update(&encoded);
    for part in salt {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// SHA-256 over an arbitrary stored JSON payload, for records too malformed
/// to carry a readable version.
pub fn payload_hash(raw: &Json) -> [u8; 32] {
    let encoded = serde_json::to_vec(raw).unwrap_or_default();
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(&encoded));
    out
}

pub fn to_hex(bytes: &[u8; 32]) -> String {
    let mut out = String::with_capacity(64);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

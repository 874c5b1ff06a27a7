//! Content digests of loaded policy documents.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix distinguishing policy digests from other hashes.
pub const DIGEST_PREFIX: &str = "p:";

/// Digest of a parsed policy document.
///
/// The document is re-serialized compactly; object keys come out sorted, so
/// formatting, key order and the source format (JSON or YAML) do not affect
/// the result.
pub fn policy_digest(document: &Value) -> String {
    // Serializing a `Value` cannot fail.
    let canonical = serde_json::to_string(document).unwrap_or_default();
    format!("{}{}", DIGEST_PREFIX, sha256_hex(canonical.as_bytes()))
}

/// Hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

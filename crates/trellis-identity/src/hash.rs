//! Content hashing.

use crate::canonical::canonical_json_string;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters in a truncated hash.
pub const SHORT_HASH_LEN: usize = 16;

/// Requested digest length for [`hash_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashLength {
    /// Full SHA-256, 64 hex characters.
    Full,
    /// Truncated prefix, 16 hex characters.
    Short,
}

/// SHA-256 of the input string, 64 lowercase hex characters.
pub fn hash_full(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Truncated SHA-256: always a prefix of [`hash_full`].
pub fn hash_short(input: &str) -> String {
    let mut digest = hash_full(input);
    digest.truncate(SHORT_HASH_LEN);
    digest
}

/// Hash a JSON value through its canonical rendering.
pub fn hash_json(value: &Value, length: HashLength) -> String {
    let canonical = canonical_json_string(value);
    match length {
        HashLength::Full => hash_full(&canonical),
        HashLength::Short => hash_short(&canonical),
    }
}

//! Cryptographic utilities for deterministic identifier derivation.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives a short stable identifier from a pair of identifiers.
///
/// The result depends only on the inputs, so deriving the same pair twice
/// yields the same id. Truncated to 32 hex chars (128 bits).
pub fn derive_pair_id(left: &str, right: &str) -> String {
    let digest = sha256_hex(&format!("{}:{}", left, right));
    digest[..32].to_string()
}

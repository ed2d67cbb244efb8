// Hashing helpers for anything that must not appear in logs verbatim

use sha2::{Digest, Sha256};

/// SHA-256 hex digest (lowercase).
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Short, stable fingerprint of a session token (never log the raw token).
pub fn token_fingerprint(token: &str) -> String {
    let mut hex = sha256_hex(token.trim().as_bytes());
    hex.truncate(12);
    hex
}

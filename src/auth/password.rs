//! AUTHINFO PASS verification: `SHA-512(base64(salt) + secret)`, the whole
//! digest base64-encoded for storage and comparison.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// Hash `secret` against `salt` the same way [`verify_password`] checks it,
/// for use when provisioning a new account's stored credential.
pub fn hash_password(salt: &[u8], secret: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(STANDARD.encode(salt).as_bytes());
    hasher.update(secret.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Verify `secret` against a stored `salt` and `expected_hash` (both as
/// produced by [`hash_password`]), in constant time with respect to the
/// digest comparison.
pub fn verify_password(salt: &[u8], secret: &str, expected_hash: &str) -> bool {
    let candidate = hash_password(salt, secret);
    constant_time_eq(candidate.as_bytes(), expected_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

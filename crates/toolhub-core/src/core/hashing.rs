// crates/toolhub-core/src/core/hashing.rs
// ============================================================================
// Module: Toolhub Hashing
// Description: Digest helpers for audit-safe credential labels.
// Purpose: Identify callers in logs without recording raw bearer tokens.
// Dependencies: sha2
// ============================================================================

//! Token fingerprints are the lowercase hex SHA-256 digest of the token bytes.
//! Audit events carry fingerprints only.

use sha2::Digest;
use sha2::Sha256;

/// Returns the SHA-256 fingerprint of a bearer token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest)
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

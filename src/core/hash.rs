//! Score Attestation Hashing
//!
//! Provides the one-way digest that binds a submitted score to the session
//! credential it was earned under:
//! - Clients compute `hex(SHA-256("<score>:<token>"))` after a run
//! - The server recomputes it before trusting the score
//!
//! Any change to the score or to a single byte of the token changes the digest.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type AttestationHash = [u8; 32];

/// Separator between the score and the token in the hashed message.
pub const ATTESTATION_SEPARATOR: u8 = b':';

/// Incremental hasher for attestation messages.
///
/// Wraps SHA-256. Order of updates is part of the format.
pub struct AttestationHasher {
    hasher: Sha256,
}

impl AttestationHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self { hasher: Sha256::new() }
    }

    /// Update with the decimal rendering of a score.
    #[inline]
    pub fn update_score(&mut self, score: u64) {
        self.hasher.update(score.to_string().as_bytes());
    }

    /// Update with the separator byte.
    #[inline]
    pub fn update_separator(&mut self) {
        self.hasher.update([ATTESTATION_SEPARATOR]);
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> AttestationHash {
        self.hasher.finalize().into()
    }
}

impl Default for AttestationHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the raw attestation digest for a score and its session token.
pub fn attestation_hash(score: u64, token: &str) -> AttestationHash {
    let mut hasher = AttestationHasher::new();
    hasher.update_score(score);
    hasher.update_separator();
    hasher.update_bytes(token.as_bytes());
    hasher.finalize()
}

/// Compute the attestation signature as clients send it (lowercase hex).
pub fn attestation_signature(score: u64, token: &str) -> String {
    hex::encode(attestation_hash(score, token))
}

/// Compare two digests without short-circuiting on the first differing byte.
///
/// Lengths are not secret; a length mismatch returns early.
pub fn digests_match(expected: &[u8], supplied: &[u8]) -> bool {
    if expected.len() != supplied.len() {
        return false;
    }
    expected
        .iter()
        .zip(supplied.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

// =============================================================================
// TESTS
// =============================================================================

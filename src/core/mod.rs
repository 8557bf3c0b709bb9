//! Core primitives.
//!
//! Stateless helpers shared by the session and attestation layers.

pub mod hash;

// Re-export core types
pub use hash::{attestation_hash, attestation_signature, digests_match, AttestationHash};

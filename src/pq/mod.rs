//! Post-quantum signature algorithms and the detached signer.
//!
//! The signature layer rides on top of the classic provider flow: messages
//! are additionally signed with one of the supported post-quantum schemes,
//! and the signature plus public key travel inside the signed container.
//!
//! Supported algorithms:
//!
//! - **Dilithium5** and **Dilithium5-AES** (lattice-based)
//! - **Falcon-1024** (lattice-based, compact signatures)
//! - **SPHINCS+** 256s variants (hash-based: Haraka, SHA256, SHAKE256)

pub mod signer;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

pub use signer::{generate_keypair, PqSigner, SignatureBundle};

/// Supported post-quantum signature algorithms.
///
/// The set is closed: every dispatch over it is checked for exhaustiveness
/// at compile time, and an algorithm name arriving from the outside that is
/// not in this set stays a plain string (see [`crate::armor`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PqAlgorithm {
    /// Dilithium5 (highest NIST security level)
    Dilithium5,
    /// Dilithium5 with AES-based expansion
    Dilithium5Aes,
    /// Falcon-1024
    Falcon1024,
    /// SPHINCS+-Haraka-256s-simple
    SphincsHaraka256s,
    /// SPHINCS+-SHA256-256s-simple
    SphincsSha256s,
    /// SPHINCS+-SHAKE256-256s-simple
    SphincsShake256s,
}

impl PqAlgorithm {
    /// All supported algorithms.
    pub const ALL: [PqAlgorithm; 6] = [
        PqAlgorithm::Dilithium5,
        PqAlgorithm::Dilithium5Aes,
        PqAlgorithm::Falcon1024,
        PqAlgorithm::SphincsHaraka256s,
        PqAlgorithm::SphincsSha256s,
        PqAlgorithm::SphincsShake256s,
    ];

    /// Returns the algorithm name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            PqAlgorithm::Dilithium5 => "Dilithium5",
            PqAlgorithm::Dilithium5Aes => "Dilithium5-AES",
            PqAlgorithm::Falcon1024 => "Falcon-1024",
            PqAlgorithm::SphincsHaraka256s => "SPHINCS+-Haraka-256s-simple",
            PqAlgorithm::SphincsSha256s => "SPHINCS+-SHA256-256s-simple",
            PqAlgorithm::SphincsShake256s => "SPHINCS+-SHAKE256-256s-simple",
        }
    }

    /// Parses an algorithm name, ignoring case.
    ///
    /// Accepts both the display form and the uppercased form found in
    /// armor banners.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(name))
    }

    /// Returns the public key size in bytes for this algorithm.
    pub fn public_key_size(&self) -> usize {
        match self {
            PqAlgorithm::Dilithium5 => 2592,
            PqAlgorithm::Dilithium5Aes => 2592,
            PqAlgorithm::Falcon1024 => 1793,
            PqAlgorithm::SphincsHaraka256s => 64,
            PqAlgorithm::SphincsSha256s => 64,
            PqAlgorithm::SphincsShake256s => 64,
        }
    }
}

impl fmt::Display for PqAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hashes message content for signing.
///
/// Both sign and verify run over this digest, so the signer input has a
/// fixed length regardless of message size.
pub fn hash_message(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_roundtrip() {
        for algorithm in PqAlgorithm::ALL {
            assert_eq!(PqAlgorithm::from_name(algorithm.name()), Some(algorithm));
        }
    }

    #[test]
    fn test_from_name_ignores_case() {
        assert_eq!(
            PqAlgorithm::from_name("DILITHIUM5"),
            Some(PqAlgorithm::Dilithium5)
        );
        assert_eq!(
            PqAlgorithm::from_name("SPHINCS+-SHA256-256S-SIMPLE"),
            Some(PqAlgorithm::SphincsSha256s)
        );
        assert_eq!(
            PqAlgorithm::from_name("falcon-1024"),
            Some(PqAlgorithm::Falcon1024)
        );
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        assert_eq!(PqAlgorithm::from_name("Dilithium3"), None);
        assert_eq!(PqAlgorithm::from_name(""), None);
    }

    #[test]
    fn test_display_matches_name() {
        assert_eq!(
            format!("{}", PqAlgorithm::Dilithium5Aes),
            "Dilithium5-AES"
        );
    }

    #[test]
    fn test_hash_is_stable_and_fixed_length() {
        let a = hash_message(b"message");
        let b = hash_message(b"message");
        let c = hash_message(b"other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}

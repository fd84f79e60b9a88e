//! Detached post-quantum signing and verification.
//!
//! A [`PqSigner`] binds one algorithm to a raw keypair, typically loaded
//! from the sender's account material. Signing produces detached
//! signatures over a SHA3-256 digest of the content; verification is a
//! plain boolean so that stale or foreign key material reads as an
//! invalid signature instead of an error.

use crate::armor::{self, BlockKind};
use crate::error::{PqMailError, Result};
use crate::pq::{hash_message, PqAlgorithm};
use pqcrypto_dilithium::{dilithium5, dilithium5aes};
use pqcrypto_falcon::falcon1024;
use pqcrypto_sphincsplus::{
    sphincsharaka256ssimple, sphincssha256256ssimple, sphincsshake256256ssimple,
};
use pqcrypto_traits::sign::{DetachedSignature, PublicKey, SecretKey, VerificationError};
use std::fmt;
use zeroize::Zeroize;

/// Probe content for checking that stored key material still works.
const KEY_PROBE_MESSAGE: &[u8] = b"pq key material probe";

/// A post-quantum signer bound to one algorithm and keypair.
pub struct PqSigner {
    algorithm: PqAlgorithm,
    public_key: Vec<u8>,
    secret_key: Vec<u8>,
}

impl fmt::Debug for PqSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PqSigner")
            .field("algorithm", &self.algorithm)
            .field("public_key_size", &self.public_key.len())
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Drop for PqSigner {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

impl PqSigner {
    /// Generates a fresh keypair for the given algorithm.
    pub fn generate(algorithm: PqAlgorithm) -> Self {
        let (public_key, secret_key) = generate_keypair(algorithm);
        Self {
            algorithm,
            public_key,
            secret_key,
        }
    }

    /// Creates a signer from stored key material.
    ///
    /// The material is not validated here; a mismatch surfaces when the
    /// keys are used (see [`PqSigner::verify_keys`]).
    pub fn from_keys(algorithm: PqAlgorithm, public_key: Vec<u8>, secret_key: Vec<u8>) -> Self {
        Self {
            algorithm,
            public_key,
            secret_key,
        }
    }

    /// Creates a signer from two armored key blocks.
    pub fn from_armored(public_armor: &str, secret_armor: &str) -> Result<Self> {
        let public_block = armor::decode(public_armor)?;
        if public_block.kind() != BlockKind::PublicKey {
            return Err(PqMailError::signature("Expected a public key block"));
        }
        let secret_block = armor::decode(secret_armor)?;
        if secret_block.kind() != BlockKind::PrivateKey {
            return Err(PqMailError::signature("Expected a private key block"));
        }
        if !secret_block
            .algorithm_name()
            .eq_ignore_ascii_case(public_block.algorithm_name())
        {
            return Err(PqMailError::signature(
                "Key blocks use different algorithms",
            ));
        }
        let algorithm = public_block.algorithm().ok_or_else(|| {
            PqMailError::signature(format!(
                "Unsupported algorithm: {}",
                public_block.algorithm_name()
            ))
        })?;

        Ok(Self::from_keys(
            algorithm,
            public_block.data().to_vec(),
            secret_block.data().to_vec(),
        ))
    }

    /// Returns the signer's algorithm.
    pub fn algorithm(&self) -> PqAlgorithm {
        self.algorithm
    }

    /// Returns the raw public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Signs a message, returning the detached signature bytes.
    ///
    /// Fails if the stored secret key does not fit the algorithm, which
    /// happens when the account algorithm changed after key generation.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = hash_message(message);
        match self.algorithm {
            PqAlgorithm::Dilithium5 => {
                sign_detached(dilithium5::detached_sign, &self.secret_key, &digest, self.algorithm)
            }
            PqAlgorithm::Dilithium5Aes => sign_detached(
                dilithium5aes::detached_sign,
                &self.secret_key,
                &digest,
                self.algorithm,
            ),
            PqAlgorithm::Falcon1024 => {
                sign_detached(falcon1024::detached_sign, &self.secret_key, &digest, self.algorithm)
            }
            PqAlgorithm::SphincsHaraka256s => sign_detached(
                sphincsharaka256ssimple::detached_sign,
                &self.secret_key,
                &digest,
                self.algorithm,
            ),
            PqAlgorithm::SphincsSha256s => sign_detached(
                sphincssha256256ssimple::detached_sign,
                &self.secret_key,
                &digest,
                self.algorithm,
            ),
            PqAlgorithm::SphincsShake256s => sign_detached(
                sphincsshake256256ssimple::detached_sign,
                &self.secret_key,
                &digest,
                self.algorithm,
            ),
        }
    }

    /// Verifies a detached signature against this signer's own public key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        Self::verify_with_key(self.algorithm, message, signature, &self.public_key)
    }

    /// Verifies a detached signature against an arbitrary public key.
    ///
    /// Returns `false` for any routine mismatch: wrong message, wrong or
    /// malformed key or signature. It never fails with an error.
    pub fn verify_with_key(
        algorithm: PqAlgorithm,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> bool {
        let digest = hash_message(message);
        match algorithm {
            PqAlgorithm::Dilithium5 => verify_detached(
                dilithium5::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
            PqAlgorithm::Dilithium5Aes => verify_detached(
                dilithium5aes::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
            PqAlgorithm::Falcon1024 => verify_detached(
                falcon1024::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
            PqAlgorithm::SphincsHaraka256s => verify_detached(
                sphincsharaka256ssimple::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
            PqAlgorithm::SphincsSha256s => verify_detached(
                sphincssha256256ssimple::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
            PqAlgorithm::SphincsShake256s => verify_detached(
                sphincsshake256256ssimple::verify_detached_signature,
                public_key,
                signature,
                &digest,
            ),
        }
    }

    /// Checks that the stored keypair still signs and verifies.
    ///
    /// Used after an account algorithm change, where old key material no
    /// longer matches the configured algorithm.
    pub fn verify_keys(&self) -> bool {
        match self.sign(KEY_PROBE_MESSAGE) {
            Ok(signature) => self.verify(KEY_PROBE_MESSAGE, &signature),
            Err(_) => false,
        }
    }

    /// Signs a message and packages everything the signed container needs.
    pub fn sign_bundle(&self, message: &[u8]) -> Result<SignatureBundle> {
        let signature = self.sign(message)?;
        Ok(SignatureBundle {
            algorithm: self.algorithm,
            signature,
            public_key_armored: self.export_public_key(),
        })
    }

    /// Exports the public key as an armored block.
    pub fn export_public_key(&self) -> String {
        armor::encode(BlockKind::PublicKey, self.algorithm.name(), &self.public_key)
    }

    /// Exports the secret key as an armored block.
    pub fn export_secret_key(&self) -> String {
        armor::encode(BlockKind::PrivateKey, self.algorithm.name(), &self.secret_key)
    }
}

/// A detached signature with everything needed to embed it in a message.
#[derive(Debug, Clone)]
pub struct SignatureBundle {
    /// The algorithm that produced the signature
    pub algorithm: PqAlgorithm,
    /// Raw detached signature bytes
    pub signature: Vec<u8>,
    /// The signer's public key, armored for embedding
    pub public_key_armored: String,
}

impl SignatureBundle {
    /// Returns the signature as an armored block.
    pub fn signature_armored(&self) -> String {
        armor::encode(BlockKind::Signature, self.algorithm.name(), &self.signature)
    }
}

/// Generates a raw `(public, secret)` keypair for the given algorithm.
pub fn generate_keypair(algorithm: PqAlgorithm) -> (Vec<u8>, Vec<u8>) {
    match algorithm {
        PqAlgorithm::Dilithium5 => keypair_bytes(dilithium5::keypair),
        PqAlgorithm::Dilithium5Aes => keypair_bytes(dilithium5aes::keypair),
        PqAlgorithm::Falcon1024 => keypair_bytes(falcon1024::keypair),
        PqAlgorithm::SphincsHaraka256s => keypair_bytes(sphincsharaka256ssimple::keypair),
        PqAlgorithm::SphincsSha256s => keypair_bytes(sphincssha256256ssimple::keypair),
        PqAlgorithm::SphincsShake256s => keypair_bytes(sphincsshake256256ssimple::keypair),
    }
}

fn keypair_bytes<P, S>(keypair: fn() -> (P, S)) -> (Vec<u8>, Vec<u8>)
where
    P: PublicKey,
    S: SecretKey,
{
    let (public_key, secret_key) = keypair();
    (
        public_key.as_bytes().to_vec(),
        secret_key.as_bytes().to_vec(),
    )
}

fn sign_detached<S, D>(
    sign: fn(&[u8], &S) -> D,
    secret_key: &[u8],
    digest: &[u8],
    algorithm: PqAlgorithm,
) -> Result<Vec<u8>>
where
    S: SecretKey,
    D: DetachedSignature,
{
    let secret_key = S::from_bytes(secret_key).map_err(|_| {
        PqMailError::signature(format!("Stored secret key does not fit {}", algorithm))
    })?;
    Ok(sign(digest, &secret_key).as_bytes().to_vec())
}

fn verify_detached<P, D>(
    verify: fn(&D, &[u8], &P) -> std::result::Result<(), VerificationError>,
    public_key: &[u8],
    signature: &[u8],
    digest: &[u8],
) -> bool
where
    P: PublicKey,
    D: DetachedSignature,
{
    let public_key = match P::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match D::from_bytes(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    verify(&signature, digest, &public_key).is_ok()
}

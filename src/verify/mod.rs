// src/verify/mod.rs
//! Signed head verification.
//!
//! [`RootVerifier`] is the seam the checker depends on; [`LogVerifier`] is
//! the real thing, checking the log's signature over the raw `LogRootV1`
//! bytes with `ring` before decoding them.

pub mod log_root;

use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use x509_parser::oid_registry::{
    OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION, OID_SIG_ED25519,
};
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo};

use crate::types::{SignedHead, VerifiedRoot};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("signature does not match log root")]
    BadSignature,

    #[error("malformed log root: {0}")]
    MalformedRoot(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Digest the log signs with. Ed25519 keys ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha384 => write!(f, "sha384"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    EcdsaP256,
    EcdsaP384,
    Rsa,
    Ed25519,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EcdsaP256 => write!(f, "ecdsa-p256"),
            Self::EcdsaP384 => write!(f, "ecdsa-p384"),
            Self::Rsa => write!(f, "rsa"),
            Self::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// The log's public key together with the hash algorithm it signs with.
/// Fetched once at startup.
#[derive(Debug, Clone)]
pub struct PublicKey {
    key_type: KeyType,
    hash: HashAlgorithm,
    /// Contents of the SubjectPublicKeyInfo bit string, which is the form
    /// `ring` expects for every supported key type.
    key_bytes: Vec<u8>,
    fingerprint: String,
}

impl PublicKey {
    /// Parse a PEM `PUBLIC KEY` block (PKIX SubjectPublicKeyInfo)
    pub fn from_pem(pem_bytes: &[u8], hash: HashAlgorithm) -> Result<Self, VerifyError> {
        let block = pem::parse(pem_bytes).map_err(|e| {
            VerifyError::InvalidPublicKey(format!("failed to decode PEM: {}", e))
        })?;

        if block.tag() != "PUBLIC KEY" {
            return Err(VerifyError::InvalidPublicKey(format!(
                "expected a PUBLIC KEY block, got {}",
                block.tag()
            )));
        }

        Self::from_der(block.contents(), hash)
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo
    pub fn from_der(der: &[u8], hash: HashAlgorithm) -> Result<Self, VerifyError> {
        let (rest, spki) = SubjectPublicKeyInfo::from_der(der).map_err(|e| {
            VerifyError::InvalidPublicKey(format!("failed to parse PKIX key: {:?}", e))
        })?;
        if !rest.is_empty() {
            return Err(VerifyError::InvalidPublicKey(format!(
                "{} trailing bytes after key",
                rest.len()
            )));
        }

        let algorithm = &spki.algorithm.algorithm;
        let key_bytes = spki.subject_public_key.data.to_vec();

        let key_type = if *algorithm == OID_KEY_TYPE_EC_PUBLIC_KEY {
            // Uncompressed points only: 0x04 || X || Y
            match key_bytes.len() {
                65 => KeyType::EcdsaP256,
                97 => KeyType::EcdsaP384,
                n => {
                    return Err(VerifyError::InvalidPublicKey(format!(
                        "unsupported EC point of {} bytes",
                        n
                    )));
                }
            }
        } else if *algorithm == OID_PKCS1_RSAENCRYPTION {
            KeyType::Rsa
        } else if *algorithm == OID_SIG_ED25519 {
            KeyType::Ed25519
        } else {
            return Err(VerifyError::InvalidPublicKey(format!(
                "unsupported key algorithm {}",
                algorithm
            )));
        };

        let fingerprint = hex::encode(Sha256::digest(der));

        Ok(Self {
            key_type,
            hash,
            key_bytes,
            fingerprint,
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// SHA-256 of the DER key, hex-encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn algorithm(&self) -> &'static dyn VerificationAlgorithm {
        match (self.key_type, self.hash) {
            (KeyType::EcdsaP256, HashAlgorithm::Sha256) => &signature::ECDSA_P256_SHA256_ASN1,
            (KeyType::EcdsaP256, HashAlgorithm::Sha384) => &signature::ECDSA_P256_SHA384_ASN1,
            (KeyType::EcdsaP384, HashAlgorithm::Sha256) => &signature::ECDSA_P384_SHA256_ASN1,
            (KeyType::EcdsaP384, HashAlgorithm::Sha384) => &signature::ECDSA_P384_SHA384_ASN1,
            (KeyType::Rsa, HashAlgorithm::Sha256) => &signature::RSA_PKCS1_2048_8192_SHA256,
            (KeyType::Rsa, HashAlgorithm::Sha384) => &signature::RSA_PKCS1_2048_8192_SHA384,
            (KeyType::Ed25519, _) => &signature::ED25519,
        }
    }

    /// Check `sig` over `message`
    pub fn verify_signature(&self, message: &[u8], sig: &[u8]) -> Result<(), VerifyError> {
        UnparsedPublicKey::new(self.algorithm(), &self.key_bytes)
            .verify(message, sig)
            .map_err(|_| VerifyError::BadSignature)
    }
}

/// Turns an untrusted [`SignedHead`] into a [`VerifiedRoot`], or refuses to.
pub trait RootVerifier: Send + Sync {
    fn verify(&self, head: &SignedHead) -> Result<VerifiedRoot, VerifyError>;
}

/// Verifies heads against the log's public key.
pub struct LogVerifier {
    key: PublicKey,
}

impl LogVerifier {
    pub fn new(key: PublicKey) -> Self {
        Self { key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }
}

impl RootVerifier for LogVerifier {
    fn verify(&self, head: &SignedHead) -> Result<VerifiedRoot, VerifyError> {
        // Signature first: the root bytes are not parsed until they are trusted.
        self.key
            .verify_signature(&head.log_root, &head.log_root_signature)?;
        log_root::decode(&head.log_root)
    }
}

// src/test_support.rs
// Fixtures shared by the unit tests: real keys, signed heads, fake collaborators.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair, KeyPair,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::rekor::{LogClient, LogInfo, SignedTreeHeadWire};
use crate::storage::{Bucket, ObjectBucket, StorageError};
use crate::types::{SignedHead, VerifiedRoot};
use crate::verify::{RootVerifier, VerifyError, log_root};

const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

pub enum TestSigner {
    P256(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

impl TestSigner {
    pub fn p256() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
        Self::P256(pair)
    }

    pub fn ed25519() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        Self::Ed25519(Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap())
    }

    pub fn public_pem(&self) -> String {
        let der = match self {
            Self::P256(pair) => [&P256_SPKI_PREFIX[..], pair.public_key().as_ref()].concat(),
            Self::Ed25519(pair) => [&ED25519_SPKI_PREFIX[..], pair.public_key().as_ref()].concat(),
        };
        pem::encode(&pem::Pem::new("PUBLIC KEY", der))
    }

    pub fn sign_bytes(&self, log_root: Vec<u8>) -> SignedHead {
        let log_root_signature = match self {
            Self::P256(pair) => pair
                .sign(&SystemRandom::new(), &log_root)
                .unwrap()
                .as_ref()
                .to_vec(),
            Self::Ed25519(pair) => pair.sign(&log_root).as_ref().to_vec(),
        };
        SignedHead {
            key_hint: vec![0x01, 0x02],
            log_root,
            log_root_signature,
        }
    }

    pub fn sign_root(&self, root: &VerifiedRoot) -> SignedHead {
        self.sign_bytes(log_root::encode(root).unwrap())
    }
}

pub fn sample_root(tree_size: u64, timestamp_nanos: u64) -> VerifiedRoot {
    VerifiedRoot {
        tree_size,
        root_hash: vec![(tree_size % 251) as u8; 32],
        timestamp_nanos,
        revision: tree_size,
        metadata: vec![],
    }
}

pub fn wire(head: &SignedHead) -> LogInfo {
    LogInfo {
        root_hash: None,
        tree_size: None,
        signed_tree_head: SignedTreeHeadWire {
            key_hint: STANDARD.encode(&head.key_hint),
            log_root: STANDARD.encode(&head.log_root),
            signature: STANDARD.encode(&head.log_root_signature),
        },
    }
}

/// Log client that replays a script of responses.
pub struct ScriptedClient {
    public_key: String,
    responses: Mutex<VecDeque<anyhow::Result<LogInfo>>>,
}

impl ScriptedClient {
    pub fn new(public_key: String) -> Self {
        Self {
            public_key,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, response: anyhow::Result<LogInfo>) {
        self.responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl LogClient for ScriptedClient {
    async fn get_public_key(&self) -> anyhow::Result<String> {
        Ok(self.public_key.clone())
    }

    async fn get_log_info(&self) -> anyhow::Result<LogInfo> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response left")))
    }
}

/// Accepts any signature; decodes the root. Lets the core be exercised
/// without key material.
pub struct TrustingVerifier;

impl RootVerifier for TrustingVerifier {
    fn verify(&self, head: &SignedHead) -> Result<VerifiedRoot, VerifyError> {
        if head.log_root_signature.is_empty() {
            return Err(VerifyError::BadSignature);
        }
        log_root::decode(&head.log_root)
    }
}

/// Head signed by nobody in particular, for use with [`TrustingVerifier`].
pub fn unsigned_head(root: &VerifiedRoot) -> SignedHead {
    SignedHead {
        key_hint: vec![],
        log_root: log_root::encode(root).unwrap(),
        log_root_signature: b"trusted".to_vec(),
    }
}

/// Log client that never answers
pub struct HangingClient;

#[async_trait]
impl LogClient for HangingClient {
    async fn get_public_key(&self) -> anyhow::Result<String> {
        std::future::pending().await
    }

    async fn get_log_info(&self) -> anyhow::Result<LogInfo> {
        std::future::pending().await
    }
}

/// Log client that panics when asked for the log head
pub struct PanickingClient;

#[async_trait]
impl LogClient for PanickingClient {
    async fn get_public_key(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn get_log_info(&self) -> anyhow::Result<LogInfo> {
        panic!("log client blew up")
    }
}

/// In-memory bucket with switchable faults
pub struct FaultyBucket {
    inner: ObjectBucket,
    unreadable: Mutex<HashSet<String>>,
    hang_writes: AtomicBool,
}

impl FaultyBucket {
    pub fn new() -> Self {
        Self {
            inner: ObjectBucket::memory().unwrap(),
            unreadable: Mutex::new(HashSet::new()),
            hang_writes: AtomicBool::new(false),
        }
    }

    /// Reads of `name` fail with `PermissionDenied`
    pub fn deny_read(&self, name: &str) {
        self.unreadable.lock().unwrap().insert(name.to_string());
    }

    /// Writes from now on never complete
    pub fn hang_writes(&self) {
        self.hang_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Bucket for FaultyBucket {
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.hang_writes.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.inner.write(name, data).await
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.unreadable.lock().unwrap().contains(name) {
            return Err(StorageError::PermissionDenied(name.to_string()));
        }
        self.inner.read(name).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix).await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.inner.close().await
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

// Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use sth_watch::storage::{Bucket, StorageError};
use sth_watch::types::{SignedHead, VerifiedRoot};
use sth_watch::verify::log_root;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

/// A log signing key
pub struct LogKey {
    pair: EcdsaKeyPair,
}

impl LogKey {
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
        Self { pair }
    }

    pub fn public_pem(&self) -> String {
        let der = [&P256_SPKI_PREFIX[..], self.pair.public_key().as_ref()].concat();
        pem::encode(&pem::Pem::new("PUBLIC KEY", der))
    }

    pub fn sign(&self, root: &VerifiedRoot) -> SignedHead {
        let log_root = log_root::encode(root).unwrap();
        let sig = self.pair.sign(&SystemRandom::new(), &log_root).unwrap();
        SignedHead {
            key_hint: 7u64.to_be_bytes().to_vec(),
            log_root,
            log_root_signature: sig.as_ref().to_vec(),
        }
    }
}

pub fn root(tree_size: u64, timestamp_nanos: u64) -> VerifiedRoot {
    VerifiedRoot {
        tree_size,
        root_hash: vec![0x5a; 32],
        timestamp_nanos,
        revision: tree_size,
        metadata: vec![],
    }
}

pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn log_info_json(head: &SignedHead, tree_size: u64) -> serde_json::Value {
    serde_json::json!({
        "rootHash": "",
        "treeSize": tree_size,
        "signedTreeHead": {
            "keyHint": b64(&head.key_hint),
            "logRoot": b64(&head.log_root),
            "signature": b64(&head.log_root_signature),
        }
    })
}

/// Start a fake Rekor that serves `key`'s public key
pub async fn start_rekor(key: &LogKey) -> MockServer {
    let server = MockServer::start().await;
    mount_public_key(&server, key).await;
    server
}

pub async fn mount_public_key(server: &MockServer, key: &LogKey) {
    Mock::given(method("GET"))
        .and(path("/api/v1/log/publicKey"))
        .respond_with(ResponseTemplate::new(200).set_body_string(key.public_pem()))
        .mount(server)
        .await;
}

/// Make `/api/v1/log` answer with `head` from now on
pub async fn serve_head(server: &MockServer, key: &LogKey, head: &SignedHead, tree_size: u64) {
    server.reset().await;
    mount_public_key(server, key).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/log"))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_info_json(head, tree_size)))
        .mount(server)
        .await;
}

/// Bucket wrapper that can be told to fail upcoming writes
pub struct FlakyBucket {
    inner: Arc<dyn Bucket>,
    fail_next: AtomicU32,
    writes: AtomicU64,
}

impl FlakyBucket {
    pub fn new(inner: Arc<dyn Bucket>) -> Self {
        Self {
            inner,
            fail_next: AtomicU32::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn successful_writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bucket for FlakyBucket {
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Unavailable("injected outage".to_string()));
        }
        self.inner.write(name, data).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
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

// src/types.rs
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed Tree Head as received from the log, after base64 decoding.
///
/// Untrusted until it has been through a [`crate::verify::RootVerifier`].
/// Field names follow Trillian's `SignedLogRoot` so archived records stay
/// readable by existing tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedHead {
    #[serde(default, with = "b64", skip_serializing_if = "Vec::is_empty")]
    pub key_hint: Vec<u8>,
    #[serde(default, with = "b64", skip_serializing_if = "Vec::is_empty")]
    pub log_root: Vec<u8>,
    #[serde(default, with = "b64", skip_serializing_if = "Vec::is_empty")]
    pub log_root_signature: Vec<u8>,
}

/// Decoded `LogRootV1` of a head whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifiedRoot {
    pub tree_size: u64,
    #[serde(with = "b64")]
    pub root_hash: Vec<u8>,
    pub timestamp_nanos: u64,
    pub revision: u64,
    #[serde(with = "b64")]
    pub metadata: Vec<u8>,
}

impl VerifiedRoot {
    /// Signing time as a UTC timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        let nanos = i64::try_from(self.timestamp_nanos).unwrap_or(i64::MAX);
        DateTime::from_timestamp_nanos(nanos)
    }

    /// Hex-encoded root hash, for logging
    pub fn root_hash_hex(&self) -> String {
        hex::encode(&self.root_hash)
    }
}

/// The durable unit written to the bucket: the head exactly as signed, next
/// to what it was verified to say.
///
/// Only [`crate::checker::Checker`] builds these, so every record that
/// reaches the archiver has passed signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedRecord {
    #[serde(rename = "SignedLogRoot")]
    signed: SignedHead,
    #[serde(rename = "VerifiedLogRoot")]
    verified: VerifiedRoot,
}

impl ArchivedRecord {
    pub(crate) fn new(signed: SignedHead, verified: VerifiedRoot) -> Self {
        Self { signed, verified }
    }

    pub fn signed(&self) -> &SignedHead {
        &self.signed
    }

    pub fn verified(&self) -> &VerifiedRoot {
        &self.verified
    }

    pub fn tree_size(&self) -> u64 {
        self.verified.tree_size
    }
}

/// Shape of an archived object when read back. Only the signed half is
/// trusted (after re-verification); the decoded half is kept for
/// cross-checking.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredRecord {
    #[serde(rename = "SignedLogRoot")]
    pub signed: SignedHead,
    #[serde(rename = "VerifiedLogRoot")]
    pub verified: StoredRoot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StoredRoot {
    pub tree_size: u64,
}

/// Base64 (standard alphabet, padded) for byte fields, matching how Go's
/// `encoding/json` renders `[]byte`.
mod b64 {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

// src/rekor/types.rs
use serde::{Deserialize, Serialize};

/// Response from Rekor's `GET /api/v1/log` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInfo {
    /// Hex root hash as reported by the server. Informational only; the
    /// trusted value comes out of the signed head.
    #[serde(default)]
    pub root_hash: Option<String>,
    #[serde(default)]
    pub tree_size: Option<u64>,
    pub signed_tree_head: SignedTreeHeadWire,
}

/// Signed tree head as it travels over the wire: every field base64-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTreeHeadWire {
    #[serde(default)]
    pub key_hint: String,
    pub log_root: String,
    pub signature: String,
}

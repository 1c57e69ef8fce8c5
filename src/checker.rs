// src/checker.rs
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::rekor::{LogClient, SignedTreeHeadWire};
use crate::types::{ArchivedRecord, SignedHead};
use crate::verify::RootVerifier;

/// Fetches the log's current signed head and verifies it.
///
/// Holds no state between calls; the only side effect of [`Checker::check`]
/// is the network read.
pub struct Checker {
    client: Arc<dyn LogClient>,
    verifier: Arc<dyn RootVerifier>,
}

impl Checker {
    pub fn new(client: Arc<dyn LogClient>, verifier: Arc<dyn RootVerifier>) -> Self {
        Self { client, verifier }
    }

    /// Pull, decode and verify the current head
    pub async fn check(&self) -> Result<ArchivedRecord> {
        let info = self
            .client
            .get_log_info()
            .await
            .map_err(MonitorError::Transport)?;

        let head = decode_head(&info.signed_tree_head)?;

        if let Some(reported) = info.tree_size {
            debug!(reported_tree_size = reported, "Decoded signed tree head");
        }

        self.verify_head(head)
    }

    /// Verify an already-decoded head, e.g. one read back from the archive
    pub fn verify_head(&self, head: SignedHead) -> Result<ArchivedRecord> {
        let verified = self.verifier.verify(&head)?;
        Ok(ArchivedRecord::new(head, verified))
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value.trim())
        .map_err(|source| MonitorError::InvalidEncoding { field, source })
}

/// Base64-decode the three signed head fields
pub fn decode_head(wire: &SignedTreeHeadWire) -> Result<SignedHead> {
    Ok(SignedHead {
        key_hint: decode_field("keyHint", &wire.key_hint)?,
        log_root: decode_field("logRoot", &wire.log_root)?,
        log_root_signature: decode_field("signature", &wire.signature)?,
    })
}

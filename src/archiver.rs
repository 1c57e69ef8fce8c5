// src/archiver.rs
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::Bucket;
use crate::types::{ArchivedRecord, SignedHead, StoredRecord};

const OBJECT_PREFIX: &str = "sth-";
const OBJECT_SUFFIX: &str = ".json";

/// Name of the object holding the record for `tree_size`
pub fn object_name(tree_size: u64) -> String {
    format!("{}{}{}", OBJECT_PREFIX, tree_size, OBJECT_SUFFIX)
}

/// Inverse of [`object_name`]. `None` for anything that is not an archive object.
pub fn parse_object_name(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(OBJECT_PREFIX)?.strip_suffix(OBJECT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// What a successful archive wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    pub object_name: String,
    pub size: usize,
    /// SHA-256 of the written bytes, hex
    pub sha256: String,
}

/// Newest record found in the bucket
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub object_name: String,
    /// Tree size claimed by the stored decoded root
    pub stored_tree_size: u64,
    pub signed: SignedHead,
}

/// Writes verified records to the bucket, one object per tree size.
///
/// Rewriting the same tree size is harmless: the content is a pure function
/// of the signed head, so the last writer wins with identical bytes.
pub struct Archiver {
    bucket: Arc<dyn Bucket>,
}

impl Archiver {
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Self { bucket }
    }

    pub fn bucket(&self) -> &Arc<dyn Bucket> {
        &self.bucket
    }

    /// Serialize and store `record` under `sth-<tree_size>.json`
    pub async fn archive(&self, record: &ArchivedRecord) -> Result<ArchiveReceipt> {
        let bytes = serde_json::to_vec(record)?;
        let name = object_name(record.tree_size());

        self.bucket.write(&name, &bytes).await?;

        let receipt = ArchiveReceipt {
            object_name: name,
            size: bytes.len(),
            sha256: hex::encode(Sha256::digest(&bytes)),
        };

        debug!(
            object = %receipt.object_name,
            size = receipt.size,
            sha256 = %receipt.sha256,
            "Archived record"
        );

        Ok(receipt)
    }

    /// Locate the record with the greatest tree size, if any.
    ///
    /// Objects that cannot be read or parsed are skipped with a warning and
    /// the next-newest one is tried.
    pub async fn latest(&self) -> Result<Option<Checkpoint>> {
        let mut candidates: Vec<(u64, String)> = self
            .bucket
            .list(OBJECT_PREFIX)
            .await?
            .into_iter()
            .filter_map(|name| parse_object_name(&name).map(|size| (size, name)))
            .collect();
        candidates.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        for (tree_size, name) in candidates {
            let bytes = match self.bucket.read(&name).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping archive object {}: {}", name, e);
                    continue;
                }
            };

            let stored: StoredRecord = match serde_json::from_slice(&bytes) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Skipping unreadable archive object {}: {}", name, e);
                    continue;
                }
            };

            if stored.verified.tree_size != tree_size {
                warn!(
                    "Skipping archive object {}: content claims tree size {}",
                    name, stored.verified.tree_size
                );
                continue;
            }

            return Ok(Some(Checkpoint {
                object_name: name,
                stored_tree_size: tree_size,
                signed: stored.signed,
            }));
        }

        Ok(None)
    }
}

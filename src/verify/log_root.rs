// src/verify/log_root.rs
//! Codec for Trillian's `LogRootV1`, the blob a signed head signs over.
//!
//! ```text
//! struct {
//!     uint16 version;            // 1
//!     uint64 tree_size;
//!     opaque root_hash<0..128>;
//!     uint64 timestamp_nanos;
//!     uint64 revision;
//!     opaque metadata<0..65535>;
//! } LogRootV1;
//! ```
//!
//! All integers are big-endian; variable-length fields carry a length prefix
//! sized to their upper bound.

use super::VerifyError;
use crate::types::VerifiedRoot;

pub const LOG_ROOT_FORMAT_V1: u16 = 1;
pub const MAX_ROOT_HASH_LEN: usize = 128;

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], VerifyError> {
        if self.buf.len() < n {
            return Err(VerifyError::MalformedRoot(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                n,
                self.buf.len()
            )));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u8(&mut self, what: &str) -> Result<u8, VerifyError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16, VerifyError> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u64(&mut self, what: &str) -> Result<u64, VerifyError> {
        let b = self.take(8, what)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }
}

/// Decode a `LogRootV1` blob.
pub fn decode(bytes: &[u8]) -> Result<VerifiedRoot, VerifyError> {
    let mut r = Reader { buf: bytes };

    let version = r.u16("version")?;
    if version != LOG_ROOT_FORMAT_V1 {
        return Err(VerifyError::MalformedRoot(format!(
            "unsupported log root version {}",
            version
        )));
    }

    let tree_size = r.u64("tree_size")?;

    let hash_len = r.u8("root_hash length")? as usize;
    if hash_len > MAX_ROOT_HASH_LEN {
        return Err(VerifyError::MalformedRoot(format!(
            "root hash length {} exceeds {}",
            hash_len, MAX_ROOT_HASH_LEN
        )));
    }
    let root_hash = r.take(hash_len, "root_hash")?.to_vec();

    let timestamp_nanos = r.u64("timestamp_nanos")?;
    let revision = r.u64("revision")?;

    let meta_len = r.u16("metadata length")? as usize;
    let metadata = r.take(meta_len, "metadata")?.to_vec();

    if !r.buf.is_empty() {
        return Err(VerifyError::MalformedRoot(format!(
            "{} trailing bytes after log root",
            r.buf.len()
        )));
    }

    Ok(VerifiedRoot {
        tree_size,
        root_hash,
        timestamp_nanos,
        revision,
        metadata,
    })
}

/// Encode a root in `LogRootV1` form.
///
/// The monitor itself only decodes; this exists for test fixtures and for
/// tooling that needs to produce heads.
pub fn encode(root: &VerifiedRoot) -> Result<Vec<u8>, VerifyError> {
    if root.root_hash.len() > MAX_ROOT_HASH_LEN {
        return Err(VerifyError::MalformedRoot(format!(
            "root hash length {} exceeds {}",
            root.root_hash.len(),
            MAX_ROOT_HASH_LEN
        )));
    }
    let meta_len = u16::try_from(root.metadata.len()).map_err(|_| {
        VerifyError::MalformedRoot(format!("metadata length {} too long", root.metadata.len()))
    })?;

    let mut out = Vec::with_capacity(2 + 8 + 1 + root.root_hash.len() + 8 + 8 + 2 + root.metadata.len());
    out.extend_from_slice(&LOG_ROOT_FORMAT_V1.to_be_bytes());
    out.extend_from_slice(&root.tree_size.to_be_bytes());
    out.push(root.root_hash.len() as u8);
    out.extend_from_slice(&root.root_hash);
    out.extend_from_slice(&root.timestamp_nanos.to_be_bytes());
    out.extend_from_slice(&root.revision.to_be_bytes());
    out.extend_from_slice(&meta_len.to_be_bytes());
    out.extend_from_slice(&root.metadata);
    Ok(out)
}

// src/storage/object.rs
//! Bucket over an opendal operator: local directory, cloud object store or
//! memory, depending on how the operator was built.

use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

use super::{Bucket, StorageError};

/// Directory inside a file bucket where writes are staged before the rename
pub(crate) const STAGING_DIR: &str = ".staging";

pub struct ObjectBucket {
    op: Operator,
    location: String,
    writes: AtomicU64,
    closed: AtomicBool,
}

impl ObjectBucket {
    pub fn new(op: Operator, location: String) -> Self {
        Self {
            op,
            location,
            writes: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Process-local bucket; nothing survives the process
    pub fn memory() -> Result<Self, StorageError> {
        Ok(Self::new(super::memory_operator()?, "mem://".to_string()))
    }

    /// Total successful writes, including overwrites
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_name(name: &str) -> Result<(), StorageError> {
        // Flat namespace: refuse anything that could escape the bucket root
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(StorageError::Unavailable(format!(
                "invalid object name {:?}",
                name
            )));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Bucket for ObjectBucket {
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_open()?;
        Self::check_name(name)?;

        self.op
            .write(name, data.to_vec())
            .await
            .map_err(|e| StorageError::backend(name, e))?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        debug!(bucket = %self.location, name, size = data.len(), "wrote object");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_open()?;
        Self::check_name(name)?;

        match self.op.read(name).await {
            Ok(buf) => Ok(Some(buf.to_vec())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::backend(name, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.ensure_open()?;

        let entries = self
            .op
            .list("/")
            .await
            .map_err(|e| StorageError::backend(prefix, e))?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .map(|entry| entry.name().to_string())
            .filter(|name| name.starts_with(prefix) && !name.starts_with('.'))
            .collect())
    }

    async fn close(&self) -> Result<(), StorageError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed bucket {}", self.location);
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

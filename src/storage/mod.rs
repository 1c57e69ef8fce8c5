// src/storage/mod.rs
//! Object storage for archived tree heads.
//!
//! A bucket is a flat namespace of named objects. Writes replace whole
//! objects and are never partially visible. Buckets are opened from a URI:
//!
//! - `file:///var/lib/sth`: one file per object in an existing directory
//!   (add `?create_dir=true` to create it)
//! - `gs://bucket/prefix`: Google Cloud Storage, credentials from the
//!   environment (`?credential_path=` and `?endpoint=` override)
//! - `s3://bucket/prefix`: S3 or an S3-compatible store (`?region=`,
//!   `?endpoint=`)
//! - `mem://`: process-local, for tests and dry runs

use async_trait::async_trait;
use opendal::{Operator, services};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use url::Url;

pub mod object;

pub use object::ObjectBucket;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("bucket is closed")]
    Closed,

    #[error("write of {0} did not finish before the cycle deadline")]
    Timeout(String),

    #[error("invalid bucket URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("unsupported bucket scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend error on {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: opendal::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.display().to_string())
        } else {
            Self::Io {
                path: path.display().to_string(),
                source,
            }
        }
    }

    pub(crate) fn backend(name: &str, source: opendal::Error) -> Self {
        match source.kind() {
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied(name.to_string()),
            opendal::ErrorKind::RateLimited => {
                Self::Unavailable(format!("{}: {}", name, source))
            }
            _ => Self::Backend {
                name: name.to_string(),
                source,
            },
        }
    }
}

/// Durable, flat object store
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Create or replace `name` with `data`. Readers see either the old
    /// object or the new one, never a mix.
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Fetch `name`, or `None` if it does not exist
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Names of all objects starting with `prefix`, in no particular order
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Release the bucket. Later writes fail with [`StorageError::Closed`].
    async fn close(&self) -> Result<(), StorageError>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Open the bucket named by `uri`
pub async fn open_bucket(uri: &str) -> Result<Arc<dyn Bucket>, StorageError> {
    let parsed = Url::parse(uri).map_err(|e| invalid_uri(uri, e.to_string()))?;

    let op = match parsed.scheme() {
        "file" => file_operator(uri, &parsed).await?,
        "gs" => gcs_operator(uri, &parsed)?,
        "s3" => s3_operator(uri, &parsed)?,
        "mem" => memory_operator()?,
        other => return Err(StorageError::UnsupportedScheme(other.to_string())),
    };

    let bucket = Arc::new(ObjectBucket::new(op, display_location(&parsed)));
    info!("Opened bucket {}", bucket.location());

    Ok(bucket)
}

fn invalid_uri(uri: &str, reason: impl Into<String>) -> StorageError {
    StorageError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.into(),
    }
}

fn query_param(parsed: &Url, key: &str) -> Option<String> {
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Location without query parameters, which may carry credential paths
fn display_location(parsed: &Url) -> String {
    let mut location = parsed.clone();
    location.set_query(None);
    location.to_string()
}

fn build_error(uri: &str, e: opendal::Error) -> StorageError {
    invalid_uri(uri, e.to_string())
}

async fn file_operator(uri: &str, parsed: &Url) -> Result<Operator, StorageError> {
    let dir: PathBuf = parsed
        .to_file_path()
        .map_err(|_| invalid_uri(uri, "not an absolute local path"))?;
    let create_dir = query_param(parsed, "create_dir").is_some_and(|v| v == "true" || v == "1");

    if create_dir {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;
    }
    let meta = tokio::fs::metadata(&dir)
        .await
        .map_err(|e| StorageError::io(&dir, e))?;
    if !meta.is_dir() {
        return Err(StorageError::Unavailable(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let root = dir.to_string_lossy();
    let staging = dir.join(object::STAGING_DIR);
    let builder = services::Fs::default()
        .root(&root)
        .atomic_write_dir(&staging.to_string_lossy());

    Ok(Operator::new(builder)
        .map_err(|e| build_error(uri, e))?
        .finish())
}

/// Bucket name from the host, object prefix from the path
fn bucket_and_root<'a>(uri: &str, parsed: &'a Url) -> Result<(&'a str, String), StorageError> {
    let bucket = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid_uri(uri, "missing bucket name"))?;
    let path = parsed.path().trim_matches('/');
    let root = if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", path)
    };
    Ok((bucket, root))
}

fn gcs_operator(uri: &str, parsed: &Url) -> Result<Operator, StorageError> {
    let (bucket, root) = bucket_and_root(uri, parsed)?;
    let mut builder = services::Gcs::default().bucket(bucket).root(&root);
    if let Some(endpoint) = query_param(parsed, "endpoint") {
        builder = builder.endpoint(&endpoint);
    }
    if let Some(path) = query_param(parsed, "credential_path") {
        builder = builder.credential_path(&path);
    }

    Ok(Operator::new(builder)
        .map_err(|e| build_error(uri, e))?
        .finish())
}

fn s3_operator(uri: &str, parsed: &Url) -> Result<Operator, StorageError> {
    let (bucket, root) = bucket_and_root(uri, parsed)?;
    let mut builder = services::S3::default().bucket(bucket).root(&root);
    if let Some(region) = query_param(parsed, "region") {
        builder = builder.region(&region);
    }
    if let Some(endpoint) = query_param(parsed, "endpoint") {
        builder = builder.endpoint(&endpoint);
    }

    Ok(Operator::new(builder)
        .map_err(|e| build_error(uri, e))?
        .finish())
}

pub(crate) fn memory_operator() -> Result<Operator, StorageError> {
    Ok(Operator::new(services::Memory::default())
        .map_err(|e| build_error("mem://", e))?
        .finish())
}

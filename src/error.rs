// src/error.rs
//! Error taxonomy for the fetch → verify → archive cycle.
//!
//! Startup code works in `anyhow` and aborts on the first failure. Everything
//! that can go wrong inside a single monitoring cycle is a [`MonitorError`],
//! which the loop logs and then moves on from.

use crate::storage::StorageError;
use crate::verify::VerifyError;

/// Errors produced by a single monitoring cycle (or at startup, for
/// [`MonitorError::Configuration`]).
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Fatal startup problem: missing bucket URI, unusable public key,
    /// log server unreachable during initialisation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The log server could not be reached, answered with an error, or did
    /// not answer before the cycle deadline.
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),

    /// One of the signed head fields was not valid base64.
    #[error("invalid encoding in {field}: {source}")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// Signature or root-state decoding mismatch.
    #[error("verification failed: {0}")]
    VerificationFailed(#[from] VerifyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MonitorError {
    /// Short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport(_) => "transport",
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::VerificationFailed(_) => "verification_failed",
            Self::Serialization(_) => "serialization",
            Self::Storage(_) => "storage",
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

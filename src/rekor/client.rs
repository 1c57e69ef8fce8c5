// src/rekor/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::types::LogInfo;

/// Read-only view of a transparency log
#[async_trait]
pub trait LogClient: Send + Sync {
    /// PEM-encoded public key the log signs with
    async fn get_public_key(&self) -> Result<String>;

    /// Current signed tree head
    async fn get_log_info(&self) -> Result<LogInfo>;
}

/// HTTP client for the Rekor REST API
pub struct RekorClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RekorClient {
    /// Create a new Rekor client
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, accept: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "{} request failed with status {}: {}",
                path,
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        Ok(response)
    }
}

#[async_trait]
impl LogClient for RekorClient {
    /// Endpoint: GET {base_url}/api/v1/log/publicKey
    async fn get_public_key(&self) -> Result<String> {
        let response = self
            .get("/api/v1/log/publicKey", "application/x-pem-file")
            .await?;

        let pem = response
            .text()
            .await
            .context("Failed to read public key body")?;

        debug!("Public key received ({} bytes)", pem.len());

        Ok(pem)
    }

    /// Endpoint: GET {base_url}/api/v1/log
    async fn get_log_info(&self) -> Result<LogInfo> {
        let response = self.get("/api/v1/log", "application/json").await?;

        let info: LogInfo = response
            .json()
            .await
            .context("Failed to parse log info JSON")?;

        debug!(
            "Log info received: tree_size={:?}, root_hash={:?}",
            info.tree_size, info.root_hash
        );

        Ok(info)
    }
}

// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::MonitorError;
use crate::verify::HashAlgorithm;

/// Environment variable naming the destination bucket
pub const BUCKET_ENV: &str = "REKOR_STH_BUCKET";

#[derive(Debug, Deserialize, Clone)]
pub struct RekorServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Full base URL; takes precedence over address/port (e.g. for https)
    #[serde(default)]
    pub url: Option<String>,
}

fn default_address() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }

impl Default for RekorServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            url: None,
        }
    }
}

impl RekorServerConfig {
    pub fn base_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", self.address, self.port),
        }
    }
}

/// Log output flavour: human-readable lines or JSON objects
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    #[default]
    Dev,
    Prod,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub rekor_server: RekorServerConfig,
    /// Polling period
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Per-request HTTP timeout towards the log server
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub log_type: LogType,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Restore the last archived head from the bucket at startup
    #[serde(default = "default_seed_from_archive")]
    pub seed_from_archive: bool,
}

fn default_interval() -> Duration { Duration::from_secs(60) }
fn default_request_timeout() -> Duration { Duration::from_secs(30) }
fn default_log_level() -> String { "info".to_string() }
fn default_seed_from_archive() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            rekor_server: RekorServerConfig::default(),
            interval: default_interval(),
            request_timeout: default_request_timeout(),
            log_type: LogType::default(),
            log_level: default_log_level(),
            hash_algorithm: HashAlgorithm::default(),
            seed_from_archive: default_seed_from_archive(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        Ok(cfg)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.interval.is_zero() {
            return Err(MonitorError::Configuration(
                "interval must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(MonitorError::Configuration(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        let base = self.rekor_server.base_url();
        let parsed = url::Url::parse(&base).map_err(|e| {
            MonitorError::Configuration(format!("invalid rekor server URL {:?}: {}", base, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MonitorError::Configuration(format!(
                "rekor server URL must be http or https, got {:?}",
                base
            )));
        }

        Ok(())
    }

    /// Bucket URI from the value of [`BUCKET_ENV`]; unset or blank is fatal
    pub fn resolve_bucket(value: Option<String>) -> Result<String, MonitorError> {
        match value {
            Some(uri) if !uri.trim().is_empty() => Ok(uri.trim().to_string()),
            _ => Err(MonitorError::Configuration(format!(
                "{} env var must be set",
                BUCKET_ENV
            ))),
        }
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

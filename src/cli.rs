// src/cli.rs
use clap::Parser;
use std::time::Duration;

use crate::config::{Config, LogType};

/// sth-watch: transparency log head archiver
///
/// Polls a Rekor log for its Signed Tree Head, verifies the signature and
/// writes every verified head to the bucket named by REKOR_STH_BUCKET.
#[derive(Parser, Debug, Clone)]
#[command(name = "sth-watch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to TOML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    // ===== Log server =====
    /// Rekor server address
    #[arg(long = "rekor-server-address")]
    pub rekor_server_address: Option<String>,

    /// Rekor server port
    #[arg(long = "rekor-server-port")]
    pub rekor_server_port: Option<u16>,

    /// Full Rekor base URL (overrides address and port)
    #[arg(long = "rekor-server-url")]
    pub rekor_server_url: Option<String>,

    // ===== Polling =====
    /// Polling interval, e.g. "1m" or "30s"
    #[arg(long = "interval", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Do not restore the last archived head at startup
    #[arg(long = "no-seed")]
    pub no_seed: bool,

    // ===== Logging =====
    /// Log output format
    #[arg(long = "log-type", value_enum)]
    pub log_type: Option<LogType>,

    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.interval.is_some_and(|d| d.is_zero()) {
            anyhow::bail!("--interval must be greater than 0");
        }

        Ok(())
    }

    /// Layer command-line overrides on top of the file config
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref address) = self.rekor_server_address {
            config.rekor_server.address = address.clone();
        }
        if let Some(port) = self.rekor_server_port {
            config.rekor_server.port = port;
        }
        if let Some(ref url) = self.rekor_server_url {
            config.rekor_server.url = Some(url.clone());
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(log_type) = self.log_type {
            config.log_type = log_type;
        }
        if self.no_seed {
            config.seed_from_archive = false;
        }
    }

    /// Determine log level based on verbose/quiet flags, falling back to config
    pub fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            &config.log_level
        }
    }
}

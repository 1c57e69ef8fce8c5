// src/main.rs
use anyhow::Context;
use clap::Parser;
use sth_watch::archiver::Archiver;
use sth_watch::checker::Checker;
use sth_watch::cli::Cli;
use sth_watch::config::{BUCKET_ENV, Config, LogType};
use sth_watch::monitor::Monitor;
use sth_watch::rekor::{LogClient, RekorClient};
use sth_watch::storage::open_bucket;
use sth_watch::verify::{LogVerifier, PublicKey};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file, then apply CLI overrides
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config file {}", path))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level(&config)));

    match config.log_type {
        LogType::Dev => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        LogType::Prod => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
    }

    tracing::info!("Starting sth-watch...");

    let bucket_uri = Config::resolve_bucket(std::env::var(BUCKET_ENV).ok())?;

    // Fetch and parse the log's public key
    let base_url = config.rekor_server.base_url();
    let client = Arc::new(RekorClient::new(base_url.clone(), config.request_timeout)?);

    let pem = client
        .get_public_key()
        .await
        .with_context(|| format!("Failed to fetch public key from {}", base_url))?;
    let key = PublicKey::from_pem(pem.as_bytes(), config.hash_algorithm)
        .context("Failed to decode public key of server")?;

    tracing::info!(
        key_type = %key.key_type(),
        hash = %key.hash_algorithm(),
        fingerprint = key.fingerprint(),
        "Loaded public key of {}",
        base_url
    );

    let bucket = open_bucket(&bucket_uri)
        .await
        .with_context(|| format!("Failed to open bucket {}", bucket_uri))?;

    let checker = Checker::new(client, Arc::new(LogVerifier::new(key)));
    let archiver = Archiver::new(bucket);
    let mut monitor = Monitor::new(checker, archiver, config.interval);

    if config.seed_from_archive {
        monitor.restore_checkpoint().await;
    } else {
        tracing::debug!("Checkpoint restore disabled");
    }

    // Ctrl-C or SIGTERM stops the loop; the bucket is closed on the way out
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown_tx.send(true).ok();
    });

    monitor.serve(shutdown_rx).await
}

/// Resolves on the first of Ctrl-C or SIGTERM. A signal that cannot be
/// listened for never fires.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

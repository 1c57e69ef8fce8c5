// src/monitor.rs
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::archiver::{ArchiveReceipt, Archiver, object_name};
use crate::checker::Checker;
use crate::detector::{Change, detect};
use crate::error::MonitorError;
use crate::storage::StorageError;
use crate::types::VerifiedRoot;

/// Result of one tick
#[derive(Debug)]
pub enum CycleOutcome {
    /// Fetch, decode or verification failed. Nothing was written.
    CheckFailed(MonitorError),
    /// A verified head could not be stored. It will be fetched, verified
    /// and written again on the next tick.
    ArchiveFailed {
        tree_size: u64,
        change: Change,
        error: MonitorError,
    },
    Archived {
        tree_size: u64,
        change: Change,
        receipt: ArchiveReceipt,
    },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }
}

/// Drives the fetch → verify → detect → archive cycle on a fixed period.
///
/// One cycle runs at a time; the next tick is only awaited after the current
/// cycle has finished. The last archived root lives here and nowhere else,
/// and it only moves forward after a successful write.
pub struct Monitor {
    checker: Checker,
    archiver: Archiver,
    interval: Duration,
    last: Option<VerifiedRoot>,
    consecutive_failures: u32,
}

impl Monitor {
    pub fn new(checker: Checker, archiver: Archiver, interval: Duration) -> Self {
        Self {
            checker,
            archiver,
            interval,
            last: None,
            consecutive_failures: 0,
        }
    }

    /// Last root that was both verified and archived
    pub fn last_archived(&self) -> Option<&VerifiedRoot> {
        self.last.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Seed the last archived root from the newest object in the bucket.
    ///
    /// The stored signed head is re-verified with the current key; anything
    /// that does not verify is ignored and the monitor starts cold. Returns
    /// the restored tree size.
    pub async fn restore_checkpoint(&mut self) -> Option<u64> {
        let checkpoint = match self.archiver.latest().await {
            Ok(Some(cp)) => cp,
            Ok(None) => {
                info!("No archived heads found, starting without a checkpoint");
                return None;
            }
            Err(e) => {
                warn!("Could not read checkpoint from bucket: {}", e);
                return None;
            }
        };

        let record = match self.checker.verify_head(checkpoint.signed) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Ignoring checkpoint {}: does not verify against the log key: {}",
                    checkpoint.object_name, e
                );
                return None;
            }
        };

        if record.tree_size() != checkpoint.stored_tree_size {
            warn!(
                "Ignoring checkpoint {}: signed tree size {} does not match stored {}",
                checkpoint.object_name,
                record.tree_size(),
                checkpoint.stored_tree_size
            );
            return None;
        }

        let tree_size = record.tree_size();
        info!(
            tree_size,
            timestamp = %record.verified().timestamp(),
            "Restored checkpoint from {}",
            checkpoint.object_name
        );
        self.last = Some(record.verified().clone());
        Some(tree_size)
    }

    /// Run one cycle. Both network calls must finish by `deadline`.
    pub async fn run_cycle(&mut self, deadline: Instant) -> CycleOutcome {
        debug!("Performing check");

        let record = match tokio::time::timeout_at(deadline, self.checker.check()).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => return self.check_failed(e),
            Err(_) => {
                return self.check_failed(MonitorError::Transport(anyhow::anyhow!(
                    "log server did not answer before the cycle deadline"
                )));
            }
        };

        let verified = record.verified();
        let tree_size = verified.tree_size;
        info!(
            tree_size,
            timestamp = %verified.timestamp(),
            root_hash = %verified.root_hash_hex(),
            "Found and verified signed tree head"
        );

        let change = detect(verified, self.last.as_ref());
        match change {
            Change::Regressed { from, to } => warn!(
                from,
                to, "Tree size went backwards; archiving the signed head as evidence"
            ),
            // Still uploaded: repairs a previous write that failed silently
            Change::Unchanged { resigned } => info!(
                tree_size,
                resigned, "Tree size unchanged since last archive, rewriting anyway"
            ),
            Change::Advanced { .. } | Change::FirstObservation => {
                info!(tree_size, "Tree {}", change)
            }
        }

        let archived = match tokio::time::timeout_at(deadline, self.archiver.archive(&record)).await
        {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Storage(StorageError::Timeout(object_name(
                tree_size,
            )))),
        };

        match archived {
            Ok(receipt) => {
                info!(
                    tree_size,
                    object = %receipt.object_name,
                    "Archived signed tree head"
                );
                self.last = Some(record.verified().clone());
                self.consecutive_failures = 0;
                CycleOutcome::Archived {
                    tree_size,
                    change,
                    receipt,
                }
            }
            Err(error) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    tree_size,
                    kind = error.kind(),
                    consecutive_failures = self.consecutive_failures,
                    "Error uploading result: {}",
                    error
                );
                CycleOutcome::ArchiveFailed {
                    tree_size,
                    change,
                    error,
                }
            }
        }
    }

    fn check_failed(&mut self, error: MonitorError) -> CycleOutcome {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        warn!(
            kind = error.kind(),
            consecutive_failures = self.consecutive_failures,
            "Error verifying tree: {}",
            error
        );
        CycleOutcome::CheckFailed(error)
    }

    /// Tick forever, or until `shutdown_rx` flips to `true` (or its sender
    /// goes away). The first check happens one interval after start.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Starting monitor, checking every {:?}", self.interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                tick = ticker.tick() => {
                    let deadline = tick + self.interval;
                    self.run_cycle(deadline).await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Monitor stopped");
    }

    /// Run the loop on its own task until shutdown, then close the bucket.
    ///
    /// The bucket is closed on every way out of the loop, including a panic
    /// inside a cycle; the panic is then reported as an error.
    pub async fn serve(mut self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
        let bucket = self.archiver.bucket().clone();

        let joined = tokio::spawn(async move { self.run(shutdown_rx).await }).await;

        info!("Closing bucket {}...", bucket.location());
        let closed = bucket.close().await;

        if let Err(e) = joined {
            error!("Monitor loop aborted: {}", e);
            if let Err(close_err) = closed {
                warn!("Error closing bucket: {}", close_err);
            }
            anyhow::bail!("monitor loop aborted: {}", e);
        }

        closed?;
        Ok(())
    }
}

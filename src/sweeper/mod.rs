use crate::config::SweepConfig;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::mastodon::StatusDeleter;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub interval: Duration,
    /// Age in seconds after which a post is deleted.
    pub older_than_secs: i64,
    /// Drop the ledger entry after a successful remote delete as well.
    pub forget_on_success: bool,
}

impl SweepSettings {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            older_than_secs: i64::try_from(config.older_than_secs).unwrap_or(i64::MAX),
            forget_on_success: config.forget_on_success,
        }
    }
}

/// Outcome counters for one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cutoff: i64,
    pub scanned: u64,
    pub deleted_remote: u64,
    pub delete_failed: u64,
    pub forgotten: u64,
    pub forget_failed: u64,
}

/// Entries with `created_at <= cutoff` are due.
pub fn cutoff(now: i64, older_than_secs: i64) -> i64 {
    now.saturating_sub(older_than_secs)
}

/// Periodically deletes aged posts and reconciles the ledger.
pub struct Sweeper {
    ledger: Arc<dyn Ledger>,
    deleter: Arc<dyn StatusDeleter>,
    settings: SweepSettings,
}

impl Sweeper {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        deleter: Arc<dyn StatusDeleter>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            ledger,
            deleter,
            settings,
        }
    }

    /// Tick forever; the first cycle runs immediately. A cycle in flight when
    /// shutdown is requested runs to completion.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            older_than_secs = self.settings.older_than_secs,
            "sweeper started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let Err(e) = self.sweep().await {
                tracing::warn!(error = %e, "ledger scan error, skipping cycle");
            }
        }

        tracing::info!("sweeper stopped");
    }

    pub async fn sweep(&self) -> Result<SweepReport, LedgerError> {
        self.sweep_at(Utc::now().timestamp()).await
    }

    /// One cycle against an explicit clock. A failed scan aborts the cycle
    /// before any remote call.
    pub async fn sweep_at(&self, now: i64) -> Result<SweepReport, LedgerError> {
        let cutoff = cutoff(now, self.settings.older_than_secs);
        let entries = self.ledger.scan_older_than(cutoff).await?;

        let mut report = SweepReport {
            cutoff,
            scanned: entries.len() as u64,
            ..SweepReport::default()
        };

        for entry in entries {
            tracing::info!(post_id = %entry.id, created_at = entry.created_at, "delete status");

            let forget = match self.deleter.delete_status(&entry.id).await {
                Ok(()) => {
                    report.deleted_remote += 1;
                    tracing::info!(post_id = %entry.id, "status deleted");
                    // FIXME: entries stay in the ledger after a successful delete
                    // unless forget_on_success is set; the next sweep's 404 clears them.
                    self.settings.forget_on_success
                }
                Err(e) => {
                    report.delete_failed += 1;
                    tracing::warn!(post_id = %entry.id, error = %e, "delete status failed, forgetting entry");
                    true
                }
            };

            if !forget {
                continue;
            }
            match self.ledger.delete_by_key(&entry.id).await {
                Ok(()) => report.forgotten += 1,
                Err(e) => {
                    report.forget_failed += 1;
                    tracing::error!(post_id = %entry.id, error = %e, "ledger delete error");
                }
            }
        }

        tracing::info!(
            cutoff = report.cutoff,
            scanned = report.scanned,
            deleted = report.deleted_remote,
            failed = report.delete_failed,
            forgotten = report.forgotten,
            "sweep cycle finished"
        );
        Ok(report)
    }
}

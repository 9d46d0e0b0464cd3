//! The sync cycle: replay pending deletions, then push unsynced rows.
//!
//! A cycle walks tables in dependency order so the server never sees a
//! child before its parent on upsert, nor a parent before its children on
//! delete. Tables fail independently: an error on one table skips its
//! dependents for the rest of the cycle but leaves unrelated tables free
//! to sync. Every batch is safe to retry because the server upserts
//! idempotently and ignores deletes of unknown rows.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::transport::SyncTransport;
use liftlog_engine::{DeviceStore, EntityId, Table};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cooperative cancellation flag shared between the sync loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the sync loop stop at the next table boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Rows the server acknowledged as upserted
    pub pushed: usize,
    /// Tombstones the server acknowledged as deleted
    pub deleted: usize,
    /// Tables whose batch failed, with the error that stopped them
    pub failed: Vec<(Table, SyncError)>,
    /// Tables skipped because a table they depend on failed
    pub skipped: Vec<Table>,
    /// Whether the cycle stopped early on cancellation
    pub cancelled: bool,
}

impl SyncReport {
    /// True when the cycle ran to completion without any table failing.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.cancelled
    }
}

/// Drives sync cycles against a shared [`DeviceStore`].
///
/// The store lock is never held across a transport call: each step
/// collects what it needs under the lock, releases it, talks to the
/// server, then re-locks to record the acknowledgement. Mutations made
/// by the app between those two points are preserved because
/// acknowledgements only touch the exact rows that were sent.
pub struct SyncOrchestrator<T> {
    store: Arc<Mutex<DeviceStore>>,
    transport: Arc<T>,
    config: SyncConfig,
}

impl<T: SyncTransport> SyncOrchestrator<T> {
    pub fn new(store: Arc<Mutex<DeviceStore>>, transport: Arc<T>, config: SyncConfig) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    /// Run one full sync cycle: deletions first, then pushes.
    ///
    /// Deletions replay before pushes so a row that was deleted and
    /// re-created under a new id never races its own tombstone.
    pub async fn sync_once(&self, cancel: &CancelToken) -> SyncReport {
        let mut report = SyncReport::default();

        // Child tables delete before their parents.
        let mut blocked: HashSet<Table> = HashSet::new();
        for table in Table::DELETE_ORDER {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return report;
            }

            let row_ids = {
                let store = self.store.lock().await;
                store.pending_tombstones(table)
            };
            if row_ids.is_empty() {
                continue;
            }

            if blocked.iter().any(|b| b.parents().contains(&table)) {
                tracing::warn!(table = %table, "skipping deletions, a child table failed");
                report.skipped.push(table);
                blocked.insert(table);
                continue;
            }

            match self.replay_deletions(table, row_ids).await {
                Ok(count) => report.deleted += count,
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "deletion batch failed");
                    report.failed.push((table, err));
                    blocked.insert(table);
                }
            }
        }

        // Parent tables push before their children.
        let mut blocked: HashSet<Table> = HashSet::new();
        for table in Table::DEPENDENCY_ORDER {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return report;
            }

            let rows = {
                let store = self.store.lock().await;
                store.unsynced_rows(table)
            };
            let rows = match rows {
                Ok(rows) => rows,
                Err(err) => {
                    let err = SyncError::from(err);
                    tracing::warn!(table = %table, error = %err, "could not collect rows");
                    report.failed.push((table, err));
                    blocked.insert(table);
                    continue;
                }
            };
            if rows.is_empty() {
                continue;
            }

            if table.parents().iter().any(|p| blocked.contains(p)) {
                tracing::warn!(table = %table, "skipping push, a parent table failed");
                report.skipped.push(table);
                blocked.insert(table);
                continue;
            }

            match self.push_rows(table, rows).await {
                Ok(count) => report.pushed += count,
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "push batch failed");
                    report.failed.push((table, err));
                    blocked.insert(table);
                }
            }
        }

        tracing::info!(
            pushed = report.pushed,
            deleted = report.deleted,
            failed = report.failed.len(),
            "sync cycle finished"
        );
        report
    }

    /// Sync on a fixed interval until cancelled.
    pub async fn run(&self, cancel: CancelToken) {
        let mut ticker = tokio::time::interval(self.config.sync_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                tracing::info!("sync loop stopping");
                return;
            }
            let report = self.sync_once(&cancel).await;
            if report.cancelled {
                tracing::info!("sync loop stopping");
                return;
            }
        }
    }

    async fn replay_deletions(&self, table: Table, row_ids: Vec<EntityId>) -> Result<usize> {
        let mut deleted = 0;
        for chunk in row_ids.chunks(self.config.batch_limit) {
            let ack = self.transport.delete_rows(table, chunk.to_vec()).await?;

            let mut store = self.store.lock().await;
            store.clear_tombstones(table, &ack.accepted);
            deleted += ack.accepted.len();
        }
        tracing::debug!(table = %table, count = deleted, "deletions acknowledged");
        Ok(deleted)
    }

    async fn push_rows(&self, table: Table, rows: Vec<Value>) -> Result<usize> {
        let mut pushed = 0;
        for chunk in rows.chunks(self.config.batch_limit) {
            let ack = self.transport.upsert_rows(table, chunk.to_vec()).await?;

            let mut store = self.store.lock().await;
            store.mark_synced(table, &ack.accepted);
            pushed += ack.accepted.len();
        }
        tracing::debug!(table = %table, count = pushed, "rows acknowledged");
        Ok(pushed)
    }
}

//! Tombstone tracking for deletions that must reach the authoritative store.
//!
//! A tombstone exists for a row iff that row was synced at the moment of
//! deletion. Rows created and deleted entirely offline never produce one,
//! because the server never had a copy to remove. The guard lives inside
//! [`TombstoneLog::record_deletion`] so call sites cannot forget it.

use crate::{EntityId, IdAllocator, SyncState, Table, Tombstone};
use serde::{Deserialize, Serialize};

/// Pending deletions awaiting replay against the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TombstoneLog {
    entries: Vec<Tombstone>,
}

impl TombstoneLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the deletion of a row.
    ///
    /// No-op for `LocalOnly` rows. Called exactly once per physically
    /// deleted row, with the row's sync state as observed at deletion time.
    pub fn record_deletion(
        &mut self,
        table: Table,
        row_id: impl Into<EntityId>,
        sync_state: SyncState,
        ids: &IdAllocator,
    ) {
        if !sync_state.is_synced() {
            return;
        }
        self.entries.push(Tombstone {
            id: ids.new_id(),
            table,
            row_id: row_id.into(),
        });
    }

    /// All pending tombstones, in recording order.
    pub fn pending(&self) -> &[Tombstone] {
        &self.entries
    }

    /// Pending deleted-row ids for one table, in recording order.
    pub fn pending_for(&self, table: Table) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|t| t.table == table)
            .map(|t| t.row_id.clone())
            .collect()
    }

    /// Drop entries for acknowledged deletions of one table.
    pub fn clear(&mut self, table: Table, acknowledged_row_ids: &[EntityId]) {
        self.entries
            .retain(|t| t.table != table || !acknowledged_row_ids.contains(&t.row_id));
    }

    /// Number of pending tombstones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with_synced_row() -> (TombstoneLog, IdAllocator) {
        let ids = IdAllocator::sequential("ts");
        let mut log = TombstoneLog::new();
        log.record_deletion(Table::Exercises, "ex-1", SyncState::Synced, &ids);
        (log, ids)
    }

    #[test]
    fn synced_row_produces_tombstone() {
        let (log, _ids) = log_with_synced_row();

        assert_eq!(log.len(), 1);
        let tombstone = &log.pending()[0];
        assert_eq!(tombstone.table, Table::Exercises);
        assert_eq!(tombstone.row_id, "ex-1");
    }

    #[test]
    fn local_only_row_produces_no_tombstone() {
        let ids = IdAllocator::sequential("ts");
        let mut log = TombstoneLog::new();

        log.record_deletion(Table::Exercises, "ex-1", SyncState::LocalOnly, &ids);

        assert!(log.is_empty());
    }

    #[test]
    fn pending_for_filters_by_table() {
        let (mut log, ids) = log_with_synced_row();
        log.record_deletion(Table::SessionSets, "ss-1", SyncState::Synced, &ids);
        log.record_deletion(Table::SessionSets, "ss-2", SyncState::Synced, &ids);

        assert_eq!(log.pending_for(Table::SessionSets), vec!["ss-1", "ss-2"]);
        assert_eq!(log.pending_for(Table::Exercises), vec!["ex-1"]);
        assert!(log.pending_for(Table::Workouts).is_empty());
    }

    #[test]
    fn clear_removes_only_acknowledged_rows_of_that_table() {
        let (mut log, ids) = log_with_synced_row();
        log.record_deletion(Table::SessionSets, "ss-1", SyncState::Synced, &ids);
        log.record_deletion(Table::SessionSets, "ss-2", SyncState::Synced, &ids);

        log.clear(Table::SessionSets, &["ss-1".to_string()]);

        assert_eq!(log.pending_for(Table::SessionSets), vec!["ss-2"]);
        assert_eq!(log.pending_for(Table::Exercises), vec!["ex-1"]);

        // Same row id under a different table is untouched
        log.clear(Table::Workouts, &["ex-1".to_string()]);
        assert_eq!(log.pending_for(Table::Exercises), vec!["ex-1"]);
    }

    #[test]
    fn serialization_roundtrip() {
        let (log, _ids) = log_with_synced_row();

        let json = serde_json::to_string(&log).unwrap();
        let parsed: TombstoneLog = serde_json::from_str(&json).unwrap();

        assert_eq!(log, parsed);
    }
}

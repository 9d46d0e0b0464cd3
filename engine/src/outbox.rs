//! Outbox: an ordered changelog of rows awaiting push.
//!
//! Instead of scattering `isSynced = false` scans across every table, every
//! local mutation records one entry here. The sync orchestrator reads a
//! single ordered queue, grouped per table, and acknowledges entries once
//! the server confirms the push.

use crate::{EntityId, Table};
use serde::{Deserialize, Serialize};

/// A pending local change awaiting push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Monotonic sequence number, assigned at recording time
    pub seq: u64,
    pub table: Table,
    pub entity_id: EntityId,
}

/// Ordered queue of pending changes, coalesced per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbox {
    next_seq: u64,
    entries: Vec<Change>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local change to a row.
    ///
    /// Repeated changes to the same row coalesce into the original entry;
    /// the row is pushed once with its latest state.
    pub fn record(&mut self, table: Table, entity_id: impl Into<EntityId>) {
        let entity_id = entity_id.into();
        if self
            .entries
            .iter()
            .any(|c| c.table == table && c.entity_id == entity_id)
        {
            return;
        }
        self.next_seq += 1;
        self.entries.push(Change {
            seq: self.next_seq,
            table,
            entity_id,
        });
    }

    /// Drop the pending entry for a row, if any.
    ///
    /// Used when a row is deleted before it ever reached the server, so
    /// nothing is pushed on its behalf.
    pub fn discard(&mut self, table: Table, entity_id: &str) {
        self.entries
            .retain(|c| c.table != table || c.entity_id != entity_id);
    }

    /// All pending changes, in sequence order.
    pub fn pending(&self) -> &[Change] {
        &self.entries
    }

    /// Pending entity ids for one table, in sequence order.
    pub fn pending_for(&self, table: Table) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|c| c.table == table)
            .map(|c| c.entity_id.clone())
            .collect()
    }

    /// Drop entries for rows the server has acknowledged.
    pub fn acknowledge(&mut self, table: Table, entity_ids: &[EntityId]) {
        self.entries
            .retain(|c| c.table != table || !entity_ids.contains(&c.entity_id));
    }

    /// Number of pending changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the outbox is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

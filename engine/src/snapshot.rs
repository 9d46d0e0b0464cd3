//! Snapshot types for persisting and restoring device state.
//!
//! A snapshot is the bridge between the in-memory [`DeviceStore`] and
//! whatever durable storage the host platform provides. Collections are
//! keyed through `BTreeMap` so the serialized form is canonical: the same
//! state always produces byte-identical JSON.

use crate::error::{Error, Result};
use crate::{
    BodyPart, DeviceStore, EntityId, Equipment, Exercise, IdAllocator, Outbox, Session,
    TombstoneLog, Workout,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format, bumped on incompatible layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of everything a device knows.
///
/// Includes the sync bookkeeping: pending tombstones and the outbox survive
/// an app restart, so offline deletions and edits are never lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    pub workouts: BTreeMap<EntityId, Workout>,
    pub sessions: BTreeMap<EntityId, Session>,
    pub exercises: BTreeMap<EntityId, Exercise>,
    pub body_parts: BTreeMap<EntityId, BodyPart>,
    pub equipment: BTreeMap<EntityId, Equipment>,
    pub tombstones: TombstoneLog,
    pub outbox: Outbox,
}

impl DeviceSnapshot {
    /// Capture the current state of a store.
    pub fn capture(store: &DeviceStore) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            workouts: to_ordered(&store.workouts),
            sessions: to_ordered(&store.sessions),
            exercises: to_ordered(&store.exercises),
            body_parts: to_ordered(&store.body_parts),
            equipment: to_ordered(&store.equipment),
            tombstones: store.tombstones.clone(),
            outbox: store.outbox.clone(),
        }
    }

    /// Rebuild a store from this snapshot, with a fresh random id allocator.
    pub fn restore(self) -> DeviceStore {
        self.restore_with_allocator(IdAllocator::new())
    }

    /// Rebuild a store from this snapshot with the given id allocator.
    pub fn restore_with_allocator(self, ids: IdAllocator) -> DeviceStore {
        DeviceStore {
            ids,
            workouts: self.workouts.into_iter().collect(),
            sessions: self.sessions.into_iter().collect(),
            exercises: self.exercises.into_iter().collect(),
            body_parts: self.body_parts.into_iter().collect(),
            equipment: self.equipment.into_iter().collect(),
            tombstones: self.tombstones,
            outbox: self.outbox,
        }
    }

    /// Total row count across every table, nested children included.
    pub fn row_count(&self) -> usize {
        let workout_rows: usize = self
            .workouts
            .values()
            .map(|w| 1 + w.exercises.iter().map(|e| 1 + e.sets.len()).sum::<usize>())
            .sum();
        let session_rows: usize = self
            .sessions
            .values()
            .map(|s| 1 + s.exercises.iter().map(|e| 1 + e.sets.len()).sum::<usize>())
            .sum();
        workout_rows
            + session_rows
            + self.exercises.len()
            + self.body_parts.len()
            + self.equipment.len()
    }

    /// Serialize to canonical JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty-printed canonical JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, rejecting snapshots written by a newer format.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersionMismatch {
                supported: SNAPSHOT_FORMAT_VERSION,
                actual: snapshot.format_version,
            });
        }

        Ok(snapshot)
    }
}

fn to_ordered<V: Clone>(map: &std::collections::HashMap<EntityId, V>) -> BTreeMap<EntityId, V> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Lightweight summary of a snapshot, without the row data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub format_version: u32,
    pub workout_count: usize,
    pub session_count: usize,
    pub row_count: usize,
    pub pending_push_count: usize,
    pub pending_delete_count: usize,
}

impl From<&DeviceSnapshot> for SnapshotSummary {
    fn from(snapshot: &DeviceSnapshot) -> Self {
        Self {
            format_version: snapshot.format_version,
            workout_count: snapshot.workouts.len(),
            session_count: snapshot.sessions.len(),
            row_count: snapshot.row_count(),
            pending_push_count: snapshot.outbox.len(),
            pending_delete_count: snapshot.tombstones.len(),
        }
    }
}

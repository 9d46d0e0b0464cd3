//! # LiftLog Engine
//!
//! The device-local data layer for a local-first workout tracker.
//!
//! Every mutation happens on the device first: entities get their permanent
//! ids at creation time, deletions of server-known rows are tombstoned, and
//! edits queue in an outbox until a sync cycle pushes them. The engine is
//! pure logic; a separate runtime crate owns scheduling and transport.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: the same inputs always produce the same outputs
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### One id space
//!
//! [`IdAllocator`] mints UUID v4 identifiers on the device. The server never
//! renames a row, so client and server state reconcile by identity alone.
//!
//! ### Aggregates
//!
//! Workouts and sessions are two-level nested aggregates (exercises, each
//! with sets) with dense 1..N ordering. [`Reconciler`] diffs a persisted
//! aggregate against a target shape and applies the minimal change set.
//!
//! ### Sync bookkeeping
//!
//! Each row carries a [`SyncState`]: has the server ever acknowledged it?
//! Pending pushes live in the [`Outbox`], pending deletions in the
//! [`TombstoneLog`]. [`DeviceStore`] keeps all three consistent on every
//! write.
//!
//! ## Quick Start
//!
//! ```rust
//! use liftlog_engine::{DeviceStore, EditBuffer, ExerciseShape, SetShape, WorkoutShape};
//!
//! let mut store = DeviceStore::new();
//!
//! // 1. Seed the lookup tables
//! let chest = store.add_body_part("Chest");
//! let barbell = store.add_equipment("Barbell");
//! let bench = store.add_exercise("Bench Press", chest, barbell).unwrap();
//!
//! // 2. Build a workout template
//! let shape = WorkoutShape::new(
//!     "Push Day",
//!     vec![ExerciseShape::new(bench, vec![SetShape::new(8, 60.0)])],
//! );
//! let workout_id = store.upsert_workout(&shape, 1_000).unwrap();
//!
//! // 3. Train against it
//! let session_id = store.start_session(&workout_id, "Morning", 2_000).unwrap();
//! let set_id = store.session(&session_id).unwrap().exercises[0].sets[0].id.clone();
//! store.set_completed(&session_id, &set_id, true).unwrap();
//!
//! // 4. Finish: the payload describes exactly what the server must change
//! let payload = store
//!     .finish_session(&session_id, &EditBuffer::new(), 62_000)
//!     .unwrap();
//! assert_eq!(payload.exercises_add.len(), 1);
//! ```
//!
//! ## Persistence
//!
//! Use [`DeviceSnapshot::capture`] and [`DeviceSnapshot::restore`] to move
//! state in and out of durable storage. Snapshots serialize to canonical
//! JSON with deterministic key ordering.

pub mod error;
pub mod ident;
pub mod model;
pub mod outbox;
pub mod payload;
pub mod reconcile;
pub mod snapshot;
pub mod store;
pub mod tombstone;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use ident::IdAllocator;
pub use model::{
    format_session_time, BodyPart, Equipment, Exercise, Session, SessionExercise, SessionSet,
    SetTemplate, SyncState, Table, Tombstone, Workout, WorkoutExercise,
};
pub use outbox::{Change, Outbox};
pub use payload::{
    build_completion_payload, EditBuffer, ExerciseAdd, ExerciseUpdate, SessionSyncPayload, SetEdit,
    SetPayload,
};
pub use reconcile::{
    ExerciseShape, ReconcileReport, Reconciler, SessionExerciseShape, SessionSetShape,
    SessionShape, SetShape, WorkoutShape,
};
pub use snapshot::{DeviceSnapshot, SnapshotSummary, SNAPSHOT_FORMAT_VERSION};
pub use store::{session_as_workout_shape, DeviceStore};
pub use tombstone::TombstoneLog;

/// Type aliases for clarity
pub type EntityId = String;
pub type Timestamp = u64;

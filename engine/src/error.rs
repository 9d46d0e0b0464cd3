//! Error types for the LiftLog engine.

use crate::EntityId;
use thiserror::Error;

/// All possible errors from the LiftLog engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Not-found errors
    #[error("workout not found: {0}")]
    WorkoutNotFound(EntityId),

    #[error("session not found: {0}")]
    SessionNotFound(EntityId),

    #[error("exercise not found: {0}")]
    ExerciseNotFound(EntityId),

    #[error("row not found in {table}: {row_id}")]
    RowNotFound { table: String, row_id: EntityId },

    #[error("session {0} is not linked to a workout")]
    SessionNotLinked(EntityId),

    // Conflict errors (once-only operations)
    #[error("session {0} has already updated its source workout")]
    WorkoutAlreadyUpdated(EntityId),

    #[error("session {0} already has a derived workout")]
    DerivedWorkoutExists(EntityId),

    #[error("session {0} is already completed")]
    SessionAlreadyCompleted(EntityId),

    // Constraint errors
    #[error("exercise {0} referenced more than once in one aggregate")]
    DuplicateExerciseRef(EntityId),

    #[error("unknown table name: {0}")]
    UnknownTable(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot format version mismatch: supported up to {supported}, got {actual}")]
    SnapshotVersionMismatch { supported: u32, actual: u32 },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

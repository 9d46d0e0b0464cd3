//! Domain model: workout and session aggregates, lookup rows, sync metadata.
//!
//! Workouts and sessions are two-level nested aggregates: the parent owns an
//! ordered list of exercises, each owning an ordered list of sets. `order`
//! and `set_number` values are dense 1..N permutations, renumbered on every
//! removal. Derived counters are recomputed from live children, never
//! adjusted incrementally.

use crate::{EntityId, Error, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the authoritative store has ever acknowledged a row.
///
/// This is not a dirty flag. Pending pushes live in the outbox; `Synced`
/// means the server holds a copy, which is what deletion logic and payload
/// classification key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Created on this device, never acknowledged by the server
    LocalOnly,
    /// Acknowledged by the server at least once
    Synced,
}

impl SyncState {
    /// Check whether the server holds a copy of the row.
    pub fn is_synced(self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

/// Logical table a row belongs to.
///
/// A closed enum rather than a free string: an unknown table name is a
/// configuration error and fails fast at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Table {
    BodyParts,
    Equipment,
    Exercises,
    Workouts,
    WorkoutExercises,
    SetTemplates,
    Sessions,
    SessionExercises,
    SessionSets,
}

impl Table {
    /// Parent-before-child push order for upserts.
    pub const DEPENDENCY_ORDER: [Table; 9] = [
        Table::BodyParts,
        Table::Equipment,
        Table::Exercises,
        Table::Workouts,
        Table::WorkoutExercises,
        Table::SetTemplates,
        Table::Sessions,
        Table::SessionExercises,
        Table::SessionSets,
    ];

    /// Child-before-parent replay order for deletes.
    pub const DELETE_ORDER: [Table; 9] = [
        Table::SessionSets,
        Table::SessionExercises,
        Table::Sessions,
        Table::SetTemplates,
        Table::WorkoutExercises,
        Table::Workouts,
        Table::Exercises,
        Table::Equipment,
        Table::BodyParts,
    ];

    /// Tables this table references; their rows must exist server-side first.
    pub fn parents(self) -> &'static [Table] {
        match self {
            Table::BodyParts | Table::Equipment | Table::Workouts => &[],
            Table::Exercises => &[Table::BodyParts, Table::Equipment],
            Table::WorkoutExercises => &[Table::Workouts, Table::Exercises],
            Table::SetTemplates => &[Table::WorkoutExercises],
            Table::Sessions => &[Table::Workouts],
            Table::SessionExercises => &[Table::Sessions, Table::Exercises],
            Table::SessionSets => &[Table::SessionExercises],
        }
    }

    /// Logical table name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Table::BodyParts => "bodyParts",
            Table::Equipment => "equipment",
            Table::Exercises => "exercises",
            Table::Workouts => "workouts",
            Table::WorkoutExercises => "workoutExercises",
            Table::SetTemplates => "setTemplates",
            Table::Sessions => "sessions",
            Table::SessionExercises => "sessionExercises",
            Table::SessionSets => "sessionSets",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bodyParts" => Ok(Table::BodyParts),
            "equipment" => Ok(Table::Equipment),
            "exercises" => Ok(Table::Exercises),
            "workouts" => Ok(Table::Workouts),
            "workoutExercises" => Ok(Table::WorkoutExercises),
            "setTemplates" => Ok(Table::SetTemplates),
            "sessions" => Ok(Table::Sessions),
            "sessionExercises" => Ok(Table::SessionExercises),
            "sessionSets" => Ok(Table::SessionSets),
            other => Err(Error::UnknownTable(other.to_string())),
        }
    }
}

/// A deletion that must be replayed against the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// Unique identifier of the tombstone itself
    pub id: EntityId,
    /// Logical table of the deleted row
    pub table: Table,
    /// Identifier of the deleted row
    pub row_id: EntityId,
}

/// A target set inside a workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTemplate {
    pub id: EntityId,
    /// 1-based, dense within the owning exercise
    pub set_number: u32,
    pub target_reps: u32,
    pub target_weight: f64,
    pub sync_state: SyncState,
}

/// An exercise slot inside a workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub id: EntityId,
    /// Reference to an [`Exercise`] lookup row, unique within the workout
    pub exercise_id: EntityId,
    /// 1-based, dense within the workout
    pub order: u32,
    pub sync_state: SyncState,
    pub sets: Vec<SetTemplate>,
}

/// A workout template aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: EntityId,
    pub name: String,
    /// Seeded read-only template shipped with the app
    pub is_default_workout: bool,
    pub sync_state: SyncState,
    pub created_at: Timestamp,
    /// Derived: number of owned exercises
    pub exercise_count: u32,
    /// Derived: total number of owned sets
    pub set_count: u32,
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    /// Create an empty workout.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_default_workout: false,
            sync_state: SyncState::LocalOnly,
            created_at,
            exercise_count: 0,
            set_count: 0,
            exercises: Vec::new(),
        }
    }

    /// Find an owned exercise row by id.
    pub fn exercise(&self, id: &str) -> Option<&WorkoutExercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Find an owned exercise row by id, mutably.
    pub fn exercise_mut(&mut self, id: &str) -> Option<&mut WorkoutExercise> {
        self.exercises.iter_mut().find(|e| e.id == id)
    }

    /// Recompute derived counters from live children.
    pub fn recompute_counts(&mut self) {
        self.exercise_count = self.exercises.len() as u32;
        self.set_count = self.exercises.iter().map(|e| e.sets.len() as u32).sum();
    }

    /// Restore dense 1..N numbering after removals.
    pub fn renumber(&mut self) {
        for (i, exercise) in self.exercises.iter_mut().enumerate() {
            exercise.order = i as u32 + 1;
            for (j, set) in exercise.sets.iter_mut().enumerate() {
                set.set_number = j as u32 + 1;
            }
        }
    }
}

/// An actually-performed set inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSet {
    pub id: EntityId,
    /// 1-based, dense within the owning exercise
    pub set_number: u32,
    /// Actual reps performed, not the target
    pub reps: u32,
    /// Actual weight used, not the target
    pub weight: f64,
    /// Client-only; meaningful while the session is in progress
    pub is_completed: bool,
    pub sync_state: SyncState,
}

/// An exercise performed during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub id: EntityId,
    pub exercise_id: EntityId,
    pub order: u32,
    pub sync_state: SyncState,
    pub sets: Vec<SessionSet>,
}

impl SessionExercise {
    /// Check whether at least one owned set is completed.
    pub fn has_completed_set(&self) -> bool {
        self.sets.iter().any(|s| s.is_completed)
    }
}

/// A training session aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: EntityId,
    /// The workout this session was started from, if any
    pub workout_id: Option<EntityId>,
    /// A workout later created from this session, at most one
    pub derived_workout_id: Option<EntityId>,
    pub name: String,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Precomputed duration string, stamped at completion
    pub session_time: Option<String>,
    /// Guard: set when this session has written back into its source workout
    pub updated_workout_at: Option<Timestamp>,
    pub is_from_default_workout: bool,
    pub sync_state: SyncState,
    pub exercise_count: u32,
    pub set_count: u32,
    pub exercises: Vec<SessionExercise>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            workout_id: None,
            derived_workout_id: None,
            name: name.into(),
            created_at,
            completed_at: None,
            session_time: None,
            updated_workout_at: None,
            is_from_default_workout: false,
            sync_state: SyncState::LocalOnly,
            exercise_count: 0,
            set_count: 0,
            exercises: Vec::new(),
        }
    }

    /// Find an owned exercise row by id.
    pub fn exercise(&self, id: &str) -> Option<&SessionExercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Find an owned exercise row by id, mutably.
    pub fn exercise_mut(&mut self, id: &str) -> Option<&mut SessionExercise> {
        self.exercises.iter_mut().find(|e| e.id == id)
    }

    /// Find an owned set across all exercises, mutably.
    pub fn set_mut(&mut self, set_id: &str) -> Option<&mut SessionSet> {
        self.exercises
            .iter_mut()
            .flat_map(|e| e.sets.iter_mut())
            .find(|s| s.id == set_id)
    }

    /// Recompute derived counters from live children.
    pub fn recompute_counts(&mut self) {
        self.exercise_count = self.exercises.len() as u32;
        self.set_count = self.exercises.iter().map(|e| e.sets.len() as u32).sum();
    }

    /// Restore dense 1..N numbering after removals.
    pub fn renumber(&mut self) {
        for (i, exercise) in self.exercises.iter_mut().enumerate() {
            exercise.order = i as u32 + 1;
            for (j, set) in exercise.sets.iter_mut().enumerate() {
                set.set_number = j as u32 + 1;
            }
        }
    }
}

/// A selectable exercise definition (user-created or seeded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: EntityId,
    pub name: String,
    pub body_part_id: EntityId,
    pub equipment_id: EntityId,
    pub sync_state: SyncState,
}

/// A body part lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPart {
    pub id: EntityId,
    pub name: String,
    pub sync_state: SyncState,
}

/// An equipment lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: EntityId,
    pub name: String,
    pub sync_state: SyncState,
}

/// Format a session duration in milliseconds as `HH:MM:SS`.
pub fn format_session_time(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

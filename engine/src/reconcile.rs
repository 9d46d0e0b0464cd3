//! Aggregate diff reconciliation.
//!
//! Given the currently persisted shape of a two-level nested aggregate
//! (exercises, each with sets) and a target shape supplied by the caller,
//! compute and apply the minimal insert/update/delete set while preserving
//! identity and order.
//!
//! # Algorithm
//!
//! 1. Match each target exercise against the persisted children, by row id
//!    when the target carries one, else by exercise reference
//! 2. Matched exercises keep their identity; their nested sets are diffed
//!    the same way (by set row id, else treated as new)
//! 3. Persisted exercises and sets absent from the target are deleted,
//!    tombstoning every synced row, and the survivors are renumbered densely
//! 4. Derived counters are recomputed from the surviving children
//!
//! The reconciler never talks to storage. Callers run it inside a store
//! transaction so a failure rolls the whole aggregate back.

use crate::{
    EntityId, IdAllocator, Outbox, Session, SessionExercise, SessionSet, SetTemplate, SyncState,
    Table, TombstoneLog, Workout, WorkoutExercise,
};
use serde::{Deserialize, Serialize};

/// Target shape of one set inside a workout exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetShape {
    /// Persisted row to update; `None` inserts a new set
    pub id: Option<EntityId>,
    pub target_reps: u32,
    pub target_weight: f64,
}

impl SetShape {
    /// Shape for a brand-new set.
    pub fn new(target_reps: u32, target_weight: f64) -> Self {
        Self {
            id: None,
            target_reps,
            target_weight,
        }
    }

    /// Shape updating a persisted set row.
    pub fn existing(id: impl Into<EntityId>, target_reps: u32, target_weight: f64) -> Self {
        Self {
            id: Some(id.into()),
            target_reps,
            target_weight,
        }
    }
}

/// Target shape of one exercise inside a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseShape {
    /// Persisted row to update; `None` matches by `exercise_id`, else inserts
    pub id: Option<EntityId>,
    /// Reference to an exercise lookup row
    pub exercise_id: EntityId,
    pub sets: Vec<SetShape>,
}

impl ExerciseShape {
    /// Shape for an exercise matched by reference (or inserted).
    pub fn new(exercise_id: impl Into<EntityId>, sets: Vec<SetShape>) -> Self {
        Self {
            id: None,
            exercise_id: exercise_id.into(),
            sets,
        }
    }
}

/// Target shape of a whole workout aggregate.
///
/// Exercise order and set numbering follow list position; persisted rows
/// absent from the shape are deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutShape {
    /// Persisted workout to reconcile; `None` creates a new one
    pub id: Option<EntityId>,
    pub name: String,
    pub exercises: Vec<ExerciseShape>,
}

impl WorkoutShape {
    /// Shape for a brand-new workout.
    pub fn new(name: impl Into<String>, exercises: Vec<ExerciseShape>) -> Self {
        Self {
            id: None,
            name: name.into(),
            exercises,
        }
    }

    /// Shape reconciling a persisted workout.
    pub fn existing(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        exercises: Vec<ExerciseShape>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            exercises,
        }
    }
}

/// Target shape of one set inside a session exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetShape {
    pub id: Option<EntityId>,
    pub reps: u32,
    pub weight: f64,
    pub is_completed: bool,
}

/// Target shape of one exercise inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExerciseShape {
    pub id: Option<EntityId>,
    pub exercise_id: EntityId,
    pub sets: Vec<SessionSetShape>,
}

/// Target shape of a whole session aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionShape {
    pub name: String,
    pub exercises: Vec<SessionExerciseShape>,
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub inserted_exercises: Vec<EntityId>,
    pub updated_exercises: Vec<EntityId>,
    pub deleted_exercises: Vec<EntityId>,
    pub inserted_sets: Vec<EntityId>,
    pub updated_sets: Vec<EntityId>,
    pub deleted_sets: Vec<EntityId>,
}

impl ReconcileReport {
    /// Check whether the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.inserted_exercises.is_empty()
            && self.updated_exercises.is_empty()
            && self.deleted_exercises.is_empty()
            && self.inserted_sets.is_empty()
            && self.updated_sets.is_empty()
            && self.deleted_sets.is_empty()
    }
}

/// Applies a target shape to a persisted aggregate.
///
/// Borrows the identity allocator, tombstone log and outbox from the owning
/// store for the duration of one pass.
pub struct Reconciler<'a> {
    ids: &'a IdAllocator,
    tombstones: &'a mut TombstoneLog,
    outbox: &'a mut Outbox,
    report: ReconcileReport,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for one pass.
    pub fn new(
        ids: &'a IdAllocator,
        tombstones: &'a mut TombstoneLog,
        outbox: &'a mut Outbox,
    ) -> Self {
        Self {
            ids,
            tombstones,
            outbox,
            report: ReconcileReport::default(),
        }
    }

    /// Reconcile a workout aggregate to the target shape.
    pub fn reconcile_workout(mut self, workout: &mut Workout, target: &WorkoutShape) -> ReconcileReport {
        let old_name = workout.name.clone();
        let old_counts = (workout.exercise_count, workout.set_count);

        let mut remaining = std::mem::take(&mut workout.exercises);
        let mut survivors = Vec::with_capacity(target.exercises.len());

        for (i, shape) in target.exercises.iter().enumerate() {
            let order = i as u32 + 1;
            let matched = shape
                .id
                .as_ref()
                .and_then(|id| remaining.iter().position(|e| &e.id == id))
                .or_else(|| {
                    remaining
                        .iter()
                        .position(|e| e.exercise_id == shape.exercise_id)
                });

            match matched {
                Some(pos) => {
                    let mut exercise = remaining.remove(pos);
                    if exercise.order != order {
                        self.outbox
                            .record(Table::WorkoutExercises, exercise.id.clone());
                        self.report.updated_exercises.push(exercise.id.clone());
                    }
                    exercise.order = order;
                    self.diff_template_sets(&mut exercise, &shape.sets);
                    survivors.push(exercise);
                }
                None => survivors.push(self.insert_template_exercise(shape, order)),
            }
        }

        for exercise in remaining {
            self.delete_template_exercise(exercise);
        }

        workout.exercises = survivors;
        workout.name = target.name.clone();
        workout.recompute_counts();

        if workout.name != old_name || (workout.exercise_count, workout.set_count) != old_counts {
            self.outbox.record(Table::Workouts, workout.id.clone());
        }

        self.report
    }

    /// Reconcile a session aggregate to the target shape.
    pub fn reconcile_session(mut self, session: &mut Session, target: &SessionShape) -> ReconcileReport {
        let old_name = session.name.clone();
        let old_counts = (session.exercise_count, session.set_count);

        let mut remaining = std::mem::take(&mut session.exercises);
        let mut survivors = Vec::with_capacity(target.exercises.len());

        for (i, shape) in target.exercises.iter().enumerate() {
            let order = i as u32 + 1;
            let matched = shape
                .id
                .as_ref()
                .and_then(|id| remaining.iter().position(|e| &e.id == id))
                .or_else(|| {
                    remaining
                        .iter()
                        .position(|e| e.exercise_id == shape.exercise_id)
                });

            match matched {
                Some(pos) => {
                    let mut exercise = remaining.remove(pos);
                    if exercise.order != order {
                        self.outbox
                            .record(Table::SessionExercises, exercise.id.clone());
                        self.report.updated_exercises.push(exercise.id.clone());
                    }
                    exercise.order = order;
                    self.diff_session_sets(&mut exercise, &shape.sets);
                    survivors.push(exercise);
                }
                None => survivors.push(self.insert_session_exercise(shape, order)),
            }
        }

        for exercise in remaining {
            self.delete_session_exercise(exercise);
        }

        session.exercises = survivors;
        session.name = target.name.clone();
        session.recompute_counts();

        if session.name != old_name || (session.exercise_count, session.set_count) != old_counts {
            self.outbox.record(Table::Sessions, session.id.clone());
        }

        self.report
    }

    fn diff_template_sets(&mut self, exercise: &mut WorkoutExercise, targets: &[SetShape]) {
        let mut remaining = std::mem::take(&mut exercise.sets);
        let mut survivors = Vec::with_capacity(targets.len());

        for (j, shape) in targets.iter().enumerate() {
            let number = j as u32 + 1;
            let matched = shape
                .id
                .as_ref()
                .and_then(|id| remaining.iter().position(|s| &s.id == id));

            match matched {
                Some(pos) => {
                    let mut set = remaining.remove(pos);
                    let changed = set.set_number != number
                        || set.target_reps != shape.target_reps
                        || set.target_weight != shape.target_weight;
                    set.set_number = number;
                    set.target_reps = shape.target_reps;
                    set.target_weight = shape.target_weight;
                    if changed {
                        self.outbox.record(Table::SetTemplates, set.id.clone());
                        self.report.updated_sets.push(set.id.clone());
                    }
                    survivors.push(set);
                }
                None => {
                    let set = SetTemplate {
                        id: self.ids.new_id(),
                        set_number: number,
                        target_reps: shape.target_reps,
                        target_weight: shape.target_weight,
                        sync_state: SyncState::LocalOnly,
                    };
                    self.outbox.record(Table::SetTemplates, set.id.clone());
                    self.report.inserted_sets.push(set.id.clone());
                    survivors.push(set);
                }
            }
        }

        // Vacated rows are removed before the survivors take their numbers
        for set in remaining {
            self.tombstones
                .record_deletion(Table::SetTemplates, set.id.clone(), set.sync_state, self.ids);
            self.outbox.discard(Table::SetTemplates, &set.id);
            self.report.deleted_sets.push(set.id);
        }

        exercise.sets = survivors;
    }

    fn diff_session_sets(&mut self, exercise: &mut SessionExercise, targets: &[SessionSetShape]) {
        let mut remaining = std::mem::take(&mut exercise.sets);
        let mut survivors = Vec::with_capacity(targets.len());

        for (j, shape) in targets.iter().enumerate() {
            let number = j as u32 + 1;
            let matched = shape
                .id
                .as_ref()
                .and_then(|id| remaining.iter().position(|s| &s.id == id));

            match matched {
                Some(pos) => {
                    let mut set = remaining.remove(pos);
                    let changed = set.set_number != number
                        || set.reps != shape.reps
                        || set.weight != shape.weight;
                    set.set_number = number;
                    set.reps = shape.reps;
                    set.weight = shape.weight;
                    set.is_completed = shape.is_completed;
                    if changed {
                        self.outbox.record(Table::SessionSets, set.id.clone());
                        self.report.updated_sets.push(set.id.clone());
                    }
                    survivors.push(set);
                }
                None => {
                    let set = SessionSet {
                        id: self.ids.new_id(),
                        set_number: number,
                        reps: shape.reps,
                        weight: shape.weight,
                        is_completed: shape.is_completed,
                        sync_state: SyncState::LocalOnly,
                    };
                    self.outbox.record(Table::SessionSets, set.id.clone());
                    self.report.inserted_sets.push(set.id.clone());
                    survivors.push(set);
                }
            }
        }

        for set in remaining {
            self.tombstones
                .record_deletion(Table::SessionSets, set.id.clone(), set.sync_state, self.ids);
            self.outbox.discard(Table::SessionSets, &set.id);
            self.report.deleted_sets.push(set.id);
        }

        exercise.sets = survivors;
    }

    fn insert_template_exercise(&mut self, shape: &ExerciseShape, order: u32) -> WorkoutExercise {
        let mut exercise = WorkoutExercise {
            id: self.ids.new_id(),
            exercise_id: shape.exercise_id.clone(),
            order,
            sync_state: SyncState::LocalOnly,
            sets: Vec::with_capacity(shape.sets.len()),
        };
        self.outbox
            .record(Table::WorkoutExercises, exercise.id.clone());
        self.report.inserted_exercises.push(exercise.id.clone());

        for (j, set_shape) in shape.sets.iter().enumerate() {
            let set = SetTemplate {
                id: self.ids.new_id(),
                set_number: j as u32 + 1,
                target_reps: set_shape.target_reps,
                target_weight: set_shape.target_weight,
                sync_state: SyncState::LocalOnly,
            };
            self.outbox.record(Table::SetTemplates, set.id.clone());
            self.report.inserted_sets.push(set.id.clone());
            exercise.sets.push(set);
        }

        exercise
    }

    fn insert_session_exercise(&mut self, shape: &SessionExerciseShape, order: u32) -> SessionExercise {
        let mut exercise = SessionExercise {
            id: self.ids.new_id(),
            exercise_id: shape.exercise_id.clone(),
            order,
            sync_state: SyncState::LocalOnly,
            sets: Vec::with_capacity(shape.sets.len()),
        };
        self.outbox
            .record(Table::SessionExercises, exercise.id.clone());
        self.report.inserted_exercises.push(exercise.id.clone());

        for (j, set_shape) in shape.sets.iter().enumerate() {
            let set = SessionSet {
                id: self.ids.new_id(),
                set_number: j as u32 + 1,
                reps: set_shape.reps,
                weight: set_shape.weight,
                is_completed: set_shape.is_completed,
                sync_state: SyncState::LocalOnly,
            };
            self.outbox.record(Table::SessionSets, set.id.clone());
            self.report.inserted_sets.push(set.id.clone());
            exercise.sets.push(set);
        }

        exercise
    }

    fn delete_template_exercise(&mut self, exercise: WorkoutExercise) {
        // Sets go first so the server never sees a childless delete gap
        for set in exercise.sets {
            self.tombstones
                .record_deletion(Table::SetTemplates, set.id.clone(), set.sync_state, self.ids);
            self.outbox.discard(Table::SetTemplates, &set.id);
            self.report.deleted_sets.push(set.id);
        }
        self.tombstones.record_deletion(
            Table::WorkoutExercises,
            exercise.id.clone(),
            exercise.sync_state,
            self.ids,
        );
        self.outbox.discard(Table::WorkoutExercises, &exercise.id);
        self.report.deleted_exercises.push(exercise.id);
    }

    fn delete_session_exercise(&mut self, exercise: SessionExercise) {
        for set in exercise.sets {
            self.tombstones
                .record_deletion(Table::SessionSets, set.id.clone(), set.sync_state, self.ids);
            self.outbox.discard(Table::SessionSets, &set.id);
            self.report.deleted_sets.push(set.id);
        }
        self.tombstones.record_deletion(
            Table::SessionExercises,
            exercise.id.clone(),
            exercise.sync_state,
            self.ids,
        );
        self.outbox.discard(Table::SessionExercises, &exercise.id);
        self.report.deleted_exercises.push(exercise.id);
    }
}

//! The device-local store: aggregates, lookup rows, and sync bookkeeping.
//!
//! `DeviceStore` is the single mutation surface of the engine. Every write
//! keeps three things consistent at once: the in-memory rows, the tombstone
//! log, and the outbox. Multi-row operations run inside a clone-and-restore
//! transaction so a failure never leaves a half-applied aggregate.

use crate::error::{Error, Result};
use crate::{
    build_completion_payload, format_session_time, BodyPart, EditBuffer, EntityId, Equipment,
    Exercise, ExerciseShape, IdAllocator, Outbox, ReconcileReport, Reconciler, Session,
    SessionExercise, SessionSet, SessionSyncPayload, SetShape, SyncState, Table, Timestamp,
    TombstoneLog, Workout, WorkoutShape,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// All device-local state: rows, pending deletions, pending pushes.
#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    pub(crate) ids: IdAllocator,
    pub(crate) workouts: HashMap<EntityId, Workout>,
    pub(crate) sessions: HashMap<EntityId, Session>,
    pub(crate) exercises: HashMap<EntityId, Exercise>,
    pub(crate) body_parts: HashMap<EntityId, BodyPart>,
    pub(crate) equipment: HashMap<EntityId, Equipment>,
    pub(crate) tombstones: TombstoneLog,
    pub(crate) outbox: Outbox,
}

impl DeviceStore {
    /// Create an empty store with a random id allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given id allocator.
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// Run a closure against the store, restoring the previous state if it
    /// returns an error.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let backup = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = backup;
                Err(err)
            }
        }
    }

    // Lookup rows

    /// Add a body part lookup row.
    pub fn add_body_part(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.ids.new_id();
        self.body_parts.insert(
            id.clone(),
            BodyPart {
                id: id.clone(),
                name: name.into(),
                sync_state: SyncState::LocalOnly,
            },
        );
        self.outbox.record(Table::BodyParts, id.clone());
        id
    }

    /// Add an equipment lookup row.
    pub fn add_equipment(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.ids.new_id();
        self.equipment.insert(
            id.clone(),
            Equipment {
                id: id.clone(),
                name: name.into(),
                sync_state: SyncState::LocalOnly,
            },
        );
        self.outbox.record(Table::Equipment, id.clone());
        id
    }

    /// Add an exercise definition referencing existing lookup rows.
    pub fn add_exercise(
        &mut self,
        name: impl Into<String>,
        body_part_id: impl Into<EntityId>,
        equipment_id: impl Into<EntityId>,
    ) -> Result<EntityId> {
        let body_part_id = body_part_id.into();
        let equipment_id = equipment_id.into();
        if !self.body_parts.contains_key(&body_part_id) {
            return Err(Error::RowNotFound {
                table: Table::BodyParts.as_str().to_string(),
                row_id: body_part_id,
            });
        }
        if !self.equipment.contains_key(&equipment_id) {
            return Err(Error::RowNotFound {
                table: Table::Equipment.as_str().to_string(),
                row_id: equipment_id,
            });
        }
        let id = self.ids.new_id();
        self.exercises.insert(
            id.clone(),
            Exercise {
                id: id.clone(),
                name: name.into(),
                body_part_id,
                equipment_id,
                sync_state: SyncState::LocalOnly,
            },
        );
        self.outbox.record(Table::Exercises, id.clone());
        Ok(id)
    }

    /// Delete an exercise definition.
    pub fn delete_exercise(&mut self, exercise_id: &str) -> Result<()> {
        let exercise = self
            .exercises
            .remove(exercise_id)
            .ok_or_else(|| Error::ExerciseNotFound(exercise_id.to_string()))?;
        self.tombstones.record_deletion(
            Table::Exercises,
            exercise.id.clone(),
            exercise.sync_state,
            &self.ids,
        );
        self.outbox.discard(Table::Exercises, &exercise.id);
        Ok(())
    }

    // Accessors

    /// Look up a workout by id.
    pub fn workout(&self, id: &str) -> Option<&Workout> {
        self.workouts.get(id)
    }

    /// Look up a session by id.
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Look up an exercise definition by id.
    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    /// All workouts, in no particular order.
    pub fn workouts(&self) -> impl Iterator<Item = &Workout> {
        self.workouts.values()
    }

    /// All sessions, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// The pending-deletion log.
    pub fn tombstones(&self) -> &TombstoneLog {
        &self.tombstones
    }

    /// The pending-push queue.
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    // Workout aggregates

    /// Create or reconcile a workout aggregate to the target shape.
    ///
    /// Validates exercise references up front; a shape carrying a row id
    /// must name a persisted workout.
    pub fn upsert_workout(&mut self, shape: &WorkoutShape, now: Timestamp) -> Result<EntityId> {
        self.validate_shape_refs(&shape.exercises)?;

        match &shape.id {
            Some(id) => {
                if !self.workouts.contains_key(id) {
                    return Err(Error::WorkoutNotFound(id.clone()));
                }
                let id = id.clone();
                self.transaction(|store| {
                    let workout = store
                        .workouts
                        .get_mut(&id)
                        .ok_or_else(|| Error::WorkoutNotFound(id.clone()))?;
                    Reconciler::new(&store.ids, &mut store.tombstones, &mut store.outbox)
                        .reconcile_workout(workout, shape);
                    Ok(())
                })?;
                Ok(id)
            }
            None => {
                let id = self.ids.new_id();
                let mut workout = Workout::new(id.clone(), shape.name.clone(), now);
                Reconciler::new(&self.ids, &mut self.tombstones, &mut self.outbox)
                    .reconcile_workout(&mut workout, shape);
                self.outbox.record(Table::Workouts, id.clone());
                self.workouts.insert(id.clone(), workout);
                Ok(id)
            }
        }
    }

    /// Delete a workout aggregate, children first.
    ///
    /// Sessions started from the workout are detached, not deleted; their
    /// history survives without a template.
    pub fn delete_workout(&mut self, workout_id: &str) -> Result<()> {
        let workout = self
            .workouts
            .remove(workout_id)
            .ok_or_else(|| Error::WorkoutNotFound(workout_id.to_string()))?;

        for exercise in &workout.exercises {
            for set in &exercise.sets {
                self.tombstones.record_deletion(
                    Table::SetTemplates,
                    set.id.clone(),
                    set.sync_state,
                    &self.ids,
                );
                self.outbox.discard(Table::SetTemplates, &set.id);
            }
            self.tombstones.record_deletion(
                Table::WorkoutExercises,
                exercise.id.clone(),
                exercise.sync_state,
                &self.ids,
            );
            self.outbox.discard(Table::WorkoutExercises, &exercise.id);
        }
        self.tombstones.record_deletion(
            Table::Workouts,
            workout.id.clone(),
            workout.sync_state,
            &self.ids,
        );
        self.outbox.discard(Table::Workouts, &workout.id);

        for session in self.sessions.values_mut() {
            if session.workout_id.as_deref() == Some(workout_id) {
                session.workout_id = None;
                if session.sync_state.is_synced() {
                    self.outbox.record(Table::Sessions, session.id.clone());
                }
            }
        }
        Ok(())
    }

    fn validate_shape_refs(&self, exercises: &[ExerciseShape]) -> Result<()> {
        let mut seen = HashSet::new();
        for shape in exercises {
            if !seen.insert(shape.exercise_id.as_str()) {
                return Err(Error::DuplicateExerciseRef(shape.exercise_id.clone()));
            }
            if !self.exercises.contains_key(&shape.exercise_id) {
                return Err(Error::ExerciseNotFound(shape.exercise_id.clone()));
            }
        }
        Ok(())
    }

    // Sessions

    /// Start a session from a workout template.
    ///
    /// Every copied row gets a fresh id and starts `LocalOnly`; actual
    /// reps/weight are seeded from the targets. Nothing is queued for push
    /// until the session is finished.
    pub fn start_session(
        &mut self,
        workout_id: &str,
        name: impl Into<String>,
        now: Timestamp,
    ) -> Result<EntityId> {
        let workout = self
            .workouts
            .get(workout_id)
            .ok_or_else(|| Error::WorkoutNotFound(workout_id.to_string()))?;

        let mut session = Session::new(self.ids.new_id(), name, now);
        session.workout_id = Some(workout.id.clone());
        session.is_from_default_workout = workout.is_default_workout;
        session.exercises = workout
            .exercises
            .iter()
            .map(|exercise| SessionExercise {
                id: self.ids.new_id(),
                exercise_id: exercise.exercise_id.clone(),
                order: exercise.order,
                sync_state: SyncState::LocalOnly,
                sets: exercise
                    .sets
                    .iter()
                    .map(|set| SessionSet {
                        id: self.ids.new_id(),
                        set_number: set.set_number,
                        reps: set.target_reps,
                        weight: set.target_weight,
                        is_completed: false,
                        sync_state: SyncState::LocalOnly,
                    })
                    .collect(),
            })
            .collect();
        session.recompute_counts();

        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    /// Add an exercise to an in-progress session, at the end of the list.
    pub fn add_session_exercise(
        &mut self,
        session_id: &str,
        exercise_id: &str,
    ) -> Result<EntityId> {
        if !self.exercises.contains_key(exercise_id) {
            return Err(Error::ExerciseNotFound(exercise_id.to_string()));
        }
        let new_id = self.ids.new_id();
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if session
            .exercises
            .iter()
            .any(|e| e.exercise_id == exercise_id)
        {
            return Err(Error::DuplicateExerciseRef(exercise_id.to_string()));
        }
        let order = session.exercises.len() as u32 + 1;
        session.exercises.push(SessionExercise {
            id: new_id.clone(),
            exercise_id: exercise_id.to_string(),
            order,
            sync_state: SyncState::LocalOnly,
            sets: Vec::new(),
        });
        session.recompute_counts();
        Ok(new_id)
    }

    /// Add a set to a session exercise, seeded from the previous set.
    pub fn add_session_set(
        &mut self,
        session_id: &str,
        session_exercise_id: &str,
    ) -> Result<EntityId> {
        let new_id = self.ids.new_id();
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let exercise =
            session
                .exercise_mut(session_exercise_id)
                .ok_or_else(|| Error::RowNotFound {
                    table: Table::SessionExercises.as_str().to_string(),
                    row_id: session_exercise_id.to_string(),
                })?;
        let (reps, weight) = exercise
            .sets
            .last()
            .map(|s| (s.reps, s.weight))
            .unwrap_or((0, 0.0));
        let set_number = exercise.sets.len() as u32 + 1;
        exercise.sets.push(SessionSet {
            id: new_id.clone(),
            set_number,
            reps,
            weight,
            is_completed: false,
            sync_state: SyncState::LocalOnly,
        });
        session.recompute_counts();
        Ok(new_id)
    }

    /// Overwrite the recorded reps/weight of a session set.
    pub fn update_session_set(
        &mut self,
        session_id: &str,
        set_id: &str,
        reps: u32,
        weight: f64,
    ) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let set = session.set_mut(set_id).ok_or_else(|| Error::RowNotFound {
            table: Table::SessionSets.as_str().to_string(),
            row_id: set_id.to_string(),
        })?;
        set.reps = reps;
        set.weight = weight;
        Ok(())
    }

    /// Toggle the completion flag of a session set.
    pub fn set_completed(
        &mut self,
        session_id: &str,
        set_id: &str,
        is_completed: bool,
    ) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let set = session.set_mut(set_id).ok_or_else(|| Error::RowNotFound {
            table: Table::SessionSets.as_str().to_string(),
            row_id: set_id.to_string(),
        })?;
        set.is_completed = is_completed;
        Ok(())
    }

    /// Remove one set from an in-progress session.
    pub fn remove_session_set(&mut self, session_id: &str, set_id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let mut removed = None;
        for exercise in &mut session.exercises {
            if let Some(pos) = exercise.sets.iter().position(|s| s.id == set_id) {
                removed = Some(exercise.sets.remove(pos));
                break;
            }
        }
        let set = removed.ok_or_else(|| Error::RowNotFound {
            table: Table::SessionSets.as_str().to_string(),
            row_id: set_id.to_string(),
        })?;
        self.tombstones
            .record_deletion(Table::SessionSets, set.id.clone(), set.sync_state, &self.ids);
        self.outbox.discard(Table::SessionSets, &set.id);
        session.renumber();
        session.recompute_counts();
        Ok(())
    }

    /// Remove one exercise (and its sets) from an in-progress session.
    pub fn remove_session_exercise(
        &mut self,
        session_id: &str,
        session_exercise_id: &str,
    ) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let pos = session
            .exercises
            .iter()
            .position(|e| e.id == session_exercise_id)
            .ok_or_else(|| Error::RowNotFound {
                table: Table::SessionExercises.as_str().to_string(),
                row_id: session_exercise_id.to_string(),
            })?;
        let exercise = session.exercises.remove(pos);
        for set in &exercise.sets {
            self.tombstones
                .record_deletion(Table::SessionSets, set.id.clone(), set.sync_state, &self.ids);
            self.outbox.discard(Table::SessionSets, &set.id);
        }
        self.tombstones.record_deletion(
            Table::SessionExercises,
            exercise.id.clone(),
            exercise.sync_state,
            &self.ids,
        );
        self.outbox.discard(Table::SessionExercises, &exercise.id);
        session.renumber();
        session.recompute_counts();
        Ok(())
    }

    /// Delete a whole session, cascading through its exercises and sets.
    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        let session = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        for exercise in &session.exercises {
            for set in &exercise.sets {
                self.tombstones.record_deletion(
                    Table::SessionSets,
                    set.id.clone(),
                    set.sync_state,
                    &self.ids,
                );
                self.outbox.discard(Table::SessionSets, &set.id);
            }
            self.tombstones.record_deletion(
                Table::SessionExercises,
                exercise.id.clone(),
                exercise.sync_state,
                &self.ids,
            );
            self.outbox.discard(Table::SessionExercises, &exercise.id);
        }
        self.tombstones.record_deletion(
            Table::Sessions,
            session.id.clone(),
            session.sync_state,
            &self.ids,
        );
        self.outbox.discard(Table::Sessions, &session.id);
        Ok(())
    }

    /// Complete a session: build the wire payload, then persist only the
    /// performed work.
    ///
    /// Exercises without a completed set and uncompleted sets are dropped
    /// (tombstoned when the server knew them), pending edits are applied,
    /// numbering and counters are restored, and the surviving rows plus the
    /// session itself are queued for push.
    pub fn finish_session(
        &mut self,
        session_id: &str,
        edits: &EditBuffer,
        completed_at: Timestamp,
    ) -> Result<SessionSyncPayload> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if session.completed_at.is_some() {
            return Err(Error::SessionAlreadyCompleted(session_id.to_string()));
        }
        let payload = build_completion_payload(session, edits, completed_at);

        let session_id = session_id.to_string();
        self.transaction(|store| {
            let session = store
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;

            let exercises = std::mem::take(&mut session.exercises);
            let mut survivors = Vec::with_capacity(exercises.len());
            for mut exercise in exercises {
                if !exercise.has_completed_set() {
                    for set in &exercise.sets {
                        store.tombstones.record_deletion(
                            Table::SessionSets,
                            set.id.clone(),
                            set.sync_state,
                            &store.ids,
                        );
                        store.outbox.discard(Table::SessionSets, &set.id);
                    }
                    store.tombstones.record_deletion(
                        Table::SessionExercises,
                        exercise.id.clone(),
                        exercise.sync_state,
                        &store.ids,
                    );
                    store.outbox.discard(Table::SessionExercises, &exercise.id);
                    continue;
                }
                let sets = std::mem::take(&mut exercise.sets);
                for set in sets {
                    if set.is_completed {
                        exercise.sets.push(set);
                    } else {
                        store.tombstones.record_deletion(
                            Table::SessionSets,
                            set.id.clone(),
                            set.sync_state,
                            &store.ids,
                        );
                        store.outbox.discard(Table::SessionSets, &set.id);
                    }
                }
                survivors.push(exercise);
            }
            session.exercises = survivors;

            for exercise in &mut session.exercises {
                for set in &mut exercise.sets {
                    if let Some(edit) = edits.get(&set.id) {
                        set.reps = edit.reps;
                        set.weight = edit.weight;
                    }
                }
            }

            session.renumber();
            session.recompute_counts();
            session.completed_at = Some(completed_at);
            session.session_time = Some(format_session_time(
                completed_at.saturating_sub(session.created_at),
            ));

            store.outbox.record(Table::Sessions, session.id.clone());
            for exercise in &session.exercises {
                store
                    .outbox
                    .record(Table::SessionExercises, exercise.id.clone());
                for set in &exercise.sets {
                    store.outbox.record(Table::SessionSets, set.id.clone());
                }
            }
            Ok(())
        })?;

        Ok(payload)
    }

    /// Write a finished session's structure back into its source workout.
    ///
    /// Allowed at most once per session.
    pub fn update_workout_from_session(
        &mut self,
        session_id: &str,
        now: Timestamp,
    ) -> Result<ReconcileReport> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if session.updated_workout_at.is_some() {
            return Err(Error::WorkoutAlreadyUpdated(session_id.to_string()));
        }
        let workout_id = session
            .workout_id
            .clone()
            .ok_or_else(|| Error::SessionNotLinked(session_id.to_string()))?;
        let workout = self
            .workouts
            .get(&workout_id)
            .ok_or_else(|| Error::WorkoutNotFound(workout_id.clone()))?;
        let shape = session_as_workout_shape(session, workout.name.clone());

        let session_id = session_id.to_string();
        self.transaction(|store| {
            let workout = store
                .workouts
                .get_mut(&workout_id)
                .ok_or_else(|| Error::WorkoutNotFound(workout_id.clone()))?;
            let report = Reconciler::new(&store.ids, &mut store.tombstones, &mut store.outbox)
                .reconcile_workout(workout, &shape);
            let session = store
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;
            session.updated_workout_at = Some(now);
            if session.sync_state.is_synced() {
                store.outbox.record(Table::Sessions, session.id.clone());
            }
            Ok(report)
        })
    }

    /// Save a finished session as a brand-new workout template.
    ///
    /// Allowed at most once per session.
    pub fn create_workout_from_session(
        &mut self,
        session_id: &str,
        name: impl Into<String>,
        now: Timestamp,
    ) -> Result<EntityId> {
        let name = name.into();
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        if session.derived_workout_id.is_some() {
            return Err(Error::DerivedWorkoutExists(session_id.to_string()));
        }
        let shape = session_as_workout_shape(session, name.clone());

        let workout_id = self.ids.new_id();
        let mut workout = Workout::new(workout_id.clone(), name, now);
        Reconciler::new(&self.ids, &mut self.tombstones, &mut self.outbox)
            .reconcile_workout(&mut workout, &shape);
        self.outbox.record(Table::Workouts, workout_id.clone());
        self.workouts.insert(workout_id.clone(), workout);

        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        session.derived_workout_id = Some(workout_id.clone());
        if session.sync_state.is_synced() {
            self.outbox.record(Table::Sessions, session.id.clone());
        }
        Ok(workout_id)
    }

    // Sync surface

    /// Pending deleted-row ids for one table, oldest first.
    pub fn pending_tombstones(&self, table: Table) -> Vec<EntityId> {
        self.tombstones.pending_for(table)
    }

    /// Drop tombstones the server has acknowledged.
    pub fn clear_tombstones(&mut self, table: Table, row_ids: &[EntityId]) {
        self.tombstones.clear(table, row_ids);
    }

    /// Wire-shaped rows awaiting push for one table, oldest first.
    pub fn unsynced_rows(&self, table: Table) -> Result<Vec<Value>> {
        self.outbox
            .pending_for(table)
            .iter()
            .map(|id| self.wire_row(table, id))
            .collect()
    }

    /// Record that the server acknowledged a batch of pushed rows.
    ///
    /// An acknowledged row that no longer exists locally was deleted while
    /// its push was in flight; the server now holds a copy, so a tombstone
    /// is recorded to remove it on the next cycle.
    pub fn mark_synced(&mut self, table: Table, row_ids: &[EntityId]) {
        for row_id in row_ids {
            if !self.flip_synced(table, row_id) {
                self.tombstones
                    .record_deletion(table, row_id.clone(), SyncState::Synced, &self.ids);
            }
        }
        self.outbox.acknowledge(table, row_ids);
    }

    fn flip_synced(&mut self, table: Table, row_id: &str) -> bool {
        match table {
            Table::BodyParts => match self.body_parts.get_mut(row_id) {
                Some(row) => {
                    row.sync_state = SyncState::Synced;
                    true
                }
                None => false,
            },
            Table::Equipment => match self.equipment.get_mut(row_id) {
                Some(row) => {
                    row.sync_state = SyncState::Synced;
                    true
                }
                None => false,
            },
            Table::Exercises => match self.exercises.get_mut(row_id) {
                Some(row) => {
                    row.sync_state = SyncState::Synced;
                    true
                }
                None => false,
            },
            Table::Workouts => match self.workouts.get_mut(row_id) {
                Some(row) => {
                    row.sync_state = SyncState::Synced;
                    true
                }
                None => false,
            },
            Table::WorkoutExercises => {
                for workout in self.workouts.values_mut() {
                    if let Some(exercise) = workout.exercise_mut(row_id) {
                        exercise.sync_state = SyncState::Synced;
                        return true;
                    }
                }
                false
            }
            Table::SetTemplates => {
                for workout in self.workouts.values_mut() {
                    for exercise in &mut workout.exercises {
                        if let Some(set) = exercise.sets.iter_mut().find(|s| s.id == row_id) {
                            set.sync_state = SyncState::Synced;
                            return true;
                        }
                    }
                }
                false
            }
            Table::Sessions => match self.sessions.get_mut(row_id) {
                Some(row) => {
                    row.sync_state = SyncState::Synced;
                    true
                }
                None => false,
            },
            Table::SessionExercises => {
                for session in self.sessions.values_mut() {
                    if let Some(exercise) = session.exercise_mut(row_id) {
                        exercise.sync_state = SyncState::Synced;
                        return true;
                    }
                }
                false
            }
            Table::SessionSets => {
                for session in self.sessions.values_mut() {
                    for exercise in &mut session.exercises {
                        if let Some(set) = exercise.sets.iter_mut().find(|s| s.id == row_id) {
                            set.sync_state = SyncState::Synced;
                            return true;
                        }
                    }
                }
                false
            }
        }
    }

    fn wire_row(&self, table: Table, row_id: &str) -> Result<Value> {
        let not_found = || Error::RowNotFound {
            table: table.as_str().to_string(),
            row_id: row_id.to_string(),
        };
        let row = match table {
            Table::BodyParts => {
                let row = self.body_parts.get(row_id).ok_or_else(not_found)?;
                json!({ "id": row.id, "name": row.name })
            }
            Table::Equipment => {
                let row = self.equipment.get(row_id).ok_or_else(not_found)?;
                json!({ "id": row.id, "name": row.name })
            }
            Table::Exercises => {
                let row = self.exercises.get(row_id).ok_or_else(not_found)?;
                json!({
                    "id": row.id,
                    "name": row.name,
                    "bodyPartId": row.body_part_id,
                    "equipmentId": row.equipment_id,
                })
            }
            Table::Workouts => {
                let row = self.workouts.get(row_id).ok_or_else(not_found)?;
                json!({
                    "id": row.id,
                    "name": row.name,
                    "isDefaultWorkout": row.is_default_workout,
                    "createdAt": row.created_at,
                    "exerciseCount": row.exercise_count,
                    "setCount": row.set_count,
                })
            }
            Table::WorkoutExercises => self
                .workouts
                .values()
                .find_map(|workout| {
                    workout.exercise(row_id).map(|e| {
                        json!({
                            "id": e.id,
                            "workoutId": workout.id,
                            "exerciseId": e.exercise_id,
                            "order": e.order,
                        })
                    })
                })
                .ok_or_else(not_found)?,
            Table::SetTemplates => self
                .workouts
                .values()
                .flat_map(|w| &w.exercises)
                .find_map(|exercise| {
                    exercise.sets.iter().find(|s| s.id == row_id).map(|s| {
                        json!({
                            "id": s.id,
                            "workoutExerciseId": exercise.id,
                            "setNumber": s.set_number,
                            "targetReps": s.target_reps,
                            "targetWeight": s.target_weight,
                        })
                    })
                })
                .ok_or_else(not_found)?,
            Table::Sessions => {
                let row = self.sessions.get(row_id).ok_or_else(not_found)?;
                json!({
                    "id": row.id,
                    "workoutId": row.workout_id,
                    "name": row.name,
                    "createdAt": row.created_at,
                    "completedAt": row.completed_at,
                    "sessionTime": row.session_time,
                    "isFromDefaultWorkout": row.is_from_default_workout,
                    "exerciseCount": row.exercise_count,
                    "setCount": row.set_count,
                })
            }
            Table::SessionExercises => self
                .sessions
                .values()
                .find_map(|session| {
                    session.exercise(row_id).map(|e| {
                        json!({
                            "id": e.id,
                            "sessionId": session.id,
                            "exerciseId": e.exercise_id,
                            "order": e.order,
                        })
                    })
                })
                .ok_or_else(not_found)?,
            // The completion flag is client-only and never leaves the device
            Table::SessionSets => self
                .sessions
                .values()
                .flat_map(|s| &s.exercises)
                .find_map(|exercise| {
                    exercise.sets.iter().find(|s| s.id == row_id).map(|s| {
                        json!({
                            "id": s.id,
                            "sessionExerciseId": exercise.id,
                            "setNumber": s.set_number,
                            "reps": s.reps,
                            "weight": s.weight,
                        })
                    })
                })
                .ok_or_else(not_found)?,
        };
        Ok(row)
    }
}

/// Project a session's performed structure into a workout target shape.
///
/// Exercises are matched back by reference, so a workout exercise for the
/// same movement keeps its identity; sets are replaced wholesale because
/// session sets and template sets never share ids.
pub fn session_as_workout_shape(session: &Session, name: impl Into<String>) -> WorkoutShape {
    WorkoutShape::new(
        name,
        session
            .exercises
            .iter()
            .map(|exercise| {
                ExerciseShape::new(
                    exercise.exercise_id.clone(),
                    exercise
                        .sets
                        .iter()
                        .map(|set| SetShape::new(set.reps, set.weight))
                        .collect(),
                )
            })
            .collect(),
    )
}

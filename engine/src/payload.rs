//! Session-completion payload building.
//!
//! Converts an in-progress session (including exercises and sets added
//! mid-session) into the three-way diff contract the server's session-update
//! operation expects. Pure: input is the in-memory session plus an optional
//! edit buffer overriding reps/weight per set, output is the wire payload.
//!
//! Only performed work is recorded. An uncompleted set is discarded on save;
//! an exercise with no completed sets at all is removed from the synced
//! session, or dropped entirely if the server never saw it.

use crate::{EntityId, Session, SessionSet, SyncState, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user edit overriding the recorded reps/weight of one set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEdit {
    pub reps: u32,
    pub weight: f64,
}

/// Pending edits keyed by set id, supplied by the completion screen.
pub type EditBuffer = HashMap<EntityId, SetEdit>;

/// One set on the wire, inside an add or update list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPayload {
    pub id: EntityId,
    /// 1-based, dense within the owning exercise on the wire
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
}

/// An exercise the server has never seen, with its completed sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAdd {
    pub id: EntityId,
    pub exercise_id: EntityId,
    /// 1-based, dense across surviving exercises on the wire
    pub order: u32,
    pub session_sets: Vec<SetPayload>,
}

/// A server-known exercise updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseUpdate {
    pub id: EntityId,
    pub exercise_id: EntityId,
    pub order: u32,
    /// Completed sets the server already knows
    pub sets_update: Vec<SetPayload>,
    /// Completed sets recorded mid-session, new to the server
    pub sets_add: Vec<SetPayload>,
}

/// The wire contract for completing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSyncPayload {
    pub session_id: EntityId,
    pub workout_id: Option<EntityId>,
    pub name: String,
    pub created_at: Timestamp,
    pub completed_at: Timestamp,
    pub exercises_add: Vec<ExerciseAdd>,
    pub exercises_update: Vec<ExerciseUpdate>,
    /// Server-known exercises with no completed sets, removed on save
    pub exercises_remove: Vec<EntityId>,
    /// Server-known sets discarded on save
    pub sets_remove: Vec<EntityId>,
}

impl SessionSyncPayload {
    /// Check whether the payload carries any structural change.
    pub fn is_empty(&self) -> bool {
        self.exercises_add.is_empty()
            && self.exercises_update.is_empty()
            && self.exercises_remove.is_empty()
            && self.sets_remove.is_empty()
    }
}

/// Build the completion payload for a session.
///
/// Classification, per exercise:
/// - never synced, at least one completed set: `exercises_add`
/// - never synced, no completed set: dropped entirely
/// - synced, at least one completed set: `exercises_update`; its completed
///   synced sets go to `sets_update`, completed local-only sets to
///   `sets_add`, uncompleted synced sets to the global `sets_remove`
/// - synced, no completed set: `exercises_remove`, all its synced set ids
///   into `sets_remove` (local-only sets need no entry)
pub fn build_completion_payload(
    session: &Session,
    edits: &EditBuffer,
    completed_at: Timestamp,
) -> SessionSyncPayload {
    let mut payload = SessionSyncPayload {
        session_id: session.id.clone(),
        workout_id: session.workout_id.clone(),
        name: session.name.clone(),
        created_at: session.created_at,
        completed_at,
        exercises_add: Vec::new(),
        exercises_update: Vec::new(),
        exercises_remove: Vec::new(),
        sets_remove: Vec::new(),
    };

    let mut next_order = 0u32;

    for exercise in &session.exercises {
        let has_completed = exercise.has_completed_set();

        match exercise.sync_state {
            SyncState::LocalOnly => {
                if !has_completed {
                    // Added but never used, no trace on the wire
                    continue;
                }
                next_order += 1;
                let session_sets = exercise
                    .sets
                    .iter()
                    .filter(|s| s.is_completed)
                    .enumerate()
                    .map(|(i, s)| set_payload(s, i as u32 + 1, edits))
                    .collect();
                payload.exercises_add.push(ExerciseAdd {
                    id: exercise.id.clone(),
                    exercise_id: exercise.exercise_id.clone(),
                    order: next_order,
                    session_sets,
                });
            }
            SyncState::Synced => {
                if !has_completed {
                    payload.exercises_remove.push(exercise.id.clone());
                    for set in &exercise.sets {
                        if set.sync_state.is_synced() {
                            payload.sets_remove.push(set.id.clone());
                        }
                    }
                    continue;
                }
                next_order += 1;
                let mut update = ExerciseUpdate {
                    id: exercise.id.clone(),
                    exercise_id: exercise.exercise_id.clone(),
                    order: next_order,
                    sets_update: Vec::new(),
                    sets_add: Vec::new(),
                };
                let mut next_number = 0u32;
                for set in &exercise.sets {
                    if set.is_completed {
                        next_number += 1;
                        let entry = set_payload(set, next_number, edits);
                        match set.sync_state {
                            SyncState::Synced => update.sets_update.push(entry),
                            SyncState::LocalOnly => update.sets_add.push(entry),
                        }
                    } else if set.sync_state.is_synced() {
                        payload.sets_remove.push(set.id.clone());
                    }
                }
                payload.exercises_update.push(update);
            }
        }
    }

    payload
}

fn set_payload(set: &SessionSet, set_number: u32, edits: &EditBuffer) -> SetPayload {
    let (reps, weight) = match edits.get(&set.id) {
        Some(edit) => (edit.reps, edit.weight),
        None => (set.reps, set.weight),
    };
    SetPayload {
        id: set.id.clone(),
        set_number,
        reps,
        weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionExercise, SessionSet};

    fn set(id: &str, number: u32, completed: bool, state: SyncState) -> SessionSet {
        SessionSet {
            id: id.into(),
            set_number: number,
            reps: 10,
            weight: 50.0,
            is_completed: completed,
            sync_state: state,
        }
    }

    fn exercise(id: &str, order: u32, state: SyncState, sets: Vec<SessionSet>) -> SessionExercise {
        SessionExercise {
            id: id.into(),
            exercise_id: format!("ref-{id}"),
            order,
            sync_state: state,
            sets,
        }
    }

    fn session_with(exercises: Vec<SessionExercise>) -> Session {
        let mut session = Session::new("sess-1", "Morning", 1000);
        session.workout_id = Some("w-1".into());
        session.exercises = exercises;
        session.recompute_counts();
        session
    }

    #[test]
    fn mixed_completion_splits_update_and_remove() {
        // Server-known exercise with one completed and one abandoned set,
        // plus a brand-new exercise with one completed set
        let session = session_with(vec![
            exercise(
                "se-10",
                1,
                SyncState::Synced,
                vec![
                    set("set-1", 1, true, SyncState::Synced),
                    set("set-2", 2, false, SyncState::Synced),
                ],
            ),
            exercise(
                "se-new",
                2,
                SyncState::LocalOnly,
                vec![set("set-3", 1, true, SyncState::LocalOnly)],
            ),
        ]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        assert_eq!(payload.exercises_update.len(), 1);
        let update = &payload.exercises_update[0];
        assert_eq!(update.id, "se-10");
        assert_eq!(update.sets_update.len(), 1);
        assert_eq!(update.sets_update[0].id, "set-1");
        assert!(update.sets_add.is_empty());

        assert_eq!(payload.sets_remove, vec!["set-2"]);

        assert_eq!(payload.exercises_add.len(), 1);
        let add = &payload.exercises_add[0];
        assert_eq!(add.id, "se-new");
        assert_eq!(add.exercise_id, "ref-se-new");
        assert_eq!(add.session_sets.len(), 1);
        assert_eq!(add.session_sets[0].id, "set-3");

        assert!(payload.exercises_remove.is_empty());
    }

    #[test]
    fn exercise_with_no_completed_sets_is_removed() {
        let session = session_with(vec![exercise(
            "se-11",
            1,
            SyncState::Synced,
            vec![
                set("set-1", 1, false, SyncState::Synced),
                set("set-2", 2, false, SyncState::Synced),
                set("set-3", 3, false, SyncState::LocalOnly),
            ],
        )]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        assert_eq!(payload.exercises_remove, vec!["se-11"]);
        // Local-only sets need no removal entry, the server never saw them
        assert_eq!(payload.sets_remove, vec!["set-1", "set-2"]);
        assert!(payload.exercises_update.is_empty());
        assert!(payload.exercises_add.is_empty());
    }

    #[test]
    fn unused_new_exercise_is_dropped_entirely() {
        let session = session_with(vec![exercise(
            "se-new",
            1,
            SyncState::LocalOnly,
            vec![set("set-1", 1, false, SyncState::LocalOnly)],
        )]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        assert!(payload.is_empty());
    }

    #[test]
    fn completed_local_set_on_synced_exercise_goes_to_sets_add() {
        let session = session_with(vec![exercise(
            "se-10",
            1,
            SyncState::Synced,
            vec![
                set("set-1", 1, true, SyncState::Synced),
                set("set-2", 2, true, SyncState::LocalOnly),
            ],
        )]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        let update = &payload.exercises_update[0];
        assert_eq!(update.sets_update.len(), 1);
        assert_eq!(update.sets_add.len(), 1);
        assert_eq!(update.sets_add[0].id, "set-2");
        // Surviving sets renumber densely on the wire
        assert_eq!(update.sets_update[0].set_number, 1);
        assert_eq!(update.sets_add[0].set_number, 2);
    }

    #[test]
    fn edit_buffer_overrides_reps_and_weight() {
        let session = session_with(vec![exercise(
            "se-10",
            1,
            SyncState::Synced,
            vec![set("set-1", 1, true, SyncState::Synced)],
        )]);
        let mut edits = EditBuffer::new();
        edits.insert(
            "set-1".into(),
            SetEdit {
                reps: 12,
                weight: 62.5,
            },
        );

        let payload = build_completion_payload(&session, &edits, 5000);

        let entry = &payload.exercises_update[0].sets_update[0];
        assert_eq!(entry.reps, 12);
        assert_eq!(entry.weight, 62.5);
    }

    #[test]
    fn surviving_exercises_renumber_densely_on_the_wire() {
        // First exercise is dropped (synced, nothing completed), the two
        // survivors must still come out as order 1 and 2
        let session = session_with(vec![
            exercise(
                "se-1",
                1,
                SyncState::Synced,
                vec![set("set-1", 1, false, SyncState::Synced)],
            ),
            exercise(
                "se-2",
                2,
                SyncState::Synced,
                vec![set("set-2", 1, true, SyncState::Synced)],
            ),
            exercise(
                "se-3",
                3,
                SyncState::LocalOnly,
                vec![set("set-3", 1, true, SyncState::LocalOnly)],
            ),
        ]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        assert_eq!(payload.exercises_update[0].order, 1);
        assert_eq!(payload.exercises_add[0].order, 2);
    }

    #[test]
    fn carries_session_header_fields() {
        let session = session_with(vec![]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);

        assert_eq!(payload.session_id, "sess-1");
        assert_eq!(payload.workout_id.as_deref(), Some("w-1"));
        assert_eq!(payload.name, "Morning");
        assert_eq!(payload.created_at, 1000);
        assert_eq!(payload.completed_at, 5000);
    }

    #[test]
    fn payload_serializes_camel_case() {
        let session = session_with(vec![exercise(
            "se-10",
            1,
            SyncState::Synced,
            vec![set("set-1", 1, true, SyncState::Synced)],
        )]);

        let payload = build_completion_payload(&session, &EditBuffer::new(), 5000);
        let json = serde_json::to_value(&payload).unwrap();

        assert!(json.get("sessionId").is_some());
        assert!(json.get("exercisesUpdate").is_some());
        assert!(json.get("setsRemove").is_some());
        let update = &json["exercisesUpdate"][0];
        assert!(update.get("setsUpdate").is_some());
        assert_eq!(update["setsUpdate"][0]["setNumber"], 1);
    }
}

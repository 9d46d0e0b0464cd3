//! Performance benchmarks for liftlog-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liftlog_engine::{
    build_completion_payload, DeviceSnapshot, DeviceStore, EditBuffer, EntityId, ExerciseShape,
    IdAllocator, SetShape, WorkoutShape,
};

fn store_with_exercises(count: usize) -> (DeviceStore, Vec<EntityId>) {
    let mut store = DeviceStore::with_allocator(IdAllocator::sequential("bench"));
    let body_part = store.add_body_part("Chest");
    let equipment = store.add_equipment("Barbell");
    let ids = (0..count)
        .map(|i| {
            store
                .add_exercise(
                    format!("Exercise {i}"),
                    body_part.clone(),
                    equipment.clone(),
                )
                .unwrap()
        })
        .collect();
    (store, ids)
}

fn shape_for(exercise_ids: &[EntityId], sets_per_exercise: usize) -> WorkoutShape {
    WorkoutShape::new(
        "Bench Workout",
        exercise_ids
            .iter()
            .map(|id| {
                ExerciseShape::new(
                    id.clone(),
                    (0..sets_per_exercise)
                        .map(|i| SetShape::new(8, 60.0 + i as f64))
                        .collect(),
                )
            })
            .collect(),
    )
}

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    group.bench_function("upsert_workout", |b| {
        let (store, ids) = store_with_exercises(10);
        let shape = shape_for(&ids, 5);

        b.iter(|| {
            let mut store = store.clone();
            store.upsert_workout(black_box(&shape), 1_000).unwrap()
        })
    });

    group.bench_function("start_session", |b| {
        let (mut store, ids) = store_with_exercises(10);
        let shape = shape_for(&ids, 5);
        let workout_id = store.upsert_workout(&shape, 1_000).unwrap();

        b.iter(|| {
            let mut store = store.clone();
            store
                .start_session(black_box(&workout_id), "Morning", 2_000)
                .unwrap()
        })
    });

    group.bench_function("finish_session", |b| {
        let (mut store, ids) = store_with_exercises(10);
        let shape = shape_for(&ids, 5);
        let workout_id = store.upsert_workout(&shape, 1_000).unwrap();
        let session_id = store.start_session(&workout_id, "Morning", 2_000).unwrap();
        let set_ids: Vec<EntityId> = store
            .session(&session_id)
            .unwrap()
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter().map(|s| s.id.clone()))
            .collect();
        for set_id in &set_ids {
            store.set_completed(&session_id, set_id, true).unwrap();
        }
        let edits = EditBuffer::new();

        b.iter(|| {
            let mut store = store.clone();
            store
                .finish_session(black_box(&session_id), &edits, 62_000)
                .unwrap()
        })
    });

    group.finish();
}

fn bench_reconciliation(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciliation");

    for size in [10usize, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("reconcile_workout", size),
            size,
            |b, &size| {
                let (mut store, ids) = store_with_exercises(size);
                let workout_id = store.upsert_workout(&shape_for(&ids, 2), 1_000).unwrap();

                // reversed order with changed targets forces updates everywhere
                let mut reversed = ids.clone();
                reversed.reverse();
                let mut target = shape_for(&reversed, 3);
                target.id = Some(workout_id);

                b.iter(|| {
                    let mut store = store.clone();
                    store.upsert_workout(black_box(&target), 2_000).unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    for size in [5usize, 20, 50].iter() {
        group.bench_with_input(
            BenchmarkId::new("build_completion", size),
            size,
            |b, &size| {
                let (mut store, ids) = store_with_exercises(size);
                let workout_id = store.upsert_workout(&shape_for(&ids, 5), 1_000).unwrap();
                let session_id = store.start_session(&workout_id, "Morning", 2_000).unwrap();
                let set_ids: Vec<EntityId> = store
                    .session(&session_id)
                    .unwrap()
                    .exercises
                    .iter()
                    .flat_map(|e| e.sets.iter().map(|s| s.id.clone()))
                    .collect();
                for set_id in &set_ids {
                    store.set_completed(&session_id, set_id, true).unwrap();
                }
                let session = store.session(&session_id).unwrap().clone();
                let edits = EditBuffer::new();

                b.iter(|| build_completion_payload(black_box(&session), &edits, 62_000))
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::new("capture", size), size, |b, &size| {
            let (mut store, ids) = store_with_exercises(1);
            for i in 0..size {
                let mut shape = shape_for(&ids, 3);
                shape.name = format!("Workout {i}");
                store.upsert_workout(&shape, 1_000 + i as u64).unwrap();
            }

            b.iter(|| DeviceSnapshot::capture(black_box(&store)))
        });

        group.bench_with_input(BenchmarkId::new("restore", size), size, |b, &size| {
            let (mut store, ids) = store_with_exercises(1);
            for i in 0..size {
                let mut shape = shape_for(&ids, 3);
                shape.name = format!("Workout {i}");
                store.upsert_workout(&shape, 1_000 + i as u64).unwrap();
            }
            let json = DeviceSnapshot::capture(&store).to_json().unwrap();

            b.iter(|| {
                DeviceSnapshot::from_json(black_box(&json))
                    .unwrap()
                    .restore()
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("payload_to_json", |b| {
        let (mut store, ids) = store_with_exercises(10);
        let workout_id = store.upsert_workout(&shape_for(&ids, 5), 1_000).unwrap();
        let session_id = store.start_session(&workout_id, "Morning", 2_000).unwrap();
        let set_ids: Vec<EntityId> = store
            .session(&session_id)
            .unwrap()
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter().map(|s| s.id.clone()))
            .collect();
        for set_id in &set_ids {
            store.set_completed(&session_id, set_id, true).unwrap();
        }
        let session = store.session(&session_id).unwrap().clone();
        let payload = build_completion_payload(&session, &EditBuffer::new(), 62_000);

        b.iter(|| serde_json::to_string(black_box(&payload)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_store_operations,
    bench_reconciliation,
    bench_payload,
    bench_snapshot,
    bench_serialization,
);
criterion_main!(benches);

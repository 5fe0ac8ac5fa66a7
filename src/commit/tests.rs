use super::*;
use crate::codec::parse_gps;
use crate::db::{PointStore, SqliteStore};
use crate::test_support::{FailOn, FlakyStore, seed_points};
use std::sync::Arc;
use std::thread;

fn centroids() -> Vec<Vec<f64>> {
    vec![vec![1.0, 2.0, 3.0], vec![-4.5, 0.25, 9.0]]
}

fn request<'a>(centroids: &'a [Vec<f64>], inputs: &'a [PointId]) -> CommitRequest<'a> {
    CommitRequest {
        user_id: 1,
        group_name: "default",
        k: centroids.len(),
        restarts: 10,
        max_iterations: 100,
        centroids,
        inputs,
    }
}

#[test]
fn test_commit_writes_result_and_centroids() {
    let store = SqliteStore::new_in_memory().unwrap();
    let inputs = seed_points(&store, 1, "default", 5);
    let centroids = centroids();

    let outcome = ResultCommitter::new(true)
        .commit(&store, &request(&centroids, &inputs))
        .unwrap();

    assert_eq!(store.latest_result_id(1).unwrap(), Some(outcome.result_id));
    assert_eq!(
        outcome.labels[0],
        format!(
            "GPS:R_{}_Cluster_0:1.0000000000:2.0000000000:3.0000000000:",
            outcome.result_id
        )
    );

    let result = &store.list_results(1).unwrap()[0];
    assert!(result.complete);
    assert_eq!(result.k, 2);
    assert_eq!(result.input_count, 5);
    assert_eq!(result.restarts, 10);

    // 5 consumed inputs + 2 centroid points, none active any more
    let stamped = store.get_points_for_result(outcome.result_id).unwrap();
    assert_eq!(stamped.len(), 7);
    assert!(stamped.iter().all(|p| !p.included));
    assert!(store.load_active_points(1, "default").unwrap().is_empty());

    let centroid_points: Vec<_> = stamped
        .iter()
        .filter(|p| p.label.starts_with("GPS:R_"))
        .collect();
    assert_eq!(centroid_points[1].coords, vec![-4.5, 0.25, 9.0]);
    let parsed = parse_gps(&centroid_points[1].label).unwrap();
    assert_eq!(parsed.coords, vec![-4.5, 0.25, 9.0]);
}

#[test]
fn test_commit_without_consuming_inputs() {
    let store = SqliteStore::new_in_memory().unwrap();
    let inputs = seed_points(&store, 1, "default", 3);
    let centroids = centroids();

    let outcome = ResultCommitter::new(false)
        .commit(&store, &request(&centroids, &inputs))
        .unwrap();

    assert_eq!(store.load_active_points(1, "default").unwrap().len(), 3);
    assert_eq!(store.get_points_for_result(outcome.result_id).unwrap().len(), 2);
}

#[test]
fn test_insert_failure_leaves_nothing() {
    let store = FlakyStore::new(FailOn::InsertResult);
    let inputs = store.seed_points(1, "default", 3);
    let centroids = centroids();

    let err = ResultCommitter::new(true)
        .commit(&store, &request(&centroids, &inputs))
        .unwrap_err();

    assert!(matches!(err, CommitError::InsertResult(_)));
    assert_eq!(err.result_id(), None);
    assert!(store.list_results(1).unwrap().is_empty());
    assert_eq!(store.load_active_points(1, "default").unwrap().len(), 3);
}

#[test]
fn test_partial_commit_is_not_rolled_back() {
    let store = FlakyStore::new(FailOn::PersistCentroid(1));
    let inputs = store.seed_points(1, "default", 3);
    let centroids = centroids();

    let err = ResultCommitter::new(true)
        .commit(&store, &request(&centroids, &inputs))
        .unwrap_err();

    let result_id = err.result_id().unwrap();
    assert!(matches!(err, CommitError::PersistCentroid { index: 1, .. }));

    let results = store.list_results(1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, result_id);
    assert!(!results[0].complete);
    // First centroid made it, inputs were never consumed
    assert_eq!(store.inner.get_points_for_result(result_id).unwrap().len(), 1);
    assert_eq!(store.load_active_points(1, "default").unwrap().len(), 3);
}

#[test]
fn test_exclude_failure_reports_result() {
    let store = FlakyStore::new(FailOn::Exclude);
    let inputs = store.seed_points(1, "default", 3);
    let centroids = centroids();

    let err = ResultCommitter::new(true)
        .commit(&store, &request(&centroids, &inputs))
        .unwrap_err();

    assert!(matches!(err, CommitError::ConsumeInputs { .. }));
    assert!(!store.list_results(1).unwrap()[0].complete);
}

#[test]
fn test_concurrent_commits_same_user_get_own_ids() {
    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let committer = Arc::new(ResultCommitter::new(false));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let committer = Arc::clone(&committer);
            thread::spawn(move || {
                let centroids = vec![vec![i as f64, 0.0]];
                let outcome = committer
                    .commit(store.as_ref(), &request(&centroids, &[]))
                    .unwrap();
                (i, outcome)
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let (i, outcome) = handle.join().unwrap();
        let points = store.get_points_for_result(outcome.result_id).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].coords, vec![i as f64, 0.0]);
        ids.push(outcome.result_id);
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(committer.locks().user_count(), 0);
}

#[test]
fn test_second_commit_cannot_take_consumed_inputs() {
    let store = SqliteStore::new_in_memory().unwrap();
    let inputs = seed_points(&store, 1, "default", 3);
    let committer = ResultCommitter::new(true);
    let first_centroids = vec![vec![1.0, 1.0, 1.0]];
    let second_centroids = vec![vec![2.0, 2.0, 2.0]];

    // Both runs loaded the same active points before either committed
    let first = committer
        .commit(&store, &request(&first_centroids, &inputs))
        .unwrap();
    let err = committer
        .commit(&store, &request(&second_centroids, &inputs))
        .unwrap_err();

    assert!(matches!(
        err,
        CommitError::InputsTaken {
            expected: 3,
            consumed: 0,
            ..
        }
    ));
    let second_id = err.result_id().unwrap();
    assert_ne!(second_id, first.result_id);

    // The first result keeps its inputs plus its centroid
    assert_eq!(store.get_points_for_result(first.result_id).unwrap().len(), 4);
    // The second result only owns its own centroid and stays incomplete
    assert_eq!(store.get_points_for_result(second_id).unwrap().len(), 1);
    let results = store.list_results(1).unwrap();
    assert!(results.iter().find(|r| r.id == first.result_id).unwrap().complete);
    assert!(!results.iter().find(|r| r.id == second_id).unwrap().complete);
}

#[test]
fn test_lock_released_after_commit() {
    let store = SqliteStore::new_in_memory().unwrap();
    let committer = ResultCommitter::new(false);
    let centroids = centroids();

    committer.commit(&store, &request(&centroids, &[])).unwrap();
    assert_eq!(committer.locks().user_count(), 0);
}

#[test]
fn test_lock_kept_while_another_holder_waits() {
    let locks = UserLocks::new();
    let held = locks.for_user(7);
    let other = locks.for_user(7);
    assert!(Arc::ptr_eq(&held, &other));

    drop(other);
    locks.release(7);
    assert_eq!(locks.user_count(), 1);

    drop(held);
    locks.release(7);
    assert_eq!(locks.user_count(), 0);
}

use super::*;

fn store() -> SqliteStore {
    SqliteStore::new_in_memory().unwrap()
}

fn new_result(user_id: UserId) -> NewClusterResult {
    NewClusterResult {
        user_id,
        group_name: "default".to_string(),
        k: 2,
        input_count: 5,
        restarts: 10,
        max_iterations: 100,
    }
}

#[test]
fn test_load_filters_user_group_and_included() {
    let store = store();
    store
        .persist_point(&NewPoint::active(1, "default", "A", vec![1.0, 2.0, 3.0]))
        .unwrap();
    store
        .persist_point(&NewPoint::active(1, "default", "B", vec![4.0, 5.0]))
        .unwrap();
    store
        .persist_point(&NewPoint::active(1, "mining", "C", vec![0.0, 0.0]))
        .unwrap();
    store
        .persist_point(&NewPoint::active(2, "default", "D", vec![0.0, 0.0]))
        .unwrap();
    let mut hidden = NewPoint::active(1, "default", "E", vec![9.0, 9.0]);
    hidden.included = false;
    store.persist_point(&hidden).unwrap();

    let mut points = store.load_active_points(1, "default").unwrap();
    points.sort_by(|a, b| a.label.cmp(&b.label));

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].label, "A");
    assert_eq!(points[0].coords, vec![1.0, 2.0, 3.0]);
    assert_eq!(points[1].coords, vec![4.0, 5.0]);
    assert!(points.iter().all(|p| p.included && p.result_id.is_none()));
}

#[test]
fn test_persist_rejects_bad_dimensions() {
    let store = store();
    let err = store
        .persist_point(&NewPoint::active(1, "default", "A", vec![1.0]))
        .unwrap_err();
    assert!(matches!(err, StoreError::Dimensions(1)));
}

#[test]
fn test_insert_result_returns_fresh_ids() {
    let store = store();
    let first = store.insert_result(&new_result(1)).unwrap();
    let second = store.insert_result(&new_result(1)).unwrap();
    let other = store.insert_result(&new_result(2)).unwrap();

    assert!(second > first);
    assert_eq!(store.latest_result_id(1).unwrap(), Some(second));
    assert_eq!(store.latest_result_id(2).unwrap(), Some(other));
    assert_eq!(store.latest_result_id(3).unwrap(), None);
}

#[test]
fn test_results_start_incomplete() {
    let store = store();
    let id = store.insert_result(&new_result(1)).unwrap();

    let results = store.list_results(1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id);
    assert_eq!(results[0].k, 2);
    assert_eq!(results[0].input_count, 5);
    assert!(!results[0].complete);

    store.mark_result_complete(id).unwrap();
    assert!(store.list_results(1).unwrap()[0].complete);
}

#[test]
fn test_mark_missing_result_fails() {
    let store = store();
    assert!(matches!(
        store.mark_result_complete(99),
        Err(StoreError::NotFound(99))
    ));
}

#[test]
fn test_exclude_points_stamps_result() {
    let store = store();
    let a = store
        .persist_point(&NewPoint::active(1, "default", "A", vec![1.0, 1.0]))
        .unwrap();
    let b = store
        .persist_point(&NewPoint::active(1, "default", "B", vec![2.0, 2.0]))
        .unwrap();
    let result_id = store.insert_result(&new_result(1)).unwrap();

    assert_eq!(store.exclude_points(&[a], result_id).unwrap(), 1);

    let active = store.load_active_points(1, "default").unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b);

    let consumed = store.get_points_for_result(result_id).unwrap();
    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].id, a);
    assert!(!consumed[0].included);
}

#[test]
fn test_exclude_skips_points_already_consumed() {
    let store = store();
    let a = store
        .persist_point(&NewPoint::active(1, "default", "A", vec![1.0, 1.0]))
        .unwrap();
    let b = store
        .persist_point(&NewPoint::active(1, "default", "B", vec![2.0, 2.0]))
        .unwrap();
    let first = store.insert_result(&new_result(1)).unwrap();
    let second = store.insert_result(&new_result(1)).unwrap();

    assert_eq!(store.exclude_points(&[a], first).unwrap(), 1);
    assert_eq!(store.exclude_points(&[a, b], second).unwrap(), 1);

    let owned_by_first = store.get_points_for_result(first).unwrap();
    assert_eq!(owned_by_first.len(), 1);
    assert_eq!(owned_by_first[0].id, a);
    let owned_by_second = store.get_points_for_result(second).unwrap();
    assert_eq!(owned_by_second.len(), 1);
    assert_eq!(owned_by_second[0].id, b);
}

#[test]
fn test_stats() {
    let store = store();
    store
        .persist_point(&NewPoint::active(1, "default", "A", vec![1.0, 1.0]))
        .unwrap();
    store.insert_result(&new_result(1)).unwrap();

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.point_count, 1);
    assert_eq!(stats.active_point_count, 1);
    assert_eq!(stats.result_count, 1);
}

#[test]
fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.sqlite");
    let path = path.to_str().unwrap();

    {
        let store = SqliteStore::open(path).unwrap();
        store
            .persist_point(&NewPoint::active(1, "default", "A", vec![1.0, 2.0]))
            .unwrap();
    }

    let reopened = SqliteStore::open(path).unwrap();
    assert_eq!(reopened.load_active_points(1, "default").unwrap().len(), 1);
}

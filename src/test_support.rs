//! Store doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::{
    ClusterResultRecord, NewClusterResult, NewPoint, PointId, PointStore, ResultId, SamplePoint,
    SqliteStore, StoreError, UserId,
};

/// Which store operation should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Nothing,
    Load,
    InsertResult,
    /// Fail the n-th centroid write (0-based) after a result exists
    PersistCentroid(usize),
    Exclude,
}

/// In-memory SQLite store that fails on demand and counts calls
pub struct FlakyStore {
    pub inner: SqliteStore,
    fail_on: FailOn,
    centroid_writes: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: SqliteStore::new_in_memory().unwrap(),
            fail_on,
            centroid_writes: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Seed `count` active 3D points spread over a line
    pub fn seed_points(&self, user_id: UserId, group: &str, count: usize) -> Vec<PointId> {
        seed_points(&self.inner, user_id, group, count)
    }
}

pub fn seed_points(
    store: &SqliteStore,
    user_id: UserId,
    group: &str,
    count: usize,
) -> Vec<PointId> {
    (0..count)
        .map(|i| {
            let x = (i * 37 % 101) as f64;
            let coords = vec![x, (i * 11 % 17) as f64, i as f64];
            store
                .persist_point(&NewPoint::active(user_id, group, format!("P{}", i), coords))
                .unwrap()
        })
        .collect()
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {} failure", what))
}

impl PointStore for FlakyStore {
    fn load_active_points(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> Result<Vec<SamplePoint>, StoreError> {
        if self.fail_on == FailOn::Load {
            return Err(injected("load"));
        }
        self.inner.load_active_points(user_id, group_name)
    }

    fn persist_point(&self, point: &NewPoint) -> Result<PointId, StoreError> {
        if point.result_id.is_some() {
            let n = self.centroid_writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == FailOn::PersistCentroid(n) {
                return Err(injected("persist"));
            }
        }
        self.inner.persist_point(point)
    }

    fn exclude_points(&self, ids: &[PointId], result_id: ResultId) -> Result<usize, StoreError> {
        if self.fail_on == FailOn::Exclude {
            return Err(injected("exclude"));
        }
        self.inner.exclude_points(ids, result_id)
    }

    fn insert_result(&self, result: &NewClusterResult) -> Result<ResultId, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == FailOn::InsertResult {
            return Err(injected("insert"));
        }
        self.inner.insert_result(result)
    }

    fn mark_result_complete(&self, result_id: ResultId) -> Result<(), StoreError> {
        self.inner.mark_result_complete(result_id)
    }

    fn latest_result_id(&self, user_id: UserId) -> Result<Option<ResultId>, StoreError> {
        self.inner.latest_result_id(user_id)
    }

    fn list_results(&self, user_id: UserId) -> Result<Vec<ClusterResultRecord>, StoreError> {
        self.inner.list_results(user_id)
    }
}

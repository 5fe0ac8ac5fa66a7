mod error;
mod sqlite;
mod types;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use sqlite::{SqliteStore, StoreStats};
pub use types::{
    ClusterResultRecord, NewClusterResult, NewPoint, PointId, ResultId, SamplePoint, UserId,
};

/// Keyed record store for sample points and clustering results.
///
/// Writes must be visible to subsequent reads through the same store.
pub trait PointStore: Send + Sync {
    /// Points of `user_id` in `group_name` with `included = true`, in no particular order
    fn load_active_points(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> Result<Vec<SamplePoint>, StoreError>;

    fn persist_point(&self, point: &NewPoint) -> Result<PointId, StoreError>;

    /// Flip `included` off and stamp `result_id` on every listed point that is
    /// still active. Returns how many points changed; points another result
    /// already consumed are left alone.
    fn exclude_points(&self, ids: &[PointId], result_id: ResultId) -> Result<usize, StoreError>;

    /// Insert a result and return the identifier the store assigned to it
    fn insert_result(&self, result: &NewClusterResult) -> Result<ResultId, StoreError>;

    fn mark_result_complete(&self, result_id: ResultId) -> Result<(), StoreError>;

    fn latest_result_id(&self, user_id: UserId) -> Result<Option<ResultId>, StoreError>;

    /// Results of a user, newest first
    fn list_results(&self, user_id: UserId) -> Result<Vec<ClusterResultRecord>, StoreError>;
}

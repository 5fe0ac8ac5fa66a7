mod locks;

#[cfg(test)]
mod tests;

pub use locks::UserLocks;

use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{label, render};
use crate::db::{NewClusterResult, NewPoint, PointId, PointStore, ResultId, StoreError, UserId};

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Failed to insert cluster result: {0}")]
    InsertResult(#[source] StoreError),

    #[error("Failed to persist centroid {index} of result {result_id}: {source}")]
    PersistCentroid {
        result_id: ResultId,
        index: usize,
        #[source]
        source: StoreError,
    },

    #[error("Failed to mark input points of result {result_id} as consumed: {source}")]
    ConsumeInputs {
        result_id: ResultId,
        #[source]
        source: StoreError,
    },

    #[error("Result {result_id} consumed only {consumed} of its {expected} input points, the rest belong to another result")]
    InputsTaken {
        result_id: ResultId,
        expected: usize,
        consumed: usize,
    },

    #[error("Failed to mark result {result_id} complete: {source}")]
    MarkComplete {
        result_id: ResultId,
        #[source]
        source: StoreError,
    },
}

impl CommitError {
    /// Identifier of the result row left behind, if the insert got that far
    pub fn result_id(&self) -> Option<ResultId> {
        match self {
            Self::InsertResult(_) => None,
            Self::PersistCentroid { result_id, .. }
            | Self::ConsumeInputs { result_id, .. }
            | Self::InputsTaken { result_id, .. }
            | Self::MarkComplete { result_id, .. } => Some(*result_id),
        }
    }
}

/// Everything a finished optimization contributes to a result
#[derive(Debug, Clone)]
pub struct CommitRequest<'a> {
    pub user_id: UserId,
    pub group_name: &'a str,
    pub k: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    /// Ordered centroids; the position becomes the centroid index
    pub centroids: &'a [Vec<f64>],
    /// Active points the run clustered
    pub inputs: &'a [PointId],
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub result_id: ResultId,
    /// One `GPS:R_<id>_Cluster_<i>` line per centroid, in centroid order
    pub labels: Vec<String>,
}

/// Records a clustering run and its centroid points.
///
/// Commits for the same user are serialized. Nothing is rolled back: a failure
/// after the result insert leaves the result row with `complete = false`.
#[derive(Debug)]
pub struct ResultCommitter {
    locks: UserLocks,
    consume_inputs: bool,
}

impl ResultCommitter {
    pub fn new(consume_inputs: bool) -> Self {
        Self {
            locks: UserLocks::new(),
            consume_inputs,
        }
    }

    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    pub fn commit<S: PointStore + ?Sized>(
        &self,
        store: &S,
        request: &CommitRequest<'_>,
    ) -> Result<CommitOutcome, CommitError> {
        let lock = self.locks.for_user(request.user_id);
        let outcome = {
            let _guard = locks::acquire(&lock);
            self.commit_locked(store, request)
        };
        drop(lock);
        self.locks.release(request.user_id);
        outcome
    }

    fn commit_locked<S: PointStore + ?Sized>(
        &self,
        store: &S,
        request: &CommitRequest<'_>,
    ) -> Result<CommitOutcome, CommitError> {
        let result_id = store
            .insert_result(&NewClusterResult {
                user_id: request.user_id,
                group_name: request.group_name.to_string(),
                k: request.k,
                input_count: request.inputs.len(),
                restarts: request.restarts,
                max_iterations: request.max_iterations,
            })
            .map_err(CommitError::InsertResult)?;
        debug!(result_id, "cluster result inserted");

        let mut labels = Vec::with_capacity(request.centroids.len());
        for (index, centroid) in request.centroids.iter().enumerate() {
            let line = label(result_id, index, &render(centroid));
            store
                .persist_point(&NewPoint {
                    user_id: request.user_id,
                    group_name: request.group_name.to_string(),
                    label: line.clone(),
                    coords: centroid.clone(),
                    included: false,
                    result_id: Some(result_id),
                })
                .map_err(|source| CommitError::PersistCentroid {
                    result_id,
                    index,
                    source,
                })?;
            labels.push(line);
        }

        let mut consumed = 0;
        if self.consume_inputs {
            consumed = store
                .exclude_points(request.inputs, result_id)
                .map_err(|source| CommitError::ConsumeInputs { result_id, source })?;
            // A concurrent run loaded the same points and committed first
            if consumed < request.inputs.len() {
                return Err(CommitError::InputsTaken {
                    result_id,
                    expected: request.inputs.len(),
                    consumed,
                });
            }
        }

        store
            .mark_result_complete(result_id)
            .map_err(|source| CommitError::MarkComplete { result_id, source })?;

        info!(
            result_id,
            centroids = labels.len(),
            consumed,
            "cluster result committed"
        );
        Ok(CommitOutcome { result_id, labels })
    }
}

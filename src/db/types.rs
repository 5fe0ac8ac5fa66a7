use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type PointId = i64;
pub type ResultId = i64;

/// A stored marker owned by a user and group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub id: PointId,
    pub user_id: UserId,
    pub group_name: String,
    pub label: String,
    /// Two or three dimensions
    pub coords: Vec<f64>,
    /// Eligible for clustering
    pub included: bool,
    /// Result that consumed or produced this point
    pub result_id: Option<ResultId>,
}

/// Insert payload for [`SamplePoint`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
    pub user_id: UserId,
    pub group_name: String,
    pub label: String,
    pub coords: Vec<f64>,
    pub included: bool,
    pub result_id: Option<ResultId>,
}

impl NewPoint {
    /// An active point as produced by ingestion
    pub fn active(
        user_id: UserId,
        group_name: impl Into<String>,
        label: impl Into<String>,
        coords: Vec<f64>,
    ) -> Self {
        Self {
            user_id,
            group_name: group_name.into(),
            label: label.into(),
            coords,
            included: true,
            result_id: None,
        }
    }
}

/// Metadata of one clustering run, before it has an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewClusterResult {
    pub user_id: UserId,
    pub group_name: String,
    pub k: usize,
    pub input_count: usize,
    pub restarts: usize,
    pub max_iterations: usize,
}

/// A committed clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResultRecord {
    pub id: ResultId,
    pub user_id: UserId,
    pub group_name: String,
    pub k: usize,
    pub input_count: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    /// Set once every centroid point has been written
    pub complete: bool,
    pub created_at: String,
}

use thiserror::Error;

use crate::clusterer::EngineError;
use crate::commit::CommitError;
use crate::db::{ResultId, StoreError};

pub const INSUFFICIENT_POINTS_MESSAGE: &str =
    "Not enough coordinates to cluster that many centroids";

pub const INVALID_K_MESSAGE: &str = "Centroid count must be at least 1";

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while clustering, check logs";

/// Why a run ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InsufficientPoints,
    Storage,
    InternalOptimizer,
    Commit,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("requested {requested} centroids but only {available} active points")]
    InsufficientPoints { requested: usize, available: usize },

    #[error("requested zero centroids")]
    ZeroCentroids,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("optimizer error: {0}")]
    Optimizer(#[from] EngineError),

    #[error("commit error: {0}")]
    Commit(#[from] CommitError),

    #[error("run panicked: {0}")]
    Panicked(String),
}

impl RunError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InsufficientPoints { .. } | Self::ZeroCentroids => {
                FailureKind::InsufficientPoints
            }
            Self::Storage(_) => FailureKind::Storage,
            Self::Optimizer(_) | Self::Panicked(_) => FailureKind::InternalOptimizer,
            Self::Commit(_) => FailureKind::Commit,
        }
    }

    /// Text sent back to the requester. Infeasible requests are explained,
    /// everything else points at the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InsufficientPoints { .. } => INSUFFICIENT_POINTS_MESSAGE,
            Self::ZeroCentroids => INVALID_K_MESSAGE,
            Self::Storage(_) | Self::Optimizer(_) | Self::Commit(_) | Self::Panicked(_) => {
                GENERIC_ERROR_MESSAGE
            }
        }
    }

    /// Result row a failed commit left behind
    pub fn partial_result_id(&self) -> Option<ResultId> {
        match self {
            Self::Commit(err) => err.result_id(),
            _ => None,
        }
    }
}

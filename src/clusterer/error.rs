use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("empty input")]
    EmptyInput,

    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount { requested: usize, n_items: usize },

    #[error("dimension mismatch at point {index}: expected {expected}, found {found}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("none of {restarts} restarts produced a finite partition")]
    NoValidPartition { restarts: usize },
}

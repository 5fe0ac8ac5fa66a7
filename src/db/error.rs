use thiserror::Error;

use super::types::ResultId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to {action}: {source}")]
    Sqlite {
        action: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store connection lock poisoned")]
    Poisoned,

    #[error("Points need 2 or 3 coordinates, got {0}")]
    Dimensions(usize),

    #[error("Cluster result {0} does not exist")]
    NotFound(ResultId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// `.context()`-style labelling for rusqlite results
pub(crate) trait SqlContext<T> {
    fn action(self, action: impl Into<String>) -> Result<T, StoreError>;
}

impl<T> SqlContext<T> for Result<T, rusqlite::Error> {
    fn action(self, action: impl Into<String>) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Sqlite {
            action: action.into(),
            source,
        })
    }
}

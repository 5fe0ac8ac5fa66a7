use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Independent randomized runs per request; the best-scoring one wins
pub const DEFAULT_RESTARTS: usize = 1000;

/// Refinement step cap for a single run
pub const DEFAULT_MAX_ITERATIONS: usize = 4000;

/// Text slots carried by every outbound response
pub const DEFAULT_PAGE_SIZE: usize = 4;

/// Group used when a request does not name one
pub const DEFAULT_GROUP: &str = "default";

/// Worker threads draining the request queue
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

/// Tunables for a clustering deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub restarts: usize,
    pub max_iterations: usize,
    pub page_size: usize,
    pub default_group: String,
    pub workers: usize,
    /// Mark the input points excluded once a result consumes them
    pub consume_inputs: bool,
    /// Fixed seed for reproducible runs; fresh entropy per run when unset
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            restarts: DEFAULT_RESTARTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            page_size: DEFAULT_PAGE_SIZE,
            default_group: DEFAULT_GROUP.to_string(),
            workers: DEFAULT_WORKERS,
            consume_inputs: true,
            seed: None,
        }
    }
}

impl ClusterConfig {
    /// Load and validate a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, usize); 4] = [
            ("restarts", self.restarts),
            ("max_iterations", self.max_iterations),
            ("page_size", self.page_size),
            ("workers", self.workers),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be at least 1",
                });
            }
        }
        if self.default_group.is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_group",
                message: "must not be empty",
            });
        }
        Ok(())
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

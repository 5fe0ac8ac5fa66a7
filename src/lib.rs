// Public API exports
pub mod clusterer;
pub mod codec;
pub mod commit;
pub mod config;
pub mod db;
pub mod orchestrator;
pub mod worker;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::{ClusterConfig, ConfigError};

pub use codec::{GpsMarker, Pager, ParseError, label, paginate, parse_gps, render};

pub use db::{
    ClusterResultRecord, NewPoint, PointStore, SamplePoint, SqliteStore, StoreError,
};

pub use clusterer::{EngineError, MultiStartKmeans, Partition, Partitioner, partition};

pub use commit::{CommitError, ResultCommitter};

pub use orchestrator::{
    ClusterRequest, Event, EventKind, FailureKind, Orchestrator, RunError, RunReport, RunState,
};

pub use worker::{PoolError, WorkerPool};

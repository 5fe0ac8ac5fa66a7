mod centroid;
mod distance;
mod error;
mod kmeans;
mod multi;
mod types;


pub use distance::squared_euclidean;
pub use error::EngineError;
pub use kmeans::{kmeans, validate};
pub use multi::{partition, MultiStartKmeans, Partitioner};
pub use types::Partition;

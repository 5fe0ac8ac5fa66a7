use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::clusterer::{
    error::EngineError,
    kmeans::{run, validate},
    types::Partition,
};

/// Produces `k` centroids for a point set
pub trait Partitioner: Send + Sync {
    fn partition(
        &self,
        points: &[Vec<f64>],
        k: usize,
        restarts: usize,
        max_iterations: usize,
    ) -> Result<Partition, EngineError>;
}

/// Multi-start k-means++ keeping the cheapest of `restarts` runs
#[derive(Debug, Clone, Default)]
pub struct MultiStartKmeans {
    seed: Option<u64>,
}

impl MultiStartKmeans {
    /// Fresh entropy on every call
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Same seed on every call, so identical inputs give identical partitions
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

impl Partitioner for MultiStartKmeans {
    fn partition(
        &self,
        points: &[Vec<f64>],
        k: usize,
        restarts: usize,
        max_iterations: usize,
    ) -> Result<Partition, EngineError> {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        partition(points, k, restarts, max_iterations, &mut rng)
    }
}

/// Run `restarts` independent k-means++ runs in parallel and keep the one with
/// the lowest within-cluster sum of squares. Every run draws its own seed from
/// `rng` up front, so the outcome depends only on `rng` and not on scheduling.
pub fn partition<R: Rng>(
    points: &[Vec<f64>],
    k: usize,
    restarts: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Result<Partition, EngineError> {
    validate(points, k)?;

    let restarts = restarts.max(1);
    let seeds: Vec<u64> = (0..restarts).map(|_| rng.gen::<u64>()).collect();

    let best = seeds
        .par_iter()
        .enumerate()
        .map(|(index, &seed)| {
            let mut run_rng = ChaCha8Rng::seed_from_u64(seed);
            (index, run(points, k, max_iterations, &mut run_rng))
        })
        .filter(|(_, candidate)| candidate.cost.is_finite())
        .min_by(|a, b| a.1.cost.total_cmp(&b.1.cost).then(a.0.cmp(&b.0)));

    match best {
        Some((index, mut partition)) => {
            partition.restarts_run = restarts;
            tracing::debug!(
                restarts,
                k,
                winner = index,
                cost = partition.cost,
                iterations = partition.iterations,
                "partition selected"
            );
            Ok(partition)
        }
        None => Err(EngineError::NoValidPartition { restarts }),
    }
}

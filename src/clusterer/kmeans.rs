use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::clusterer::{
    centroid::compute_centroids,
    distance::{nearest, squared_euclidean},
    error::EngineError,
    types::Partition,
};

/// Check the shape of a point set before clustering it into `k` groups
pub fn validate(points: &[Vec<f64>], k: usize) -> Result<usize, EngineError> {
    let n = points.len();
    if n == 0 {
        return Err(EngineError::EmptyInput);
    }
    if k == 0 || k > n {
        return Err(EngineError::InvalidClusterCount {
            requested: k,
            n_items: n,
        });
    }

    let dim = points[0].len();
    for (index, point) in points.iter().enumerate() {
        if point.len() != dim {
            return Err(EngineError::DimensionMismatch {
                index,
                expected: dim,
                found: point.len(),
            });
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NonFiniteCoordinate { index });
        }
    }
    Ok(dim)
}

/// One seeded k-means run: k-means++ seeding followed by Lloyd refinement.
pub fn kmeans<R: Rng>(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Result<Partition, EngineError> {
    validate(points, k)?;
    Ok(run(points, k, max_iterations, rng))
}

/// Assumes `validate` passed.
pub(crate) fn run<R: Rng>(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Partition {
    let mut centroids = seed_centroids(points, k, rng);
    let mut assignments = vec![0usize; points.len()];
    assign(points, &centroids, &mut assignments);

    let mut iterations = 0;
    for _ in 0..max_iterations {
        iterations += 1;
        update_centroids(points, &mut assignments, &mut centroids);
        if !assign(points, &centroids, &mut assignments) {
            break; // converged
        }
    }

    let cost = points
        .iter()
        .zip(&assignments)
        .map(|(point, &c)| squared_euclidean(point, &centroids[c]))
        .sum();

    Partition {
        centroids,
        assignments,
        cost,
        iterations,
        restarts_run: 1,
    }
}

/// k-means++: each new centroid is drawn with probability proportional to its
/// squared distance from the closest centroid chosen so far.
pub(crate) fn seed_centroids<R: Rng>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    let mut min_distances: Vec<f64> = points
        .iter()
        .map(|p| squared_euclidean(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        // All weights zero (coincident points) or overflowed: fall back to uniform
        let next = match WeightedIndex::new(&min_distances) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        let chosen = points[next].clone();

        for (dist, point) in min_distances.iter_mut().zip(points) {
            let d = squared_euclidean(point, &chosen);
            if d < *dist {
                *dist = d;
            }
        }
        centroids.push(chosen);
    }

    centroids
}

/// Returns whether any assignment changed. A point only moves to a strictly
/// closer centroid, so coincident centroids keep the points repair gave them.
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, slot) in points.iter().zip(assignments.iter_mut()) {
        let (best, distance) = nearest(point, centroids);
        if *slot != best && distance < squared_euclidean(point, &centroids[*slot]) {
            *slot = best;
            changed = true;
        }
    }
    changed
}

fn update_centroids(points: &[Vec<f64>], assignments: &mut [usize], centroids: &mut [Vec<f64>]) {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &c in assignments.iter() {
        counts[c] += 1;
    }

    // An empty cluster takes over the point lying farthest from its own
    // centroid, drawn from a cluster that can spare one.
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = (0..points.len())
            .filter(|&i| counts[assignments[i]] > 1)
            .map(|i| (i, squared_euclidean(&points[i], &centroids[assignments[i]])))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, _)) = donor {
            counts[assignments[i]] -= 1;
            assignments[i] = empty;
            counts[empty] = 1;
        }
    }

    for (c, mean) in compute_centroids(points, assignments, k).into_iter().enumerate() {
        if let Some(mean) = mean {
            centroids[c] = mean;
        }
    }
}

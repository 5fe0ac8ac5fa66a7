/// Mean of the points assigned to each cluster. Empty clusters yield `None`.
pub fn compute_centroids(
    points: &[Vec<f64>],
    assignments: &[usize],
    k: usize,
) -> Vec<Option<Vec<f64>>> {
    let dim = points[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];

    for (point, &cluster) in points.iter().zip(assignments) {
        counts[cluster] += 1;
        for (acc, value) in sums[cluster].iter_mut().zip(point) {
            *acc += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if count == 0 {
                return None;
            }
            for value in sum.iter_mut() {
                *value /= count as f64;
            }
            Some(sum)
        })
        .collect()
}

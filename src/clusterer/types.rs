/// Best assignment found for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// One coordinate vector per cluster, in cluster index order
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index of every input point
    pub assignments: Vec<usize>,
    /// Within-cluster sum of squared distances
    pub cost: f64,
    /// Refinement steps taken by the winning run
    pub iterations: usize,
    /// Independent runs this partition was chosen from
    pub restarts_run: usize,
}

impl Partition {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Number of points assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &cluster in &self.assignments {
            sizes[cluster] += 1;
        }
        sizes
    }
}

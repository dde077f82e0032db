//! K-means clustering
//!
//! Greedy k-means++ seeding followed by Lloyd iterations, restarted
//! `n_init` times with the lowest-inertia run kept.

use crate::utils::linalg::squared_distance;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use thiserror::Error;

/// Errors that can occur during clustering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Number of clusters must be in [1, {n_samples}], got {k}")]
    InvalidClusterCount { k: usize, n_samples: usize },

    #[error("Cannot cluster an empty data set")]
    EmptyData,

    #[error("Need at least 2 documents to choose a cluster count, got {n_documents}")]
    TooFewDocuments { n_documents: usize },

    #[error("Expected {expected} labels, got {actual}")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("Matrix dimensions mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model not fitted yet")]
    NotFitted,
}

/// K-means configuration
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub n_clusters: usize,
    /// Maximum Lloyd iterations per run
    pub max_iter: usize,
    /// Relative tolerance on the squared centroid shift
    pub tol: f64,
    /// Number of seeded restarts
    pub n_init: usize,
    pub random_seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iter: 300,
            tol: 1e-4,
            n_init: 3,
            random_seed: 42,
        }
    }
}

impl KMeansConfig {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }

    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn n_init(mut self, n: usize) -> Self {
        self.n_init = n.max(1);
        self
    }

    /// Set random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }
}

/// Result of one seeded Lloyd run
struct Run {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

/// Fitted K-means model
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
    centroids: Option<Array2<f64>>,
    labels: Option<Vec<usize>>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self {
            config,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Fit on the rows of `data`
    pub fn fit(&mut self, data: ArrayView2<f64>) -> Result<(), ClusterError> {
        let n_samples = data.nrows();
        let k = self.config.n_clusters;
        if n_samples == 0 {
            return Err(ClusterError::EmptyData);
        }
        if k == 0 || k > n_samples {
            return Err(ClusterError::InvalidClusterCount { k, n_samples });
        }

        let tol = self.config.tol * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let mut best: Option<Run> = None;

        for _ in 0..self.config.n_init.max(1) {
            let seeds = kmeans_plus_plus(data, k, &mut rng);
            let run = lloyd(data, seeds, self.config.max_iter, tol);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        if let Some(run) = best {
            log::debug!(
                "K-means k={}: inertia {:.6} after {} iterations",
                k,
                run.inertia,
                run.n_iter
            );
            self.centroids = Some(run.centroids);
            self.labels = Some(run.labels);
            self.inertia = run.inertia;
            self.n_iter = run.n_iter;
        }
        Ok(())
    }

    /// Assign each row to its nearest centroid
    pub fn predict(&self, data: ArrayView2<f64>) -> Result<Vec<usize>, ClusterError> {
        let centroids = self.centroids.as_ref().ok_or(ClusterError::NotFitted)?;
        if data.ncols() != centroids.ncols() {
            return Err(ClusterError::DimensionMismatch {
                expected: centroids.ncols(),
                actual: data.ncols(),
            });
        }
        Ok(data
            .rows()
            .into_iter()
            .map(|row| nearest(row, centroids.view()).0)
            .collect())
    }

    pub fn centroids(&self) -> Result<&Array2<f64>, ClusterError> {
        self.centroids.as_ref().ok_or(ClusterError::NotFitted)
    }

    /// Labels of the training rows
    pub fn labels(&self) -> Result<&[usize], ClusterError> {
        self.labels.as_deref().ok_or(ClusterError::NotFitted)
    }

    /// Sum of squared distances to the assigned centroids
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn n_clusters(&self) -> usize {
        self.config.n_clusters
    }
}

/// Index of and squared distance to the nearest centroid (first on ties)
fn nearest(point: ArrayView1<f64>, centroids: ArrayView2<f64>) -> (usize, f64) {
    centroids
        .rows()
        .into_iter()
        .enumerate()
        .map(|(c, centroid)| (c, squared_distance(point, centroid)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// Mean of the per-feature variances
fn mean_variance(data: ArrayView2<f64>) -> f64 {
    if data.ncols() == 0 {
        return 0.0;
    }
    data.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

/// Greedy k-means++: each new center is the best of `2 + ln k` D²-sampled candidates
fn kmeans_plus_plus(data: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let n_trials = 2 + (k as f64).ln().floor() as usize;
    let mut centers = Array2::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&data.row(first));
    let mut closest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, data.row(first)))
        .collect();
    let mut potential: f64 = closest.iter().sum();

    for c in 1..k {
        let candidates: Vec<usize> = if potential > 0.0 {
            let cumulative: Vec<f64> = closest
                .iter()
                .scan(0.0, |acc, &d| {
                    *acc += d;
                    Some(*acc)
                })
                .collect();
            (0..n_trials)
                .map(|_| {
                    let target = rng.gen::<f64>() * potential;
                    cumulative.partition_point(|&x| x <= target).min(n - 1)
                })
                .collect()
        } else {
            // every point coincides with a chosen center
            (0..n_trials).map(|_| rng.gen_range(0..n)).collect()
        };

        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for candidate in candidates {
            let distances: Vec<f64> = data
                .rows()
                .into_iter()
                .zip(closest.iter())
                .map(|(row, &d)| d.min(squared_distance(row, data.row(candidate))))
                .collect();
            let pot: f64 = distances.iter().sum();
            if best.as_ref().map_or(true, |b| pot < b.1) {
                best = Some((candidate, pot, distances));
            }
        }

        if let Some((candidate, pot, distances)) = best {
            centers.row_mut(c).assign(&data.row(candidate));
            potential = pot;
            closest = distances;
        }
    }

    centers
}

/// Assign rows to their nearest centroid
fn assign(data: ArrayView2<f64>, centroids: &Array2<f64>) -> (Vec<usize>, Vec<f64>) {
    data.rows()
        .into_iter()
        .map(|row| nearest(row, centroids.view()))
        .unzip()
}

/// Give each empty cluster the farthest point of a cluster that can spare one
fn fill_empty_clusters(
    data: ArrayView2<f64>,
    centroids: &mut Array2<f64>,
    labels: &mut [usize],
    distances: &mut [f64],
) {
    let k = centroids.nrows();
    let mut sizes = vec![0usize; k];
    for &label in labels.iter() {
        sizes[label] += 1;
    }

    for cluster in 0..k {
        if sizes[cluster] > 0 {
            continue;
        }
        let donor = (0..labels.len())
            .filter(|&i| sizes[labels[i]] > 1)
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if distances[b] >= distances[i] => Some(b),
                _ => Some(i),
            });
        let Some(point) = donor else {
            break;
        };

        sizes[labels[point]] -= 1;
        sizes[cluster] = 1;
        labels[point] = cluster;
        distances[point] = 0.0;
        centroids.row_mut(cluster).assign(&data.row(point));
    }
}

/// Mean of the rows assigned to each cluster; empty clusters keep their centroid
fn update_centroids(data: ArrayView2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::zeros(previous.dim());
    let mut counts = vec![0usize; k];

    for (row, &label) in data.rows().into_iter().zip(labels) {
        sums.row_mut(label).scaled_add(1.0, &row);
        counts[label] += 1;
    }

    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            sums.row_mut(c).mapv_inplace(|x| x / count as f64);
        } else {
            sums.row_mut(c).assign(&previous.row(c));
        }
    }
    sums
}

fn lloyd(data: ArrayView2<f64>, mut centroids: Array2<f64>, max_iter: usize, tol: f64) -> Run {
    let mut previous_labels: Option<Vec<usize>> = None;
    let mut n_iter = 0;

    for iter in 0..max_iter {
        n_iter = iter + 1;
        let (mut labels, mut distances) = assign(data, &centroids);
        fill_empty_clusters(data, &mut centroids, &mut labels, &mut distances);

        let updated = update_centroids(data, &labels, &centroids);
        let shift: f64 = (&updated - &centroids).mapv(|x| x * x).sum();
        centroids = updated;

        if previous_labels.as_ref() == Some(&labels) || shift <= tol {
            break;
        }
        previous_labels = Some(labels);
    }

    let (mut labels, mut distances) = assign(data, &centroids);
    fill_empty_clusters(data, &mut centroids, &mut labels, &mut distances);
    // Refit so each centroid is the mean of the labels actually returned
    centroids = update_centroids(data, &labels, &centroids);
    let inertia: f64 = data
        .rows()
        .into_iter()
        .zip(&labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum();

    Run {
        centroids,
        labels,
        inertia,
        n_iter,
    }
}

/// Sizes of each cluster id in `[0, k)`
pub fn cluster_sizes(labels: &[usize], k: usize) -> Array1<usize> {
    let mut sizes = Array1::zeros(k);
    for &label in labels {
        if label < k {
            sizes[label] += 1;
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let data = blobs();
        let mut model = KMeans::new(KMeansConfig::new(2));
        model.fit(data.view()).unwrap();

        let labels = model.labels().unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
        assert!(model.inertia() < 0.1);
        assert_eq!(model.predict(array![[4.9, 4.9]].view()).unwrap()[0], labels[3]);
    }

    #[test]
    fn test_every_cluster_used() {
        // Only two distinct points but three clusters
        let data = array![[0.0, 1.0], [0.0, 1.0], [1.0, 0.0], [1.0, 0.0]];
        let mut model = KMeans::new(KMeansConfig::new(3));
        model.fit(data.view()).unwrap();

        let sizes = cluster_sizes(model.labels().unwrap(), 3);
        assert!(sizes.iter().all(|&s| s > 0));
    }

    #[test]
    fn test_centroids_are_means_of_returned_labels() {
        // Three distinct values, four clusters: one cluster must be filled by a donor point
        let data = array![[0.0], [0.0], [1.0], [1.0], [10.0]];
        let mut model = KMeans::new(KMeansConfig::new(4).n_init(1));
        model.fit(data.view()).unwrap();

        let labels = model.labels().unwrap();
        let centroids = model.centroids().unwrap();
        assert!(cluster_sizes(labels, 4).iter().all(|&s| s > 0));

        let mut inertia = 0.0;
        for c in 0..4 {
            let members: Vec<f64> = labels
                .iter()
                .zip(data.column(0))
                .filter(|&(&l, _)| l == c)
                .map(|(_, &x)| x)
                .collect();
            let mean = members.iter().sum::<f64>() / members.len() as f64;
            assert!((centroids[[c, 0]] - mean).abs() < 1e-12);
            inertia += members.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        }
        assert!((model.inertia() - inertia).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = blobs();
        let mut a = KMeans::new(KMeansConfig::new(3).random_seed(11));
        let mut b = KMeans::new(KMeansConfig::new(3).random_seed(11));
        a.fit(data.view()).unwrap();
        b.fit(data.view()).unwrap();

        assert_eq!(a.labels().unwrap(), b.labels().unwrap());
        assert_eq!(a.centroids().unwrap(), b.centroids().unwrap());
    }

    #[test]
    fn test_invalid_cluster_count() {
        let data = blobs();
        let mut model = KMeans::new(KMeansConfig::new(7));
        assert_eq!(
            model.fit(data.view()),
            Err(ClusterError::InvalidClusterCount { k: 7, n_samples: 6 })
        );
        assert_eq!(model.predict(data.view()), Err(ClusterError::NotFitted));
    }
}

//! Exact t-SNE
//!
//! Embeds the reduced document vectors in two dimensions for display.
//! Affinities are computed over all pairs, so cost grows quadratically
//! with the number of points; large inputs are subsampled first.

use crate::utils::linalg::squared_distance;
use ndarray::{Array2, ArrayView2, Axis};
use rand::prelude::*;
use rand_distr::StandardNormal;
use thiserror::Error;

/// Errors that can occur during t-SNE
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TsneError {
    #[error("Perplexity must be positive, got {0}")]
    InvalidPerplexity(f64),

    #[error("Number of output dimensions must be positive")]
    InvalidDimensions,

    #[error("Cannot embed an empty data set")]
    EmptyData,
}

const MACHINE_EPSILON: f64 = f64::EPSILON;
const P_FLOOR: f64 = 1e-12;
const BINARY_SEARCH_STEPS: usize = 100;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const MIN_GAIN: f64 = 0.01;

/// t-SNE configuration
#[derive(Debug, Clone)]
pub struct TsneConfig {
    pub n_components: usize,
    pub perplexity: f64,
    pub early_exaggeration: f64,
    /// Iterations spent with exaggerated affinities
    pub exaggeration_iter: usize,
    /// Total gradient descent iterations
    pub n_iter: usize,
    /// Fixed step size; derived from the point count when unset
    pub learning_rate: Option<f64>,
    /// Larger inputs are subsampled to this many points
    pub max_points: usize,
    pub random_seed: u64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            perplexity: 30.0,
            early_exaggeration: 12.0,
            exaggeration_iter: 250,
            n_iter: 1000,
            learning_rate: None,
            max_points: 2000,
            random_seed: 42,
        }
    }
}

impl TsneConfig {
    pub fn perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn max_points(mut self, n: usize) -> Self {
        self.max_points = n;
        self
    }

    /// Set random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }
}

/// Low-dimensional embedding together with the rows it covers
#[derive(Debug, Clone)]
pub struct Projection {
    /// Row indices into the input, ascending
    pub indices: Vec<usize>,
    /// One embedded point per index
    pub embedding: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct Tsne {
    config: TsneConfig,
}

impl Tsne {
    pub fn new(config: TsneConfig) -> Result<Self, TsneError> {
        if config.perplexity.is_nan() || config.perplexity <= 0.0 {
            return Err(TsneError::InvalidPerplexity(config.perplexity));
        }
        if config.n_components == 0 {
            return Err(TsneError::InvalidDimensions);
        }
        Ok(Self { config })
    }

    /// Embed a seeded subsample of at most `max_points` rows
    pub fn project(&self, data: ArrayView2<f64>) -> Result<Projection, TsneError> {
        let n = data.nrows();
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);

        let indices: Vec<usize> = if n > self.config.max_points {
            let mut chosen = rand::seq::index::sample(&mut rng, n, self.config.max_points).into_vec();
            chosen.sort_unstable();
            log::info!("t-SNE: subsampled {} of {} points", chosen.len(), n);
            chosen
        } else {
            (0..n).collect()
        };

        let subset = data.select(Axis(0), &indices);
        let embedding = self.embed(subset.view(), &mut rng)?;
        Ok(Projection { indices, embedding })
    }

    /// Embed every row of `data`
    pub fn fit_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, TsneError> {
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        self.embed(data, &mut rng)
    }

    fn embed(&self, data: ArrayView2<f64>, rng: &mut StdRng) -> Result<Array2<f64>, TsneError> {
        let n = data.nrows();
        let dims = self.config.n_components;
        if n == 0 {
            return Err(TsneError::EmptyData);
        }
        if n == 1 {
            return Ok(Array2::zeros((1, dims)));
        }

        let perplexity = self.config.perplexity.min((n - 1) as f64 / 3.0).max(1.0);
        let p = joint_probabilities(data, perplexity);

        let learning_rate = self
            .config
            .learning_rate
            .unwrap_or_else(|| (n as f64 / self.config.early_exaggeration / 4.0).max(50.0));

        let mut y: Array2<f64> =
            Array2::from_shape_fn((n, dims), |_| 1e-4 * rng.sample::<f64, _>(StandardNormal));
        let mut update = Array2::<f64>::zeros((n, dims));
        let mut gains = Array2::<f64>::ones((n, dims));

        for iter in 0..self.config.n_iter {
            let exaggerating = iter < self.config.exaggeration_iter;
            let exaggeration = if exaggerating {
                self.config.early_exaggeration
            } else {
                1.0
            };
            let momentum = if exaggerating { 0.5 } else { 0.8 };

            let (grad, kl) = gradient(&p, &y, exaggeration);

            ndarray::Zip::from(&mut gains)
                .and(&update)
                .and(&grad)
                .for_each(|g, &u, &d| {
                    *g = if u * d < 0.0 { *g + 0.2 } else { *g * 0.8 };
                    *g = g.max(MIN_GAIN);
                });
            ndarray::Zip::from(&mut update)
                .and(&gains)
                .and(&grad)
                .for_each(|u, &g, &d| *u = momentum * *u - learning_rate * g * d);
            y += &update;

            if (iter + 1) % 250 == 0 {
                log::debug!("t-SNE iteration {}: KL divergence {:.4}", iter + 1, kl);
            }
        }

        Ok(y)
    }
}

/// Symmetric affinities `(P + Pᵀ) / 2n` from per-point Gaussian kernels
fn joint_probabilities(data: ArrayView2<f64>, perplexity: f64) -> Array2<f64> {
    let n = data.nrows();
    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i + 1..n {
            let d = squared_distance(data.row(i), data.row(j));
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }

    let target_entropy = perplexity.ln();
    let mut conditional = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..BINARY_SEARCH_STEPS {
            let mut sum = 0.0;
            for j in 0..n {
                let value = if i == j {
                    0.0
                } else {
                    (-distances[[i, j]] * beta).exp()
                };
                conditional[[i, j]] = value;
                sum += value;
            }
            if sum == 0.0 {
                sum = MACHINE_EPSILON;
            }

            let mut weighted = 0.0;
            for j in 0..n {
                conditional[[i, j]] /= sum;
                weighted += distances[[i, j]] * conditional[[i, j]];
            }
            let entropy = sum.ln() + beta * weighted;
            let diff = entropy - target_entropy;
            if diff.abs() <= PERPLEXITY_TOLERANCE {
                break;
            }

            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max == f64::INFINITY {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min == f64::NEG_INFINITY {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }
    }

    let mut joint = &conditional + &conditional.t();
    let total = joint.sum().max(MACHINE_EPSILON);
    joint.mapv_inplace(|x| (x / total).max(P_FLOOR));
    joint.diag_mut().fill(0.0);
    joint
}

/// Gradient of the KL divergence and the divergence itself
fn gradient(p: &Array2<f64>, y: &Array2<f64>, exaggeration: f64) -> (Array2<f64>, f64) {
    let n = y.nrows();
    let mut num = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i + 1..n {
            let value = 1.0 / (1.0 + squared_distance(y.row(i), y.row(j)));
            num[[i, j]] = value;
            num[[j, i]] = value;
        }
    }
    let total = num.sum().max(MACHINE_EPSILON);

    let mut grad = Array2::<f64>::zeros(y.dim());
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let pij = exaggeration * p[[i, j]];
            let qij = (num[[i, j]] / total).max(MACHINE_EPSILON);
            kl += pij * (pij.max(MACHINE_EPSILON) / qij).ln();

            let coeff = 4.0 * (pij - qij) * num[[i, j]];
            for d in 0..y.ncols() {
                grad[[i, d]] += coeff * (y[[i, d]] - y[[j, d]]);
            }
        }
    }
    (grad, kl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_groups() -> Array2<f64> {
        array![
            [0.0, 0.0, 1.0],
            [0.0, 0.1, 1.0],
            [0.1, 0.0, 1.0],
            [0.0, 0.0, 0.9],
            [5.0, 5.0, 0.0],
            [5.0, 5.1, 0.0],
            [5.1, 5.0, 0.0],
            [5.0, 4.9, 0.0],
        ]
    }

    fn mean_distance(y: &Array2<f64>, a: &[usize], b: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut count = 0.0;
        for &i in a {
            for &j in b {
                if i != j {
                    total += squared_distance(y.row(i), y.row(j)).sqrt();
                    count += 1.0;
                }
            }
        }
        total / count
    }

    #[test]
    fn test_preserves_groups() {
        let tsne = Tsne::new(TsneConfig::default().n_iter(500)).unwrap();
        let y = tsne.fit_transform(two_groups().view()).unwrap();

        assert_eq!(y.dim(), (8, 2));
        assert!(y.iter().all(|v| v.is_finite()));

        let left = [0, 1, 2, 3];
        let right = [4, 5, 6, 7];
        let within = mean_distance(&y, &left, &left).max(mean_distance(&y, &right, &right));
        assert!(mean_distance(&y, &left, &right) > within);
    }

    #[test]
    fn test_joint_probabilities_are_symmetric() {
        let p = joint_probabilities(two_groups().view(), 2.0);
        assert!((p.sum() - 1.0).abs() < 1e-6);
        for i in 0..8 {
            assert_eq!(p[[i, i]], 0.0);
            for j in 0..8 {
                assert!((p[[i, j]] - p[[j, i]]).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_single_point() {
        let tsne = Tsne::new(TsneConfig::default()).unwrap();
        let y = tsne.fit_transform(array![[1.0, 2.0]].view()).unwrap();
        assert_eq!(y, Array2::<f64>::zeros((1, 2)));
    }

    #[test]
    fn test_subsample() {
        let tsne = Tsne::new(TsneConfig::default().max_points(5).n_iter(50)).unwrap();
        let projection = tsne.project(two_groups().view()).unwrap();

        assert_eq!(projection.indices.len(), 5);
        assert_eq!(projection.embedding.nrows(), 5);
        assert!(projection.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let tsne = Tsne::new(TsneConfig::default().n_iter(100)).unwrap();
        let a = tsne.fit_transform(two_groups().view()).unwrap();
        let b = tsne.fit_transform(two_groups().view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            Tsne::new(TsneConfig::default().perplexity(0.0)).unwrap_err(),
            TsneError::InvalidPerplexity(0.0)
        );
        let tsne = Tsne::new(TsneConfig::default()).unwrap();
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(tsne.fit_transform(empty.view()).unwrap_err(), TsneError::EmptyData);
    }
}

//! Randomized truncated SVD
//!
//! Projects a sparse TF-IDF matrix onto a fixed number of latent
//! components. The basis is kept so that reduced-space vectors can be
//! mapped back onto the vocabulary.

use crate::utils::linalg::{
    normalize_rows, orthonormalize, sparse_dot, sparse_t_dot, symmetric_eigen,
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_distr::StandardNormal;
use sprs::CsMat;
use thiserror::Error;

/// Errors that can occur during SVD computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SvdError {
    #[error("Number of components must be positive")]
    InvalidComponentCount,

    #[error("Cannot decompose an empty matrix of shape {0:?}")]
    EmptyMatrix((usize, usize)),

    #[error("Matrix dimensions mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model not fitted yet")]
    NotFitted,
}

/// Eigenvalues of the projected Gram matrix below this fraction of the largest are dropped
const EIGEN_TOLERANCE: f64 = 1e-12;

/// Truncated SVD configuration
#[derive(Debug, Clone)]
pub struct SvdConfig {
    /// Target rank (output width)
    pub n_components: usize,
    /// Extra random directions sampled beyond the target rank
    pub n_oversamples: usize,
    /// Power iterations of the range finder
    pub n_iter: usize,
    /// Seed for the Gaussian test matrix
    pub random_seed: u64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            n_components: 300,
            n_oversamples: 10,
            n_iter: 5,
            random_seed: 42,
        }
    }
}

impl SvdConfig {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            ..Default::default()
        }
    }

    pub fn n_oversamples(mut self, n: usize) -> Self {
        self.n_oversamples = n;
        self
    }

    pub fn n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    /// Set random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }
}

/// Randomized truncated SVD with a retained basis
///
/// Components are rows of a `n_components x n_terms` matrix. When the
/// attainable rank is below `n_components` the trailing rows are zero.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    config: SvdConfig,
    components: Option<Array2<f64>>,
    singular_values: Option<Array1<f64>>,
    explained_variance_ratio: Option<Array1<f64>>,
}

impl TruncatedSvd {
    pub fn new(config: SvdConfig) -> Result<Self, SvdError> {
        if config.n_components == 0 {
            return Err(SvdError::InvalidComponentCount);
        }

        Ok(Self {
            config,
            components: None,
            singular_values: None,
            explained_variance_ratio: None,
        })
    }

    /// Fit the basis and return the unit-norm reduced rows
    pub fn fit_transform(&mut self, matrix: &CsMat<f64>) -> Result<Array2<f64>, SvdError> {
        self.fit(matrix)?;
        self.transform(matrix)
    }

    /// Fit the basis on a document-term matrix
    pub fn fit(&mut self, matrix: &CsMat<f64>) -> Result<(), SvdError> {
        let (n_docs, n_terms) = matrix.shape();
        if n_docs == 0 {
            return Err(SvdError::EmptyMatrix((n_docs, n_terms)));
        }

        let target = self.config.n_components;
        if n_terms == 0 {
            // rank zero: every component is zero
            self.components = Some(Array2::zeros((target, 0)));
            self.singular_values = Some(Array1::zeros(target));
            self.explained_variance_ratio = Some(Array1::zeros(target));
            return Ok(());
        }

        let attainable = n_docs.min(n_terms);
        let n_samples = (target + self.config.n_oversamples).min(attainable);

        let q = self.range_finder(matrix, n_samples);

        // B = Qᵀ A, kept transposed as Aᵀ Q (n_terms x n_samples)
        let bt = sparse_t_dot(matrix, &q);
        let gram = bt.t().dot(&bt);
        let (eigenvalues, eigenvectors) = symmetric_eigen(&gram);

        let max_eigen = eigenvalues.iter().cloned().fold(0.0, f64::max);
        let mut components = Array2::zeros((target, n_terms));
        let mut singular_values = Array1::zeros(target);

        for k in 0..target.min(n_samples) {
            let lambda = eigenvalues[k];
            if max_eigen <= 0.0 || lambda <= EIGEN_TOLERANCE * max_eigen {
                break;
            }
            let sigma = lambda.sqrt();
            let mut v = bt.dot(&eigenvectors.column(k)) / sigma;
            flip_sign(&mut v);

            components.row_mut(k).assign(&v);
            singular_values[k] = sigma;
        }

        let kept = singular_values.iter().filter(|&&s| s > 0.0).count();
        log::debug!(
            "SVD: {} of {} components non-zero (matrix {}x{})",
            kept,
            target,
            n_docs,
            n_terms
        );

        let projected = sparse_dot(matrix, &components.t().to_owned());
        let total_variance = column_variance_sum(matrix);
        let explained = projected.var_axis(Axis(0), 0.0);
        let ratio = if total_variance > 0.0 {
            explained / total_variance
        } else {
            Array1::zeros(target)
        };

        self.components = Some(components);
        self.singular_values = Some(singular_values);
        self.explained_variance_ratio = Some(ratio);
        Ok(())
    }

    /// Orthonormal basis for the range of `matrix` (n_docs x n_samples)
    fn range_finder(&self, matrix: &CsMat<f64>, n_samples: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let omega: Array2<f64> =
            Array2::from_shape_fn((matrix.cols(), n_samples), |_| rng.sample(StandardNormal));

        let mut q = sparse_dot(matrix, &omega);
        orthonormalize(&mut q);

        for _ in 0..self.config.n_iter {
            let mut z = sparse_t_dot(matrix, &q);
            orthonormalize(&mut z);
            q = sparse_dot(matrix, &z);
            orthonormalize(&mut q);
        }

        q
    }

    /// Project documents onto the basis; rows scaled to unit norm
    pub fn transform(&self, matrix: &CsMat<f64>) -> Result<Array2<f64>, SvdError> {
        let components = self.components.as_ref().ok_or(SvdError::NotFitted)?;
        if matrix.cols() != components.ncols() {
            return Err(SvdError::DimensionMismatch {
                expected: components.ncols(),
                actual: matrix.cols(),
            });
        }

        let mut reduced = sparse_dot(matrix, &components.t().to_owned());
        normalize_rows(&mut reduced);
        Ok(reduced)
    }

    /// Map a reduced-space vector back to weights over the vocabulary
    pub fn inverse_transform(&self, vector: ArrayView1<f64>) -> Result<Array1<f64>, SvdError> {
        let components = self.components.as_ref().ok_or(SvdError::NotFitted)?;
        if vector.len() != components.nrows() {
            return Err(SvdError::DimensionMismatch {
                expected: components.nrows(),
                actual: vector.len(),
            });
        }
        Ok(vector.dot(components))
    }

    pub fn components(&self) -> Result<&Array2<f64>, SvdError> {
        self.components.as_ref().ok_or(SvdError::NotFitted)
    }

    pub fn singular_values(&self) -> Result<&Array1<f64>, SvdError> {
        self.singular_values.as_ref().ok_or(SvdError::NotFitted)
    }

    /// Share of the total column variance captured by each component
    pub fn explained_variance_ratio(&self) -> Result<&Array1<f64>, SvdError> {
        self.explained_variance_ratio.as_ref().ok_or(SvdError::NotFitted)
    }

    pub fn n_components(&self) -> usize {
        self.config.n_components
    }
}

/// Make the largest absolute loading positive
fn flip_sign(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .cloned()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

/// Sum of per-column population variances of a sparse matrix
fn column_variance_sum(matrix: &CsMat<f64>) -> f64 {
    let n = matrix.rows() as f64;
    let mut sums = vec![0.0; matrix.cols()];
    let mut squares = vec![0.0; matrix.cols()];
    for row in matrix.outer_iterator() {
        for (j, &x) in row.iter() {
            sums[j] += x;
            squares[j] += x * x;
        }
    }
    sums.iter()
        .zip(squares.iter())
        .map(|(&s, &sq)| sq / n - (s / n) * (s / n))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use sprs::TriMat;

    fn sparse(dense: &Array2<f64>) -> CsMat<f64> {
        let mut tri = TriMat::new(dense.dim());
        for ((i, j), &v) in dense.indexed_iter() {
            if v != 0.0 {
                tri.add_triplet(i, j, v);
            }
        }
        tri.to_csr()
    }

    fn block_matrix() -> CsMat<f64> {
        sparse(&array![
            [1.0, 1.0, 0.0, 0.0, 0.0],
            [1.0, 0.9, 0.1, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 0.1, 0.8, 1.0],
        ])
    }

    #[test]
    fn test_output_width_is_target_rank() {
        let mut svd = TruncatedSvd::new(SvdConfig::new(10)).unwrap();
        let reduced = svd.fit_transform(&block_matrix()).unwrap();

        assert_eq!(reduced.dim(), (4, 10));
        for row in reduced.rows() {
            let norm = row.dot(&row).sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }

        // Rank is at most 4, so trailing components are zero
        let s = svd.singular_values().unwrap();
        assert!(s.iter().skip(4).all(|&x| x == 0.0));
    }

    #[test]
    fn test_singular_values_match_exact() {
        // diag(3, 2) embedded in a 3x3 matrix
        let matrix = sparse(&array![[3.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 0.0]]);
        let mut svd = TruncatedSvd::new(SvdConfig::new(2)).unwrap();
        svd.fit(&matrix).unwrap();

        let s = svd.singular_values().unwrap();
        assert!((s[0] - 3.0).abs() < 1e-9);
        assert!((s[1] - 2.0).abs() < 1e-9);

        let components = svd.components().unwrap();
        assert!((components[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((components[[1, 1]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let mut a = TruncatedSvd::new(SvdConfig::new(3).random_seed(7)).unwrap();
        let mut b = TruncatedSvd::new(SvdConfig::new(3).random_seed(7)).unwrap();
        assert_eq!(
            a.fit_transform(&block_matrix()).unwrap(),
            b.fit_transform(&block_matrix()).unwrap()
        );
    }

    #[test]
    fn test_inverse_transform() {
        let mut svd = TruncatedSvd::new(SvdConfig::new(2)).unwrap();
        let reduced = svd.fit_transform(&block_matrix()).unwrap();

        let weights = svd.inverse_transform(reduced.row(0)).unwrap();
        assert_eq!(weights.len(), 5);
        // The first document's strongest terms are its own
        assert!(weights[0] > weights[3]);
        assert!(weights[1] > weights[4]);

        assert!(matches!(
            svd.inverse_transform(array![1.0].view()),
            Err(SvdError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_explained_variance_ratio_bounded() {
        let mut svd = TruncatedSvd::new(SvdConfig::new(4)).unwrap();
        svd.fit(&block_matrix()).unwrap();
        let ratio = svd.explained_variance_ratio().unwrap();
        let total: f64 = ratio.sum();
        assert!(ratio.iter().all(|&r| r >= -1e-12));
        assert!(total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            TruncatedSvd::new(SvdConfig::new(0)),
            Err(SvdError::InvalidComponentCount)
        ));

        let mut svd = TruncatedSvd::new(SvdConfig::new(2)).unwrap();
        assert!(matches!(svd.transform(&block_matrix()), Err(SvdError::NotFitted)));
        let empty: CsMat<f64> = TriMat::new((0, 3)).to_csr();
        assert_eq!(svd.fit(&empty), Err(SvdError::EmptyMatrix((0, 3))));
    }

    #[test]
    fn test_no_terms_gives_zero_rows() {
        let mut svd = TruncatedSvd::new(SvdConfig::new(4)).unwrap();
        let no_terms: CsMat<f64> = TriMat::new((1, 0)).to_csr();
        let reduced = svd.fit_transform(&no_terms).unwrap();
        assert_eq!(reduced, Array2::<f64>::zeros((1, 4)));
    }
}

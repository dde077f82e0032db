//! Dense / sparse linear algebra helpers
//!
//! Small routines used by the decomposition and clustering models,
//! implemented on `ndarray` and `sprs` without an external LAPACK.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use sprs::CsMat;

/// Columns whose norm falls below this fraction of their original norm are zeroed
const RANK_TOLERANCE: f64 = 1e-10;
const JACOBI_MAX_SWEEPS: usize = 100;

/// `A · B` for a CSR matrix `A` (n x m) and dense `B` (m x l)
pub fn sparse_dot(a: &CsMat<f64>, b: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((a.rows(), b.ncols()));
    for (i, row) in a.outer_iterator().enumerate() {
        let mut out_row = out.row_mut(i);
        for (j, &value) in row.iter() {
            out_row.scaled_add(value, &b.row(j));
        }
    }
    out
}

/// `Aᵀ · B` for a CSR matrix `A` (n x m) and dense `B` (n x l)
pub fn sparse_t_dot(a: &CsMat<f64>, b: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((a.cols(), b.ncols()));
    for (i, row) in a.outer_iterator().enumerate() {
        let b_row = b.row(i);
        for (j, &value) in row.iter() {
            out.row_mut(j).scaled_add(value, &b_row);
        }
    }
    out
}

/// Orthonormalize the columns of `m` in place (modified Gram-Schmidt, two passes)
///
/// Columns that are numerically dependent on earlier ones become zero.
pub fn orthonormalize(m: &mut Array2<f64>) {
    let original: Vec<f64> = m.axis_iter(Axis(1)).map(|c| norm(c)).collect();

    for _ in 0..2 {
        for j in 0..m.ncols() {
            for i in 0..j {
                let qi = m.column(i).to_owned();
                let proj = qi.dot(&m.column(j));
                m.column_mut(j).scaled_add(-proj, &qi);
            }

            let n = norm(m.column(j));
            if n <= RANK_TOLERANCE * original[j].max(f64::MIN_POSITIVE) {
                m.column_mut(j).fill(0.0);
            } else {
                m.column_mut(j).mapv_inplace(|x| x / n);
            }
        }
    }
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations
///
/// Returns eigenvalues in descending order and the matching eigenvectors
/// as columns.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.to_owned();
    let mut v = Array2::<f64>::eye(n);

    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let threshold = 1e-14 * scale.max(f64::MIN_POSITIVE);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum::<f64>()
            .sqrt();
        if off <= threshold {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]).then_with(|| i.cmp(&j)));

    let values = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }

    (values, vectors)
}

/// Euclidean norm of a vector
pub fn norm(v: ArrayView1<f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Scale every row to unit L2 norm; zero rows stay zero
pub fn normalize_rows(m: &mut Array2<f64>) {
    for mut row in m.rows_mut() {
        let n = norm(row.view());
        if n > 0.0 {
            row.mapv_inplace(|x| x / n);
        }
    }
}

/// Squared Euclidean distance
pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
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

    #[test]
    fn test_sparse_products_match_dense() {
        let a = array![[1.0, 0.0, 2.0], [0.0, 3.0, 0.0]];
        let b = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let c = array![[1.0], [2.0]];
        let s = sparse(&a);

        assert_eq!(sparse_dot(&s, &b), a.dot(&b));
        assert_eq!(sparse_t_dot(&s, &c), a.t().dot(&c));
    }

    #[test]
    fn test_orthonormalize_zeroes_dependent_columns() {
        let mut m = array![[1.0, 2.0, 0.0], [1.0, 2.0, 1.0], [0.0, 0.0, 1.0]];
        orthonormalize(&mut m);

        assert!((norm(m.column(0)) - 1.0).abs() < 1e-12);
        assert!(norm(m.column(1)) < 1e-12);
        assert!((norm(m.column(2)) - 1.0).abs() < 1e-12);
        assert!(m.column(0).dot(&m.column(2)).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_eigen() {
        let m = array![[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 5.0]];
        let (values, vectors) = symmetric_eigen(&m);

        assert!((values[0] - 5.0).abs() < 1e-10);
        assert!((values[1] - 3.0).abs() < 1e-10);
        assert!((values[2] - 1.0).abs() < 1e-10);

        for k in 0..3 {
            let v = vectors.column(k);
            let mv = m.dot(&v);
            for i in 0..3 {
                assert!((mv[i] - values[k] * v[i]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_normalize_rows_keeps_zero_rows() {
        let mut m = array![[3.0, 4.0], [0.0, 0.0]];
        normalize_rows(&mut m);
        assert_eq!(m, array![[0.6, 0.8], [0.0, 0.0]]);
    }
}

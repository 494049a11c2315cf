//! Conversion helpers and the handful of sparse kernels the solvers share.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::error::SolveError;

/// Builds a CSR matrix from `(row, col, value)` triplets.
///
/// Duplicate coordinates are summed, matching finite-element style assembly.
pub fn from_triplets(
    nrows: usize,
    ncols: usize,
    triplets: &[(usize, usize, f64)],
) -> Result<CsrMatrix<f64>, SolveError> {
    let rows = triplets.iter().map(|t| t.0).collect();
    let cols = triplets.iter().map(|t| t.1).collect();
    let vals = triplets.iter().map(|t| t.2).collect();

    let coo = CooMatrix::try_from_triplets(nrows, ncols, rows, cols, vals)
        .map_err(|e| SolveError::InvalidMatrix(e.to_string()))?;
    Ok(CsrMatrix::from(&coo))
}

/// `y = A x`.
pub(crate) fn spmv(a: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(a.nrows());
    for (i, row) in a.row_iter().enumerate() {
        y[i] = row
            .col_indices()
            .iter()
            .zip(row.values())
            .map(|(&j, &v)| v * x[j])
            .sum();
    }
    y
}

/// Main diagonal; structurally missing entries read as zero.
pub(crate) fn diagonal(a: &CsrMatrix<f64>) -> DVector<f64> {
    let n = a.nrows().min(a.ncols());
    let mut d = DVector::zeros(n);
    for (i, row) in a.row_iter().take(n).enumerate() {
        if let Ok(pos) = row.col_indices().binary_search(&i) {
            d[i] = row.values()[pos];
        }
    }
    d
}

/// `‖b - A x‖ / ‖b‖`, or the absolute residual when `b` is zero.
pub fn relative_residual(a: &CsrMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let r = (b - spmv(a, x)).norm();
    let bn = b.norm();
    if bn > 0.0 { r / bn } else { r }
}

/// Largest absolute element-wise difference between two vectors.
pub fn max_abs_deviation(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_triplets_sums_duplicates() {
        let a = from_triplets(2, 2, &[(0, 0, 1.0), (0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        assert_eq!(a.nnz(), 2);
        assert_eq!(diagonal(&a).as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn from_triplets_rejects_out_of_bounds() {
        let err = from_triplets(2, 2, &[(2, 0, 1.0)]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidMatrix(_)));
    }

    #[test]
    fn spmv_matches_dense_product() {
        let a = from_triplets(2, 3, &[(0, 0, 1.0), (0, 2, 2.0), (1, 1, -1.0)]).unwrap();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(spmv(&a, &x).as_slice(), &[7.0, -2.0]);
    }

    #[test]
    fn diagonal_reads_missing_entries_as_zero() {
        let a = from_triplets(3, 3, &[(0, 0, 5.0), (1, 2, 1.0), (2, 2, 7.0)]).unwrap();
        assert_eq!(diagonal(&a).as_slice(), &[5.0, 0.0, 7.0]);
    }

    #[test]
    fn residual_of_exact_solution_is_zero() {
        let a = from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        let b = DVector::from_vec(vec![2.0, 8.0]);
        let x = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(relative_residual(&a, &x, &b), 0.0);
    }

    #[test]
    fn max_abs_deviation_picks_largest_gap() {
        let a = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let b = DVector::from_vec(vec![1.5, 2.0, 0.0]);
        assert_eq!(max_abs_deviation(&a, &b), 3.0);
    }
}

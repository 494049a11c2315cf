//! Direct factorizations.
//!
//! `Llt` uses the sparse Cholesky of `nalgebra-sparse`;
//! `Lu` and `Qr` go through `faer`'s sparse LU (partial pivoting) and sparse
//! Householder QR, both with fill-reducing column orderings.

use faer::prelude::*;
use faer::sparse::SparseColMat;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CscMatrix, CsrMatrix};

use crate::config::SolverConfig;
use crate::dispatch::Outcome;
use crate::error::SolveError;
use crate::method::Method;

pub(crate) fn llt(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    _config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let csc = CscMatrix::from(a);
    let chol = CscCholesky::factor(&csc)
        .map_err(|_| factorization(Method::Llt, "matrix is not positive definite"))?;

    let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
    let x = chol.solve(&rhs).column(0).into_owned();
    finite(Method::Llt, x).map(Outcome::direct)
}

pub(crate) fn lu(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    _config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    if let Some(col) = empty_column(a) {
        let reason = format!("matrix is singular (column {col} is empty)");
        return Err(factorization(Method::Lu, reason));
    }
    if let Some(row) = empty_row(a) {
        let reason = format!("matrix is singular (row {row} is empty)");
        return Err(factorization(Method::Lu, reason));
    }

    let lu = to_faer(Method::Lu, a)?
        .as_ref()
        .sp_lu()
        .map_err(|err| factorization(Method::Lu, format!("{err:?}")))?;
    let x = lu.solve(&to_faer_rhs(b));
    finite(Method::Lu, from_faer(&x, a.ncols())).map(Outcome::direct)
}

pub(crate) fn qr(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    _config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    qr_least_squares(a, b).map(Outcome::direct)
}

/// Minimizes `‖A x - b‖₂` for `nrows ≥ ncols` via sparse QR.
///
/// For square non-singular `A` this is the exact solution. A structurally
/// empty column makes `A` rank deficient and is rejected up front.
pub(crate) fn qr_least_squares(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
) -> Result<DVector<f64>, SolveError> {
    if a.nrows() < a.ncols() {
        return Err(SolveError::Underdetermined {
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    if a.ncols() == 0 {
        return Ok(DVector::zeros(0));
    }
    if let Some(col) = empty_column(a) {
        return Err(factorization(
            Method::Qr,
            format!("matrix is rank deficient (column {col} is empty)"),
        ));
    }

    let qr = to_faer(Method::Qr, a)?
        .as_ref()
        .sp_qr()
        .map_err(|err| factorization(Method::Qr, format!("{err:?}")))?;
    let x = qr.solve_lstsq(&to_faer_rhs(b));
    finite(Method::Qr, from_faer(&x, a.ncols()))
}

fn to_faer(method: Method, a: &CsrMatrix<f64>) -> Result<SparseColMat<usize, f64>, SolveError> {
    let triplets: Vec<(usize, usize, f64)> =
        a.triplet_iter().map(|(i, j, &v)| (i, j, v)).collect();
    SparseColMat::try_new_from_triplets(a.nrows(), a.ncols(), &triplets)
        .map_err(|err| factorization(method, format!("{err:?}")))
}

fn to_faer_rhs(b: &DVector<f64>) -> Mat<f64> {
    Mat::from_fn(b.len(), 1, |i, _| b[i])
}

/// First `n` entries of the single solution column.
fn from_faer(x: &Mat<f64>, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |i, _| x.read(i, 0))
}

fn empty_column(a: &CsrMatrix<f64>) -> Option<usize> {
    let mut seen = vec![false; a.ncols()];
    for (_, j, &v) in a.triplet_iter() {
        if v != 0.0 {
            seen[j] = true;
        }
    }
    seen.iter().position(|&s| !s)
}

fn empty_row(a: &CsrMatrix<f64>) -> Option<usize> {
    a.row_iter()
        .position(|row| row.values().iter().all(|&v| v == 0.0))
}

fn factorization(method: Method, reason: impl Into<String>) -> SolveError {
    SolveError::Factorization {
        method,
        reason: reason.into(),
    }
}

fn finite(method: Method, x: DVector<f64>) -> Result<DVector<f64>, SolveError> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(factorization(method, "solution contains non-finite values"))
    }
}

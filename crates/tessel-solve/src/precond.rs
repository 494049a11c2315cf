//! Preconditioners for the Krylov solvers.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::matrix::diagonal;

/// Approximate inverse `M⁻¹` applied to a vector.
pub(crate) trait Preconditioner {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64>;
}

/// Jacobi preconditioner. Zero diagonal entries act as identity.
pub(crate) struct Diagonal {
    inv_diag: DVector<f64>,
}

impl Diagonal {
    pub(crate) fn new(a: &CsrMatrix<f64>) -> Self {
        let inv_diag = diagonal(a).map(|d| if d != 0.0 { 1.0 / d } else { 1.0 });
        Self { inv_diag }
    }
}

impl Preconditioner for Diagonal {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        r.component_mul(&self.inv_diag)
    }
}

/// Sparse row of a factor, columns ascending.
#[derive(Debug, Clone, Default)]
struct FactorRow {
    cols: Vec<usize>,
    vals: Vec<f64>,
}

/// Incomplete LU with dual threshold dropping (ILUT).
///
/// `L` is unit lower triangular (diagonal implicit); `U` stores its
/// diagonal separately.
pub(crate) struct Ilut {
    lower: Vec<FactorRow>,
    upper: Vec<FactorRow>,
    diag: Vec<f64>,
}

impl Ilut {
    /// Factor `a` row by row (IKJ variant).
    ///
    /// In each row, entries below `drop_tolerance · ‖row‖₂` are dropped and
    /// at most `fill_factor · nnz(A)/n` entries are kept in each of the
    /// `L` and `U` parts.
    pub(crate) fn new(a: &CsrMatrix<f64>, drop_tolerance: f64, fill_factor: usize) -> Self {
        let n = a.nrows();
        let avg_row = a.nnz().div_ceil(n.max(1));
        let keep = (fill_factor * avg_row).max(1);

        let mut lower: Vec<FactorRow> = Vec::with_capacity(n);
        let mut upper: Vec<FactorRow> = Vec::with_capacity(n);
        let mut diag = vec![0.0; n];

        let mut work = vec![0.0f64; n];
        let mut present = vec![false; n];
        let mut touched: Vec<usize> = Vec::new();

        for (i, row) in a.row_iter().enumerate() {
            let row_norm = row.values().iter().map(|v| v * v).sum::<f64>().sqrt();
            let tau = drop_tolerance * row_norm;

            let mut pending = BinaryHeap::new();
            for (&j, &v) in row.col_indices().iter().zip(row.values()) {
                work[j] = v;
                present[j] = true;
                touched.push(j);
                if j < i {
                    pending.push(Reverse(j));
                }
            }

            let mut l_row = FactorRow::default();
            while let Some(Reverse(k)) = pending.pop() {
                let w_k = work[k] / diag[k];
                if w_k.abs() <= tau {
                    work[k] = 0.0;
                    continue;
                }
                work[k] = w_k;
                let u_k = &upper[k];
                for (&j, &u) in u_k.cols.iter().zip(&u_k.vals) {
                    if !present[j] {
                        present[j] = true;
                        touched.push(j);
                        if j < i {
                            pending.push(Reverse(j));
                        }
                    }
                    work[j] -= w_k * u;
                }
                l_row.cols.push(k);
                l_row.vals.push(w_k);
            }

            let mut u_row = FactorRow::default();
            let mut d = 0.0;
            for &j in &touched {
                if j == i {
                    d = work[j];
                } else if j > i && work[j].abs() > tau {
                    u_row.cols.push(j);
                    u_row.vals.push(work[j]);
                }
            }
            if d == 0.0 {
                d = (1e-4 + drop_tolerance) * row_norm.max(1.0);
            }

            truncate_largest(&mut l_row, keep);
            truncate_largest(&mut u_row, keep);

            for &j in &touched {
                work[j] = 0.0;
                present[j] = false;
            }
            touched.clear();

            diag[i] = d;
            lower.push(l_row);
            upper.push(u_row);
        }

        Self { lower, upper, diag }
    }
}

/// Keeps the `keep` largest-magnitude entries, columns ascending.
fn truncate_largest(row: &mut FactorRow, keep: usize) {
    let mut entries: Vec<(usize, f64)> =
        row.cols.iter().copied().zip(row.vals.iter().copied()).collect();
    if entries.len() > keep {
        entries.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        entries.truncate(keep);
    }
    entries.sort_by_key(|e| e.0);
    row.cols = entries.iter().map(|e| e.0).collect();
    row.vals = entries.iter().map(|e| e.1).collect();
}

impl Preconditioner for Ilut {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        let n = self.diag.len();
        let mut x = r.clone();
        for i in 0..n {
            let l = &self.lower[i];
            let s: f64 = l.cols.iter().zip(&l.vals).map(|(&j, &v)| v * x[j]).sum();
            x[i] -= s;
        }
        for i in (0..n).rev() {
            let u = &self.upper[i];
            let s: f64 = u.cols.iter().zip(&u.vals).map(|(&j, &v)| v * x[j]).sum();
            x[i] = (x[i] - s) / self.diag[i];
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{from_triplets, spmv};

    #[test]
    fn diagonal_inverts_diagonal_matrix() {
        let a = from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        let p = Diagonal::new(&a);
        let z = p.apply(&DVector::from_vec(vec![2.0, 2.0]));
        assert_eq!(z.as_slice(), &[1.0, 0.5]);
    }

    #[test]
    fn diagonal_treats_missing_entry_as_identity() {
        let a = from_triplets(2, 2, &[(0, 1, 3.0), (1, 1, 4.0)]).unwrap();
        let z = Diagonal::new(&a).apply(&DVector::from_vec(vec![7.0, 8.0]));
        assert_eq!(z.as_slice(), &[7.0, 2.0]);
    }

    #[test]
    fn ilut_without_dropping_is_exact_lu() {
        // Tridiagonal matrices have no fill, so ILUT reproduces the full LU.
        let a = from_triplets(
            3,
            3,
            &[
                (0, 0, 4.0),
                (0, 1, -1.0),
                (1, 0, -2.0),
                (1, 1, 4.0),
                (1, 2, -1.0),
                (2, 1, -2.0),
                (2, 2, 4.0),
            ],
        )
        .unwrap();
        let ilut = Ilut::new(&a, 0.0, 10);
        let x = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        let b = spmv(&a, &x);
        let y = ilut.apply(&b);
        for (got, want) in y.iter().zip(x.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn truncate_keeps_largest_in_column_order() {
        let mut row = FactorRow {
            cols: vec![1, 3, 5, 7],
            vals: vec![0.1, -4.0, 2.0, 0.01],
        };
        truncate_largest(&mut row, 2);
        assert_eq!(row.cols, vec![3, 5]);
        assert_eq!(row.vals, vec![-4.0, 2.0]);
    }
}

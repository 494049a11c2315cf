//! Simplicial up-looking LDLᵀ factorization.
//!
//! Reads only the upper triangle (`i ≤ k` in column `k`) of a symmetric
//! matrix. Natural ordering, no pivoting: a zero pivot fails the
//! factorization instead of being repaired.

use nalgebra::DVector;
use nalgebra_sparse::{CscMatrix, CsrMatrix};

use crate::config::SolverConfig;
use crate::dispatch::Outcome;
use crate::error::SolveError;
use crate::method::Method;

const NONE: usize = usize::MAX;

/// Factor `A = L D Lᵀ` with unit-lower `L` stored column-wise.
#[derive(Debug, Clone)]
pub(crate) struct Ldlt {
    n: usize,
    lp: Vec<usize>,
    li: Vec<usize>,
    lx: Vec<f64>,
    d: Vec<f64>,
}

impl Ldlt {
    pub(crate) fn factor(a: &CscMatrix<f64>) -> Result<Self, SolveError> {
        let n = a.ncols();
        let ap = a.col_offsets();
        let ai = a.row_indices();
        let ax = a.values();

        // Symbolic: elimination tree + column counts of L.
        let mut parent = vec![NONE; n];
        let mut lnz = vec![0usize; n];
        let mut flag = vec![NONE; n];
        for k in 0..n {
            flag[k] = k;
            for &row in &ai[ap[k]..ap[k + 1]] {
                let mut i = row;
                if i >= k {
                    continue;
                }
                while flag[i] != k {
                    if parent[i] == NONE {
                        parent[i] = k;
                    }
                    lnz[i] += 1;
                    flag[i] = k;
                    i = parent[i];
                }
            }
        }

        let mut lp = vec![0usize; n + 1];
        for k in 0..n {
            lp[k + 1] = lp[k] + lnz[k];
        }

        // Numeric.
        let nnz = lp[n];
        let mut li = vec![0usize; nnz];
        let mut lx = vec![0.0f64; nnz];
        let mut d = vec![0.0f64; n];
        let mut y = vec![0.0f64; n];
        let mut pattern = vec![0usize; n];
        flag.fill(NONE);
        lnz.fill(0);

        for k in 0..n {
            let mut top = n;
            flag[k] = k;
            for p in ap[k]..ap[k + 1] {
                let mut i = ai[p];
                if i > k {
                    continue;
                }
                y[i] += ax[p];
                let mut len = 0;
                while flag[i] != k {
                    pattern[len] = i;
                    len += 1;
                    flag[i] = k;
                    i = parent[i];
                }
                while len > 0 {
                    len -= 1;
                    top -= 1;
                    pattern[top] = pattern[len];
                }
            }

            d[k] = y[k];
            y[k] = 0.0;
            for &i in &pattern[top..n] {
                let yi = y[i];
                y[i] = 0.0;
                let end = lp[i] + lnz[i];
                for p in lp[i]..end {
                    y[li[p]] -= lx[p] * yi;
                }
                let l_ki = yi / d[i];
                d[k] -= l_ki * yi;
                li[end] = k;
                lx[end] = l_ki;
                lnz[i] += 1;
            }

            if d[k] == 0.0 || !d[k].is_finite() {
                return Err(SolveError::Factorization {
                    method: Method::Ldlt,
                    reason: format!("zero pivot in column {k}"),
                });
            }
        }

        Ok(Self { n, lp, li, lx, d })
    }

    pub(crate) fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();
        for j in 0..self.n {
            let xj = x[j];
            for p in self.lp[j]..self.lp[j + 1] {
                x[self.li[p]] -= self.lx[p] * xj;
            }
        }
        for j in 0..self.n {
            x[j] /= self.d[j];
        }
        for j in (0..self.n).rev() {
            let mut xj = x[j];
            for p in self.lp[j]..self.lp[j + 1] {
                xj -= self.lx[p] * x[self.li[p]];
            }
            x[j] = xj;
        }
        x
    }
}

pub(crate) fn solve(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    _config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let factor = Ldlt::factor(&CscMatrix::from(a))?;
    Ok(Outcome::direct(factor.solve(b)))
}

//! Preconditioned Krylov solvers.
//!
//! Both start from `x₀ = 0` and stop once `‖b - A x‖ ≤ tol · ‖b‖`. Running out
//! of iterations is an error; the last iterate is never returned silently.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::config::SolverConfig;
use crate::dispatch::Outcome;
use crate::error::SolveError;
use crate::matrix::spmv;
use crate::method::Method;
use crate::precond::{Diagonal, Ilut, Preconditioner};

pub(crate) fn conjugate_gradient_diag(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let precond = Diagonal::new(a);
    conjugate_gradient(
        Method::ConjugateGradientDiag,
        a,
        b,
        &precond,
        config.cg_tolerance,
        config.iteration_budget(a.nrows()),
    )
}

pub(crate) fn bicgstab_diag(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let precond = Diagonal::new(a);
    bicgstab(
        Method::BiCgStabDiag,
        a,
        b,
        &precond,
        config.bicgstab_tolerance,
        config.iteration_budget(a.nrows()),
    )
}

pub(crate) fn bicgstab_ilut(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let precond = Ilut::new(a, config.ilut_drop_tolerance, config.ilut_fill_factor);
    bicgstab(
        Method::BiCgStabIlut,
        a,
        b,
        &precond,
        config.bicgstab_tolerance,
        config.iteration_budget(a.nrows()),
    )
}

fn conjugate_gradient(
    method: Method,
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    precond: &impl Preconditioner,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Outcome, SolveError> {
    let n = b.len();
    let mut x = DVector::zeros(n);

    let rhs_norm2 = b.norm_squared();
    if rhs_norm2 == 0.0 {
        return Ok(Outcome { x, iterations: Some(0) });
    }
    let threshold = (tolerance * tolerance * rhs_norm2).max(f64::MIN_POSITIVE);

    let mut r = b.clone();
    if r.norm_squared() < threshold {
        return Ok(Outcome { x, iterations: Some(0) });
    }

    let mut p = precond.apply(&r);
    let mut abs_new = r.dot(&p);

    for i in 0..max_iterations {
        let q = spmv(a, &p);
        let pq = p.dot(&q);
        if pq == 0.0 {
            return Err(SolveError::Breakdown { method, iteration: i });
        }
        let alpha = abs_new / pq;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &q, 1.0);

        let res2 = r.norm_squared();
        if res2 < threshold {
            log::debug!("{method}: converged in {} iterations", i + 1);
            return Ok(Outcome { x, iterations: Some(i + 1) });
        }

        let z = precond.apply(&r);
        let abs_old = abs_new;
        abs_new = r.dot(&z);
        let beta = abs_new / abs_old;
        p = z + p * beta;
    }

    Err(SolveError::NotConverged {
        method,
        iterations: max_iterations,
        residual: (r.norm_squared() / rhs_norm2).sqrt(),
    })
}

fn bicgstab(
    method: Method,
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    precond: &impl Preconditioner,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Outcome, SolveError> {
    let n = b.len();
    let mut x = DVector::zeros(n);

    let rhs_norm2 = b.norm_squared();
    if rhs_norm2 == 0.0 {
        return Ok(Outcome { x, iterations: Some(0) });
    }
    let threshold = (tolerance * tolerance * rhs_norm2).max(f64::MIN_POSITIVE);

    let mut r = b.clone();
    let mut r0 = r.clone();
    let mut r0_norm2 = rhs_norm2;
    let eps2 = f64::EPSILON * f64::EPSILON;

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut w = 1.0;
    let mut v = DVector::zeros(n);
    let mut p = DVector::zeros(n);

    for i in 0..max_iterations {
        if r.norm_squared() <= threshold {
            log::debug!("{method}: converged in {i} iterations");
            return Ok(Outcome { x, iterations: Some(i) });
        }

        let rho_old = rho;
        rho = r0.dot(&r);
        if rho.abs() < eps2 * r0_norm2 {
            // The shadow residual became orthogonal to r; restart from it.
            r = b - spmv(a, &x);
            r0 = r.clone();
            rho = r.norm_squared();
            r0_norm2 = rho;
            v.fill(0.0);
            p.fill(0.0);
            alpha = 1.0;
            w = 1.0;
            log::debug!("{method}: restart at iteration {i}");
        }

        let beta = (rho / rho_old) * (alpha / w);
        p = &r + (&p - &v * w) * beta;

        let y = precond.apply(&p);
        v = spmv(a, &y);
        let r0v = r0.dot(&v);
        if r0v == 0.0 {
            return Err(SolveError::Breakdown { method, iteration: i });
        }
        alpha = rho / r0v;
        let s = &r - &v * alpha;

        let z = precond.apply(&s);
        let t = spmv(a, &z);
        let tt = t.norm_squared();
        w = if tt > 0.0 { t.dot(&s) / tt } else { 0.0 };

        x.axpy(alpha, &y, 1.0);
        x.axpy(w, &z, 1.0);
        r = s - &t * w;

        if w == 0.0 && r.norm_squared() > threshold {
            return Err(SolveError::Breakdown { method, iteration: i });
        }
    }

    let res2 = r.norm_squared();
    if res2 <= threshold {
        return Ok(Outcome { x, iterations: Some(max_iterations) });
    }
    Err(SolveError::NotConverged {
        method,
        iterations: max_iterations,
        residual: (res2 / rhs_norm2).sqrt(),
    })
}

use std::time::Duration;

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::config::SolverConfig;
use crate::direct;
use crate::dispatch::routine;
use crate::error::SolveError;
use crate::matrix::{max_abs_deviation, relative_residual};
use crate::method::Method;
use crate::timer::ScopedTimer;

/// Diagnostics attached to a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveStats {
    pub method: Method,
    /// Krylov iterations; `None` for direct methods.
    pub iterations: Option<usize>,
    /// `‖b - A x‖ / ‖b‖`.
    pub residual: f64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub x: DVector<f64>,
    pub stats: SolveStats,
}

/// One row of a [`ProfileReport`].
#[derive(Debug, Clone)]
pub struct ProfileEntry {
    pub method: Method,
    /// The solve result, or why this method failed on the input.
    pub outcome: Result<SolveStats, SolveError>,
    /// Max absolute deviation from the reference (`Llt`) solution.
    pub max_deviation: Option<f64>,
}

/// Result of running every real method on the same system.
#[derive(Debug, Clone)]
pub struct ProfileReport {
    /// The `Llt` solution every other method is compared against.
    pub reference: Solution,
    pub entries: Vec<ProfileEntry>,
}

impl ProfileReport {
    pub fn entry(&self, method: Method) -> Option<&ProfileEntry> {
        self.entries.iter().find(|e| e.method == method)
    }
}

/// Sparse linear solver front-end.
///
/// Holds the method tag and iterative-solver configuration; every call is
/// independent and stateless otherwise.
#[derive(Debug, Clone, Default)]
pub struct LinearSolver {
    method: Method,
    config: SolverConfig,
}

impl LinearSolver {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            config: SolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves `A x = b` with the configured method.
    ///
    /// With [`Method::Profile`], every method runs and the `Llt` solution is
    /// returned.
    pub fn solve(&self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
        self.solve_with_stats(a, b).map(|s| s.x)
    }

    /// Like [`LinearSolver::solve`], keeping the per-solve diagnostics.
    pub fn solve_with_stats(
        &self,
        a: &CsrMatrix<f64>,
        b: &DVector<f64>,
    ) -> Result<Solution, SolveError> {
        check_square_system(a, b)?;

        if self.method == Method::Profile {
            return self.run_profile(a, b).map(|report| report.reference);
        }
        self.solve_using(self.method, a, b)
    }

    /// Runs every real method on `A x = b` and compares against `Llt`.
    ///
    /// Fails only if the inputs are invalid or the reference solve fails;
    /// other methods record their failure in the report.
    pub fn profile(&self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<ProfileReport, SolveError> {
        check_square_system(a, b)?;
        self.run_profile(a, b)
    }

    /// Least-squares solve via rectangular QR, regardless of the method tag.
    pub fn solve_least_squares(
        &self,
        a: &CsrMatrix<f64>,
        b: &DVector<f64>,
    ) -> Result<DVector<f64>, SolveError> {
        if b.len() != a.nrows() {
            return Err(SolveError::DimensionMismatch {
                rows: a.nrows(),
                rhs: b.len(),
            });
        }
        log::info!("solving least-squares problem using QR");
        let _timer = ScopedTimer::new("least-squares QR");
        direct::qr_least_squares(a, b)
    }

    fn solve_using(
        &self,
        method: Method,
        a: &CsrMatrix<f64>,
        b: &DVector<f64>,
    ) -> Result<Solution, SolveError> {
        let Some(f) = routine(method) else {
            return Err(SolveError::UnknownMethod(method.name().to_string()));
        };

        let timer = ScopedTimer::new(format!("solving using method: {method}"));
        if a.nrows() == 0 {
            log::debug!("{method}: empty system");
            return Ok(Solution {
                x: DVector::zeros(0),
                stats: SolveStats {
                    method,
                    iterations: method.is_iterative().then_some(0),
                    residual: 0.0,
                    elapsed: timer.elapsed(),
                },
            });
        }
        let out = f(a, b, &self.config)?;
        let elapsed = timer.elapsed();

        let residual = relative_residual(a, &out.x, b);
        Ok(Solution {
            x: out.x,
            stats: SolveStats {
                method,
                iterations: out.iterations,
                residual,
                elapsed,
            },
        })
    }

    fn run_profile(&self, a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<ProfileReport, SolveError> {
        log::info!("profiling all linear solvers");

        let reference = self.solve_using(Method::Llt, a, b)?;
        let mut entries = vec![ProfileEntry {
            method: Method::Llt,
            outcome: Ok(reference.stats.clone()),
            max_deviation: Some(0.0),
        }];

        for method in Method::REAL.into_iter().skip(1) {
            let entry = match self.solve_using(method, a, b) {
                Ok(sol) => {
                    let dev = max_abs_deviation(&sol.x, &reference.x);
                    log::info!("{method}: max deviation from LLT: {dev:e}");
                    ProfileEntry {
                        method,
                        outcome: Ok(sol.stats),
                        max_deviation: Some(dev),
                    }
                }
                Err(err) => {
                    log::warn!("{method}: {err}");
                    ProfileEntry {
                        method,
                        outcome: Err(err),
                        max_deviation: None,
                    }
                }
            };
            entries.push(entry);
        }

        Ok(ProfileReport { reference, entries })
    }
}

fn check_square_system(a: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<(), SolveError> {
    if a.nrows() != a.ncols() {
        return Err(SolveError::NotSquare {
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    if b.len() != a.nrows() {
        return Err(SolveError::DimensionMismatch {
            rows: a.nrows(),
            rhs: b.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::from_triplets;

    /// 5-point Laplacian on a `k × k` grid with Dirichlet boundary.
    fn poisson_2d(k: usize) -> CsrMatrix<f64> {
        let idx = |x: usize, y: usize| y * k + x;
        let mut t = Vec::new();
        for y in 0..k {
            for x in 0..k {
                let i = idx(x, y);
                t.push((i, i, 4.0));
                if x > 0 {
                    t.push((i, idx(x - 1, y), -1.0));
                }
                if x + 1 < k {
                    t.push((i, idx(x + 1, y), -1.0));
                }
                if y > 0 {
                    t.push((i, idx(x, y - 1), -1.0));
                }
                if y + 1 < k {
                    t.push((i, idx(x, y + 1), -1.0));
                }
            }
        }
        from_triplets(k * k, k * k, &t).unwrap()
    }

    fn ones(n: usize) -> DVector<f64> {
        DVector::from_element(n, 1.0)
    }

    #[test]
    fn every_method_solves_spd_system() {
        let a = poisson_2d(8);
        let b = ones(64);
        for m in Method::REAL.into_iter().chain([Method::Profile]) {
            let sol = LinearSolver::new(m).solve_with_stats(&a, &b).unwrap();
            assert!(sol.stats.residual < 1e-8, "{m}: residual {}", sol.stats.residual);
        }
    }

    #[test]
    fn iterative_stats_report_iterations() {
        let a = poisson_2d(6);
        let b = ones(36);
        let sol = LinearSolver::new(Method::ConjugateGradientDiag)
            .solve_with_stats(&a, &b)
            .unwrap();
        assert!(sol.stats.iterations.is_some());

        let sol = LinearSolver::new(Method::Llt).solve_with_stats(&a, &b).unwrap();
        assert_eq!(sol.stats.iterations, None);
    }

    /// Tridiagonal `(-1, 4, -1)`: eigenvalues lie in `(2, 6)`.
    fn tridiagonal(n: usize) -> CsrMatrix<f64> {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 4.0));
            if i > 0 {
                t.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
            }
        }
        from_triplets(n, n, &t).unwrap()
    }

    #[test]
    fn profile_deviation_is_within_configured_tolerance() {
        let n = 60;
        let a = tridiagonal(n);
        let b = DVector::from_fn(n, |i, _| (i as f64).sin() + 2.0);
        let config = SolverConfig::default()
            .with_cg_tolerance(1e-8)
            .with_bicgstab_tolerance(1e-9);
        let solver = LinearSolver::default().with_config(config);
        let report = solver.profile(&a, &b).unwrap();

        assert_eq!(report.entries.len(), Method::REAL.len());
        assert_eq!(report.entries[0].method, Method::Llt);
        assert!(report.entry(Method::Profile).is_none());

        // ‖x - x*‖ ≤ ‖r‖ / λmin and ‖b‖ ≤ λmax ‖x*‖, so the error is at most
        // (λmax / λmin) · tol · ‖x*‖ = 3 · tol · ‖x*‖.
        let x_norm = report.reference.x.norm();
        for entry in &report.entries {
            let tol = match entry.method {
                Method::ConjugateGradientDiag => solver.config().cg_tolerance,
                Method::BiCgStabDiag | Method::BiCgStabIlut => solver.config().bicgstab_tolerance,
                _ => 1e-12,
            };
            let dev = entry.max_deviation.expect("method succeeded");
            let bound = 3.0 * tol * x_norm * (1.0 + 1e-6);
            assert!(dev <= bound, "{}: deviation {dev:e} > {bound:e}", entry.method);
        }
    }

    #[test]
    fn empty_system_solves_to_empty_vector() {
        let a = from_triplets(0, 0, &[]).unwrap();
        let b = DVector::zeros(0);
        for m in Method::REAL.into_iter().chain([Method::Profile]) {
            let sol = LinearSolver::new(m).solve_with_stats(&a, &b).unwrap();
            assert_eq!(sol.x.len(), 0, "{m}");
            assert_eq!(sol.stats.residual, 0.0);
            assert_eq!(sol.stats.iterations, m.is_iterative().then_some(0));
        }

        let report = LinearSolver::default().profile(&a, &b).unwrap();
        assert!(report.entries.iter().all(|e| e.max_deviation == Some(0.0)));
        let x = LinearSolver::default().solve_least_squares(&a, &b).unwrap();
        assert_eq!(x.len(), 0);
    }

    #[test]
    fn single_unknown_every_method() {
        let a = from_triplets(1, 1, &[(0, 0, 4.0)]).unwrap();
        let b = DVector::from_vec(vec![2.0]);
        let mut solver = LinearSolver::default();
        for m in Method::REAL.into_iter().chain([Method::Profile]) {
            solver.set_method(m);
            assert_eq!(solver.method(), m);
            let x = solver.solve(&a, &b).unwrap();
            assert_eq!(x.len(), 1);
            assert!((x[0] - 0.5).abs() < 1e-14, "{m}: {}", x[0]);
        }
        let x = solver.solve_least_squares(&a, &b).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-14);
    }

    #[test]
    fn direct_methods_stay_sparse_on_large_grid() {
        let a = poisson_2d(60);
        let b = ones(3600);
        for m in [Method::Llt, Method::Ldlt, Method::Lu, Method::Qr] {
            let sol = LinearSolver::new(m).solve_with_stats(&a, &b).unwrap();
            assert!(sol.stats.residual < 1e-10, "{m}: residual {}", sol.stats.residual);
        }
    }

    #[test]
    fn profile_mode_returns_llt_solution() {
        let a = poisson_2d(4);
        let b = ones(16);
        let via_profile = LinearSolver::new(Method::Profile).solve(&a, &b).unwrap();
        let via_llt = LinearSolver::new(Method::Llt).solve(&a, &b).unwrap();
        assert_eq!(via_profile, via_llt);
    }

    #[test]
    fn profile_records_failures_without_aborting() {
        let a = poisson_2d(6);
        let b = ones(36);
        let solver = LinearSolver::default().with_config(SolverConfig::default().with_max_iterations(1));
        let report = solver.profile(&a, &b).unwrap();

        let cg = report.entry(Method::ConjugateGradientDiag).unwrap();
        assert!(matches!(cg.outcome, Err(SolveError::NotConverged { .. })));
        assert!(cg.max_deviation.is_none());
        assert!(report.entry(Method::Lu).unwrap().outcome.is_ok());
    }

    #[test]
    fn profile_fails_when_reference_fails() {
        let a = from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, -1.0)]).unwrap();
        let b = ones(2);
        let err = LinearSolver::new(Method::Profile).solve(&a, &b).unwrap_err();
        assert!(matches!(err, SolveError::Factorization { method: Method::Llt, .. }));
    }

    #[test]
    fn non_square_matrix_fails_before_solving() {
        // Also indefinite: a factorization attempt would report a different error.
        let a = from_triplets(2, 3, &[(0, 0, -1.0), (1, 1, -1.0)]).unwrap();
        let b = ones(2);
        for m in Method::REAL.into_iter().chain([Method::Profile]) {
            let err = LinearSolver::new(m).solve(&a, &b).unwrap_err();
            assert_eq!(err, SolveError::NotSquare { rows: 2, cols: 3 });
        }
    }

    #[test]
    fn rhs_length_mismatch_fails_before_solving() {
        let a = poisson_2d(3);
        let b = ones(4);
        for m in Method::REAL.into_iter().chain([Method::Profile]) {
            let err = LinearSolver::new(m).solve(&a, &b).unwrap_err();
            assert_eq!(err, SolveError::DimensionMismatch { rows: 9, rhs: 4 });
        }
        assert!(LinearSolver::default().profile(&a, &b).is_err());
    }

    #[test]
    fn least_squares_ignores_method_tag() {
        let a = from_triplets(
            3,
            2,
            &[(0, 0, 1.0), (1, 0, 1.0), (1, 1, 1.0), (2, 0, 1.0), (2, 1, 2.0)],
        )
        .unwrap();
        // Inconsistent system; the best fit of y = c0 + c1 t is c = [1/6, 3/2].
        let b = DVector::from_vec(vec![0.0, 2.0, 3.0]);
        for m in [Method::Llt, Method::BiCgStabIlut, Method::Profile] {
            let x = LinearSolver::new(m).solve_least_squares(&a, &b).unwrap();
            assert!((x[0] - 1.0 / 6.0).abs() < 1e-12);
            assert!((x[1] - 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn tall_rank_deficient_least_squares_is_rejected() {
        // Column 1 is never touched, so any multiple of e1 fits equally well.
        let a = from_triplets(4, 3, &[(0, 0, 1.0), (1, 0, 2.0), (2, 2, 1.0), (3, 2, -1.0)]).unwrap();
        let err = LinearSolver::default()
            .solve_least_squares(&a, &ones(4))
            .unwrap_err();
        assert!(matches!(err, SolveError::Factorization { method: Method::Qr, .. }));
    }

    #[test]
    fn least_squares_checks_rhs_length() {
        let a = from_triplets(3, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap();
        let err = LinearSolver::default()
            .solve_least_squares(&a, &ones(2))
            .unwrap_err();
        assert_eq!(err, SolveError::DimensionMismatch { rows: 3, rhs: 2 });
    }
}

/// Tuning knobs for the iterative back-ends.
///
/// Keep defaults conservative: they must converge on well-conditioned
/// problems without per-call tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Relative residual target for conjugate gradient (`‖r‖ ≤ tol·‖b‖`).
    pub cg_tolerance: f64,

    /// Relative residual target for both BiCGSTAB variants.
    pub bicgstab_tolerance: f64,

    /// Iteration cap. `None` means twice the system size.
    pub max_iterations: Option<usize>,

    /// ILUT drop tolerance, relative to each row's 2-norm.
    pub ilut_drop_tolerance: f64,

    /// ILUT fill factor: entries kept per factor row, as a multiple of the
    /// average row occupancy of `A`.
    pub ilut_fill_factor: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cg_tolerance: 1e-10,
            bicgstab_tolerance: 1e-10,
            max_iterations: None,
            ilut_drop_tolerance: 1e-12,
            ilut_fill_factor: 10,
        }
    }
}

impl SolverConfig {
    pub fn with_cg_tolerance(mut self, tol: f64) -> Self {
        self.cg_tolerance = tol;
        self
    }

    pub fn with_bicgstab_tolerance(mut self, tol: f64) -> Self {
        self.bicgstab_tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Resolves the iteration cap for a system with `n` unknowns.
    pub(crate) fn iteration_budget(&self, n: usize) -> usize {
        self.max_iterations.unwrap_or(2 * n).max(1)
    }
}

//! Method tag → routine table.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::method::Method;
use crate::{direct, iterative, ldlt};

/// Raw result of one back-end routine.
#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub x: DVector<f64>,
    /// Krylov iterations performed; `None` for direct factorizations.
    pub iterations: Option<usize>,
}

impl Outcome {
    pub(crate) fn direct(x: DVector<f64>) -> Self {
        Self { x, iterations: None }
    }
}

/// Signature shared by every back-end. Inputs are already dimension-checked.
pub(crate) type SolveFn =
    fn(&CsrMatrix<f64>, &DVector<f64>, &SolverConfig) -> Result<Outcome, SolveError>;

/// Returns the routine behind `method`, or `None` for [`Method::Profile`],
/// which is a composite of all the others.
pub(crate) fn routine(method: Method) -> Option<SolveFn> {
    let f: SolveFn = match method {
        Method::Llt => direct::llt,
        Method::Ldlt => ldlt::solve,
        Method::Lu => direct::lu,
        Method::Qr => direct::qr,
        Method::ConjugateGradientDiag => iterative::conjugate_gradient_diag,
        Method::BiCgStabDiag => iterative::bicgstab_diag,
        Method::BiCgStabIlut => iterative::bicgstab_ilut,
        Method::Profile => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_real_method_has_a_routine() {
        for m in Method::REAL {
            assert!(routine(m).is_some(), "{m} has no routine");
        }
        assert!(routine(Method::Profile).is_none());
    }
}

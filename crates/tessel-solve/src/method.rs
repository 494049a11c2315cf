use std::fmt;
use std::str::FromStr;

use crate::error::SolveError;

/// Solver back-end selector.
///
/// Declaration order matters: [`Method::Profile`] runs the real methods in
/// this order and compares every result against the first one (`Llt`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Method {
    /// Sparse Cholesky. Symmetric positive-definite input only.
    Llt,
    /// Simplicial LDLᵀ. Symmetric input, no pivoting.
    Ldlt,
    /// LU with partial pivoting. Inferior to `Llt` for symmetric problems.
    Lu,
    /// Householder QR. Slowest of the direct methods.
    Qr,
    /// Conjugate gradient with a diagonal (Jacobi) preconditioner.
    #[default]
    ConjugateGradientDiag,
    /// BiCGSTAB with a diagonal (Jacobi) preconditioner.
    BiCgStabDiag,
    /// BiCGSTAB with an incomplete LU (threshold) preconditioner.
    BiCgStabIlut,
    /// Runs every other method and logs the deviation from `Llt`.
    Profile,
}

impl Method {
    /// Every method that maps to a concrete routine, in profiling order.
    pub const REAL: [Method; 7] = [
        Method::Llt,
        Method::Ldlt,
        Method::Lu,
        Method::Qr,
        Method::ConjugateGradientDiag,
        Method::BiCgStabDiag,
        Method::BiCgStabIlut,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Method::Llt => "LLT",
            Method::Ldlt => "LDLT",
            Method::Lu => "LU",
            Method::Qr => "QR",
            Method::ConjugateGradientDiag => "ConjugateGradient_Diag",
            Method::BiCgStabDiag => "BiCGSTAB_Diag",
            Method::BiCgStabIlut => "BiCGSTAB_LUT",
            Method::Profile => "Profile",
        }
    }

    pub const fn is_iterative(self) -> bool {
        matches!(
            self,
            Method::ConjugateGradientDiag | Method::BiCgStabDiag | Method::BiCgStabIlut
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Method {
    type Err = SolveError;

    /// Parses the canonical names (`"LLT"`, `"BiCGSTAB_LUT"`, ...), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::REAL
            .into_iter()
            .chain(std::iter::once(Method::Profile))
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SolveError::UnknownMethod(s.to_string()))
    }
}

use std::fmt;

use crate::method::Method;

/// Errors produced by [`crate::LinearSolver`].
///
/// Dimension checks happen before any factorization or iteration starts, so a
/// `NotSquare` / `DimensionMismatch` never costs numerical work.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The system matrix is not square.
    NotSquare { rows: usize, cols: usize },
    /// The right-hand side does not match the matrix row count.
    DimensionMismatch { rows: usize, rhs: usize },
    /// Least-squares input with fewer equations than unknowns.
    Underdetermined { rows: usize, cols: usize },
    /// A direct factorization failed (singular or indefinite matrix).
    Factorization { method: Method, reason: String },
    /// An iterative method ran out of iterations above its tolerance.
    NotConverged {
        method: Method,
        iterations: usize,
        residual: f64,
    },
    /// An iterative method hit a zero denominator.
    Breakdown { method: Method, iteration: usize },
    /// A method name that does not map to any [`Method`].
    UnknownMethod(String),
    /// Triplet input that does not describe a valid sparse matrix.
    InvalidMatrix(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::NotSquare { rows, cols } => {
                write!(f, "invalid solve dimensions: matrix is {rows}x{cols}, not square")
            }
            SolveError::DimensionMismatch { rows, rhs } => write!(
                f,
                "invalid solve dimensions: matrix has {rows} rows but rhs has {rhs} entries"
            ),
            SolveError::Underdetermined { rows, cols } => write!(
                f,
                "least-squares system is underdetermined ({rows} equations, {cols} unknowns)"
            ),
            SolveError::Factorization { method, reason } => {
                write!(f, "{method} factorization failed: {reason}")
            }
            SolveError::NotConverged { method, iterations, residual } => write!(
                f,
                "{method} did not converge after {iterations} iterations (relative residual {residual:e})"
            ),
            SolveError::Breakdown { method, iteration } => {
                write!(f, "{method} broke down at iteration {iteration}")
            }
            SolveError::UnknownMethod(name) => write!(f, "unknown solver method `{name}`"),
            SolveError::InvalidMatrix(reason) => write!(f, "invalid sparse matrix: {reason}"),
        }
    }
}

impl std::error::Error for SolveError {}

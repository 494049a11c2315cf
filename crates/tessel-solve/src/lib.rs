//! Tessel sparse linear solver.
//!
//! One front-end ([`LinearSolver`]) over several back-ends selected by a
//! [`Method`] tag: direct factorizations (LLᵀ, LDLᵀ, LU, QR) and
//! preconditioned Krylov methods (CG, BiCGSTAB). [`Method::Profile`] runs all
//! of them and reports how far each strays from the Cholesky solution.
//!
//! ```rust,ignore
//! use tessel_solve::{matrix, LinearSolver, Method};
//!
//! let a = matrix::from_triplets(2, 2, &[(0, 0, 4.0), (1, 1, 2.0)])?;
//! let x = LinearSolver::new(Method::Llt).solve(&a, &b)?;
//! ```

mod config;
mod direct;
mod dispatch;
mod error;
mod iterative;
mod ldlt;
mod method;
mod precond;
mod solver;
mod timer;

pub mod matrix;

pub use config::SolverConfig;
pub use error::SolveError;
pub use method::Method;
pub use solver::{LinearSolver, ProfileEntry, ProfileReport, Solution, SolveStats};

pub use nalgebra::DVector;
pub use nalgebra_sparse::CsrMatrix;

//! Nonlinear algebraic solver for steady operating points.
//!
//! Newton iteration with backtracking line search and an optional lower
//! bound on the unknowns, plus finite-difference Jacobians. Used to locate
//! equilibria of the HPT rate law without time-stepping.

pub mod error;
pub mod jacobian;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use jacobian::{central_difference_jacobian, finite_difference_jacobian};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};

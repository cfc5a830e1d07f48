//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Smallest magnitude used to scale a perturbation. Hormone pools sit well
/// below 1, so an absolute floor of 1 would swamp the smaller ones.
const MIN_SCALE: f64 = 1e-3;

#[inline]
fn perturbation(x: f64, epsilon: f64) -> f64 {
    epsilon * x.abs().max(MIN_SCALE)
}

/// Compute Jacobian using forward finite differences.
///
/// Column j is `(f(x + h·e_j) - f(x)) / h` with `h = ε·max(|x_j|, 1e-3)`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let f_x = f(x)?;
    let mut jac = DMatrix::zeros(f_x.len(), x.len());
    let mut probe = x.clone();

    for j in 0..x.len() {
        let h = perturbation(x[j], epsilon);
        probe[j] = x[j] + h;
        let column = (f(&probe)? - &f_x) / h;
        jac.set_column(j, &column);
        probe[j] = x[j];
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (second order, 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let m = f(x)?.len();
    let mut jac = DMatrix::zeros(m, x.len());
    let mut probe = x.clone();

    for j in 0..x.len() {
        let h = perturbation(x[j], epsilon);
        probe[j] = x[j] + h;
        let f_plus = f(&probe)?;
        probe[j] = x[j] - h;
        let f_minus = f(&probe)?;
        probe[j] = x[j];
        jac.set_column(j, &((f_plus - f_minus) / (2.0 * h)));
    }

    Ok(jac)
}

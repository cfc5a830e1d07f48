//! Steady state of a two-pool chain with saturable elimination.
//!
//! x1' = s - a·x1
//! x2' = a·x1 - V·x2 / (K + x2)
//!
//! Steady state: x1 = s/a, x2 = K·s / (V - s).

use nalgebra::DVector;
use thy_solver::{NewtonConfig, SolverResult, finite_difference_jacobian, newton_solve};

const S: f64 = 0.6;
const A: f64 = 1.5;
const V: f64 = 2.0;
const K: f64 = 0.3;

fn residual(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
    Ok(DVector::from_vec(vec![
        S - A * x[0],
        A * x[0] - V * x[1] / (K + x[1]),
    ]))
}

#[test]
fn saturable_chain_reaches_analytic_steady_state() {
    let result = newton_solve(
        DVector::from_vec(vec![1.0, 1.0]),
        residual,
        |x| finite_difference_jacobian(x, residual, 1e-8),
        &NewtonConfig::default(),
    )
    .expect("chain should converge");

    assert!(result.converged);
    assert!((result.x[0] - S / A).abs() < 1e-9);
    assert!((result.x[1] - K * S / (V - S)).abs() < 1e-9);
    assert!(result.x.iter().all(|v| *v >= 0.0));
}

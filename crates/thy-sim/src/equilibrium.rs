//! Circadian-neutral equilibrium of the rate model.
//!
//! The TSH sinusoid vanishes at `t*`, the earliest non-negative hour where
//! `sin(π t/12 - p33)` is zero, so `f(t*, x) = 0` is an autonomous fixed
//! point. Oral pools are held empty and the FT accumulators are left out
//! of the solve; their derivatives are the free hormones, never zero.

use nalgebra::DVector;
use thy_core::{Compartment, ModelVariant};
use thy_model::RateModel;
use thy_solver::{NewtonConfig, SolverResult, central_difference_jacobian, newton_solve};

use crate::error::{SimError, SimResult};
use crate::sim::{SimOptions, run_to_point};

/// Compartments the solve moves.
fn free_compartments() -> impl Iterator<Item = Compartment> {
    ModelVariant::Baseline
        .compartments()
        .iter()
        .copied()
        .filter(|c| !Compartment::ORAL.contains(c))
}

#[derive(Clone, Debug)]
pub struct EquilibriumOptions {
    pub newton: NewtonConfig,
    /// Relative perturbation for the finite-difference Jacobian.
    pub fd_epsilon: f64,
    /// Hours to integrate the guess forward before solving; 0 skips it.
    pub settle_hours: f64,
    pub sim: SimOptions,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            fd_epsilon: 1e-6,
            settle_hours: 0.0,
            sim: SimOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Equilibrium {
    /// Full state for the model variant; accumulators keep the guess values.
    pub state: Vec<f64>,
    /// Evaluation hour of the residual.
    pub t: f64,
    /// Max |dx/dt| over the solved compartments.
    pub residual: f64,
    pub iterations: usize,
}

/// Integrate `guess` forward `hours` from t = 0 and return the end state.
pub fn settle(model: &RateModel, guess: &[f64], hours: f64, opts: &SimOptions) -> SimResult<Vec<f64>> {
    if !(hours.is_finite() && hours >= 0.0) {
        return Err(SimError::InvalidArg {
            what: "settle time must be finite and non-negative",
        });
    }
    Ok(run_to_point(model, guess, 0.0, hours, opts)?.state)
}

/// Newton solve for `f(t*, x) = 0` starting from `guess`.
pub fn find_equilibrium(
    model: &RateModel,
    guess: &[f64],
    opts: &EquilibriumOptions,
) -> SimResult<Equilibrium> {
    let n = model.dimension();
    if guess.len() != n {
        return Err(SimError::StateLength {
            expected: n,
            actual: guess.len(),
        });
    }
    if !(opts.fd_epsilon.is_finite() && opts.fd_epsilon > 0.0) {
        return Err(SimError::InvalidArg {
            what: "finite-difference epsilon must be positive",
        });
    }

    let mut base = if opts.settle_hours > 0.0 {
        settle(model, guess, opts.settle_hours, &opts.sim)?
    } else {
        guess.to_vec()
    };
    for c in Compartment::ORAL {
        base[c.index()] = 0.0;
    }

    let t_star = model.circadian_neutral_time();
    let free: Vec<usize> = free_compartments().map(Compartment::index).collect();
    let x0 = DVector::from_iterator(free.len(), free.iter().map(|&i| base[i]));

    let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
        let mut state = base.clone();
        for (slot, &i) in free.iter().enumerate() {
            state[i] = x[slot];
        }
        let mut dx = vec![0.0; n];
        model.derivative_into(t_star, &state, &mut dx);
        Ok(DVector::from_iterator(free.len(), free.iter().map(|&i| dx[i])))
    };
    let jacobian = |x: &DVector<f64>| central_difference_jacobian(x, residual, opts.fd_epsilon);

    tracing::debug!(t_star, unknowns = free.len(), "equilibrium solve started");
    let solved = newton_solve(x0, residual, jacobian, &opts.newton)?;

    for (slot, &i) in free.iter().enumerate() {
        base[i] = solved.x[slot];
    }
    tracing::info!(
        iterations = solved.iterations,
        residual = solved.residual_norm,
        "equilibrium found"
    );

    Ok(Equilibrium {
        state: base,
        t: t_star,
        residual: solved.residual_norm,
        iterations: solved.iterations,
    })
}

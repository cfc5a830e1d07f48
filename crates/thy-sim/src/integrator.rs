//! Time integrators: adaptive Dormand–Prince 5(4) and fixed-step RK4.

use std::ops::AddAssign;

use ode_solvers::dop_shared::OutputType;
use ode_solvers::dopri5::Dopri5;
use ode_solvers::{DVector, System};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::model::RateLaw;

/// Error control and step limits for the adaptive integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationTolerances {
    /// Absolute error tolerance
    pub abs: f64,
    /// Relative error tolerance
    pub rel: f64,
    /// Nominal smallest step (hours). Only caps the step budget of a call
    /// at `span / min_step`; `ode_solvers` has no step floor, so smaller
    /// steps are still taken
    pub min_step: f64,
    /// Largest step (hours)
    pub max_step: f64,
    /// Step budget per integrator call (safety limit)
    pub max_steps: usize,
}

impl Default for IntegrationTolerances {
    fn default() -> Self {
        Self {
            abs: 1e-10,
            rel: 1e-10,
            min_step: 1e-8,
            max_step: 100.0,
            max_steps: 100_000,
        }
    }
}

impl IntegrationTolerances {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.abs.is_finite() && self.abs > 0.0) {
            return Err(SimError::InvalidArg {
                what: "absolute tolerance must be positive",
            });
        }
        if !(self.rel.is_finite() && self.rel >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "relative tolerance must be non-negative",
            });
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "min_step must be positive",
            });
        }
        if !(self.max_step >= self.min_step) {
            return Err(SimError::InvalidArg {
                what: "max_step must be at least min_step",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        Ok(())
    }

    /// Steps allowed over `span`: the explicit budget, capped by how many
    /// `min_step`-sized steps fit. This is the only use of `min_step`.
    fn step_budget(&self, span: f64) -> u32 {
        let by_min_step = (span / self.min_step).ceil();
        (self.max_steps as f64)
            .min(by_min_step)
            .clamp(1.0, u32::MAX as f64) as u32
    }
}

/// Work done by one or more integrator calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub evaluations: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.evaluations += rhs.evaluations;
        self.accepted += rhs.accepted;
        self.rejected += rhs.rejected;
    }
}

/// Trait for time integrators.
pub trait Integrator {
    /// Advance `x` in place from `t0` to `t1` (`t1 >= t0`). The model sees
    /// absolute time throughout.
    fn integrate<M: RateLaw + ?Sized>(
        &self,
        model: &M,
        t0: f64,
        t1: f64,
        x: &mut [f64],
    ) -> SimResult<StepStats>;
}

fn check_call<M: RateLaw + ?Sized>(model: &M, t0: f64, t1: f64, x: &[f64]) -> SimResult<f64> {
    if x.len() != model.dimension() {
        return Err(SimError::StateLength {
            expected: model.dimension(),
            actual: x.len(),
        });
    }
    let span = t1 - t0;
    if !span.is_finite() || span < 0.0 {
        return Err(SimError::InvalidArg {
            what: "integration interval must be finite and forward in time",
        });
    }
    Ok(span)
}

fn ensure_finite_state(x: &[f64], t0: f64, t1: f64) -> SimResult<()> {
    thy_core::ensure_all_finite(x, "state").map_err(|e| SimError::Integration {
        t0,
        t1,
        message: e.to_string(),
    })
}

/// Adapter exposing a [`RateLaw`] as an `ode_solvers` system.
struct OdeSystem<'a, M: ?Sized> {
    model: &'a M,
}

impl<M: RateLaw + ?Sized> System<f64, DVector<f64>> for OdeSystem<'_, M> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        self.model.rhs(t, y.as_slice(), dy.as_mut_slice());
    }
}

/// Adaptive Dormand–Prince 5(4) backed by `ode_solvers`.
#[derive(Clone, Debug, Default)]
pub struct Dopri5Integrator {
    pub tolerances: IntegrationTolerances,
}

impl Dopri5Integrator {
    pub fn new(tolerances: IntegrationTolerances) -> Self {
        Self { tolerances }
    }
}

impl Integrator for Dopri5Integrator {
    fn integrate<M: RateLaw + ?Sized>(
        &self,
        model: &M,
        t0: f64,
        t1: f64,
        x: &mut [f64],
    ) -> SimResult<StepStats> {
        let span = check_call(model, t0, t1, x)?;
        if span == 0.0 {
            return Ok(StepStats::default());
        }
        let tol = &self.tolerances;

        // Sparse output records every accepted step; the last one is at t1.
        let mut stepper = Dopri5::from_param(
            OdeSystem { model },
            t0,
            t1,
            span,
            DVector::from_column_slice(x),
            tol.rel,
            tol.abs,
            0.9,
            0.04,
            0.2,
            10.0,
            tol.max_step.min(span),
            0.0,
            tol.step_budget(span),
            u32::MAX,
            OutputType::Sparse,
        );

        let stats = stepper.integrate().map_err(|e| SimError::Integration {
            t0,
            t1,
            message: e.to_string(),
        })?;
        let y_end = stepper.y_out().last().ok_or_else(|| SimError::Integration {
            t0,
            t1,
            message: "integrator produced no output".to_string(),
        })?;
        x.copy_from_slice(y_end.as_slice());
        ensure_finite_state(x, t0, t1)?;

        tracing::trace!(
            t0,
            t1,
            evaluations = stats.num_eval,
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            "dopri5 interval"
        );

        Ok(StepStats {
            evaluations: stats.num_eval as usize,
            accepted: stats.accepted_steps as usize,
            rejected: stats.rejected_steps as usize,
        })
    }
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
///
/// The interval is split into the fewest equal steps no longer than `step`,
/// so every call lands exactly on `t1`.
#[derive(Clone, Debug)]
pub struct Rk4 {
    pub step: f64,
    pub max_steps: usize,
}

impl Rk4 {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            max_steps: IntegrationTolerances::default().max_steps,
        }
    }
}

impl Integrator for Rk4 {
    fn integrate<M: RateLaw + ?Sized>(
        &self,
        model: &M,
        t0: f64,
        t1: f64,
        x: &mut [f64],
    ) -> SimResult<StepStats> {
        let span = check_call(model, t0, t1, x)?;
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "RK4 step must be positive",
            });
        }
        if span == 0.0 {
            return Ok(StepStats::default());
        }

        let steps = (span / self.step).ceil().max(1.0);
        if steps > self.max_steps as f64 {
            return Err(SimError::Integration {
                t0,
                t1,
                message: format!("{steps} RK4 steps exceed budget of {}", self.max_steps),
            });
        }
        let steps = steps as usize;
        let h = span / steps as f64;

        let n = x.len();
        let (mut k1, mut k2, mut k3, mut k4) = (vec![0.0; n], vec![0.0; n], vec![0.0; n], vec![0.0; n]);
        let mut probe = vec![0.0; n];

        for i in 0..steps {
            let t = t0 + i as f64 * h;

            model.rhs(t, x, &mut k1);
            for j in 0..n {
                probe[j] = x[j] + 0.5 * h * k1[j];
            }
            model.rhs(t + 0.5 * h, &probe, &mut k2);
            for j in 0..n {
                probe[j] = x[j] + 0.5 * h * k2[j];
            }
            model.rhs(t + 0.5 * h, &probe, &mut k3);
            for j in 0..n {
                probe[j] = x[j] + h * k3[j];
            }
            model.rhs(t + h, &probe, &mut k4);

            // x_new = x + (h/6) * (k1 + 2*k2 + 2*k3 + k4)
            for j in 0..n {
                x[j] += h / 6.0 * (k1[j] + 2.0 * k2[j] + 2.0 * k3[j] + k4[j]);
            }
        }
        ensure_finite_state(x, t0, t1)?;

        Ok(StepStats {
            evaluations: 4 * steps,
            accepted: steps,
            rejected: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x' = -k·x, plus a clock component y' = 1 to check absolute time.
    struct Decay {
        k: f64,
    }

    impl RateLaw for Decay {
        fn dimension(&self) -> usize {
            2
        }

        fn rhs(&self, _t: f64, x: &[f64], dxdt: &mut [f64]) {
            dxdt[0] = -self.k * x[0];
            dxdt[1] = 1.0;
        }
    }

    /// x' = cos(t): only correct if absolute time reaches the law.
    struct Forced;

    impl RateLaw for Forced {
        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&self, t: f64, _x: &[f64], dxdt: &mut [f64]) {
            dxdt[0] = t.cos();
        }
    }

    /// Blows up to NaN on the first evaluation.
    struct Poisoned;

    impl RateLaw for Poisoned {
        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&self, _t: f64, _x: &[f64], dxdt: &mut [f64]) {
            dxdt[0] = f64::NAN;
        }
    }

    #[test]
    fn tolerance_defaults() {
        let tol = IntegrationTolerances::default();
        assert_eq!(tol.abs, 1e-10);
        assert_eq!(tol.rel, 1e-10);
        assert_eq!(tol.min_step, 1e-8);
        assert_eq!(tol.max_step, 100.0);
        assert!(tol.validate().is_ok());
    }

    #[test]
    fn invalid_tolerances_rejected() {
        let tol = IntegrationTolerances {
            max_step: 1e-9,
            ..IntegrationTolerances::default()
        };
        assert!(matches!(tol.validate(), Err(SimError::InvalidArg { .. })));
        let tol = IntegrationTolerances {
            abs: 0.0,
            ..IntegrationTolerances::default()
        };
        assert!(tol.validate().is_err());
    }

    #[test]
    fn dopri5_exponential_decay() {
        let model = Decay { k: 0.7 };
        let mut x = vec![2.0, 0.0];
        let stats = Dopri5Integrator::default()
            .integrate(&model, 0.0, 3.0, &mut x)
            .unwrap();
        assert!((x[0] - 2.0 * (-0.7f64 * 3.0).exp()).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
        assert!(stats.accepted > 0 && stats.evaluations > stats.accepted);
    }

    #[test]
    fn dopri5_sees_absolute_time() {
        let mut x = vec![0.0];
        Dopri5Integrator::default()
            .integrate(&Forced, 5.0, 6.0, &mut x)
            .unwrap();
        assert!((x[0] - (6.0f64.sin() - 5.0f64.sin())).abs() < 1e-9);
    }

    #[test]
    fn dopri5_forced_time_is_composable() {
        // [5, 7] in one call vs. [5, 6] then [6, 7]
        let integrator = Dopri5Integrator::default();
        let mut whole = vec![0.0];
        integrator.integrate(&Forced, 5.0, 7.0, &mut whole).unwrap();
        let mut split = vec![0.0];
        integrator.integrate(&Forced, 5.0, 6.0, &mut split).unwrap();
        integrator.integrate(&Forced, 6.0, 7.0, &mut split).unwrap();
        let exact = 7.0f64.sin() - 5.0f64.sin();
        assert!((whole[0] - exact).abs() < 1e-9);
        assert!((whole[0] - split[0]).abs() < 1e-9);
    }

    #[test]
    fn non_finite_state_is_an_integration_error() {
        let mut x = vec![1.0];
        let err = Rk4::new(0.1).integrate(&Poisoned, 0.0, 1.0, &mut x).unwrap_err();
        assert!(matches!(err, SimError::Integration { t0, t1, .. } if t0 == 0.0 && t1 == 1.0));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn rk4_exponential_decay() {
        let model = Decay { k: 0.7 };
        let mut x = vec![2.0, 0.0];
        let stats = Rk4::new(0.01).integrate(&model, 1.0, 2.5, &mut x).unwrap();
        assert!((x[0] - 2.0 * (-0.7f64 * 1.5).exp()).abs() < 1e-9);
        assert_eq!(stats.accepted, 150);
        assert_eq!(stats.evaluations, 600);
    }

    #[test]
    fn zero_span_is_identity() {
        let model = Decay { k: 0.7 };
        let mut x = vec![1.25, 4.0];
        let stats = Dopri5Integrator::default()
            .integrate(&model, 7.0, 7.0, &mut x)
            .unwrap();
        assert_eq!(x, vec![1.25, 4.0]);
        assert_eq!(stats, StepStats::default());
    }

    #[test]
    fn backwards_interval_rejected() {
        let model = Decay { k: 0.7 };
        let mut x = vec![1.0, 0.0];
        let err = Rk4::new(0.1).integrate(&model, 2.0, 1.0, &mut x).unwrap_err();
        assert!(matches!(err, SimError::InvalidArg { .. }));
    }

    #[test]
    fn wrong_state_length_rejected() {
        let model = Decay { k: 0.7 };
        let mut x = vec![1.0];
        let err = Dopri5Integrator::default()
            .integrate(&model, 0.0, 1.0, &mut x)
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::StateLength {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn exhausted_step_budget_is_integration_error() {
        let model = Decay { k: 0.7 };
        let mut x = vec![1.0, 0.0];
        let integrator = Dopri5Integrator::new(IntegrationTolerances {
            max_steps: 3,
            max_step: 1.0,
            ..IntegrationTolerances::default()
        });
        let err = integrator.integrate(&model, 0.0, 50.0, &mut x).unwrap_err();
        assert!(matches!(err, SimError::Integration { .. }));
    }

    #[test]
    fn step_stats_accumulate() {
        let mut total = StepStats::default();
        total += StepStats {
            evaluations: 12,
            accepted: 1,
            rejected: 0,
        };
        total += StepStats {
            evaluations: 24,
            accepted: 2,
            rejected: 1,
        };
        assert_eq!(
            total,
            StepStats {
                evaluations: 36,
                accepted: 3,
                rejected: 1
            }
        );
    }
}

//! Simulation driver: point mode and hourly series mode.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thy_model::{Infusions, RateModel};

use crate::error::{SimError, SimResult};
use crate::integrator::{Dopri5Integrator, IntegrationTolerances, Integrator, Rk4, StepStats};
use crate::output::{OutputSeries, PointResult};
use crate::protocol::{DosingProtocol, TIME_EPS};

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegratorType {
    /// Adaptive Dormand–Prince 5(4) (default).
    #[default]
    Dopri5,
    /// Fixed-step RK4 with the given maximum step (hours).
    Rk4 { step: f64 },
}

/// Options for simulation runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimOptions {
    #[serde(default)]
    pub integrator: IntegratorType,
    #[serde(default)]
    pub tolerances: IntegrationTolerances,
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        self.tolerances.validate()?;
        if let IntegratorType::Rk4 { step } = self.integrator {
            if !(step.is_finite() && step > 0.0) {
                return Err(SimError::InvalidArg {
                    what: "RK4 step must be positive",
                });
            }
        }
        Ok(())
    }
}

/// Cooperative cancellation shared between a run and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress report emitted after each completed unit step.
#[derive(Clone, Copy, Debug)]
pub struct SimProgress {
    pub t: f64,
    pub t_start: f64,
    pub t_end: f64,
    pub stats: StepStats,
}

impl SimProgress {
    pub fn fraction_complete(&self) -> f64 {
        let span = self.t_end - self.t_start;
        if span > 0.0 {
            ((self.t - self.t_start) / span).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Optional collaborators of a run.
#[derive(Default)]
pub struct RunHooks<'a> {
    pub protocol: Option<&'a DosingProtocol>,
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a mut dyn FnMut(SimProgress)>,
}

fn integrate_span(
    model: &RateModel,
    opts: &SimOptions,
    t0: f64,
    t1: f64,
    x: &mut [f64],
) -> SimResult<StepStats> {
    match opts.integrator {
        IntegratorType::Dopri5 => Dopri5Integrator::new(opts.tolerances).integrate(model, t0, t1, x),
        IntegratorType::Rk4 { step } => Rk4 {
            step,
            max_steps: opts.tolerances.max_steps,
        }
        .integrate(model, t0, t1, x),
    }
}

/// Walks the dosing schedule while the integrator advances the state.
struct Schedule<'a> {
    protocol: Option<&'a DosingProtocol>,
    next_bolus: usize,
}

impl<'a> Schedule<'a> {
    fn new(protocol: Option<&'a DosingProtocol>, t_start: f64) -> Self {
        let next_bolus = protocol.map_or(0, |p| p.first_bolus_from(t_start));
        Self {
            protocol,
            next_bolus,
        }
    }

    fn apply_due(&mut self, t: f64, x: &mut [f64]) {
        let Some(protocol) = self.protocol else {
            return;
        };
        let boluses = protocol.boluses();
        while let Some(b) = boluses.get(self.next_bolus) {
            if b.at > t + TIME_EPS {
                break;
            }
            if let Some(slot) = x.get_mut(b.compartment.index()) {
                *slot += b.amount;
            }
            tracing::debug!(t, compartment = b.compartment.name(), amount = b.amount, "dose applied");
            self.next_bolus += 1;
        }
    }

    /// Model for the segment starting at `t0`, with any active infusions
    /// added to the base rates.
    fn model_for<'m>(&self, base: &'m RateModel, t0: f64, t1: f64) -> SimResult<Cow<'m, RateModel>> {
        let Some(protocol) = self.protocol else {
            return Ok(Cow::Borrowed(base));
        };
        let extra = protocol.infusion_rates_at(0.5 * (t0 + t1));
        if extra == Infusions::default() {
            return Ok(Cow::Borrowed(base));
        }
        let u = base.params().infusions();
        let model = base.with_infusions(Infusions::new(u.t4 + extra.t4, u.t3 + extra.t3))?;
        Ok(Cow::Owned(model))
    }

    /// Advance `x` over `[t0, t1]`, applying doses due at each instant
    /// before integrating past it and splitting at every schedule edge.
    fn advance(
        &mut self,
        base: &RateModel,
        opts: &SimOptions,
        t0: f64,
        t1: f64,
        x: &mut [f64],
    ) -> SimResult<StepStats> {
        let mut stats = StepStats::default();
        let mut cur = t0;
        while cur < t1 {
            self.apply_due(cur, x);
            let next = self
                .protocol
                .and_then(|p| p.next_breakpoint_after(cur))
                .map_or(t1, |b| b.min(t1));
            let model = self.model_for(base, cur, next)?;
            stats += integrate_span(&model, opts, cur, next, x)?;
            cur = next;
        }
        Ok(stats)
    }
}

fn check_state(model: &RateModel, state0: &[f64]) -> SimResult<()> {
    if state0.len() != model.dimension() {
        return Err(SimError::StateLength {
            expected: model.dimension(),
            actual: state0.len(),
        });
    }
    if state0.iter().any(|v| !v.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "initial state must be finite",
        });
    }
    Ok(())
}

fn check_cancel(cancel: Option<&CancelToken>, t: f64) -> SimResult<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SimError::Cancelled { t }),
        _ => Ok(()),
    }
}

/// Integrate once from `t_start` to `t_end` and return the terminal state.
pub fn run_to_point(
    model: &RateModel,
    state0: &[f64],
    t_start: f64,
    t_end: f64,
    opts: &SimOptions,
) -> SimResult<PointResult> {
    run_to_point_with(model, state0, t_start, t_end, opts, RunHooks::default())
}

/// [`run_to_point`] with a dosing protocol, cancellation and progress.
pub fn run_to_point_with(
    model: &RateModel,
    state0: &[f64],
    t_start: f64,
    t_end: f64,
    opts: &SimOptions,
    mut hooks: RunHooks<'_>,
) -> SimResult<PointResult> {
    opts.validate()?;
    check_state(model, state0)?;
    if !(t_start.is_finite() && t_end.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "time bounds must be finite",
        });
    }
    if t_end < t_start {
        return Err(SimError::InvalidHorizon {
            t_start: t_start.floor() as i64,
            t_end: t_end.floor() as i64,
        });
    }
    check_cancel(hooks.cancel, t_start)?;

    tracing::info!(variant = ?model.variant(), t_start, t_end, "point run started");

    let mut x = state0.to_vec();
    let mut schedule = Schedule::new(hooks.protocol, t_start);
    let stats = schedule.advance(model, opts, t_start, t_end, &mut x)?;

    if let Some(cb) = hooks.progress.as_mut() {
        cb(SimProgress {
            t: t_end,
            t_start,
            t_end,
            stats,
        });
    }
    tracing::info!(t_end, evaluations = stats.evaluations, "point run finished");

    Ok(PointResult {
        t: t_end,
        variant: model.variant(),
        state: x,
        stats,
    })
}

/// Hourly series from `t_start` to `t_end` inclusive.
///
/// For every integer hour the current state and its FT4/FT3 are recorded
/// before integrating to the next hour, giving `t_end - t_start + 1`
/// samples. Each unit step is integrated with absolute time.
pub fn run_series(
    model: &RateModel,
    state0: &[f64],
    t_start: i64,
    t_end: i64,
    opts: &SimOptions,
) -> SimResult<OutputSeries> {
    run_series_with(model, state0, t_start, t_end, opts, RunHooks::default())
}

/// [`run_series`] with a dosing protocol, cancellation and progress.
pub fn run_series_with(
    model: &RateModel,
    state0: &[f64],
    t_start: i64,
    t_end: i64,
    opts: &SimOptions,
    mut hooks: RunHooks<'_>,
) -> SimResult<OutputSeries> {
    opts.validate()?;
    check_state(model, state0)?;
    if t_end < t_start {
        return Err(SimError::InvalidHorizon { t_start, t_end });
    }

    let samples = usize::try_from(t_end - t_start)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(SimError::InvalidArg {
            what: "horizon too long",
        })?;
    tracing::info!(variant = ?model.variant(), t_start, t_end, samples, "series run started");

    let mut series = OutputSeries::with_capacity(model.variant(), samples);
    let mut schedule = Schedule::new(hooks.protocol, t_start as f64);
    let mut stats = StepStats::default();
    let mut x = state0.to_vec();

    for hour in t_start..=t_end {
        let t = hour as f64;
        series.push(t, &x, model.free_hormones(&x));
        if hour == t_end {
            break;
        }
        check_cancel(hooks.cancel, t)?;
        stats += schedule.advance(model, opts, t, t + 1.0, &mut x)?;

        if let Some(cb) = hooks.progress.as_mut() {
            cb(SimProgress {
                t: t + 1.0,
                t_start: t_start as f64,
                t_end: t_end as f64,
                stats,
            });
        }
    }

    series.set_stats(stats);
    tracing::info!(
        samples = series.len(),
        evaluations = stats.evaluations,
        rejected = stats.rejected,
        "series run finished"
    );
    Ok(series)
}

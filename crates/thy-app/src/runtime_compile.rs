//! Compile a scenario into runtime objects: model, dosing protocol and
//! integrator options.

use std::path::Path;

use thy_core::{Time, days, micrograms};
use thy_model::{ParameterSource, RateModel};
use thy_scenario::{HormoneDef, InitialDef, InputDef, IntegratorDef, Scenario, SolverDef};
use thy_sim::{DosingProtocol, Hormone, IntegrationTolerances, IntegratorType, SimOptions};

use crate::error::{AppError, AppResult};

/// Everything needed to run one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRuntime {
    pub model: RateModel,
    pub protocol: DosingProtocol,
    pub options: SimOptions,
    pub initial: InitialDef,
    pub start_hour: i64,
    pub end_hour: i64,
}

pub fn compile_scenario(scenario: &Scenario, config_dir: Option<&Path>) -> AppResult<ScenarioRuntime> {
    thy_scenario::validate_scenario(scenario)?;

    let source = ParameterSource::resolve(&scenario.parameter_set, config_dir)?;
    let params = source.parameter_set(scenario.dials, scenario.infusions)?;
    let model = RateModel::new(params, scenario.variant);

    let protocol = build_protocol(&scenario.inputs)?;
    let options = build_sim_options(&scenario.solver);
    options
        .validate()
        .map_err(|e| AppError::Compile(e.to_string()))?;

    tracing::debug!(
        scenario = %scenario.name,
        parameter_set = source.id(),
        inputs = scenario.inputs.len(),
        "scenario compiled"
    );

    Ok(ScenarioRuntime {
        model,
        protocol,
        options,
        initial: scenario.initial.clone(),
        start_hour: scenario.start_hour,
        end_hour: scenario.end_hour,
    })
}

fn hormone(def: HormoneDef) -> Hormone {
    match def {
        HormoneDef::T4 => Hormone::T4,
        HormoneDef::T3 => Hormone::T3,
    }
}

/// Start of calendar day `day` (day 1 starts at hour 0).
fn day_start(day: f64) -> Time {
    days(day - 1.0)
}

/// End of calendar day `day`.
fn day_end(day: f64) -> Time {
    days(day)
}

pub fn build_protocol(inputs: &[InputDef]) -> AppResult<DosingProtocol> {
    let mut protocol = DosingProtocol::new();
    for (i, input) in inputs.iter().enumerate() {
        let scheduled = match *input {
            InputDef::Oral {
                hormone: h,
                dose_ug,
                start_day,
                end_day,
                interval_days,
            } => {
                // Without an interval the dose is given once.
                let repeat = interval_days.map(|every| (end_day.unwrap_or(start_day), every));
                protocol.add_oral(
                    hormone(h),
                    micrograms(dose_ug),
                    day_start(start_day),
                    repeat.map(|(end, _)| day_start(end)),
                    repeat.map(|(_, every)| days(every)),
                )
            }
            InputDef::IvPulse {
                hormone: h,
                dose_ug,
                start_day,
            } => protocol.add_iv_pulse(hormone(h), micrograms(dose_ug), day_start(start_day)),
            InputDef::Infusion {
                hormone: h,
                dose_ug_per_day,
                start_day,
                end_day,
            } => protocol.add_infusion(
                hormone(h),
                micrograms(dose_ug_per_day),
                day_start(start_day),
                end_day.map(day_end),
            ),
        };
        scheduled.map_err(|e| AppError::Compile(format!("input {} ({}): {}", i, input.kind_name(), e)))?;
    }
    Ok(protocol)
}

pub fn build_sim_options(solver: &SolverDef) -> SimOptions {
    let defaults = IntegrationTolerances::default();
    SimOptions {
        integrator: match solver.method {
            IntegratorDef::Dopri5 => IntegratorType::Dopri5,
            IntegratorDef::Rk4 { step_h } => IntegratorType::Rk4 { step: step_h },
        },
        tolerances: IntegrationTolerances {
            abs: solver.abs_tol.unwrap_or(defaults.abs),
            rel: solver.rel_tol.unwrap_or(defaults.rel),
            min_step: solver.min_step_h.unwrap_or(defaults.min_step),
            max_step: solver.max_step_h.unwrap_or(defaults.max_step),
            max_steps: solver.max_steps.unwrap_or(defaults.max_steps),
        },
    }
}

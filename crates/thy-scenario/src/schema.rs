//! Scenario schema definitions.

use serde::{Deserialize, Serialize};
use thy_core::ModelVariant;
use thy_model::{BUILTIN_ID, Dials, Infusions};

/// One simulation experiment: model, horizon, dials and dosing inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameter set id: the embedded set or `<config_dir>/<id>.params`.
    #[serde(default = "default_parameter_set")]
    pub parameter_set: String,
    #[serde(default)]
    pub variant: ModelVariant,
    #[serde(default)]
    pub initial: InitialDef,
    pub start_hour: i64,
    pub end_hour: i64,
    #[serde(default)]
    pub dials: Dials,
    /// Constant background infusions (µmol/h).
    #[serde(default)]
    pub infusions: Infusions,
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    #[serde(default)]
    pub solver: SolverDef,
}

fn default_parameter_set() -> String {
    BUILTIN_ID.to_string()
}

impl Scenario {
    /// Horizon length in hours.
    pub fn duration_hours(&self) -> i64 {
        self.end_hour - self.start_hour
    }
}

/// Where the initial state comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialDef {
    /// Published euthyroid state.
    #[default]
    Reference,
    /// Circadian-neutral equilibrium for the scenario's dials, searched
    /// from the reference state after integrating it `settle_hours`.
    Equilibrium {
        #[serde(default)]
        settle_hours: f64,
    },
    /// Explicit values: 19 compartments, or the full variant state.
    Explicit { values: Vec<f64> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HormoneDef {
    T4,
    T3,
}

/// Dosing input. Days are calendar days of the run: day 1 starts at the
/// first hour of the simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputDef {
    /// Oral dose at `start_day`, repeated every `interval_days` through
    /// `end_day` when both are given.
    Oral {
        hormone: HormoneDef,
        dose_ug: f64,
        start_day: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_day: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval_days: Option<f64>,
    },
    /// Intravenous bolus at the start of `start_day`.
    IvPulse {
        hormone: HormoneDef,
        dose_ug: f64,
        start_day: f64,
    },
    /// Constant infusion from the start of `start_day` to the end of
    /// `end_day` (open-ended when absent).
    Infusion {
        hormone: HormoneDef,
        dose_ug_per_day: f64,
        start_day: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_day: Option<f64>,
    },
}

impl InputDef {
    pub fn hormone(&self) -> HormoneDef {
        match self {
            InputDef::Oral { hormone, .. }
            | InputDef::IvPulse { hormone, .. }
            | InputDef::Infusion { hormone, .. } => *hormone,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            InputDef::Oral { .. } => "oral",
            InputDef::IvPulse { .. } => "iv_pulse",
            InputDef::Infusion { .. } => "infusion",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegratorDef {
    #[default]
    Dopri5,
    Rk4 { step_h: f64 },
}

/// Integrator settings; absent fields keep the simulator defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default)]
    pub method: IntegratorDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_step_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

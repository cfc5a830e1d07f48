//! Scenario validation logic.

use thy_core::state::BASELINE_DIM;

use crate::schema::{InitialDef, InputDef, IntegratorDef, Scenario, SolverDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Missing value: {field}")]
    Missing { field: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite_non_negative(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() || v < 0.0 {
        return Err(invalid(field, v, "must be non-negative and finite"));
    }
    Ok(())
}

fn positive(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() || v <= 0.0 {
        return Err(invalid(field, v, "must be positive and finite"));
    }
    Ok(())
}

fn calendar_day(field: String, day: f64) -> Result<(), ValidationError> {
    if !day.is_finite() || day < 1.0 {
        return Err(invalid(field, day, "days are numbered from 1"));
    }
    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "name".to_string(),
        });
    }
    if scenario.parameter_set.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "parameter_set".to_string(),
        });
    }
    if scenario.end_hour < scenario.start_hour {
        return Err(invalid(
            "end_hour",
            scenario.end_hour,
            "must not precede start_hour",
        ));
    }

    validate_initial(scenario)?;

    for (name, value) in ["t4_secretion", "t4_absorption", "t3_secretion", "t3_absorption"]
        .into_iter()
        .zip(scenario.dials.as_array())
    {
        finite_non_negative(format!("dials.{name}"), value)?;
    }
    for (name, value) in [("t4", scenario.infusions.t4), ("t3", scenario.infusions.t3)] {
        if !value.is_finite() {
            return Err(invalid(format!("infusions.{name}"), value, "must be finite"));
        }
    }

    for (i, input) in scenario.inputs.iter().enumerate() {
        validate_input(i, input)?;
    }

    validate_solver(&scenario.solver)
}

fn validate_initial(scenario: &Scenario) -> Result<(), ValidationError> {
    match &scenario.initial {
        InitialDef::Reference => Ok(()),
        InitialDef::Equilibrium { settle_hours } => {
            finite_non_negative("initial.settle_hours", *settle_hours)
        }
        InitialDef::Explicit { values } => {
            let full = scenario.variant.dimension();
            if values.len() != BASELINE_DIM && values.len() != full {
                return Err(invalid(
                    "initial.values",
                    values.len(),
                    "length must match the model state",
                ));
            }
            for (i, v) in values.iter().enumerate() {
                finite_non_negative(format!("initial.values[{i}]"), *v)?;
            }
            Ok(())
        }
    }
}

fn validate_input(i: usize, input: &InputDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("inputs[{i}].{name}");
    match input {
        InputDef::Oral {
            dose_ug,
            start_day,
            end_day,
            interval_days,
            ..
        } => {
            finite_non_negative(field("dose_ug"), *dose_ug)?;
            calendar_day(field("start_day"), *start_day)?;
            if let Some(end) = end_day
                && !(end.is_finite() && end >= start_day)
            {
                return Err(invalid(field("end_day"), end, "must not precede start_day"));
            }
            if let Some(every) = interval_days {
                positive(field("interval_days"), *every)?;
            }
            Ok(())
        }
        InputDef::IvPulse {
            dose_ug, start_day, ..
        } => {
            finite_non_negative(field("dose_ug"), *dose_ug)?;
            calendar_day(field("start_day"), *start_day)
        }
        InputDef::Infusion {
            dose_ug_per_day,
            start_day,
            end_day,
            ..
        } => {
            finite_non_negative(field("dose_ug_per_day"), *dose_ug_per_day)?;
            calendar_day(field("start_day"), *start_day)?;
            if let Some(end) = end_day
                && !(end.is_finite() && end >= start_day)
            {
                return Err(invalid(field("end_day"), end, "must not precede start_day"));
            }
            Ok(())
        }
    }
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    if let IntegratorDef::Rk4 { step_h } = solver.method {
        positive("solver.method.step_h", step_h)?;
    }
    if let Some(v) = solver.abs_tol {
        positive("solver.abs_tol", v)?;
    }
    if let Some(v) = solver.rel_tol {
        finite_non_negative("solver.rel_tol", v)?;
    }
    if let Some(v) = solver.min_step_h {
        positive("solver.min_step_h", v)?;
    }
    if let Some(v) = solver.max_step_h {
        positive("solver.max_step_h", v)?;
    }
    if solver.max_steps == Some(0) {
        return Err(invalid("solver.max_steps", 0, "must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::preset;
    use crate::schema::HormoneDef;

    fn base() -> Scenario {
        preset("default").unwrap()
    }

    #[test]
    fn presets_are_valid() {
        for name in crate::presets::PRESET_NAMES {
            validate_scenario(&preset(name).unwrap()).unwrap();
        }
    }

    #[test]
    fn reversed_horizon() {
        let mut s = base();
        s.start_hour = 10;
        s.end_hour = 5;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::InvalidValue { field, .. }) if field == "end_hour"
        ));
    }

    #[test]
    fn empty_horizon_is_allowed() {
        let mut s = base();
        s.end_hour = s.start_hour;
        validate_scenario(&s).unwrap();
    }

    #[test]
    fn explicit_initial_length() {
        let mut s = base();
        s.initial = InitialDef::Explicit {
            values: vec![0.1; 18],
        };
        assert!(validate_scenario(&s).is_err());

        s.initial = InitialDef::Explicit {
            values: vec![0.1; 19],
        };
        validate_scenario(&s).unwrap();

        // Full extended state needs the extended variant.
        s.initial = InitialDef::Explicit {
            values: vec![0.1; 21],
        };
        assert!(validate_scenario(&s).is_err());
        s.variant = thy_core::ModelVariant::Extended;
        validate_scenario(&s).unwrap();
    }

    #[test]
    fn negative_dial() {
        let mut s = base();
        s.dials.t3_secretion = -0.1;
        let err = validate_scenario(&s).unwrap_err();
        assert!(err.to_string().contains("dials.t3_secretion"));
    }

    #[test]
    fn nan_infusion() {
        let mut s = base();
        s.infusions.t4 = f64::NAN;
        assert!(validate_scenario(&s).is_err());
    }

    #[test]
    fn malformed_inputs() {
        let oral = |dose_ug, start_day, end_day, interval_days| InputDef::Oral {
            hormone: HormoneDef::T4,
            dose_ug,
            start_day,
            end_day,
            interval_days,
        };
        let cases = [
            oral(-1.0, 1.0, None, None),
            oral(10.0, 0.0, None, None),
            oral(10.0, 5.0, Some(4.0), Some(1.0)),
            oral(10.0, 1.0, Some(4.0), Some(0.0)),
            InputDef::Infusion {
                hormone: HormoneDef::T3,
                dose_ug_per_day: 5.0,
                start_day: 3.0,
                end_day: Some(2.0),
            },
            InputDef::IvPulse {
                hormone: HormoneDef::T3,
                dose_ug: f64::INFINITY,
                start_day: 1.0,
            },
        ];
        for input in cases {
            let mut s = base();
            s.inputs = vec![input.clone()];
            let err = validate_scenario(&s).unwrap_err();
            assert!(err.to_string().contains("inputs[0]"), "{input:?}: {err}");
        }
    }

    #[test]
    fn future_version_rejected() {
        let mut s = base();
        s.version = crate::migrate::LATEST_VERSION + 1;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn solver_settings_checked() {
        let mut s = base();
        s.solver.method = IntegratorDef::Rk4 { step_h: 0.0 };
        assert!(validate_scenario(&s).is_err());
        s.solver.method = IntegratorDef::Rk4 { step_h: 0.05 };
        s.solver.max_steps = Some(0);
        assert!(validate_scenario(&s).is_err());
    }
}

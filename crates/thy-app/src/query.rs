//! Query helpers for extracting data from finished runs.

use serde::Serialize;
use thy_model::{ClinicalReadout, ParameterSet};
use thy_sim::OutputSeries;

use crate::error::{AppError, AppResult};

/// Summary of a series run's time range and data.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub sample_count: usize,
    pub field_count: usize,
}

pub fn get_run_summary(series: &OutputSeries) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (series.time().first(), series.time().last()) else {
        return Err(AppError::InvalidInput("No samples in run".to_string()));
    };
    Ok(RunSummary {
        time_range: (*first, *last),
        sample_count: series.len(),
        field_count: series.field_names().len(),
    })
}

/// `(t, value)` pairs for one field (`t`, a compartment name, `ft4`, `ft3`).
pub fn extract_series(series: &OutputSeries, field: &str) -> AppResult<Vec<(f64, f64)>> {
    let values = series
        .field(field)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown field: {}", field)))?;
    Ok(series
        .time()
        .iter()
        .copied()
        .zip(values.iter().copied())
        .collect())
}

/// Smallest and largest sample of a field and the hours they occur at.
/// Ties resolve to the earliest hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extrema {
    pub min: f64,
    pub t_min: f64,
    pub max: f64,
    pub t_max: f64,
}

pub fn field_extrema(series: &OutputSeries, field: &str) -> AppResult<Extrema> {
    let points = extract_series(series, field)?;
    let mut iter = points.into_iter();
    let Some((t0, v0)) = iter.next() else {
        return Err(AppError::InvalidInput("No samples in run".to_string()));
    };
    let mut ext = Extrema {
        min: v0,
        t_min: t0,
        max: v0,
        t_max: t0,
    };
    for (t, v) in iter {
        if v < ext.min {
            ext.min = v;
            ext.t_min = t;
        }
        if v > ext.max {
            ext.max = v;
            ext.t_max = t;
        }
    }
    Ok(ext)
}

/// Clinical readout at every sample hour.
pub fn clinical_series(
    series: &OutputSeries,
    params: &ParameterSet,
) -> AppResult<Vec<(f64, ClinicalReadout)>> {
    (0..series.len())
        .map(|i| {
            let state = series
                .state_at(i)
                .ok_or_else(|| AppError::InvalidInput(format!("Sample {} out of range", i)))?;
            Ok((series.time()[i], ClinicalReadout::from_state(params, &state)))
        })
        .collect()
}

/// Clinical readout of a single state vector.
pub fn clinical_readout(params: &ParameterSet, state: &[f64]) -> AppResult<ClinicalReadout> {
    if state.len() < thy_core::state::BASELINE_DIM {
        return Err(AppError::InvalidInput(format!(
            "State has {} values, expected at least {}",
            state.len(),
            thy_core::state::BASELINE_DIM
        )));
    }
    Ok(ClinicalReadout::from_state(params, state))
}

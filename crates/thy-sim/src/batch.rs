//! Independent series runs in parallel.

use rayon::prelude::*;
use thy_model::RateModel;

use crate::error::SimResult;
use crate::output::OutputSeries;
use crate::protocol::DosingProtocol;
use crate::sim::{CancelToken, RunHooks, SimOptions, run_series_with};

/// One series run of a batch.
#[derive(Clone, Debug)]
pub struct SeriesJob {
    pub label: String,
    pub model: RateModel,
    pub initial: Vec<f64>,
    pub t_start: i64,
    pub t_end: i64,
    pub protocol: Option<DosingProtocol>,
}

/// Run every job on the rayon pool. Results keep the job order; one
/// failing job does not stop the others.
pub fn run_batch(
    jobs: &[SeriesJob],
    opts: &SimOptions,
    cancel: Option<&CancelToken>,
) -> Vec<SimResult<OutputSeries>> {
    tracing::info!(jobs = jobs.len(), "batch started");
    jobs.par_iter()
        .map(|job| {
            let hooks = RunHooks {
                protocol: job.protocol.as_ref(),
                cancel,
                progress: None,
            };
            let result = run_series_with(&job.model, &job.initial, job.t_start, job.t_end, opts, hooks);
            if let Err(e) = &result {
                tracing::warn!(label = %job.label, error = %e, "batch job failed");
            }
            result
        })
        .collect()
}

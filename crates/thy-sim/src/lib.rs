//! Simulation of the HPT axis model.
//!
//! Provides:
//! - Point and hourly series runs over a [`thy_model::RateModel`]
//! - Adaptive Dormand–Prince 5(4) and fixed-step RK4 integrators
//! - Oral, IV and infusion dosing protocols
//! - Circadian-neutral equilibrium search
//! - Parallel batch runs

pub mod batch;
pub mod equilibrium;
pub mod error;
pub mod integrator;
pub mod model;
pub mod output;
pub mod protocol;
pub mod sim;

pub use batch::{SeriesJob, run_batch};
pub use equilibrium::{Equilibrium, EquilibriumOptions, find_equilibrium, settle};
pub use error::{SimError, SimResult};
pub use integrator::{Dopri5Integrator, IntegrationTolerances, Integrator, Rk4, StepStats};
pub use model::RateLaw;
pub use output::{FT3_FIELD, FT4_FIELD, OutputSeries, PointResult, TIME_FIELD};
pub use protocol::{Bolus, DosingProtocol, Hormone, InfusionWindow};
pub use sim::{
    CancelToken, IntegratorType, RunHooks, SimOptions, SimProgress, run_series, run_series_with,
    run_to_point, run_to_point_with,
};

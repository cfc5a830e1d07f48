//! thy-model: parameters and rate law of the hypothalamic-pituitary-thyroid
//! axis.
//!
//! Contains:
//! - params (immutable, grouped kinetic constants + dials/infusions)
//! - source (properties/YAML/JSON parameter files and the embedded set)
//! - free_hormone (canonical FT4/FT3 computation)
//! - initial (published euthyroid initial state)
//! - rate (the 19/21-state derivative)
//! - readout (clinical unit conversion)

pub mod error;
pub mod free_hormone;
pub mod initial;
pub mod params;
pub mod rate;
pub mod readout;
pub mod source;

pub use error::{ConfigError, ConfigResult};
pub use free_hormone::FreeHormones;
pub use initial::{REFERENCE_INITIAL_STATE, reference_initial_state};
pub use params::{Dials, Infusions, PARAMETER_KEYS, ParameterSet};
pub use rate::RateModel;
pub use readout::ClinicalReadout;
pub use source::{BUILTIN_ID, ParameterSource};

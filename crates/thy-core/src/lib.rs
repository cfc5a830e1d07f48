//! thy-core: stable foundation for the thyrosim workspace.
//!
//! Contains:
//! - units (uom SI types + dose/time constructors)
//! - numeric (Real + tolerances + float helpers)
//! - state (compartment layout of the HPT state vector)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod state;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{ThyError, ThyResult};
pub use numeric::*;
pub use state::{Compartment, ModelVariant};
pub use units::*;

//! Published euthyroid initial state of the 19-compartment model.

use thy_core::ModelVariant;
use thy_core::state::BASELINE_DIM;

/// Euthyroid starting point (µmol, TSH in mU) at nominal dials.
///
/// Close to, but not exactly at, the circadian-neutral equilibrium.
pub const REFERENCE_INITIAL_STATE: [f64; BASELINE_DIM] = [
    0.322114215761171,
    0.201296960359917,
    0.638967411907560,
    0.00663104034826483,
    0.0112595761822961,
    0.0652960640300348,
    1.78829584764370,
    7.05727560072869,
    7.05714474742141,
    0.0,
    0.0,
    0.0,
    0.0,
    3.34289716182018,
    3.69277248068433,
    3.87942133769244,
    3.90061903207543,
    3.77875734283571,
    3.55364471589659,
];

/// [`REFERENCE_INITIAL_STATE`] sized for `variant`, accumulators at zero.
pub fn reference_initial_state(variant: ModelVariant) -> Vec<f64> {
    variant.widen_initial(&REFERENCE_INITIAL_STATE)
}

//! Free (unbound) plasma hormone fractions.
//!
//! This is the single place FT4/FT3 are computed; the rate law and every
//! output snapshot go through it.

use serde::Serialize;
use thy_core::Compartment;

use crate::params::ParameterSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FreeHormones {
    pub ft4: f64,
    pub ft3: f64,
}

impl FreeHormones {
    /// Both free fractions are cubic in plasma T4; FT3 scales plasma T3.
    #[inline]
    pub fn compute(params: &ParameterSet, t4_plasma: f64, t3_plasma: f64) -> Self {
        Self {
            ft4: params.t4().free.eval(t4_plasma) * t4_plasma,
            ft3: params.t3().free.eval(t4_plasma) * t3_plasma,
        }
    }

    #[inline]
    pub fn from_state(params: &ParameterSet, state: &[f64]) -> Self {
        Self::compute(
            params,
            state[Compartment::T4Plasma.index()],
            state[Compartment::T3Plasma.index()],
        )
    }
}

//! Conversion of model amounts to clinical plasma concentrations.

use serde::Serialize;
use thy_core::Compartment;
use thy_core::constants::{T3_MOLAR_MASS_G_PER_MOL, T4_MOLAR_MASS_G_PER_MOL, TSH_MU_PER_UMOL};

use crate::free_hormone::FreeHormones;
use crate::params::ParameterSet;

/// Euthyroid reference interval for a clinical quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalRange {
    pub lo: f64,
    pub hi: f64,
}

impl NormalRange {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

pub const T4_NORMAL_UG_PER_L: NormalRange = NormalRange { lo: 45.0, hi: 105.0 };
pub const T3_NORMAL_UG_PER_L: NormalRange = NormalRange { lo: 0.6, hi: 1.8 };
pub const TSH_NORMAL_MU_PER_L: NormalRange = NormalRange { lo: 0.4, hi: 4.0 };

/// Plasma concentrations in the units clinicians read.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClinicalReadout {
    pub t4_ug_per_l: f64,
    pub t3_ug_per_l: f64,
    pub tsh_mu_per_l: f64,
    pub ft4_ng_per_l: f64,
    pub ft3_ng_per_l: f64,
}

impl ClinicalReadout {
    pub fn from_state(params: &ParameterSet, state: &[f64]) -> Self {
        let free = FreeHormones::from_state(params, state);
        let v = params.volumes();
        Self {
            t4_ug_per_l: T4_MOLAR_MASS_G_PER_MOL * state[Compartment::T4Plasma.index()] / v.plasma,
            t3_ug_per_l: T3_MOLAR_MASS_G_PER_MOL * state[Compartment::T3Plasma.index()] / v.plasma,
            tsh_mu_per_l: TSH_MU_PER_UMOL * state[Compartment::TshPlasma.index()] / v.tsh,
            ft4_ng_per_l: 1000.0 * T4_MOLAR_MASS_G_PER_MOL * free.ft4 / v.plasma,
            ft3_ng_per_l: 1000.0 * T3_MOLAR_MASS_G_PER_MOL * free.ft3 / v.plasma,
        }
    }

    /// True when T4, T3 and TSH all sit inside their reference intervals.
    pub fn is_euthyroid(&self) -> bool {
        T4_NORMAL_UG_PER_L.contains(self.t4_ug_per_l)
            && T3_NORMAL_UG_PER_L.contains(self.t3_ug_per_l)
            && TSH_NORMAL_MU_PER_L.contains(self.tsh_mu_per_l)
    }
}

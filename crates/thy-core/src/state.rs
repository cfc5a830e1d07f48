//! Layout of the HPT state vector.
//!
//! The state is a flat `[f64]` slice. Index positions are fixed for the
//! lifetime of a run; the extended variant appends two free-hormone
//! accumulators after the 19 baseline compartments.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of compartments in the baseline model.
pub const BASELINE_DIM: usize = 19;
/// Baseline compartments plus the FT4/FT3 integrals.
pub const EXTENDED_DIM: usize = 21;

/// Named position in the state vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Compartment {
    T4Plasma = 0,
    T4Fast,
    T4Slow,
    T3Plasma,
    T3Fast,
    T3Slow,
    TshPlasma,
    /// Brain T3, the fast feedback auxiliary.
    T3Brain,
    /// Lagged companion of brain T3 that gates TSH secretion.
    T3BrainLag,
    T4Pill,
    T4Gut,
    T3Pill,
    T3Gut,
    Delay1,
    Delay2,
    Delay3,
    Delay4,
    Delay5,
    Delay6,
    Ft4Integral,
    Ft3Integral,
}

impl Compartment {
    pub const ALL: [Compartment; EXTENDED_DIM] = [
        Compartment::T4Plasma,
        Compartment::T4Fast,
        Compartment::T4Slow,
        Compartment::T3Plasma,
        Compartment::T3Fast,
        Compartment::T3Slow,
        Compartment::TshPlasma,
        Compartment::T3Brain,
        Compartment::T3BrainLag,
        Compartment::T4Pill,
        Compartment::T4Gut,
        Compartment::T3Pill,
        Compartment::T3Gut,
        Compartment::Delay1,
        Compartment::Delay2,
        Compartment::Delay3,
        Compartment::Delay4,
        Compartment::Delay5,
        Compartment::Delay6,
        Compartment::Ft4Integral,
        Compartment::Ft3Integral,
    ];

    /// The six stages of the TSH delay cascade, upstream first.
    pub const DELAY_CHAIN: [Compartment; 6] = [
        Compartment::Delay1,
        Compartment::Delay2,
        Compartment::Delay3,
        Compartment::Delay4,
        Compartment::Delay5,
        Compartment::Delay6,
    ];

    /// Oral dosing pools (pill and gut for each hormone).
    pub const ORAL: [Compartment; 4] = [
        Compartment::T4Pill,
        Compartment::T4Gut,
        Compartment::T3Pill,
        Compartment::T3Gut,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable field name used in output series and documents.
    pub const fn name(self) -> &'static str {
        match self {
            Compartment::T4Plasma => "t4_plasma",
            Compartment::T4Fast => "t4_fast",
            Compartment::T4Slow => "t4_slow",
            Compartment::T3Plasma => "t3_plasma",
            Compartment::T3Fast => "t3_fast",
            Compartment::T3Slow => "t3_slow",
            Compartment::TshPlasma => "tsh_plasma",
            Compartment::T3Brain => "t3_brain",
            Compartment::T3BrainLag => "t3_brain_lag",
            Compartment::T4Pill => "t4_pill",
            Compartment::T4Gut => "t4_gut",
            Compartment::T3Pill => "t3_pill",
            Compartment::T3Gut => "t3_gut",
            Compartment::Delay1 => "delay_1",
            Compartment::Delay2 => "delay_2",
            Compartment::Delay3 => "delay_3",
            Compartment::Delay4 => "delay_4",
            Compartment::Delay5 => "delay_5",
            Compartment::Delay6 => "delay_6",
            Compartment::Ft4Integral => "ft4_integral",
            Compartment::Ft3Integral => "ft3_integral",
        }
    }

    pub fn from_name(name: &str) -> Option<Compartment> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Which state layout a run uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModelVariant {
    /// 19 compartments; FT4/FT3 recomputed at each snapshot.
    #[default]
    Baseline,
    /// 21 compartments; FT4/FT3 integrals carried as state.
    Extended,
}

impl ModelVariant {
    #[inline]
    pub const fn dimension(self) -> usize {
        match self {
            ModelVariant::Baseline => BASELINE_DIM,
            ModelVariant::Extended => EXTENDED_DIM,
        }
    }

    /// Compartments present in this variant, in index order.
    pub fn compartments(self) -> &'static [Compartment] {
        &Compartment::ALL[..self.dimension()]
    }

    /// Extends a baseline initial condition to this variant's length,
    /// starting any accumulators at zero.
    pub fn widen_initial(self, baseline: &[f64]) -> Vec<f64> {
        let mut x = baseline.to_vec();
        x.resize(self.dimension().max(baseline.len()), 0.0);
        x
    }
}

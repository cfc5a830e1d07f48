//! Immutable kinetic parameter set.
//!
//! The 48 rate constants of the HPT model are read from a flat key/value
//! mapping (`kdelay`, `p1`..`p48`) and regrouped into records named after
//! the physiology they describe. The absorption dials scale the oral
//! excretion rates (`p44`, `p46`) exactly once, here; nothing downstream
//! rescales them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Every key a parameter source must define, in canonical order.
pub const PARAMETER_KEYS: [&str; 49] = [
    "kdelay", "p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11", "p12", "p13",
    "p14", "p15", "p16", "p17", "p18", "p19", "p20", "p21", "p22", "p23", "p24", "p25", "p26",
    "p27", "p28", "p29", "p30", "p31", "p32", "p33", "p34", "p35", "p36", "p37", "p38", "p39",
    "p40", "p41", "p42", "p43", "p44", "p45", "p46", "p47", "p48",
];

/// Clinical dial multipliers (1.0 is nominal).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dials {
    /// d1: scales thyroidal T4 secretion.
    pub t4_secretion: f64,
    /// d2: scales oral T4 excretion (p44).
    pub t4_absorption: f64,
    /// d3: scales thyroidal T3 secretion.
    pub t3_secretion: f64,
    /// d4: scales oral T3 excretion (p46).
    pub t3_absorption: f64,
}

impl Default for Dials {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

impl Dials {
    pub const fn new(d1: f64, d2: f64, d3: f64, d4: f64) -> Self {
        Self {
            t4_secretion: d1,
            t4_absorption: d2,
            t3_secretion: d3,
            t3_absorption: d4,
        }
    }

    pub const fn as_array(&self) -> [f64; 4] {
        [
            self.t4_secretion,
            self.t4_absorption,
            self.t3_secretion,
            self.t3_absorption,
        ]
    }

    fn validate(&self) -> ConfigResult<()> {
        const NAMES: [&str; 4] = ["dial d1", "dial d2", "dial d3", "dial d4"];
        for (what, value) in NAMES.into_iter().zip(self.as_array()) {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    what,
                    value,
                    reason: "must be finite",
                });
            }
            if value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    what,
                    value,
                    reason: "must be non-negative",
                });
            }
        }
        Ok(())
    }
}

/// Constant intravenous infusion rates in µmol/h.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Infusions {
    /// u1
    pub t4: f64,
    /// u4
    pub t3: f64,
}

impl Infusions {
    pub const fn new(u1: f64, u4: f64) -> Self {
        Self { t4: u1, t3: u4 }
    }

    fn validate(&self) -> ConfigResult<()> {
        for (what, value) in [("infusion u1", self.t4), ("infusion u4", self.t3)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    what,
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }
}

/// Cubic free-fraction polynomial `a + b·x + c·x² + d·x³` in plasma T4.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeFraction {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl FreeFraction {
    #[inline]
    pub fn eval(&self, t4_plasma: f64) -> f64 {
        let x = t4_plasma;
        self.a + self.b * x + self.c * x * x + self.d * x * x * x
    }
}

/// Thyroidal secretion constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Secretion {
    /// p1
    pub s4: f64,
    /// p2 (retained for completeness; unused by the rate law)
    pub tau: f64,
    /// p19
    pub s3: f64,
}

/// T4 distribution between plasma, fast and slow tissue pools.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct T4Kinetics {
    /// p3
    pub k12: f64,
    /// p4
    pub k13: f64,
    /// p5
    pub k31_free: f64,
    /// p6
    pub k21_free: f64,
    /// p7..p10
    pub free: FreeFraction,
    /// p12
    pub k02: f64,
}

/// Saturable T4→T3 conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deiodination {
    /// p13
    pub vmax_d1_fast: f64,
    /// p14
    pub km_d1_fast: f64,
    /// p15
    pub vmax_d1_slow: f64,
    /// p16
    pub km_d1_slow: f64,
    /// p17
    pub vmax_d2_slow: f64,
    /// p18
    pub km_d2_slow: f64,
}

/// T3 distribution between plasma, fast and slow tissue pools.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct T3Kinetics {
    /// p20
    pub k45: f64,
    /// p21
    pub k46: f64,
    /// p22
    pub k64_free: f64,
    /// p23
    pub k54_free: f64,
    /// p24..p27
    pub free: FreeFraction,
    /// p29
    pub k05: f64,
}

/// Pituitary TSH secretion and degradation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TshSecretion {
    /// p30
    pub b_zero: f64,
    /// p31
    pub a_zero: f64,
    /// p32
    pub a_max: f64,
    /// p33, circadian phase (rad)
    pub phi: f64,
    /// p34
    pub kdeg_hypo: f64,
    /// p35
    pub vmax_deg: f64,
    /// p36
    pub k50: f64,
}

/// Brain T3 feedback loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrainFeedback {
    /// p37
    pub k3: f64,
    /// p38
    pub t4p_eu: f64,
    /// p39
    pub t3p_eu: f64,
    /// p40
    pub kdeg_t3b: f64,
    /// p41
    pub klag_hypo: f64,
    /// p42
    pub klag: f64,
}

/// Two-compartment oral absorption chain (pill → gut → plasma).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OralAbsorption {
    /// Pill dissolution (p43 / p45).
    pub dissolve: f64,
    /// Gut excretion, already dial-scaled (p44·d2 / p46·d4).
    pub excrete: f64,
    /// Gut absorption into plasma (p11 / p28).
    pub absorb: f64,
}

/// Distribution volumes in litres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Volumes {
    /// p47
    pub plasma: f64,
    /// p48
    pub tsh: f64,
}

/// Complete, immutable parameterisation of one simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    secretion: Secretion,
    t4: T4Kinetics,
    deiodination: Deiodination,
    t3: T3Kinetics,
    tsh: TshSecretion,
    brain: BrainFeedback,
    oral_t4: OralAbsorption,
    oral_t3: OralAbsorption,
    volumes: Volumes,
    kdelay: f64,
    dials: Dials,
    infusions: Infusions,
}

pub(crate) fn parse_real(key: &str, text: &str) -> ConfigResult<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConfigError::Malformed {
            key: key.to_string(),
            value: text.to_string(),
        }),
    }
}

impl ParameterSet {
    /// Build a parameter set from dials, infusions and a textual constant
    /// mapping. Every key in [`PARAMETER_KEYS`] must be present and parse as
    /// a finite real; the first offending key (in canonical order) is
    /// reported.
    pub fn build(
        dials: Dials,
        infusions: Infusions,
        constants: &BTreeMap<String, String>,
    ) -> ConfigResult<Self> {
        dials.validate()?;
        infusions.validate()?;

        let mut values = [0.0; PARAMETER_KEYS.len()];
        for (slot, key) in values.iter_mut().zip(PARAMETER_KEYS) {
            let text = constants.get(key).ok_or_else(|| ConfigError::MissingKey {
                key: key.to_string(),
            })?;
            *slot = parse_real(key, text)?;
        }

        // values[0] is kdelay, values[i] is p_i
        let p = |i: usize| values[i];

        Ok(Self {
            secretion: Secretion {
                s4: p(1),
                tau: p(2),
                s3: p(19),
            },
            t4: T4Kinetics {
                k12: p(3),
                k13: p(4),
                k31_free: p(5),
                k21_free: p(6),
                free: FreeFraction {
                    a: p(7),
                    b: p(8),
                    c: p(9),
                    d: p(10),
                },
                k02: p(12),
            },
            deiodination: Deiodination {
                vmax_d1_fast: p(13),
                km_d1_fast: p(14),
                vmax_d1_slow: p(15),
                km_d1_slow: p(16),
                vmax_d2_slow: p(17),
                km_d2_slow: p(18),
            },
            t3: T3Kinetics {
                k45: p(20),
                k46: p(21),
                k64_free: p(22),
                k54_free: p(23),
                free: FreeFraction {
                    a: p(24),
                    b: p(25),
                    c: p(26),
                    d: p(27),
                },
                k05: p(29),
            },
            tsh: TshSecretion {
                b_zero: p(30),
                a_zero: p(31),
                a_max: p(32),
                phi: p(33),
                kdeg_hypo: p(34),
                vmax_deg: p(35),
                k50: p(36),
            },
            brain: BrainFeedback {
                k3: p(37),
                t4p_eu: p(38),
                t3p_eu: p(39),
                kdeg_t3b: p(40),
                klag_hypo: p(41),
                klag: p(42),
            },
            oral_t4: OralAbsorption {
                dissolve: p(43),
                excrete: p(44) * dials.t4_absorption,
                absorb: p(11),
            },
            oral_t3: OralAbsorption {
                dissolve: p(45),
                excrete: p(46) * dials.t3_absorption,
                absorb: p(28),
            },
            volumes: Volumes {
                plasma: p(47),
                tsh: p(48),
            },
            kdelay: p(0),
            dials,
            infusions,
        })
    }

    /// Same constants (already dial-scaled) with different infusion rates.
    pub fn with_infusions(&self, infusions: Infusions) -> ConfigResult<Self> {
        infusions.validate()?;
        Ok(Self {
            infusions,
            ..self.clone()
        })
    }

    pub fn secretion(&self) -> &Secretion {
        &self.secretion
    }

    pub fn t4(&self) -> &T4Kinetics {
        &self.t4
    }

    pub fn deiodination(&self) -> &Deiodination {
        &self.deiodination
    }

    pub fn t3(&self) -> &T3Kinetics {
        &self.t3
    }

    pub fn tsh(&self) -> &TshSecretion {
        &self.tsh
    }

    pub fn brain(&self) -> &BrainFeedback {
        &self.brain
    }

    pub fn oral_t4(&self) -> &OralAbsorption {
        &self.oral_t4
    }

    pub fn oral_t3(&self) -> &OralAbsorption {
        &self.oral_t3
    }

    pub fn volumes(&self) -> &Volumes {
        &self.volumes
    }

    pub fn kdelay(&self) -> f64 {
        self.kdelay
    }

    pub fn dials(&self) -> &Dials {
        &self.dials
    }

    pub fn infusions(&self) -> &Infusions {
        &self.infusions
    }

    /// Effective value of a source key (`p44`/`p46` reflect dial scaling).
    pub fn value(&self, key: &str) -> Option<f64> {
        let v = match key {
            "kdelay" => self.kdelay,
            "p1" => self.secretion.s4,
            "p2" => self.secretion.tau,
            "p3" => self.t4.k12,
            "p4" => self.t4.k13,
            "p5" => self.t4.k31_free,
            "p6" => self.t4.k21_free,
            "p7" => self.t4.free.a,
            "p8" => self.t4.free.b,
            "p9" => self.t4.free.c,
            "p10" => self.t4.free.d,
            "p11" => self.oral_t4.absorb,
            "p12" => self.t4.k02,
            "p13" => self.deiodination.vmax_d1_fast,
            "p14" => self.deiodination.km_d1_fast,
            "p15" => self.deiodination.vmax_d1_slow,
            "p16" => self.deiodination.km_d1_slow,
            "p17" => self.deiodination.vmax_d2_slow,
            "p18" => self.deiodination.km_d2_slow,
            "p19" => self.secretion.s3,
            "p20" => self.t3.k45,
            "p21" => self.t3.k46,
            "p22" => self.t3.k64_free,
            "p23" => self.t3.k54_free,
            "p24" => self.t3.free.a,
            "p25" => self.t3.free.b,
            "p26" => self.t3.free.c,
            "p27" => self.t3.free.d,
            "p28" => self.oral_t3.absorb,
            "p29" => self.t3.k05,
            "p30" => self.tsh.b_zero,
            "p31" => self.tsh.a_zero,
            "p32" => self.tsh.a_max,
            "p33" => self.tsh.phi,
            "p34" => self.tsh.kdeg_hypo,
            "p35" => self.tsh.vmax_deg,
            "p36" => self.tsh.k50,
            "p37" => self.brain.k3,
            "p38" => self.brain.t4p_eu,
            "p39" => self.brain.t3p_eu,
            "p40" => self.brain.kdeg_t3b,
            "p41" => self.brain.klag_hypo,
            "p42" => self.brain.klag,
            "p43" => self.oral_t4.dissolve,
            "p44" => self.oral_t4.excrete,
            "p45" => self.oral_t3.dissolve,
            "p46" => self.oral_t3.excrete,
            "p47" => self.volumes.plasma,
            "p48" => self.volumes.tsh,
            _ => return None,
        };
        Some(v)
    }

    /// All effective constants in canonical key order.
    pub fn effective_constants(&self) -> Vec<(&'static str, f64)> {
        PARAMETER_KEYS
            .iter()
            .filter_map(|key| self.value(key).map(|v| (*key, v)))
            .collect()
    }
}

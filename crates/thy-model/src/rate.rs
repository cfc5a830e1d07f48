//! HPT axis rate law: `(t, x) -> dx/dt`.

use std::f64::consts::PI;

use thy_core::{Compartment as C, ModelVariant, ThyError, ThyResult};

use crate::error::ConfigResult;
use crate::free_hormone::FreeHormones;
use crate::params::{Infusions, ParameterSet};

/// Pure rate model over an immutable parameter set.
#[derive(Clone, Debug, PartialEq)]
pub struct RateModel {
    params: ParameterSet,
    variant: ModelVariant,
}

impl RateModel {
    pub fn new(params: ParameterSet, variant: ModelVariant) -> Self {
        Self { params, variant }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.variant.dimension()
    }

    /// Copy of this model with different infusion rates.
    pub fn with_infusions(&self, infusions: Infusions) -> ConfigResult<Self> {
        Ok(Self {
            params: self.params.with_infusions(infusions)?,
            variant: self.variant,
        })
    }

    pub fn free_hormones(&self, state: &[f64]) -> FreeHormones {
        FreeHormones::from_state(&self.params, state)
    }

    /// Earliest non-negative hour at which the circadian TSH sinusoid is zero.
    pub fn circadian_neutral_time(&self) -> f64 {
        12.0 / PI * self.params.tsh().phi.rem_euclid(2.0 * PI)
    }

    /// Checked derivative. Fails if `state` does not match the variant.
    pub fn derivative(&self, t: f64, state: &[f64]) -> ThyResult<Vec<f64>> {
        let n = self.dimension();
        if state.len() != n {
            return Err(ThyError::StateLength {
                expected: n,
                actual: state.len(),
            });
        }
        let mut out = vec![0.0; n];
        self.derivative_into(t, state, &mut out);
        Ok(out)
    }

    /// Unchecked derivative into a caller-provided buffer.
    ///
    /// Both slices must hold at least [`RateModel::dimension`] values.
    pub fn derivative_into(&self, t: f64, q: &[f64], dq: &mut [f64]) {
        let p = &self.params;
        let (sec, t4k, dio, t3k, tsh, brain) = (
            p.secretion(),
            p.t4(),
            p.deiodination(),
            p.t3(),
            p.tsh(),
            p.brain(),
        );
        let (oral4, oral3) = (p.oral_t4(), p.oral_t3());
        let dials = p.dials();
        let u = p.infusions();

        let t4p = q[C::T4Plasma.index()];
        let t4f = q[C::T4Fast.index()];
        let t4s = q[C::T4Slow.index()];
        let t3p = q[C::T3Plasma.index()];
        let t3f = q[C::T3Fast.index()];
        let t3s = q[C::T3Slow.index()];
        let tsh_p = q[C::TshPlasma.index()];
        let t3b = q[C::T3Brain.index()];
        let t3b_lag = q[C::T3BrainLag.index()];
        let t4_pill = q[C::T4Pill.index()];
        let t4_gut = q[C::T4Gut.index()];
        let t3_pill = q[C::T3Pill.index()];
        let t3_gut = q[C::T3Gut.index()];
        let delay6 = q[C::Delay6.index()];

        let free = FreeHormones::compute(p, t4p, t3p);

        // Thyroidal secretion driven by the end of the TSH delay chain
        let sr_t3 = sec.s3 * delay6 * dials.t3_secretion;
        let sr_t4 = sec.s4 * delay6 * dials.t4_secretion;

        // Pituitary TSH: circadian secretion suppressed by lagged brain T3
        let suppression = (-t3b_lag).exp();
        let f_circ = 1.0
            + (tsh.a_max / (tsh.a_zero * suppression) - 1.0)
                * (1.0 / (1.0 + (10.0 * t3b_lag - 55.0).exp()));
        let sr_tsh =
            (tsh.b_zero + tsh.a_zero * f_circ * (PI / 12.0 * t - tsh.phi).sin()) * suppression;
        let f_deg_tsh = tsh.kdeg_hypo + tsh.vmax_deg / (tsh.k50 + tsh_p);

        let t3b_11 = t3b.powi(11);
        let f_lag = brain.klag_hypo + 2.0 * t3b_11 / (brain.klag.powi(11) + t3b_11);
        let f4 = brain.k3 + 5.0 * brain.k3 / (1.0 + (2.0 * t3b - 7.0).exp());

        let nl = dio.vmax_d1_fast / (dio.km_d1_fast + t4f);
        let d1_slow = dio.vmax_d1_slow / (dio.km_d1_slow + t4s);
        let d2_slow = dio.vmax_d2_slow / (dio.km_d2_slow + t4s);

        dq[C::T4Plasma.index()] = sr_t4 + t4k.k12 * t4f + t4k.k13 * t4s
            - (t4k.k31_free + t4k.k21_free) * free.ft4
            + oral4.absorb * t4_gut
            + u.t4;
        dq[C::T4Fast.index()] = t4k.k21_free * free.ft4 - (t4k.k12 + t4k.k02 + nl) * t4f;
        dq[C::T4Slow.index()] = t4k.k31_free * free.ft4 - (t4k.k13 + d1_slow + d2_slow) * t4s;
        dq[C::T3Plasma.index()] = sr_t3 + t3k.k45 * t3f + t3k.k46 * t3s
            - (t3k.k64_free + t3k.k54_free) * free.ft3
            + oral3.absorb * t3_gut
            + u.t3;
        dq[C::T3Fast.index()] = t3k.k54_free * free.ft3 + nl * t4f - (t3k.k45 + t3k.k05) * t3f;
        dq[C::T3Slow.index()] =
            t3k.k64_free * free.ft3 + d1_slow * t4s + d2_slow * t4s - t3k.k46 * t3s;
        dq[C::TshPlasma.index()] = sr_tsh - f_deg_tsh * tsh_p;
        dq[C::T3Brain.index()] =
            f4 / brain.t4p_eu * t4p + brain.k3 / brain.t3p_eu * t3p - brain.kdeg_t3b * t3b;
        dq[C::T3BrainLag.index()] = f_lag * (t3b - t3b_lag);

        dq[C::T4Pill.index()] = -oral4.dissolve * t4_pill;
        dq[C::T4Gut.index()] = oral4.dissolve * t4_pill - (oral4.excrete + oral4.absorb) * t4_gut;
        dq[C::T3Pill.index()] = -oral3.dissolve * t3_pill;
        dq[C::T3Gut.index()] = oral3.dissolve * t3_pill - (oral3.excrete + oral3.absorb) * t3_gut;

        let kdelay = p.kdelay();
        dq[C::Delay1.index()] = -kdelay * q[C::Delay1.index()] + tsh_p;
        for pair in C::DELAY_CHAIN.windows(2) {
            let (up, down) = (pair[0].index(), pair[1].index());
            dq[down] = kdelay * (q[up] - q[down]);
        }

        if self.variant == ModelVariant::Extended {
            dq[C::Ft4Integral.index()] = free.ft4;
            dq[C::Ft3Integral.index()] = free.ft3;
        }
    }
}

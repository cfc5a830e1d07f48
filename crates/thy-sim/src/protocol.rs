//! Dosing protocol: oral doses, IV pulses and constant infusions.
//!
//! Times are absolute simulation hours (built from [`thy_core::Time`]);
//! amounts are µmol, converted from µg with the hormone molar mass.

use thy_core::constants::{t3_molar_mass, t4_molar_mass};
use thy_core::{Compartment, Mass, MolarMass, Time, as_hours, as_micromoles, days, dose_amount};
use thy_core::units::infusion_rate_umol_per_h;
use thy_model::Infusions;

use crate::error::{SimError, SimResult};

/// Two scheduled instants closer than this (hours) are the same instant.
pub(crate) const TIME_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hormone {
    T4,
    T3,
}

impl Hormone {
    pub fn molar_mass(self) -> MolarMass {
        match self {
            Hormone::T4 => t4_molar_mass(),
            Hormone::T3 => t3_molar_mass(),
        }
    }

    /// Where an oral dose lands.
    pub fn pill(self) -> Compartment {
        match self {
            Hormone::T4 => Compartment::T4Pill,
            Hormone::T3 => Compartment::T3Pill,
        }
    }

    /// Where an IV pulse lands.
    pub fn plasma(self) -> Compartment {
        match self {
            Hormone::T4 => Compartment::T4Plasma,
            Hormone::T3 => Compartment::T3Plasma,
        }
    }
}

/// Instantaneous addition of `amount` µmol to a compartment at hour `at`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bolus {
    pub at: f64,
    pub compartment: Compartment,
    pub amount: f64,
}

/// Constant-rate infusion active on `[start, end)` hours.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfusionWindow {
    pub hormone: Hormone,
    pub start: f64,
    pub end: f64,
    /// µmol/h
    pub rate: f64,
}

impl InfusionWindow {
    fn active_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Scheduled inputs for one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DosingProtocol {
    boluses: Vec<Bolus>,
    infusions: Vec<InfusionWindow>,
}

fn finite_non_negative(v: f64, what: &'static str) -> SimResult<f64> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(SimError::InvalidArg { what })
    }
}

impl DosingProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.boluses.is_empty() && self.infusions.is_empty()
    }

    pub fn boluses(&self) -> &[Bolus] {
        &self.boluses
    }

    pub fn infusions(&self) -> &[InfusionWindow] {
        &self.infusions
    }

    fn insert_bolus(&mut self, bolus: Bolus) {
        let pos = self.boluses.partition_point(|b| b.at <= bolus.at);
        self.boluses.insert(pos, bolus);
    }

    /// Oral doses of `dose` starting at `start`. With an `interval`, doses
    /// repeat up to and including `end` (or `start` when `end` is absent);
    /// without one a single dose is given.
    pub fn add_oral(
        &mut self,
        hormone: Hormone,
        dose: Mass,
        start: Time,
        end: Option<Time>,
        interval: Option<Time>,
    ) -> SimResult<&mut Self> {
        let amount = finite_non_negative(
            as_micromoles(dose_amount(dose, hormone.molar_mass())),
            "oral dose must be finite and non-negative",
        )?;
        let first = finite_non_negative(as_hours(start), "oral start must be non-negative")?;
        let last = match end {
            Some(end) => as_hours(end),
            None => first,
        };
        if !last.is_finite() || last < first {
            return Err(SimError::InvalidArg {
                what: "oral end must not precede start",
            });
        }

        match interval.map(as_hours) {
            None => self.insert_bolus(Bolus {
                at: first,
                compartment: hormone.pill(),
                amount,
            }),
            Some(every) => {
                if !(every.is_finite() && every > 0.0) {
                    return Err(SimError::InvalidArg {
                        what: "oral interval must be positive",
                    });
                }
                let count = ((last - first) / every + TIME_EPS).floor() as usize + 1;
                for k in 0..count {
                    self.insert_bolus(Bolus {
                        at: first + k as f64 * every,
                        compartment: hormone.pill(),
                        amount,
                    });
                }
            }
        }
        Ok(self)
    }

    /// Single IV pulse straight into plasma.
    pub fn add_iv_pulse(&mut self, hormone: Hormone, dose: Mass, at: Time) -> SimResult<&mut Self> {
        let amount = finite_non_negative(
            as_micromoles(dose_amount(dose, hormone.molar_mass())),
            "IV dose must be finite and non-negative",
        )?;
        let at = finite_non_negative(as_hours(at), "IV time must be non-negative")?;
        self.insert_bolus(Bolus {
            at,
            compartment: hormone.plasma(),
            amount,
        });
        Ok(self)
    }

    /// Constant infusion of `dose_per_day` between `start` and `end`
    /// (open-ended when `end` is absent).
    pub fn add_infusion(
        &mut self,
        hormone: Hormone,
        dose_per_day: Mass,
        start: Time,
        end: Option<Time>,
    ) -> SimResult<&mut Self> {
        let rate = infusion_rate_umol_per_h(dose_per_day, hormone.molar_mass(), days(1.0));
        let rate = finite_non_negative(rate, "infusion rate must be finite and non-negative")?;
        let start = finite_non_negative(as_hours(start), "infusion start must be non-negative")?;
        let end = end.map_or(f64::INFINITY, as_hours);
        if end.is_nan() || end < start {
            return Err(SimError::InvalidArg {
                what: "infusion end must not precede start",
            });
        }
        self.infusions.push(InfusionWindow {
            hormone,
            start,
            end,
            rate,
        });
        Ok(self)
    }

    /// Summed infusion rates of every window active at `t`.
    pub fn infusion_rates_at(&self, t: f64) -> Infusions {
        self.infusions
            .iter()
            .filter(|w| w.active_at(t))
            .fold(Infusions::default(), |acc, w| match w.hormone {
                Hormone::T4 => Infusions::new(acc.t4 + w.rate, acc.t3),
                Hormone::T3 => Infusions::new(acc.t4, acc.t3 + w.rate),
            })
    }

    /// Earliest dose or infusion edge strictly after `t`.
    pub(crate) fn next_breakpoint_after(&self, t: f64) -> Option<f64> {
        let bolus = self
            .boluses
            .iter()
            .map(|b| b.at)
            .find(|at| *at > t + TIME_EPS);
        let edges = self
            .infusions
            .iter()
            .flat_map(|w| [w.start, w.end])
            .filter(|e| e.is_finite() && *e > t + TIME_EPS);
        bolus.into_iter().chain(edges).reduce(f64::min)
    }

    /// Index of the first bolus at or after `t`.
    pub(crate) fn first_bolus_from(&self, t: f64) -> usize {
        self.boluses.partition_point(|b| b.at < t - TIME_EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thy_core::{hours, micrograms};

    #[test]
    fn daily_oral_doses_inclusive_of_end() {
        let mut p = DosingProtocol::new();
        p.add_oral(
            Hormone::T4,
            micrograms(123.0),
            days(0.0),
            Some(days(29.0)),
            Some(days(1.0)),
        )
        .unwrap();
        assert_eq!(p.boluses().len(), 30);
        assert_eq!(p.boluses()[0].at, 0.0);
        assert_eq!(p.boluses()[29].at, 29.0 * 24.0);
        assert_eq!(p.boluses()[0].compartment, Compartment::T4Pill);
        assert!((p.boluses()[0].amount - 123.0 / 777.0).abs() < 1e-15);
    }

    #[test]
    fn single_oral_dose_without_interval() {
        let mut p = DosingProtocol::new();
        p.add_oral(Hormone::T3, micrograms(6.5), hours(10.0), None, None)
            .unwrap();
        assert_eq!(p.boluses().len(), 1);
        assert_eq!(p.boluses()[0].compartment, Compartment::T3Pill);
    }

    #[test]
    fn boluses_stay_sorted_across_inputs() {
        let mut p = DosingProtocol::new();
        p.add_iv_pulse(Hormone::T4, micrograms(100.0), hours(30.0))
            .unwrap()
            .add_oral(
                Hormone::T3,
                micrograms(5.0),
                hours(0.0),
                Some(hours(48.0)),
                Some(hours(24.0)),
            )
            .unwrap();
        let times: Vec<f64> = p.boluses().iter().map(|b| b.at).collect();
        assert_eq!(times, vec![0.0, 24.0, 30.0, 48.0]);
        assert_eq!(p.boluses()[2].compartment, Compartment::T4Plasma);
    }

    #[test]
    fn infusion_rates_and_edges() {
        let mut p = DosingProtocol::new();
        p.add_infusion(Hormone::T3, micrograms(651.0), hours(12.0), Some(hours(36.0)))
            .unwrap();
        assert_eq!(p.infusion_rates_at(11.9), Infusions::default());
        let during = p.infusion_rates_at(12.0);
        assert!((during.t3 - 1.0 / 24.0).abs() < 1e-15);
        assert_eq!(during.t4, 0.0);
        assert_eq!(p.infusion_rates_at(36.0), Infusions::default());

        assert_eq!(p.next_breakpoint_after(0.0), Some(12.0));
        assert_eq!(p.next_breakpoint_after(12.0), Some(36.0));
        assert_eq!(p.next_breakpoint_after(36.0), None);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let mut p = DosingProtocol::new();
        assert!(p
            .add_oral(Hormone::T4, micrograms(-1.0), hours(0.0), None, None)
            .is_err());
        assert!(p
            .add_oral(
                Hormone::T4,
                micrograms(1.0),
                hours(5.0),
                Some(hours(1.0)),
                Some(hours(1.0))
            )
            .is_err());
        assert!(p
            .add_oral(
                Hormone::T4,
                micrograms(1.0),
                hours(0.0),
                Some(hours(5.0)),
                Some(hours(0.0))
            )
            .is_err());
        assert!(p
            .add_infusion(Hormone::T4, micrograms(1.0), hours(5.0), Some(hours(1.0)))
            .is_err());
        assert!(p.is_empty());
    }

    #[test]
    fn first_bolus_skips_past_doses() {
        let mut p = DosingProtocol::new();
        p.add_oral(
            Hormone::T4,
            micrograms(1.0),
            hours(0.0),
            Some(hours(72.0)),
            Some(hours(24.0)),
        )
        .unwrap();
        assert_eq!(p.first_bolus_from(0.0), 0);
        assert_eq!(p.first_bolus_from(24.0), 1);
        assert_eq!(p.first_bolus_from(25.0), 2);
        assert_eq!(p.first_bolus_from(100.0), 4);
    }
}

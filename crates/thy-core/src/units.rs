// thy-core/src/units.rs

use uom::si::f64::{
    AmountOfSubstance as UomAmountOfSubstance, Mass as UomMass, MolarMass as UomMolarMass,
    Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Amount = UomAmountOfSubstance;
pub type Mass = UomMass;
pub type MolarMass = UomMolarMass;
pub type Time = UomTime;

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

/// Simulation clock value of a duration (the model runs in hours).
#[inline]
pub fn as_hours(t: Time) -> f64 {
    use uom::si::time::hour;
    t.get::<hour>()
}

#[inline]
pub fn micrograms(v: f64) -> Mass {
    use uom::si::mass::microgram;
    Mass::new::<microgram>(v)
}

#[inline]
pub fn grams_per_mole(v: f64) -> MolarMass {
    use uom::si::molar_mass::gram_per_mole;
    MolarMass::new::<gram_per_mole>(v)
}

/// Model amount value (compartments hold µmol).
#[inline]
pub fn as_micromoles(a: Amount) -> f64 {
    use uom::si::amount_of_substance::micromole;
    a.get::<micromole>()
}

/// Amount of hormone in a dose of the given mass.
#[inline]
pub fn dose_amount(dose: Mass, molar_mass: MolarMass) -> Amount {
    dose / molar_mass
}

/// Constant infusion in µmol/h for `dose` delivered evenly over `period`.
pub fn infusion_rate_umol_per_h(dose: Mass, molar_mass: MolarMass, period: Time) -> f64 {
    as_micromoles(dose_amount(dose, molar_mass)) / as_hours(period)
}

pub mod constants {
    use super::*;

    pub const T4_MOLAR_MASS_G_PER_MOL: f64 = 777.0;
    pub const T3_MOLAR_MASS_G_PER_MOL: f64 = 651.0;
    /// mU of TSH per µmol.
    pub const TSH_MU_PER_UMOL: f64 = 5.6;

    #[inline]
    pub fn t4_molar_mass() -> MolarMass {
        grams_per_mole(T4_MOLAR_MASS_G_PER_MOL)
    }

    #[inline]
    pub fn t3_molar_mass() -> MolarMass {
        grams_per_mole(T3_MOLAR_MASS_G_PER_MOL)
    }
}

#[cfg(test)]
mod tests {
    use super::constants::*;
    use super::*;

    #[test]
    fn days_convert_to_simulation_hours() {
        assert!((as_hours(days(1.5)) - 36.0).abs() < 1e-12);
        assert!((as_hours(hours(7.0)) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn oral_t4_dose_in_micromoles() {
        // 123 µg of T4 at 777 g/mol
        let n = as_micromoles(dose_amount(micrograms(123.0), t4_molar_mass()));
        assert!((n - 123.0 / 777.0).abs() < 1e-12);
    }

    #[test]
    fn daily_infusion_spread_over_hours() {
        let rate = infusion_rate_umol_per_h(micrograms(651.0), t3_molar_mass(), days(1.0));
        assert!((rate - 1.0 / 24.0).abs() < 1e-12);
    }
}

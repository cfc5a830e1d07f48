//! Integration tests: oral doses, IV pulses and infusions during runs.
//!
//! The pill and gut pools form a linear chain decoupled from the rest of
//! the model, so an oral dose has a closed-form trajectory:
//! pill(t) = D·e^(-k1 t), gut(t) = D·k1/(k2-k1)·(e^(-k1 t) - e^(-k2 t)).

use thy_core::{Compartment, ModelVariant, hours, micrograms};
use thy_model::{Dials, Infusions, ParameterSource, RateModel};
use thy_sim::{
    DosingProtocol, Hormone, RunHooks, SimOptions, run_series, run_series_with, run_to_point_with,
};

const STEADY: [f64; 19] = [
    0.3505522198950952,
    0.22454778819384053,
    0.7128237760142724,
    0.005856197900486942,
    0.010110072274715116,
    0.06008299348384752,
    2.028946699007015,
    6.98591050782251,
    6.98591050782251,
    0.0,
    0.0,
    0.0,
    0.0,
    3.246314718411224,
    3.246314718411224,
    3.246314718411224,
    3.246314718411224,
    3.246314718411224,
    3.246314718411224,
];

fn reference_model() -> RateModel {
    let params = ParameterSource::builtin()
        .unwrap()
        .parameter_set(Dials::default(), Infusions::default())
        .unwrap();
    RateModel::new(params, ModelVariant::Baseline)
}

fn with_protocol(protocol: &DosingProtocol) -> RunHooks<'_> {
    RunHooks {
        protocol: Some(protocol),
        ..RunHooks::default()
    }
}

#[test]
fn oral_dose_follows_absorption_chain() {
    let model = reference_model();
    let oral = *model.params().oral_t4();
    let (k1, k2) = (oral.dissolve, oral.excrete + oral.absorb);

    // 777 µg of T4 is exactly 1 µmol.
    let mut protocol = DosingProtocol::new();
    protocol
        .add_oral(Hormone::T4, micrograms(777.0), hours(0.0), None, None)
        .unwrap();
    let series = run_series_with(
        &model,
        &STEADY,
        0,
        8,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();

    let pill = series.compartment(Compartment::T4Pill).unwrap();
    let gut = series.compartment(Compartment::T4Gut).unwrap();
    assert_eq!(pill[0], 0.0, "sample at the dose instant is taken before dosing");
    for hour in 1..=8 {
        let t = hour as f64;
        let pill_exact = (-k1 * t).exp();
        let gut_exact = k1 / (k2 - k1) * ((-k1 * t).exp() - (-k2 * t).exp());
        assert!((pill[hour] - pill_exact).abs() < 1e-8, "pill at {hour} h");
        assert!((gut[hour] - gut_exact).abs() < 1e-8, "gut at {hour} h");
    }

    let t4p = series.compartment(Compartment::T4Plasma).unwrap();
    assert!(t4p[8] > t4p[0]);
    assert!(series.compartment(Compartment::T3Pill).unwrap().iter().all(|v| *v == 0.0));
}

#[test]
fn mid_run_dose_lands_after_its_sample() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_oral(Hormone::T3, micrograms(6.5), hours(5.0), None, None)
        .unwrap();
    let series = run_series_with(
        &model,
        &STEADY,
        0,
        7,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();

    let pill = series.compartment(Compartment::T3Pill).unwrap();
    assert!(pill[..=5].iter().all(|v| *v == 0.0));
    let dose = 6.5 / 651.0;
    let k1 = model.params().oral_t3().dissolve;
    assert!((pill[6] - dose * (-k1).exp()).abs() < 1e-10);
}

#[test]
fn daily_doses_repeat() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_oral(
            Hormone::T4,
            micrograms(100.0),
            hours(0.0),
            Some(hours(48.0)),
            Some(hours(24.0)),
        )
        .unwrap();
    let series = run_series_with(
        &model,
        &STEADY,
        0,
        72,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();

    let pill = series.compartment(Compartment::T4Pill).unwrap();
    // Each new dose adds to a nearly empty pill, so the pool jumps daily.
    assert!(pill[25] > pill[23]);
    assert!(pill[49] > pill[47]);
    assert!(pill[72] < pill[49] * 1e-6);
}

#[test]
fn doses_before_the_run_are_skipped() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_oral(Hormone::T4, micrograms(100.0), hours(2.0), None, None)
        .unwrap();
    let dosed = run_series_with(
        &model,
        &STEADY,
        3,
        6,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();
    let plain = run_series(&model, &STEADY, 3, 6, &SimOptions::default()).unwrap();
    assert_eq!(dosed, plain);
}

#[test]
fn iv_pulse_enters_plasma_directly() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_iv_pulse(Hormone::T4, micrograms(777.0), hours(1.0))
        .unwrap();
    let point = run_to_point_with(
        &model,
        &STEADY,
        0.0,
        1.0 + 1e-6,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();
    let plain = thy_sim::run_to_point(&model, &STEADY, 0.0, 1.0 + 1e-6, &SimOptions::default())
        .unwrap();
    let jump = point.value(Compartment::T4Plasma).unwrap()
        - plain.value(Compartment::T4Plasma).unwrap();
    assert!((jump - 1.0).abs() < 1e-4);
}

#[test]
fn infusion_matches_constant_rate_model() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_infusion(Hormone::T3, micrograms(65.1), hours(0.0), Some(hours(24.0)))
        .unwrap();
    let infused = run_series_with(
        &model,
        &STEADY,
        0,
        24,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();

    let constant = model
        .with_infusions(protocol.infusion_rates_at(0.5))
        .unwrap();
    let reference = run_series(&constant, &STEADY, 0, 24, &SimOptions::default()).unwrap();

    let a = infused.compartment(Compartment::T3Plasma).unwrap();
    let b = reference.compartment(Compartment::T3Plasma).unwrap();
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-12);
    }
    assert!(a[24] > a[0]);
}

#[test]
fn infusion_switches_off_mid_hour() {
    let model = reference_model();
    let mut protocol = DosingProtocol::new();
    protocol
        .add_infusion(Hormone::T4, micrograms(777.0), hours(0.0), Some(hours(0.5)))
        .unwrap();
    let on_for_half_hour = run_series_with(
        &model,
        &STEADY,
        0,
        2,
        &SimOptions::default(),
        with_protocol(&protocol),
    )
    .unwrap();
    let plain = run_series(&model, &STEADY, 0, 2, &SimOptions::default()).unwrap();

    // 1 µmol/day for half an hour adds about 1/48 µmol of T4.
    let extra = on_for_half_hour.compartment(Compartment::T4Plasma).unwrap()[1]
        - plain.compartment(Compartment::T4Plasma).unwrap()[1];
    assert!(extra > 0.0 && extra < 1.0 / 48.0);
}

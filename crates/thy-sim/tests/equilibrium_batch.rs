//! Integration tests: equilibrium search and parallel batches.

use proptest::prelude::*;
use thy_core::{Compartment, ModelVariant};
use thy_model::{Dials, Infusions, ParameterSource, REFERENCE_INITIAL_STATE, RateModel};
use thy_sim::{
    CancelToken, EquilibriumOptions, SeriesJob, SimError, SimOptions, find_equilibrium,
    run_batch, run_series,
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

fn model_with(dials: Dials) -> RateModel {
    let params = ParameterSource::builtin()
        .unwrap()
        .parameter_set(dials, Infusions::default())
        .unwrap();
    RateModel::new(params, ModelVariant::Baseline)
}

#[test]
fn newton_from_textbook_state_reaches_steady_state() {
    let model = model_with(Dials::default());
    let eq = find_equilibrium(&model, &REFERENCE_INITIAL_STATE, &EquilibriumOptions::default()).unwrap();

    assert!((eq.t - 9.828843867097639).abs() < 1e-12);
    assert!(eq.residual < 1e-9);
    assert!(eq.iterations > 0 && eq.iterations < 20);
    for (a, e) in eq.state.iter().zip(STEADY) {
        assert!((a - e).abs() < 1e-8, "{a} vs {e}");
    }

    let dx = model.derivative(eq.t, &eq.state).unwrap();
    assert!(dx.iter().all(|v| v.abs() < 1e-9));
}

#[test]
fn settling_first_lands_on_the_same_point() {
    let model = model_with(Dials::default());
    let opts = EquilibriumOptions {
        settle_hours: 48.0,
        ..EquilibriumOptions::default()
    };
    let eq = find_equilibrium(&model, &REFERENCE_INITIAL_STATE, &opts).unwrap();
    assert!((eq.state[Compartment::TshPlasma.index()] - STEADY[6]).abs() < 1e-8);
}

#[test]
fn lower_secretion_lowers_equilibrium_t4() {
    let euthyroid = find_equilibrium(
        &model_with(Dials::default()),
        &STEADY,
        &EquilibriumOptions::default(),
    )
    .unwrap();
    let hypo = find_equilibrium(
        &model_with(Dials::new(0.5, 0.88, 0.5, 0.88)),
        &STEADY,
        &EquilibriumOptions {
            settle_hours: 240.0,
            ..EquilibriumOptions::default()
        },
    )
    .unwrap();
    let t4 = Compartment::T4Plasma.index();
    let tsh = Compartment::TshPlasma.index();
    assert!(hypo.state[t4] < euthyroid.state[t4]);
    assert!(hypo.state[tsh] > euthyroid.state[tsh]);
}

#[test]
fn batch_matches_individual_runs_in_order() {
    let opts = SimOptions::default();
    let jobs: Vec<SeriesJob> = [1.0, 0.5, 0.25]
        .into_iter()
        .map(|d| SeriesJob {
            label: format!("secretion {d}"),
            model: model_with(Dials::new(d, 0.88, d, 0.88)),
            initial: STEADY.to_vec(),
            t_start: 0,
            t_end: 12,
            protocol: None,
        })
        .collect();

    let results = run_batch(&jobs, &opts, None);
    assert_eq!(results.len(), 3);
    for (job, result) in jobs.iter().zip(&results) {
        let alone = run_series(&job.model, &job.initial, 0, 12, &opts).unwrap();
        assert_eq!(result.as_ref().unwrap(), &alone);
    }

    let t4_end: Vec<f64> = results
        .iter()
        .map(|r| r.as_ref().unwrap().compartment(Compartment::T4Plasma).unwrap()[12])
        .collect();
    assert!(t4_end[0] > t4_end[1] && t4_end[1] > t4_end[2]);
}

#[test]
fn batch_isolates_failures() {
    let good = SeriesJob {
        label: "good".into(),
        model: model_with(Dials::default()),
        initial: STEADY.to_vec(),
        t_start: 0,
        t_end: 2,
        protocol: None,
    };
    let bad = SeriesJob {
        label: "bad".into(),
        initial: STEADY[..10].to_vec(),
        ..good.clone()
    };
    let results = run_batch(&[good, bad], &SimOptions::default(), None);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SimError::StateLength { .. })));
}

#[test]
fn cancelled_batch_reports_every_job() {
    let job = SeriesJob {
        label: "a".into(),
        model: model_with(Dials::default()),
        initial: STEADY.to_vec(),
        t_start: 0,
        t_end: 5,
        protocol: None,
    };
    let token = CancelToken::new();
    token.cancel();
    let results = run_batch(&[job.clone(), job], &SimOptions::default(), Some(&token));
    assert!(results.iter().all(|r| matches!(r, Err(SimError::Cancelled { .. }))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn series_length_and_time_axis(t_start in -48i64..48, len in 0i64..6) {
        let model = model_with(Dials::default());
        let series = run_series(&model, &STEADY, t_start, t_start + len, &SimOptions::default()).unwrap();
        prop_assert_eq!(series.len() as i64, len + 1);
        for (i, t) in series.time().iter().enumerate() {
            prop_assert_eq!(*t, (t_start + i as i64) as f64);
        }
        prop_assert!(series.ft4().iter().all(|v| *v > 0.0));
    }
}

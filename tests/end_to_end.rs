//! End-to-end runs on synthetic seasonal series.
//!
//! The main generator is a linear trend plus a period-7 sinusoid plus white
//! noise. Seasonal and trend differencing leave `(1 - B)(1 - B⁷) e`, so the
//! fitted MA factors sit close to the unit circle; the engine still has to fit
//! both candidates and cover most of a two-week hold-out with ±2·SE bands.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sarima_engine::core::{Partition, Series};
use sarima_engine::error::ForecastError;
use sarima_engine::models::arima::{
    DifferencingSpec, EstimatorConfig, Forecaster, ModelSearch, SarimaOrder, SearchConfig,
    StationarityReducer,
};
use sarima_engine::pipeline::{Pipeline, PipelineConfig};
use sarima_engine::validation::DiagnosticsEngine;

const PERIOD: usize = 7;
const TRAINING: usize = 321;
const HOLD_OUT: usize = 14;

/// `100 + 0.05·t + 10·sin(2πt/7) + e`, `e ~ N(0, 1)`.
fn trend_seasonal_series(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n)
        .map(|t| {
            let phase = t as f64 * std::f64::consts::TAU / PERIOD as f64;
            100.0 + 0.05 * t as f64 + 10.0 * phase.sin() + normal.sample(&mut rng)
        })
        .collect()
}

/// `(1 - B)(1 - B⁷) y = (1 - 0.4B)(1 - 0.6B⁷) e` around a positive level.
fn airline_series(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let e: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();

    let mut y: Vec<f64> = (0..=PERIOD)
        .map(|t| 500.0 + 15.0 * (t as f64 * std::f64::consts::TAU / PERIOD as f64).sin())
        .collect();
    for t in PERIOD + 1..n {
        let w = e[t] - 0.4 * e[t - 1] - 0.6 * e[t - PERIOD] + 0.24 * e[t - PERIOD - 1];
        y.push(y[t - 1] + y[t - PERIOD] - y[t - PERIOD - 1] + w);
    }
    y
}

fn candidates() -> Vec<SarimaOrder> {
    vec![
        SarimaOrder::seasonal((1, 1, 1), (1, 1, 1, PERIOD)),
        SarimaOrder::seasonal((1, 1, 1), (0, 1, 2, PERIOD)),
    ]
}

fn partition(values: Vec<f64>) -> Partition {
    let series = Series::new(values).unwrap();
    Partition::new(&series, 0, TRAINING, HOLD_OUT).unwrap()
}

#[test]
fn both_candidates_fit_and_cover_the_hold_out() {
    let mut covered = 0.0;
    let mut evaluated = 0usize;

    for seed in 0..5 {
        let partition = partition(trend_seasonal_series(TRAINING + HOLD_OUT, seed));
        let training = Arc::new(partition.training().clone());
        let summary = ModelSearch::default().run(&training, &candidates()).unwrap();

        assert!(summary.rejected.is_empty(), "seed {seed}: {:?}", summary.rejected);
        assert_eq!(summary.ranked.len(), 2, "seed {seed}");
        assert!(summary.ranked[0].aicc() <= summary.ranked[1].aicc());
        for model in &summary.ranked {
            assert!(model.min_ar_root_modulus() > 1.0, "seed {seed}: {}", model.order());
            assert!(model.min_ma_root_modulus() > 1.0, "seed {seed}: {}", model.order());
        }

        let best = summary.best().unwrap();
        let forecast = Forecaster::default().forecast(best, HOLD_OUT, None).unwrap();
        let actual = partition.validation().unwrap().values();
        covered += forecast.coverage(actual) * HOLD_OUT as f64;
        evaluated += HOLD_OUT;
    }

    let rate = covered / evaluated as f64;
    assert!(rate >= 0.85, "coverage {rate}");
}

#[test]
fn default_pipeline_runs_on_trend_seasonal_data() {
    let config = PipelineConfig::default().with_candidate_orders(candidates());
    let report = Pipeline::new(config)
        .run(&partition(trend_seasonal_series(TRAINING + HOLD_OUT, 3)))
        .unwrap();

    // Trend differencing after the seasonal step only adds noise here; the
    // step is reported, not fatal.
    assert_eq!(report.overdifferenced_at, Some(2));
    assert_eq!(report.stationary.series.len(), TRAINING - PERIOD - 1);
    assert_eq!(report.search.ranked.len(), 2);
    assert_eq!(report.diagnostics.len(), 2);
    assert!(report.diagnostics.iter().all(|d| d.is_ok()));
}

#[test]
fn pipeline_produces_validated_forecast() {
    let config = PipelineConfig::default()
        .with_candidate_orders(candidates())
        .with_significance_level(0.01);
    let pipeline = Pipeline::new(config);

    let mut produced = 0;
    for seed in [11, 12, 13] {
        let report = pipeline
            .run(&partition(trend_seasonal_series(TRAINING + HOLD_OUT, seed)))
            .unwrap();
        assert_eq!(report.diagnostics.len(), report.search.ranked.len());
        assert_eq!(report.search.attempted(), 2);

        let Some(model) = report.selected_model() else {
            assert!(report.forecast.is_none());
            assert!(report.final_model.is_none());
            continue;
        };
        produced += 1;
        assert!(report.selected_diagnostics().unwrap().passed);

        let validation = report.validation.as_ref().unwrap();
        assert_eq!(validation.forecast.horizon(), HOLD_OUT);
        assert!(validation.metrics.coverage.is_some());
        assert!(validation.metrics.mae.is_finite());

        let final_model = report.final_model.as_ref().unwrap();
        assert_eq!(final_model.order(), model.order());
        assert_eq!(final_model.training().len(), TRAINING + HOLD_OUT);

        let forecast = report.forecast.as_ref().unwrap();
        assert_eq!(forecast.horizon(), 14);
        assert_eq!(forecast.transform(), Some(&report.transform.spec()));
        for h in 0..14 {
            assert!(forecast.original_lower()[h] <= forecast.original_point()[h]);
            assert!(forecast.original_point()[h] <= forecast.original_upper()[h]);
            assert!(forecast.original_point()[h] > 0.0);
        }
    }
    assert!(produced >= 1, "no run passed diagnostics");
}

#[test]
fn untestable_candidate_does_not_abort_the_run() {
    // Four free coefficients exhaust a four-lag portmanteau test.
    let config = PipelineConfig::default()
        .with_candidate_orders(vec![
            SarimaOrder::seasonal((1, 1, 1), (1, 1, 1, PERIOD)),
            SarimaOrder::seasonal((0, 1, 1), (0, 1, 1, PERIOD)),
        ])
        .with_diagnostics_lag(4)
        .with_significance_level(0.01);
    let report = Pipeline::new(config)
        .run(&partition(airline_series(TRAINING + HOLD_OUT, 5)))
        .unwrap();

    assert_eq!(report.diagnostics.len(), report.search.ranked.len());
    for (model, diagnostics) in report.ranked() {
        if model.n_free_arma() >= 4 {
            assert!(matches!(
                diagnostics,
                Err(ForecastError::InsufficientData { .. })
            ));
        } else {
            assert!(diagnostics.is_ok());
        }
    }
    if let Some(model) = report.selected_model() {
        assert_eq!(model.n_free_arma(), 2);
    }
}

#[test]
fn pipeline_without_hold_out_skips_validation() {
    let series = Series::new(airline_series(TRAINING, 21)).unwrap();
    let config = PipelineConfig::default()
        .with_candidate_orders(vec![SarimaOrder::seasonal((0, 1, 1), (0, 1, 1, PERIOD))])
        .with_significance_level(0.01)
        .with_forecast_horizon(5);
    let report = Pipeline::new(config)
        .run(&Partition::training_only(series))
        .unwrap();

    assert!(report.validation.is_none());
    if let Some(forecast) = &report.forecast {
        assert_eq!(forecast.horizon(), 5);
        assert_eq!(
            report.final_model.as_ref().unwrap().training().len(),
            TRAINING
        );
    }
}

#[test]
fn identified_candidates_are_used_when_none_configured() {
    let report = Pipeline::new(PipelineConfig::default().with_significance_level(0.01))
        .run(&partition(airline_series(TRAINING + HOLD_OUT, 31)))
        .unwrap();
    assert_eq!(
        report.search.attempted(),
        report.identification.candidates.len()
    );
    for model in &report.search.ranked {
        assert_eq!(model.order().d, 1);
        assert_eq!(model.order().cap_d, 1);
        assert_eq!(model.order().s, PERIOD);
    }
}

#[test]
fn ranked_models_respect_root_tolerance() {
    let mut rng = StdRng::seed_from_u64(41);
    let normal = Normal::new(0.0, 1.0).unwrap();
    // White noise differenced once pushes the MA root onto the unit circle.
    let values: Vec<f64> = (0..200).map(|_| 10.0 + normal.sample(&mut rng)).collect();
    let series = Arc::new(Series::new(values).unwrap());
    let tolerance = 0.05;
    let search = ModelSearch::new(
        SearchConfig::default()
            .with_estimator(EstimatorConfig::default().with_root_tolerance(tolerance)),
    );
    let summary = search
        .run(
            &series,
            &[
                SarimaOrder::new(0, 0, 0),
                SarimaOrder::new(0, 1, 1),
                SarimaOrder::new(1, 0, 0),
            ],
        )
        .unwrap();

    assert_eq!(summary.attempted(), 3);
    for model in &summary.ranked {
        assert!(model.min_ar_root_modulus() > 1.0 + tolerance);
        assert!(model.min_ma_root_modulus() > 1.0 + tolerance);
    }
    for rejected in &summary.rejected {
        assert!(rejected.error.is_candidate_failure(), "{:?}", rejected.error);
    }
    assert!(summary
        .ranked
        .iter()
        .any(|m| m.order() == &SarimaOrder::new(0, 0, 0)));
}

#[test]
fn diagnostics_are_deterministic() {
    let partition = partition(trend_seasonal_series(TRAINING + HOLD_OUT, 51));
    let training = Arc::new(partition.training().clone());
    let summary = ModelSearch::default()
        .run(&training, &candidates()[..1])
        .unwrap();
    let model = summary.best().unwrap();
    let engine = DiagnosticsEngine::default();
    assert_eq!(engine.run(model).unwrap(), engine.run(model).unwrap());
}

#[test]
fn differencing_needs_more_than_total_lag() {
    let spec = DifferencingSpec::seasonal_then_trend(PERIOD);
    let reducer = StationarityReducer::new();

    let short = Series::new(trend_seasonal_series(PERIOD + 1, 61)).unwrap();
    assert!(matches!(
        reducer.reduce(&short, &spec),
        Err(ForecastError::InsufficientData { needed: 9, got: 8 })
    ));

    let just_enough = Series::new(trend_seasonal_series(PERIOD + 2, 61)).unwrap();
    let out = reducer.reduce(&just_enough, &spec).unwrap();
    assert_eq!(out.series.len(), 1);
}

#[test]
fn overdifferencing_warns_by_default_and_aborts_on_request() {
    // A flat series with white noise gets noisier with every difference.
    let mut rng = StdRng::seed_from_u64(71);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let values: Vec<f64> = (0..200).map(|_| 100.0 + normal.sample(&mut rng)).collect();
    let partition = Partition::training_only(Series::new(values).unwrap());
    let orders = vec![SarimaOrder::seasonal((0, 1, 1), (0, 1, 1, PERIOD))];

    let lenient = PipelineConfig::default().with_candidate_orders(orders.clone());
    let report = Pipeline::new(lenient).run(&partition).unwrap();
    assert_eq!(report.overdifferenced_at, Some(1));

    let strict = PipelineConfig::default()
        .with_candidate_orders(orders)
        .with_stop_on_overdifferencing(true);
    assert!(matches!(
        Pipeline::new(strict).run(&partition),
        Err(ForecastError::Overdifferenced { step: 1, .. })
    ));
}

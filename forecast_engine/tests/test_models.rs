use chrono::{Duration, NaiveDate};
use forecast_engine::config::BoostingConfig;
use forecast_engine::data::HistoricalSeries;
use forecast_engine::error::ForecastError;
use forecast_engine::features::FeatureEngineer;
use forecast_engine::models::autoregressive::AutoregressiveForecaster;
use forecast_engine::models::boosting::GradientBoostedTrees;
use forecast_engine::models::ensemble::{EnsembleForecaster, EnsembleWeights};
use forecast_engine::models::seasonal::SeasonalForecaster;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rstest::rstest;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

fn noisy_sinusoid(days: usize, seed: u64) -> HistoricalSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.04).unwrap();
    let values: Vec<f64> = (0..days)
        .map(|i| {
            let season = (2.0 * std::f64::consts::PI * i as f64 / 365.25).sin();
            (0.5 + 0.3 * season + noise.sample(&mut rng)).clamp(0.0, 1.0)
        })
        .collect();
    HistoricalSeries::from_values(start(), &values).unwrap()
}

fn quick_boosting() -> GradientBoostedTrees {
    GradientBoostedTrees::from_config(&BoostingConfig {
        n_estimators: 40,
        max_depth: 3,
        ..BoostingConfig::default()
    })
    .unwrap()
}

#[rstest]
#[case(8, 1)]
#[case(9, 2)]
#[case(30, 23)]
#[case(365, 358)]
fn test_feature_rows_drop_first_week(#[case] len: usize, #[case] rows: usize) {
    let series = noisy_sinusoid(len, 1);
    let matrix = FeatureEngineer::new().build(&series).unwrap();
    assert_eq!(matrix.len(), rows);
    assert_eq!(matrix.targets.len(), rows);
    assert!(matrix
        .rows
        .iter()
        .all(|row| row.values.iter().all(|v| v.is_finite())));
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(40)]
fn test_predict_future_dates_are_contiguous(#[case] horizon: usize) {
    let series = noisy_sinusoid(120, 2);
    let mut forecaster = AutoregressiveForecaster::new(quick_boosting());
    forecaster.train(&series).unwrap();

    let forecast = forecaster.predict_future(&series, horizon).unwrap();
    let last = series.last_date().unwrap();
    let expected: Vec<NaiveDate> = (1..=horizon as i64)
        .map(|i| last + Duration::days(i))
        .collect();
    assert_eq!(forecast.dates(), expected);
    assert!(forecast.values().iter().all(|v| v.is_finite()));
}

#[test]
fn test_forecasters_reject_use_before_training() {
    let series = noisy_sinusoid(60, 3);

    let seasonal = SeasonalForecaster::default();
    assert!(matches!(
        seasonal.predict(10, true),
        Err(ForecastError::ModelNotTrained(_))
    ));

    let autoregressive = AutoregressiveForecaster::new(quick_boosting());
    assert!(matches!(
        autoregressive.predict_future(&series, 10),
        Err(ForecastError::ModelNotTrained(_))
    ));
    assert!(matches!(
        autoregressive.validation_rmse(),
        Err(ForecastError::ModelNotTrained(_))
    ));
}

#[test]
fn test_feature_importance_is_normalized() {
    let series = noisy_sinusoid(200, 4);
    let mut forecaster = AutoregressiveForecaster::new(quick_boosting());
    forecaster.train(&series).unwrap();

    let importances = forecaster.get_feature_importance().unwrap();
    assert_eq!(importances.len(), 4);
    assert!(importances.iter().all(|i| i.importance >= 0.0));
    assert!(importances
        .windows(2)
        .all(|w| w[0].importance >= w[1].importance));
    let total: f64 = importances.iter().map(|i| i.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_seasonal_tracks_yearly_cycle() {
    let series = noisy_sinusoid(730, 5);
    let mut forecaster = SeasonalForecaster::default();
    forecaster.train(&series).unwrap();

    // Peak of the cycle falls roughly a quarter year into each year
    let forecast = forecaster.predict(365, false).unwrap();
    let values = forecast.values();
    let peak = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    let peak_day = (series.len() + peak) as f64 % 365.25;
    assert!((peak_day - 91.3).abs() < 20.0);
}

#[test]
fn test_ensemble_with_custom_weights() {
    let series = noisy_sinusoid(150, 6);
    let mut ensemble = EnsembleForecaster::with_models(
        SeasonalForecaster::default(),
        AutoregressiveForecaster::new(quick_boosting()),
        EnsembleWeights::new(3.0, 1.0).unwrap(),
    );
    ensemble.train(&series).unwrap();

    let forecast = ensemble.predict(&series, 20).unwrap();
    assert_eq!(forecast.len(), 20);
    assert_eq!(forecast.seasonal().len(), 20);
    assert_eq!(forecast.autoregressive().len(), 20);
    for point in forecast.points() {
        let expected = 0.75 * point.forecast_seasonal + 0.25 * point.forecast_autoregressive;
        assert!((point.forecast - expected).abs() < 1e-12);
    }

    assert!(matches!(
        ensemble.train(&series),
        Err(ForecastError::AlreadyTrained(_))
    ));
}

#[test]
fn test_evaluate_on_sixty_rows() {
    let series = noisy_sinusoid(60, 7);
    let ensemble = EnsembleForecaster::with_models(
        SeasonalForecaster::default(),
        AutoregressiveForecaster::new(quick_boosting()),
        EnsembleWeights::default(),
    );

    let report = ensemble.evaluate(&series, 30).unwrap();
    assert_eq!(report.scores.len(), 3);
    assert!(report
        .scores
        .iter()
        .all(|s| s.rmse.is_finite() && s.mae.is_finite() && s.mape.is_finite()));
    assert_eq!(report.to_dataframe().unwrap().height(), 3);
}

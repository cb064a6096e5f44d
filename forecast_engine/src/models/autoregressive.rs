//! Autoregressive forecaster over a pluggable regression model
//!
//! Training fits the regression model on engineered lag/rolling features.
//! Forecasting is recursive: each day's prediction feeds the lag features of
//! the next day, with covariates for unseen dates supplied by a
//! [`WeatherEstimator`].

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::features::{assemble_row, FeatureEngineer, LagFeatures, WINDOW};
use crate::metrics::rmse;
use crate::models::boosting::GradientBoostedTrees;
use crate::models::{FittedRegression, ForecastPoint, ForecastSeries, ModelState, RegressionModel};
use crate::utils::{future_dates, shuffled_split};
use crate::weather::{ClimatologicalEstimator, CovariateProfile, WeatherEstimator};
use polars::prelude::*;
use score_math::stats::population_std;
use score_math::RollingWindow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default share of feature rows held out for validation
pub const VALIDATION_FRACTION: f64 = 0.2;

/// Default seed for the validation split
pub const SPLIT_SEED: u64 = 42;

/// Importance of one feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Table with `feature` and `importance` columns
pub fn importance_to_dataframe(importances: &[FeatureImportance]) -> Result<DataFrame> {
    let features: Vec<&str> = importances.iter().map(|i| i.feature.as_str()).collect();
    let values: Vec<f64> = importances.iter().map(|i| i.importance).collect();
    Ok(DataFrame::new(vec![
        Series::new("feature", features),
        Series::new("importance", values),
    ])?)
}

#[derive(Debug)]
struct AutoregressiveFit<F> {
    fitted: F,
    feature_names: Vec<String>,
    covariates: Vec<&'static str>,
    validation_rmse: f64,
}

/// Trailing values carried across recursive steps
#[derive(Debug)]
struct RecursiveState {
    /// Last `WINDOW` actual targets
    history: RollingWindow,
    /// Last `WINDOW` forecasts
    forecasts: RollingWindow,
    history_std: f64,
}

impl RecursiveState {
    fn new(recent_targets: &[f64]) -> Result<Self> {
        let history = RollingWindow::from_tail(WINDOW, recent_targets)?;
        let history_std = history.sample_std()?;
        Ok(Self {
            history,
            forecasts: RollingWindow::new(WINDOW)?,
            history_std,
        })
    }

    /// Trailing pool: recent forecasts, topped up with recent actuals
    fn pool(&self) -> Vec<f64> {
        let from_history = WINDOW - self.forecasts.len();
        self.history
            .values()
            .skip(self.history.len().saturating_sub(from_history))
            .chain(self.forecasts.values())
            .collect()
    }

    fn lags(&self) -> Result<LagFeatures> {
        let lag_1 = self
            .forecasts
            .last()
            .or_else(|| self.history.last())
            .ok_or_else(|| ForecastError::InsufficientData("No trailing values to lag".to_string()))?;

        let pool = self.pool();
        let pool_mean = pool.iter().sum::<f64>() / pool.len() as f64;
        // Historical spread is a sample std, the forecast pool a population std
        let rolling_std_7 = if self.forecasts.len() < 2 {
            self.history_std
        } else {
            population_std(&pool)?
        };

        Ok(LagFeatures {
            lag_1,
            lag_7: pool_mean,
            rolling_mean_7: pool_mean,
            rolling_std_7,
        })
    }

    fn push(&mut self, forecast: f64) {
        self.forecasts.push(forecast);
    }
}

/// Recursive multi-step forecaster
#[derive(Debug)]
pub struct AutoregressiveForecaster<
    R: RegressionModel = GradientBoostedTrees,
    W: WeatherEstimator = ClimatologicalEstimator,
> {
    model: R,
    weather: W,
    engineer: FeatureEngineer,
    validation_fraction: f64,
    seed: u64,
    state: ModelState<AutoregressiveFit<R::Fitted>>,
}

impl<R: RegressionModel> AutoregressiveForecaster<R, ClimatologicalEstimator> {
    /// Create a forecaster with climatological covariates and the default split
    pub fn new(model: R) -> Self {
        Self {
            model,
            weather: ClimatologicalEstimator,
            engineer: FeatureEngineer::new(),
            validation_fraction: VALIDATION_FRACTION,
            seed: SPLIT_SEED,
            state: ModelState::Untrained,
        }
    }
}

impl<R: RegressionModel, W: WeatherEstimator> AutoregressiveForecaster<R, W> {
    /// Create a forecaster with an explicit covariate estimator and split
    pub fn with_parts(model: R, weather: W, validation_fraction: f64, seed: u64) -> Result<Self> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation fraction must be between 0 and 1, got {}",
                validation_fraction
            )));
        }

        Ok(Self {
            model,
            weather,
            engineer: FeatureEngineer::new(),
            validation_fraction,
            seed,
            state: ModelState::Untrained,
        })
    }

    /// An untrained copy with the same settings
    pub fn fresh(&self) -> Self {
        Self {
            model: self.model.clone(),
            weather: self.weather.clone(),
            engineer: self.engineer,
            validation_fraction: self.validation_fraction,
            seed: self.seed,
            state: ModelState::Untrained,
        }
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    /// Fit on a shuffled training split of the engineered features
    ///
    /// The held-out rows only score the fit; the model is not refit on them.
    pub fn train(&mut self, series: &HistoricalSeries) -> Result<()> {
        self.state.ensure_untrained(self.model.name())?;

        let matrix = self.engineer.build(series)?;
        let (train_rows, test_rows) =
            shuffled_split(matrix.len(), self.validation_fraction, self.seed)?;
        if train_rows.is_empty() {
            return Err(ForecastError::InsufficientData(format!(
                "{} feature rows leave nothing to train on",
                matrix.len()
            )));
        }

        let pick = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            rows.iter()
                .map(|&r| (matrix.rows[r].values.clone(), matrix.targets[r]))
                .unzip()
        };
        let (x_train, y_train) = pick(&train_rows);
        let (x_test, y_test) = pick(&test_rows);

        info!(
            model = self.model.name(),
            train_rows = x_train.len(),
            validation_rows = x_test.len(),
            features = matrix.feature_names.len(),
            "Training autoregressive model"
        );

        let fitted = self
            .model
            .fit(&x_train, &y_train)
            .map_err(|e| ForecastError::training_failure(self.model.name(), e))?;

        let predictions = x_test
            .iter()
            .map(|row| fitted.predict(row))
            .collect::<Result<Vec<f64>>>()?;
        let validation_rmse = rmse(&predictions, &y_test)?;
        info!(model = self.model.name(), validation_rmse, "Validation RMSE");

        self.state = ModelState::Trained(AutoregressiveFit {
            fitted,
            feature_names: matrix.feature_names,
            covariates: series.present_covariates(),
            validation_rmse,
        });
        Ok(())
    }

    /// RMSE on the held-out validation rows
    pub fn validation_rmse(&self) -> Result<f64> {
        Ok(self.state.fitted(self.model.name())?.validation_rmse)
    }

    /// Forecast `horizon_days` days past the end of `series`, one day at a time
    ///
    /// A zero horizon yields an empty forecast.
    pub fn predict_future(
        &self,
        series: &HistoricalSeries,
        horizon_days: usize,
    ) -> Result<ForecastSeries> {
        let fit = self.state.fitted(self.model.name())?;
        if horizon_days == 0 {
            return ForecastSeries::new(Vec::new());
        }
        if series.len() <= WINDOW {
            return Err(ForecastError::InsufficientData(format!(
                "Recursive forecasting needs at least {} observations, have {}",
                WINDOW + 1,
                series.len()
            )));
        }

        let last_date = series.last_date().ok_or_else(|| {
            ForecastError::InsufficientData("Cannot forecast from an empty series".to_string())
        })?;

        let profile = self.weather.profile(series, &fit.covariates)?;
        let mut state = RecursiveState::new(&series.tail_targets(WINDOW))?;
        let mut points = Vec::with_capacity(horizon_days);

        for date in future_dates(last_date, horizon_days) {
            let covariates = profile.estimate(date)?;
            let lags = state.lags()?;
            let row = assemble_row(&fit.covariates, &covariates, &lags)?;

            let forecast = fit.fitted.predict(&row)?;
            state.push(forecast);
            points.push(ForecastPoint::new(date, forecast));
        }

        debug!(horizon_days, "Recursive forecast complete");
        ForecastSeries::new(points)
    }

    /// Feature importances, most important first
    pub fn get_feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let fit = self.state.fitted(self.model.name())?;

        let mut importances: Vec<FeatureImportance> = fit
            .feature_names
            .iter()
            .zip(fit.fitted.feature_importances())
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(importances)
    }
}

impl Default for AutoregressiveForecaster {
    fn default() -> Self {
        Self::new(GradientBoostedTrees::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoostingConfig;
    use crate::data::Observation;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use approx::assert_relative_eq;
    use rand_distr::{Distribution, Normal};
    use rstest::rstest;
    use score_math::stats::sample_std;

    /// Predicts `lag_1 + step`, which makes the recursion observable
    #[derive(Debug, Clone)]
    struct DriftModel {
        step: f64,
    }

    #[derive(Debug)]
    struct FittedDrift {
        step: f64,
        lag_index: usize,
        width: usize,
    }

    impl RegressionModel for DriftModel {
        type Fitted = FittedDrift;

        fn fit(&self, features: &[Vec<f64>], _targets: &[f64]) -> Result<Self::Fitted> {
            let width = features[0].len();
            Ok(FittedDrift {
                step: self.step,
                lag_index: width - 4,
                width,
            })
        }

        fn name(&self) -> &str {
            "Drift"
        }
    }

    impl FittedRegression for FittedDrift {
        fn predict(&self, row: &[f64]) -> Result<f64> {
            Ok(row[self.lag_index] + self.step)
        }

        fn feature_importances(&self) -> Vec<f64> {
            (0..self.width).map(|i| i as f64).collect()
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    fn noisy_sinusoid(days: usize) -> HistoricalSeries {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let values: Vec<f64> = (0..days)
            .map(|i| {
                let season = (2.0 * std::f64::consts::PI * i as f64 / 365.25).sin();
                (0.5 + 0.3 * season + noise.sample(&mut rng)).clamp(0.0, 1.0)
            })
            .collect();
        HistoricalSeries::from_values(start(), &values).unwrap()
    }

    fn small_boosting() -> GradientBoostedTrees {
        GradientBoostedTrees::from_config(&BoostingConfig {
            n_estimators: 50,
            max_depth: 4,
            ..BoostingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_noisy_sinusoid_forecast_is_finite() {
        let series = noisy_sinusoid(400);
        let mut forecaster = AutoregressiveForecaster::default();
        forecaster.train(&series).unwrap();

        let forecast = forecaster.predict_future(&series, 40).unwrap();
        assert_eq!(forecast.len(), 40);
        assert_eq!(forecast.first_date(), Some(start() + Duration::days(400)));
        assert!(forecast.values().iter().all(|v| v.is_finite()));
        assert!(forecaster.validation_rmse().unwrap() >= 0.0);
    }

    #[test]
    fn test_recursion_feeds_previous_forecast() {
        let values = [0.1, 0.2, 0.3, 0.4, 0.5, 0.4, 0.3, 0.2, 0.5];
        let series = HistoricalSeries::from_values(start(), &values).unwrap();
        let mut forecaster = AutoregressiveForecaster::new(DriftModel { step: 0.01 });
        forecaster.train(&series).unwrap();

        let forecast = forecaster.predict_future(&series, 3).unwrap();
        let expected = [0.51, 0.52, 0.53];
        for (value, expected) in forecast.values().iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict_before_train() {
        let series = noisy_sinusoid(30);
        let forecaster = AutoregressiveForecaster::new(small_boosting());
        assert!(matches!(
            forecaster.predict_future(&series, 5),
            Err(ForecastError::ModelNotTrained(_))
        ));
        assert!(matches!(
            forecaster.get_feature_importance(),
            Err(ForecastError::ModelNotTrained(_))
        ));
    }

    #[test]
    fn test_short_series_and_retrain_rejected() {
        let mut forecaster = AutoregressiveForecaster::new(small_boosting());
        let short = HistoricalSeries::from_values(start(), &[0.5; 7]).unwrap();
        assert!(matches!(
            forecaster.train(&short),
            Err(ForecastError::InsufficientData(_))
        ));

        let series = noisy_sinusoid(60);
        forecaster.train(&series).unwrap();
        assert!(matches!(
            forecaster.train(&series),
            Err(ForecastError::AlreadyTrained(_))
        ));
    }

    #[test]
    fn test_feature_importance_sorted_with_covariates() {
        let observations = (0..60)
            .map(|i| {
                Observation::new(start() + Duration::days(i), 0.3 + (i % 5) as f64 / 10.0)
                    .with_covariate("TAVG", (i % 9) as f64)
            })
            .collect();
        let series = HistoricalSeries::new(observations).unwrap();

        let mut forecaster = AutoregressiveForecaster::new(DriftModel { step: 0.0 });
        forecaster.train(&series).unwrap();

        let importances = forecaster.get_feature_importance().unwrap();
        let names: Vec<&str> = importances.iter().map(|i| i.feature.as_str()).collect();
        assert_eq!(
            names,
            vec!["rolling_std_7", "rolling_mean_7", "lag_7", "lag_1", "TAVG"]
        );

        let df = importance_to_dataframe(&importances).unwrap();
        assert_eq!(df.get_column_names(), vec!["feature", "importance"]);

        // Covariates for the forecast come from the same calendar month
        let forecast = forecaster.predict_future(&series, 3).unwrap();
        assert_eq!(forecast.len(), 3);
    }

    const RECENT: [f64; 8] = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];

    fn pushed_forecasts(count: usize) -> Vec<f64> {
        (0..count).map(|i| 0.9 - 0.05 * i as f64).collect()
    }

    /// Trailing pool after `count` forecasts, built independently of the state
    fn expected_pool(count: usize) -> Vec<f64> {
        let from_forecasts = count.min(WINDOW);
        let mut pool = RECENT[RECENT.len() - (WINDOW - from_forecasts)..].to_vec();
        pool.extend_from_slice(&pushed_forecasts(count)[count - from_forecasts..]);
        pool
    }

    fn pool_mean(pool: &[f64]) -> f64 {
        pool.iter().sum::<f64>() / pool.len() as f64
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(7)]
    #[case(8)]
    fn test_recursive_state_pool_and_lags(#[case] count: usize) {
        let mut state = RecursiveState::new(&RECENT).unwrap();
        for forecast in pushed_forecasts(count) {
            state.push(forecast);
        }

        let pool = expected_pool(count);
        assert_eq!(state.pool().len(), WINDOW);
        for (actual, expected) in state.pool().iter().zip(&pool) {
            assert_relative_eq!(*actual, *expected, epsilon = 1e-12);
        }

        let lags = state.lags().unwrap();
        let lag_1 = pushed_forecasts(count).last().copied().unwrap_or(0.7);
        assert_relative_eq!(lags.lag_1, lag_1, epsilon = 1e-12);
        assert_relative_eq!(lags.lag_7, pool_mean(&pool), epsilon = 1e-12);
        assert_relative_eq!(lags.rolling_mean_7, pool_mean(&pool), epsilon = 1e-12);

        let history_std = sample_std(&RECENT[1..]).unwrap();
        let expected_std = if count < 2 {
            history_std
        } else {
            population_std(&pool).unwrap()
        };
        assert_relative_eq!(lags.rolling_std_7, expected_std, epsilon = 1e-12);
    }

    #[test]
    fn test_recursive_state_mixes_forecasts_with_actuals() {
        let mut state = RecursiveState::new(&RECENT).unwrap();
        state.push(0.9);
        state.push(0.85);

        let expected = [0.3, 0.4, 0.5, 0.6, 0.7, 0.9, 0.85];
        for (actual, expected) in state.pool().iter().zip(expected) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-12);
        }

        // Two forecasts switch the spread from historical to the pool (ddof 0)
        let lags = state.lags().unwrap();
        let mean = expected.iter().sum::<f64>() / 7.0;
        let variance = expected.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 7.0;
        assert_relative_eq!(lags.rolling_std_7, variance.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(lags.lag_7, mean, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let series = noisy_sinusoid(60);
        let mut forecaster = AutoregressiveForecaster::new(small_boosting());
        forecaster.train(&series).unwrap();
        assert!(forecaster.predict_future(&series, 0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_validation_fraction() {
        assert!(AutoregressiveForecaster::with_parts(
            small_boosting(),
            ClimatologicalEstimator,
            0.0,
            SPLIT_SEED
        )
        .is_err());
    }
}

//! Ensemble of the seasonal and autoregressive forecasters
//!
//! Both component forecasts are inner-joined on date and blended with either
//! a static weight pair or horizon-adaptive weights that shift trust from the
//! autoregressive model to the seasonal model as the forecast reaches further
//! out.

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{EvaluationReport, ModelScore};
use crate::models::autoregressive::AutoregressiveForecaster;
use crate::models::boosting::GradientBoostedTrees;
use crate::models::fourier::FourierTrendModel;
use crate::models::seasonal::SeasonalForecaster;
use crate::models::{DecompositionModel, ForecastSeries, RegressionModel};
use crate::weather::{ClimatologicalEstimator, WeatherEstimator};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// Minimum training observations left after the evaluation hold-out
pub const MIN_EVALUATION_TRAINING: usize = 30;

/// Autoregressive weight on the first adaptive day
const ADAPTIVE_START: f64 = 0.8;
/// Total adaptive decay across the horizon
const ADAPTIVE_DECAY: f64 = 0.5;
/// Autoregressive weight never drops below this
const ADAPTIVE_FLOOR: f64 = 0.3;

/// Normalized blending weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    seasonal: f64,
    autoregressive: f64,
}

impl EnsembleWeights {
    /// Normalize a weight pair so it sums to 1
    pub fn new(seasonal: f64, autoregressive: f64) -> Result<Self> {
        if !seasonal.is_finite() || !autoregressive.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "Ensemble weights must be finite".to_string(),
            ));
        }
        if seasonal < 0.0 || autoregressive < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ensemble weights must be non-negative".to_string(),
            ));
        }

        let total = seasonal + autoregressive;
        if total <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ensemble weights must have a positive sum".to_string(),
            ));
        }

        Ok(Self {
            seasonal: seasonal / total,
            autoregressive: autoregressive / total,
        })
    }

    /// Horizon-adaptive weights for day-out position `k` (1-based)
    ///
    /// The autoregressive weight is `max(0.3, 0.8 - (k / horizon) * 0.5)`.
    pub fn adaptive(k: usize, horizon_days: usize) -> Self {
        let progress = k as f64 / horizon_days.max(1) as f64;
        let autoregressive = (ADAPTIVE_START - progress * ADAPTIVE_DECAY).max(ADAPTIVE_FLOOR);
        Self {
            seasonal: 1.0 - autoregressive,
            autoregressive,
        }
    }

    pub fn seasonal(&self) -> f64 {
        self.seasonal
    }

    pub fn autoregressive(&self) -> f64 {
        self.autoregressive
    }

    fn blend(&self, seasonal: f64, autoregressive: f64) -> f64 {
        self.seasonal * seasonal + self.autoregressive * autoregressive
    }
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            seasonal: 0.5,
            autoregressive: 0.5,
        }
    }
}

/// How component forecasts are weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightPolicy {
    /// The forecaster's fixed weight pair
    Static,
    /// Weights that decay with the day-out position
    Adaptive,
}

/// One blended forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePoint {
    pub date: NaiveDate,
    pub forecast: f64,
    pub forecast_seasonal: f64,
    pub forecast_autoregressive: f64,
    pub seasonal_weight: f64,
    pub autoregressive_weight: f64,
}

/// Blended forecast plus both component forecasts
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleForecast {
    points: Vec<EnsemblePoint>,
    seasonal: ForecastSeries,
    autoregressive: ForecastSeries,
}

impl EnsembleForecast {
    pub fn points(&self) -> &[EnsemblePoint] {
        &self.points
    }

    pub fn seasonal(&self) -> &ForecastSeries {
        &self.seasonal
    }

    pub fn autoregressive(&self) -> &ForecastSeries {
        &self.autoregressive
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Blended values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.forecast).collect()
    }

    /// Table with `date`, `forecast`, `forecast_seasonal`, `forecast_autoregressive`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.points.iter().map(|p| p.date.to_string()).collect();
        let seasonal: Vec<f64> = self.points.iter().map(|p| p.forecast_seasonal).collect();
        let autoregressive: Vec<f64> = self
            .points
            .iter()
            .map(|p| p.forecast_autoregressive)
            .collect();

        Ok(DataFrame::new(vec![
            Series::new("date", dates),
            Series::new("forecast", self.values()),
            Series::new("forecast_seasonal", seasonal),
            Series::new("forecast_autoregressive", autoregressive),
        ])?)
    }
}

/// Inner-join two forecasts on date and blend each shared day
///
/// `weights` receives the 1-based position of the day within the joined
/// output. Dates present in only one forecast are dropped.
pub fn join_forecasts<F>(
    seasonal: &ForecastSeries,
    autoregressive: &ForecastSeries,
    weights: F,
) -> Vec<EnsemblePoint>
where
    F: Fn(usize) -> EnsembleWeights,
{
    let left = seasonal.points();
    let right = autoregressive.points();
    let mut joined = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].date.cmp(&right[j].date) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let w = weights(joined.len() + 1);
                joined.push(EnsemblePoint {
                    date: left[i].date,
                    forecast: w.blend(left[i].forecast, right[j].forecast),
                    forecast_seasonal: left[i].forecast,
                    forecast_autoregressive: right[j].forecast,
                    seasonal_weight: w.seasonal(),
                    autoregressive_weight: w.autoregressive(),
                });
                i += 1;
                j += 1;
            }
        }
    }

    joined
}

/// Hybrid seasonal plus autoregressive forecaster
#[derive(Debug)]
pub struct EnsembleForecaster<
    D: DecompositionModel = FourierTrendModel,
    R: RegressionModel = GradientBoostedTrees,
    W: WeatherEstimator = ClimatologicalEstimator,
> {
    seasonal: SeasonalForecaster<D>,
    autoregressive: AutoregressiveForecaster<R, W>,
    weights: EnsembleWeights,
}

impl EnsembleForecaster {
    /// Default component models with the given weights
    pub fn new(weights: EnsembleWeights) -> Self {
        Self::with_models(
            SeasonalForecaster::default(),
            AutoregressiveForecaster::default(),
            weights,
        )
    }
}

impl Default for EnsembleForecaster {
    fn default() -> Self {
        Self::new(EnsembleWeights::default())
    }
}

impl<D, R, W> EnsembleForecaster<D, R, W>
where
    D: DecompositionModel,
    R: RegressionModel,
    W: WeatherEstimator,
{
    pub fn with_models(
        seasonal: SeasonalForecaster<D>,
        autoregressive: AutoregressiveForecaster<R, W>,
        weights: EnsembleWeights,
    ) -> Self {
        Self {
            seasonal,
            autoregressive,
            weights,
        }
    }

    /// An untrained copy with the same models and weights
    pub fn fresh(&self) -> Self {
        Self::with_models(
            self.seasonal.fresh(),
            self.autoregressive.fresh(),
            self.weights,
        )
    }

    pub fn weights(&self) -> EnsembleWeights {
        self.weights
    }

    pub fn seasonal(&self) -> &SeasonalForecaster<D> {
        &self.seasonal
    }

    pub fn autoregressive(&self) -> &AutoregressiveForecaster<R, W> {
        &self.autoregressive
    }

    pub fn is_trained(&self) -> bool {
        self.seasonal.is_trained() && self.autoregressive.is_trained()
    }

    /// Train both component forecasters on the same history
    ///
    /// Components are trained on fresh copies and swapped in together, so a
    /// failure in either leaves this instance untrained.
    pub fn train(&mut self, series: &HistoricalSeries) -> Result<()> {
        if self.seasonal.is_trained() || self.autoregressive.is_trained() {
            return Err(ForecastError::AlreadyTrained(
                "Ensemble cannot be retrained in place; create a new instance".to_string(),
            ));
        }

        info!(rows = series.len(), "Training ensemble");
        let mut seasonal = self.seasonal.fresh();
        let mut autoregressive = self.autoregressive.fresh();
        seasonal.train(series)?;
        autoregressive.train(series)?;

        self.seasonal = seasonal;
        self.autoregressive = autoregressive;
        info!("Ensemble training complete");
        Ok(())
    }

    /// Blend with the static weight pair
    pub fn predict(&self, series: &HistoricalSeries, horizon_days: usize) -> Result<EnsembleForecast> {
        self.predict_with(series, horizon_days, WeightPolicy::Static)
    }

    /// Blend with horizon-adaptive weights
    pub fn adaptive_predict(
        &self,
        series: &HistoricalSeries,
        horizon_days: usize,
    ) -> Result<EnsembleForecast> {
        self.predict_with(series, horizon_days, WeightPolicy::Adaptive)
    }

    /// Forecast both components and blend them under `policy`
    pub fn predict_with(
        &self,
        series: &HistoricalSeries,
        horizon_days: usize,
        policy: WeightPolicy,
    ) -> Result<EnsembleForecast> {
        let seasonal = self.seasonal.predict(horizon_days, false)?;
        let autoregressive = self.autoregressive.predict_future(series, horizon_days)?;

        let points = match policy {
            WeightPolicy::Static => join_forecasts(&seasonal, &autoregressive, |_| self.weights),
            WeightPolicy::Adaptive => join_forecasts(&seasonal, &autoregressive, |k| {
                EnsembleWeights::adaptive(k, horizon_days)
            }),
        };

        Ok(EnsembleForecast {
            points,
            seasonal,
            autoregressive,
        })
    }

    /// Hold out the last `test_days` and score all three forecast variants
    ///
    /// Trains fresh component models on the remaining history, so this
    /// instance is left untouched.
    pub fn evaluate(&self, series: &HistoricalSeries, test_days: usize) -> Result<EvaluationReport> {
        if test_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "test_days must be positive".to_string(),
            ));
        }
        if series.len() < test_days + MIN_EVALUATION_TRAINING {
            return Err(ForecastError::InsufficientData(format!(
                "Evaluation needs at least {} observations, have {}",
                test_days + MIN_EVALUATION_TRAINING,
                series.len()
            )));
        }

        let (train, test) = series.split_at(series.len() - test_days);
        let mut candidate = self.fresh();
        candidate.train(&train)?;
        let forecast = candidate.predict(&train, test_days)?;

        let actual_by_date: BTreeMap<NaiveDate, f64> = test
            .observations()
            .iter()
            .map(|obs| (obs.date, obs.target))
            .collect();

        let mut actual = Vec::new();
        let mut blended = Vec::new();
        let mut seasonal = Vec::new();
        let mut autoregressive = Vec::new();
        for point in forecast.points() {
            if let Some(&value) = actual_by_date.get(&point.date) {
                actual.push(value);
                blended.push(point.forecast);
                seasonal.push(point.forecast_seasonal);
                autoregressive.push(point.forecast_autoregressive);
            }
        }

        if actual.is_empty() {
            return Err(ForecastError::InsufficientData(
                "No held-out dates overlap the forecast".to_string(),
            ));
        }

        let report = EvaluationReport::new(vec![
            ModelScore::compute("Ensemble", &blended, &actual)?,
            ModelScore::compute("Seasonal", &seasonal, &actual)?,
            ModelScore::compute("Autoregressive", &autoregressive, &actual)?,
        ]);

        for score in &report.scores {
            info!(
                model = %score.model,
                rmse = score.rmse,
                mae = score.mae,
                mape = score.mape,
                "Evaluation"
            );
        }

        Ok(report)
    }
}

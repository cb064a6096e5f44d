//! Forecasting models for renewable score series
//!
//! Two pluggable model strategies sit behind narrow fit/predict contracts:
//! - [`DecompositionModel`]: trend plus seasonality over the date axis
//! - [`RegressionModel`]: tabular regression over engineered features
//!
//! The forecasters in [`seasonal`], [`autoregressive`] and [`ensemble`] wrap
//! those strategies and own the Untrained/Trained lifecycle.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod autoregressive;
pub mod boosting;
pub mod ensemble;
pub mod fourier;
pub mod seasonal;

/// Lifecycle of a forecaster instance
///
/// An instance moves from `Untrained` to `Trained` exactly once.
#[derive(Debug, Clone)]
pub enum ModelState<T> {
    Untrained,
    Trained(T),
}

impl<T> Default for ModelState<T> {
    fn default() -> Self {
        ModelState::Untrained
    }
}

impl<T> ModelState<T> {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained(_))
    }

    /// Borrow the fitted state, failing when untrained
    pub fn fitted(&self, model: &str) -> Result<&T> {
        match self {
            ModelState::Trained(fitted) => Ok(fitted),
            ModelState::Untrained => Err(ForecastError::ModelNotTrained(format!(
                "{} must be trained before use",
                model
            ))),
        }
    }

    /// Fail when the instance has already been trained
    pub fn ensure_untrained(&self, model: &str) -> Result<()> {
        if self.is_trained() {
            return Err(ForecastError::AlreadyTrained(format!(
                "{} cannot be retrained in place; create a new instance",
                model
            )));
        }
        Ok(())
    }
}

/// Fitted value and optional interval from a decomposition model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionPoint {
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Trend plus seasonality model over calendar dates
pub trait DecompositionModel: Debug + Clone + Send + Sync {
    /// The type of fitted model produced
    type Fitted: FittedDecomposition;

    /// Fit the model on (date, value) pairs
    fn fit(&self, dates: &[NaiveDate], values: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Fitted decomposition model
pub trait FittedDecomposition: Debug + Send + Sync {
    /// Point estimate and interval for each requested date
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<DecompositionPoint>>;
}

/// Tabular regression model over feature rows
pub trait RegressionModel: Debug + Clone + Send + Sync {
    /// The type of fitted model produced
    type Fitted: FittedRegression;

    /// Fit the model on feature rows and targets
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Fitted regression model
pub trait FittedRegression: Debug + Send + Sync {
    /// Predict the target for one feature row
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Non-negative importance per feature column
    fn feature_importances(&self) -> Vec<f64>;
}

/// One forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl ForecastPoint {
    pub fn new(date: NaiveDate, forecast: f64) -> Self {
        Self {
            date,
            forecast,
            lower_bound: None,
            upper_bound: None,
        }
    }

    pub fn with_bounds(date: NaiveDate, forecast: f64, lower: f64, upper: f64) -> Self {
        Self {
            date,
            forecast,
            lower_bound: Some(lower),
            upper_bound: Some(upper),
        }
    }
}

/// Contiguous daily forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Create a forecast from points on consecutive days
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].date != pair[0].date + Duration::days(1) {
                return Err(ForecastError::ValidationError(format!(
                    "Forecast dates must be contiguous: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
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

    /// Forecast values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.forecast).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Whether any point carries interval bounds
    pub fn has_bounds(&self) -> bool {
        self.points.iter().any(|p| p.lower_bound.is_some())
    }

    /// Tabular view with `date`, `forecast` and, when present, the bounds
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.points.iter().map(|p| p.date.to_string()).collect();
        let mut columns = vec![
            Series::new("date", dates),
            Series::new("forecast", self.values()),
        ];

        if self.has_bounds() {
            let lower: Vec<Option<f64>> = self.points.iter().map(|p| p.lower_bound).collect();
            let upper: Vec<Option<f64>> = self.points.iter().map(|p| p.upper_bound).collect();
            columns.push(Series::new("lower_bound", lower));
            columns.push(Series::new("upper_bound", upper));
        }

        Ok(DataFrame::new(columns)?)
    }
}

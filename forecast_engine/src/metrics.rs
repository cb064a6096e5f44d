//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::utils::round_to;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Offset that keeps MAPE finite on zero actuals
const MAPE_EPSILON: f64 = 1e-10;

fn check_lengths(forecast: &[f64], actual: &[f64]) -> Result<()> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Root mean squared error
pub fn rmse(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    let mse = forecast
        .iter()
        .zip(actual)
        .map(|(f, a)| (a - f).powi(2))
        .sum::<f64>()
        / forecast.len() as f64;
    Ok(mse.sqrt())
}

/// Mean absolute error
pub fn mae(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    Ok(forecast
        .iter()
        .zip(actual)
        .map(|(f, a)| (a - f).abs())
        .sum::<f64>()
        / forecast.len() as f64)
}

/// Mean absolute percentage error, in percent
pub fn mape(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    Ok(forecast
        .iter()
        .zip(actual)
        .map(|(f, a)| ((a - f) / (a + MAPE_EPSILON)).abs())
        .sum::<f64>()
        / forecast.len() as f64
        * 100.0)
}

/// Scores for one forecast variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: String,
    pub rmse: f64,
    pub mae: f64,
    /// Percent
    pub mape: f64,
}

impl ModelScore {
    /// Score a forecast against actual values
    pub fn compute(model: impl Into<String>, forecast: &[f64], actual: &[f64]) -> Result<Self> {
        Ok(Self {
            model: model.into(),
            rmse: rmse(forecast, actual)?,
            mae: mae(forecast, actual)?,
            mape: mape(forecast, actual)?,
        })
    }
}

/// Held-out comparison of the ensemble and its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub scores: Vec<ModelScore>,
}

impl EvaluationReport {
    pub fn new(scores: Vec<ModelScore>) -> Self {
        Self { scores }
    }

    /// Look up the score for a variant by name
    pub fn score(&self, model: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.model == model)
    }

    /// Table with `model`, `RMSE`, `MAE`, `MAPE`, rounded for display
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let models: Vec<&str> = self.scores.iter().map(|s| s.model.as_str()).collect();
        let rmse: Vec<f64> = self.scores.iter().map(|s| round_to(s.rmse, 4)).collect();
        let mae: Vec<f64> = self.scores.iter().map(|s| round_to(s.mae, 4)).collect();
        let mape: Vec<f64> = self.scores.iter().map(|s| round_to(s.mape, 2)).collect();

        Ok(DataFrame::new(vec![
            Series::new("model", models),
            Series::new("RMSE", rmse),
            Series::new("MAE", mae),
            Series::new("MAPE", mape),
        ])?)
    }
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Model Evaluation:")?;
        writeln!(f, "  {:<16} {:>8} {:>8} {:>9}", "Model", "RMSE", "MAE", "MAPE")?;
        for score in &self.scores {
            writeln!(
                f,
                "  {:<16} {:>8.4} {:>8.4} {:>8.2}%",
                score.model, score.rmse, score.mae, score.mape
            )?;
        }
        Ok(())
    }
}

//! Engine configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! { "ensemble": { "adaptive": true }, "boosting": { "n_estimators": 200 } }
//! ```

use crate::data::TARGET_COLUMN;
use crate::error::{ForecastError, Result};
use crate::models::autoregressive::AutoregressiveForecaster;
use crate::models::boosting::GradientBoostedTrees;
use crate::models::ensemble::{EnsembleForecaster, EnsembleWeights};
use crate::models::fourier::FourierTrendModel;
use crate::models::seasonal::SeasonalForecaster;
use crate::weather::ClimatologicalEstimator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Decomposition model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    /// Fourier order of the yearly component
    pub yearly_order: usize,
    /// Add a weekly component
    pub weekly_seasonality: bool,
    /// Fourier order of the weekly component
    pub weekly_order: usize,
    /// Coverage of the uncertainty interval
    pub interval_width: f64,
    /// Ridge penalty on seasonal coefficients
    pub ridge: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_order: 10,
            weekly_seasonality: false,
            weekly_order: 3,
            interval_width: 0.8,
            ridge: 1.0,
        }
    }
}

/// Gradient boosting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Fraction of feature columns sampled per tree
    pub colsample: f64,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Seed for row/column sampling and the validation split
    pub seed: u64,
    /// Share of feature rows held out for validation RMSE
    pub validation_fraction: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            learning_rate: 0.05,
            max_depth: 6,
            subsample: 0.8,
            colsample: 0.8,
            lambda: 1.0,
            seed: 42,
            validation_fraction: 0.2,
        }
    }
}

/// Ensemble weighting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub seasonal_weight: f64,
    pub autoregressive_weight: f64,
    /// Use horizon-adaptive weights instead of the static pair
    pub adaptive: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            seasonal_weight: 0.5,
            autoregressive_weight: 0.5,
            adaptive: false,
        }
    }
}

/// A labelled forecast horizon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonConfig {
    pub label: String,
    pub days: usize,
}

impl HorizonConfig {
    pub fn new(label: impl Into<String>, days: usize) -> Self {
        Self {
            label: label.into(),
            days,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Column holding the renewable score
    pub target_column: String,
    pub seasonal: SeasonalConfig,
    pub boosting: BoostingConfig,
    pub ensemble: EnsembleConfig,
    /// Horizons produced by batch forecasting
    pub horizons: Vec<HorizonConfig>,
    /// Locations with fewer observations are skipped in batch runs
    pub min_history: usize,
    /// Locations kept per province and period when ranking
    pub top_n: usize,
    /// Held-out days for evaluation
    pub test_days: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            seasonal: SeasonalConfig::default(),
            boosting: BoostingConfig::default(),
            ensemble: EnsembleConfig::default(),
            horizons: vec![
                HorizonConfig::new("30_days", 30),
                HorizonConfig::new("4_months", 120),
                HorizonConfig::new("1_year", 365),
            ],
            min_history: 10,
            top_n: 3,
            test_days: 30,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(ForecastError::ConfigError(
                "target_column must not be empty".to_string(),
            ));
        }
        if self.horizons.is_empty() {
            return Err(ForecastError::ConfigError(
                "At least one horizon is required".to_string(),
            ));
        }
        if let Some(horizon) = self.horizons.iter().find(|h| h.days == 0) {
            return Err(ForecastError::ConfigError(format!(
                "Horizon '{}' must cover at least one day",
                horizon.label
            )));
        }
        if self.test_days == 0 {
            return Err(ForecastError::ConfigError(
                "test_days must be positive".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(ForecastError::ConfigError(
                "top_n must be positive".to_string(),
            ));
        }

        // Surface model and weight errors at load time
        self.build_ensemble()?;
        Ok(())
    }

    /// Build an untrained ensemble from these settings
    pub fn build_ensemble(&self) -> Result<EnsembleForecaster> {
        let seasonal = SeasonalForecaster::new(FourierTrendModel::from_config(&self.seasonal)?);
        let autoregressive = AutoregressiveForecaster::with_parts(
            GradientBoostedTrees::from_config(&self.boosting)?,
            ClimatologicalEstimator,
            self.boosting.validation_fraction,
            self.boosting.seed,
        )?;
        let weights = EnsembleWeights::new(
            self.ensemble.seasonal_weight,
            self.ensemble.autoregressive_weight,
        )?;

        Ok(EnsembleForecaster::with_models(seasonal, autoregressive, weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "ensemble": { "adaptive": true }, "top_n": 5 }"#)
                .unwrap();

        assert!(config.ensemble.adaptive);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.boosting, BoostingConfig::default());
        assert_eq!(config.horizons.len(), 3);
        assert_eq!(config.target_column, "Renewable_Score");
        assert!(!config.seasonal.weekly_seasonality);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_json_str(r#"{ "horizons": [] }"#).is_err());
        assert!(EngineConfig::from_json_str(
            r#"{ "horizons": [{ "label": "none", "days": 0 }] }"#
        )
        .is_err());
        assert!(EngineConfig::from_json_str(
            r#"{ "ensemble": { "seasonal_weight": 0.0, "autoregressive_weight": 0.0 } }"#
        )
        .is_err());
        assert!(EngineConfig::from_json_str(r#"{ "boosting": { "learning_rate": 0.0 } }"#).is_err());
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ForecastError::ConfigError(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}

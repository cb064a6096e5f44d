//! # Forecast Engine
//!
//! Hybrid forecasting of bounded [0, 1] renewable potential scores per location.
//!
//! ## Features
//!
//! - Per-location daily history loaded from CSV, with the score derived from raw
//!   weather columns when absent
//! - Lag and rolling-window feature engineering
//! - Seasonal forecaster (linear trend plus Fourier seasonality)
//! - Autoregressive forecaster (gradient-boosted trees, recursive multi-step)
//! - Ensemble combiner with static or horizon-adaptive weights
//! - Held-out evaluation (RMSE, MAE, MAPE)
//! - Parallel batch forecasting and top-N ranking per province
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_engine::data::DataLoader;
//! use forecast_engine::models::ensemble::EnsembleForecaster;
//!
//! # fn main() -> forecast_engine::error::Result<()> {
//! let locations = DataLoader::from_csv("data/processed_indices.csv", "Renewable_Score")?;
//! let history = &locations[0].series;
//!
//! let mut ensemble = EnsembleForecaster::default();
//! ensemble.train(history)?;
//!
//! let forecast = ensemble.adaptive_predict(history, 30)?;
//! println!("{}", forecast.to_dataframe()?);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod utils;
pub mod weather;

// Re-export commonly used types
pub use crate::config::EngineConfig;
pub use crate::data::{DataLoader, HistoricalSeries, LocationKey, LocationSeries, Observation};
pub use crate::error::ForecastError;
pub use crate::features::FeatureEngineer;
pub use crate::metrics::EvaluationReport;
pub use crate::models::autoregressive::AutoregressiveForecaster;
pub use crate::models::ensemble::{EnsembleForecaster, EnsembleWeights, WeightPolicy};
pub use crate::models::seasonal::SeasonalForecaster;
pub use crate::models::{ForecastPoint, ForecastSeries};
pub use crate::weather::{
    ClimatologicalEstimator, CovariateProfile, MonthlyClimatology, WeatherEstimator,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Error types for the forecast_engine crate

use score_math::MathError;
use thiserror::Error;

/// Boxed cause attached to a training failure
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough history for the requested operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A forecaster was asked for output before `train`
    #[error("Model not trained: {0}")]
    ModelNotTrained(String),

    /// A forecaster instance can only be trained once
    #[error("Model already trained: {0}")]
    AlreadyTrained(String),

    /// The underlying model rejected its training input
    #[error("Training failed for {model}: {source}")]
    TrainingFailure {
        model: String,
        #[source]
        source: BoxedCause,
    },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter or shape validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error loading or validating configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from score calculations
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// Wrap a model-level cause as a training failure
    pub fn training_failure<E>(model: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        ForecastError::TrainingFailure {
            model: model.into(),
            source: cause.into(),
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}

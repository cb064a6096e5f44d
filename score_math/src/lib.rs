//! # Score Math
//!
//! Numeric building blocks for renewable potential forecasting.
//! This crate provides the descriptive statistics, fixed-size rolling
//! windows and renewable index calculations shared by the forecasting engine.

use thiserror::Error;

pub mod indices;
pub mod rolling;
pub mod stats;

pub use indices::{compute_indices, RenewableIndex, WeatherReading};
pub use rolling::RollingWindow;

/// Errors that can occur in score calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for score math operations
pub type Result<T> = std::result::Result<T, MathError>;

//! # Renewcast
//!
//! Workspace facade for renewable potential forecasting.
//!
//! - [`score_math`]: statistics, rolling windows and renewable index computation
//! - [`forecast_engine`]: data loading, feature engineering, the seasonal,
//!   autoregressive and ensemble forecasters, evaluation and batch ranking
//!
//! ## Example
//!
//! ```
//! use renewcast_workspace::score_math::{compute_indices, WeatherReading};
//!
//! let readings = vec![
//!     WeatherReading { tavg: Some(20.0), awnd: Some(4.0), ..Default::default() },
//!     WeatherReading { tavg: Some(5.0), prcp: Some(12.0), ..Default::default() },
//! ];
//! let indices = compute_indices(&readings).unwrap();
//! assert!(indices.iter().all(|i| (0.0..=1.0).contains(&i.score)));
//! ```

pub use forecast_engine;
pub use score_math;

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_engine::models::ensemble::EnsembleWeights;

    #[test]
    fn test_members_are_reachable() {
        let weights = EnsembleWeights::default();
        assert_eq!(weights.seasonal(), 0.5);

        let window = score_math::RollingWindow::new(7).unwrap();
        assert!(window.is_empty());
    }
}

//! Seasonal forecaster over a pluggable decomposition model

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::fourier::FourierTrendModel;
use crate::models::{
    DecompositionModel, FittedDecomposition, ForecastPoint, ForecastSeries, ModelState,
};
use crate::utils::future_dates;
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug)]
struct SeasonalFit<F> {
    fitted: F,
    last_date: NaiveDate,
}

/// Trend plus seasonality forecaster
#[derive(Debug)]
pub struct SeasonalForecaster<D: DecompositionModel = FourierTrendModel> {
    model: D,
    state: ModelState<SeasonalFit<D::Fitted>>,
}

impl<D: DecompositionModel> SeasonalForecaster<D> {
    pub fn new(model: D) -> Self {
        Self {
            model,
            state: ModelState::Untrained,
        }
    }

    /// An untrained copy with the same model settings
    pub fn fresh(&self) -> Self {
        Self::new(self.model.clone())
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    /// Fit the decomposition model on (date, target) pairs
    pub fn train(&mut self, series: &HistoricalSeries) -> Result<()> {
        self.state.ensure_untrained(self.model.name())?;

        let last_date = series.last_date().ok_or_else(|| {
            ForecastError::InsufficientData("Cannot train on an empty series".to_string())
        })?;

        info!(model = self.model.name(), rows = series.len(), "Training seasonal model");
        let fitted = self
            .model
            .fit(&series.dates(), &series.targets())
            .map_err(|e| ForecastError::training_failure(self.model.name(), e))?;

        self.state = ModelState::Trained(SeasonalFit { fitted, last_date });
        debug!(model = self.model.name(), "Seasonal model trained");
        Ok(())
    }

    /// Forecast `horizon_days` contiguous days past the last training date
    ///
    /// A zero horizon yields an empty forecast.
    pub fn predict(&self, horizon_days: usize, include_uncertainty: bool) -> Result<ForecastSeries> {
        let fit = self.state.fitted(self.model.name())?;
        let dates = future_dates(fit.last_date, horizon_days);
        let estimates = fit.fitted.predict(&dates)?;

        let points = dates
            .into_iter()
            .zip(estimates)
            .map(|(date, estimate)| {
                if include_uncertainty {
                    ForecastPoint::with_bounds(date, estimate.yhat, estimate.lower, estimate.upper)
                } else {
                    ForecastPoint::new(date, estimate.yhat)
                }
            })
            .collect();

        ForecastSeries::new(points)
    }
}

impl Default for SeasonalForecaster<FourierTrendModel> {
    fn default() -> Self {
        Self::new(FourierTrendModel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(days: usize) -> HistoricalSeries {
        let values: Vec<f64> = (0..days)
            .map(|i| 0.5 + 0.3 * (2.0 * std::f64::consts::PI * i as f64 / 365.25).sin())
            .collect();
        HistoricalSeries::from_values(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), &values)
            .unwrap()
    }

    #[test]
    fn test_predict_horizon_and_bounds() {
        let history = series(400);
        let mut forecaster = SeasonalForecaster::default();
        forecaster.train(&history).unwrap();

        let forecast = forecaster.predict(14, true).unwrap();
        assert_eq!(forecast.len(), 14);
        assert_eq!(
            forecast.first_date(),
            history.last_date().map(|d| d + Duration::days(1))
        );
        assert!(forecast
            .points()
            .iter()
            .all(|p| p.lower_bound.unwrap() <= p.forecast && p.forecast <= p.upper_bound.unwrap()));

        let plain = forecaster.predict(14, false).unwrap();
        assert!(!plain.has_bounds());
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut forecaster = SeasonalForecaster::default();
        assert!(matches!(
            forecaster.predict(5, false),
            Err(ForecastError::ModelNotTrained(_))
        ));

        forecaster.train(&series(30)).unwrap();
        assert!(matches!(
            forecaster.train(&series(30)),
            Err(ForecastError::AlreadyTrained(_))
        ));
        assert!(forecaster.predict(0, false).unwrap().is_empty());
        assert!(!forecaster.fresh().is_trained());
    }

    #[test]
    fn test_degenerate_series_is_training_failure() {
        let mut forecaster = SeasonalForecaster::default();
        let result = forecaster.train(&series(1));
        match result {
            Err(err @ ForecastError::TrainingFailure { .. }) => {
                assert!(std::error::Error::source(&err).is_some());
            }
            other => panic!("expected TrainingFailure, got {:?}", other),
        }
        assert!(!forecaster.is_trained());
    }
}

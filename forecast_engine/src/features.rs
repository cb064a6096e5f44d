//! Lag and rolling-window features for temporal learning

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use score_math::RollingWindow;
use std::collections::BTreeMap;

/// Trailing window length for lag and rolling features
pub const WINDOW: usize = 7;

/// Names of the derived temporal features, in column order
pub const TEMPORAL_FEATURES: [&str; 4] = ["lag_1", "lag_7", "rolling_mean_7", "rolling_std_7"];

/// Temporal features for one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagFeatures {
    pub lag_1: f64,
    pub lag_7: f64,
    pub rolling_mean_7: f64,
    pub rolling_std_7: f64,
}

/// One featurized date
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub date: NaiveDate,
    /// Values aligned with [`FeatureMatrix::feature_names`]
    pub values: Vec<f64>,
}

/// Aligned feature rows and targets
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature values without dates, for model fitting
    pub fn values(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| row.values.clone()).collect()
    }
}

/// Builds lag/rolling features from a historical series
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Column names for a series carrying the given covariates
    pub fn feature_names(covariates: &[&str]) -> Vec<String> {
        covariates
            .iter()
            .chain(TEMPORAL_FEATURES.iter())
            .map(|name| name.to_string())
            .collect()
    }

    /// Featurize every date that has a full trailing week behind it
    ///
    /// Produces `len(series) - 7` rows. Fails on fewer than 8 observations.
    pub fn build(&self, series: &HistoricalSeries) -> Result<FeatureMatrix> {
        if series.len() <= WINDOW {
            return Err(ForecastError::InsufficientData(format!(
                "Feature engineering needs at least {} observations, have {}",
                WINDOW + 1,
                series.len()
            )));
        }

        let covariates = series.present_covariates();
        let feature_names = Self::feature_names(&covariates);
        let observations = series.observations();
        let targets = series.targets();

        let mut window = RollingWindow::new(WINDOW)?;
        let mut rows = Vec::with_capacity(series.len() - WINDOW);
        let mut row_targets = Vec::with_capacity(series.len() - WINDOW);

        for (i, obs) in observations.iter().enumerate() {
            window.push(obs.target);
            if i < WINDOW {
                continue;
            }

            let lags = LagFeatures {
                lag_1: targets[i - 1],
                lag_7: targets[i - WINDOW],
                rolling_mean_7: window.mean()?,
                rolling_std_7: window.sample_std()?,
            };

            rows.push(FeatureVector {
                date: obs.date,
                values: assemble_row(&covariates, &obs.covariates, &lags)?,
            });
            row_targets.push(obs.target);
        }

        Ok(FeatureMatrix {
            feature_names,
            rows,
            targets: row_targets,
        })
    }
}

/// Lay out covariates then temporal features in training column order
pub fn assemble_row(
    covariate_names: &[&str],
    covariates: &BTreeMap<String, f64>,
    lags: &LagFeatures,
) -> Result<Vec<f64>> {
    let mut row = Vec::with_capacity(covariate_names.len() + TEMPORAL_FEATURES.len());
    for name in covariate_names {
        let value = covariates.get(*name).copied().ok_or_else(|| {
            ForecastError::DataError(format!("Missing covariate '{}' for feature row", name))
        })?;
        row.push(value);
    }
    row.extend([lags.lag_1, lags.lag_7, lags.rolling_mean_7, lags.rolling_std_7]);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
    }

    #[test]
    fn test_first_row_values() {
        let values: Vec<f64> = (1..=9).map(|v| v as f64 / 10.0).collect();
        let series = HistoricalSeries::from_values(start(), &values).unwrap();
        let matrix = FeatureEngineer::new().build(&series).unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.feature_names, TEMPORAL_FEATURES.to_vec());

        // Row for the 8th observation (0.8)
        let first = &matrix.rows[0];
        assert_eq!(first.date, start() + Duration::days(7));
        assert_relative_eq!(first.values[0], 0.7); // lag_1
        assert_relative_eq!(first.values[1], 0.1); // lag_7
        assert_relative_eq!(first.values[2], 0.5); // mean of 0.2..=0.8
        assert_relative_eq!(first.values[3], (0.14_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(matrix.targets[0], 0.8);
    }

    #[test]
    fn test_covariates_lead_the_columns() {
        let observations = (0..10)
            .map(|i| {
                Observation::new(start() + Duration::days(i), 0.5)
                    .with_covariate("TMAX", 20.0 + i as f64)
                    .with_covariate("PRCP", 1.0)
                    .with_covariate("AWND", 9.0)
            })
            .collect();
        let series = HistoricalSeries::new(observations).unwrap();
        let matrix = FeatureEngineer::new().build(&series).unwrap();

        assert_eq!(
            matrix.feature_names,
            vec!["PRCP", "TMAX", "lag_1", "lag_7", "rolling_mean_7", "rolling_std_7"]
        );
        assert_eq!(matrix.rows[0].values[..2], [1.0, 27.0]);
    }

    #[test]
    fn test_too_short_series() {
        let series = HistoricalSeries::from_values(start(), &[0.5; 7]).unwrap();
        let result = FeatureEngineer::new().build(&series);
        assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    }
}

//! Covariate estimation for future dates
//!
//! Recursive forecasting needs exogenous covariates for days that have not
//! been observed yet. A [`WeatherEstimator`] summarizes the history once into
//! a [`CovariateProfile`], which then answers every forecast day.

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use score_math::stats::median;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Supplies covariate values for future dates
pub trait WeatherEstimator: Debug + Clone + Send + Sync {
    /// Summary of the history that answers per-date queries
    type Profile: CovariateProfile;

    /// Summarize the named covariates of the series history
    fn profile(&self, history: &HistoricalSeries, covariates: &[&str]) -> Result<Self::Profile>;
}

/// Covariate estimates for individual dates
pub trait CovariateProfile {
    /// Estimate each profiled covariate on `date`
    fn estimate(&self, date: NaiveDate) -> Result<BTreeMap<String, f64>>;
}

/// Same-month climatology
///
/// Each covariate is the median over historical observations in the target
/// date's calendar month. When no observation shares that month, the most
/// recent observation's values are used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClimatologicalEstimator;

/// Per-month medians with a latest-observation fallback
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyClimatology {
    covariates: Vec<String>,
    /// Indexed by month number minus one
    monthly: [BTreeMap<String, f64>; 12],
    latest: BTreeMap<String, f64>,
}

impl WeatherEstimator for ClimatologicalEstimator {
    type Profile = MonthlyClimatology;

    fn profile(&self, history: &HistoricalSeries, covariates: &[&str]) -> Result<Self::Profile> {
        let mut samples: [BTreeMap<&str, Vec<f64>>; 12] = Default::default();
        for obs in history.observations() {
            let month = obs.date.month0() as usize;
            for &name in covariates {
                if let Some(value) = obs.covariate(name) {
                    samples[month].entry(name).or_default().push(value);
                }
            }
        }

        let mut monthly: [BTreeMap<String, f64>; 12] = Default::default();
        for (medians, month_samples) in monthly.iter_mut().zip(&samples) {
            for (name, values) in month_samples {
                medians.insert(name.to_string(), median(values)?);
            }
        }

        let latest = history
            .last()
            .map(|obs| {
                covariates
                    .iter()
                    .filter_map(|&name| obs.covariate(name).map(|v| (name.to_string(), v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(MonthlyClimatology {
            covariates: covariates.iter().map(|name| name.to_string()).collect(),
            monthly,
            latest,
        })
    }
}

impl CovariateProfile for MonthlyClimatology {
    fn estimate(&self, date: NaiveDate) -> Result<BTreeMap<String, f64>> {
        let medians = &self.monthly[date.month0() as usize];

        self.covariates
            .iter()
            .map(|name| {
                let value = medians
                    .get(name)
                    .or_else(|| self.latest.get(name))
                    .copied()
                    .ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Covariate '{}' missing from the latest observation",
                            name
                        ))
                    })?;
                Ok((name.clone(), value))
            })
            .collect()
    }
}

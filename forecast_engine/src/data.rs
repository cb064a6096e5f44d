//! Historical series handling for forecasting
//!
//! A [`HistoricalSeries`] is the clean, daily, per-location input every
//! forecaster consumes. [`DataLoader`] turns a CSV table (one row per
//! location and day) into one series per location.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use score_math::{compute_indices, WeatherReading};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Default name of the target column
pub const TARGET_COLUMN: &str = "Renewable_Score";

/// Exogenous covariates the feature engineer will use when present
pub const COVARIATE_CANDIDATES: [&str; 7] =
    ["PRCP", "TAVG", "TMIN", "TMAX", "SNOW", "SNWD", "elevation"];

/// Raw weather columns used to derive the target when it is absent
const RAW_WEATHER_COLUMNS: [&str; 6] = ["PRCP", "TAVG", "AWND", "WSF2", "SNOW", "SNWD"];

/// One day of history for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar day of the observation
    pub date: NaiveDate,
    /// Renewable score in [0, 1]
    pub target: f64,
    /// Named exogenous covariates carried by this observation
    pub covariates: BTreeMap<String, f64>,
}

impl Observation {
    /// Create an observation without covariates
    pub fn new(date: NaiveDate, target: f64) -> Self {
        Self {
            date,
            target,
            covariates: BTreeMap::new(),
        }
    }

    /// Attach a covariate value
    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }

    /// Look up a covariate value
    pub fn covariate(&self, name: &str) -> Option<f64> {
        self.covariates.get(name).copied()
    }
}

/// Ordered daily history for one location
///
/// Dates are strictly ascending (no duplicates) and every target is a finite
/// value in [0, 1]; both are checked at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    observations: Vec<Observation>,
}

impl HistoricalSeries {
    /// Create a series from observations already sorted by date
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        for obs in &observations {
            if !obs.target.is_finite() || !(0.0..=1.0).contains(&obs.target) {
                return Err(ForecastError::DataError(format!(
                    "Target on {} must be a finite value in [0, 1], got {}",
                    obs.date, obs.target
                )));
            }
        }

        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ForecastError::DataError(format!(
                    "Dates must be unique and ascending: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }

        Ok(Self { observations })
    }

    /// Create a series from observations in any order
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Result<Self> {
        observations.sort_by_key(|obs| obs.date);
        Self::new(observations)
    }

    /// Create a covariate-free series of consecutive days starting at `start`
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Observation::new(start + Duration::days(i as i64), value))
            .collect();
        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Target values in date order
    pub fn targets(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.target).collect()
    }

    /// The last `n` targets in date order
    pub fn tail_targets(&self, n: usize) -> Vec<f64> {
        let start = self.observations.len().saturating_sub(n);
        self.observations[start..]
            .iter()
            .map(|obs| obs.target)
            .collect()
    }

    /// Dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|obs| obs.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|obs| obs.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|obs| obs.date)
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Candidate covariates carried by every observation, in candidate order
    pub fn present_covariates(&self) -> Vec<&'static str> {
        if self.observations.is_empty() {
            return Vec::new();
        }

        COVARIATE_CANDIDATES
            .iter()
            .copied()
            .filter(|name| {
                self.observations
                    .iter()
                    .all(|obs| obs.covariates.contains_key(*name))
            })
            .collect()
    }

    /// Split into the first `at` observations and the remainder
    pub fn split_at(&self, at: usize) -> (HistoricalSeries, HistoricalSeries) {
        let at = at.min(self.observations.len());
        let (head, tail) = self.observations.split_at(at);
        (
            HistoricalSeries {
                observations: head.to_vec(),
            },
            HistoricalSeries {
                observations: tail.to_vec(),
            },
        )
    }
}

/// Identifies the location a series belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub province: String,
    pub city: String,
}

impl LocationKey {
    pub fn new(province: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            province: province.into(),
            city: city.into(),
        }
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.province)
    }
}

/// History for one location
#[derive(Debug, Clone)]
pub struct LocationSeries {
    pub location: LocationKey,
    pub series: HistoricalSeries,
}

/// Data loader for per-location renewable score tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load per-location series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, target_column: &str) -> Result<Vec<LocationSeries>> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, target_column)
    }

    /// Build per-location series from an existing DataFrame
    ///
    /// When `target_column` is absent the score is derived from the raw
    /// weather columns. Rows without a date or target are skipped, as are
    /// locations whose history has duplicate dates or out-of-range targets.
    pub fn from_dataframe(df: &DataFrame, target_column: &str) -> Result<Vec<LocationSeries>> {
        let time_column = Self::detect_time_column(df)?;
        let dates = Self::date_column(df, &time_column)?;

        let targets = match Self::float_column(df, target_column)? {
            Some(values) => values,
            None => Self::derive_targets(df)?,
        };

        let provinces = Self::string_column(df, "province")?;
        let cities = Self::string_column(df, "city")?;

        let mut covariates = Vec::new();
        for name in COVARIATE_CANDIDATES {
            if let Some(values) = Self::float_column(df, name)? {
                covariates.push((name, values));
            }
        }

        let mut grouped: BTreeMap<LocationKey, Vec<Observation>> = BTreeMap::new();
        let mut skipped = 0usize;

        for row in 0..df.height() {
            let (Some(date), Some(target)) = (dates[row], targets[row]) else {
                skipped += 1;
                continue;
            };

            let location = LocationKey::new(
                Self::label_at(&provinces, row),
                Self::label_at(&cities, row),
            );

            let mut obs = Observation::new(date, target);
            for (name, values) in &covariates {
                if let Some(value) = values[row] {
                    obs = obs.with_covariate(*name, value);
                }
            }

            grouped.entry(location).or_default().push(obs);
        }

        if skipped > 0 {
            debug!(skipped, "Skipped rows without a date or target");
        }

        // A location with invalid history is dropped without affecting the rest
        let locations = grouped
            .into_iter()
            .filter_map(
                |(location, observations)| match HistoricalSeries::from_unsorted(observations) {
                    Ok(series) => Some(LocationSeries { location, series }),
                    Err(e) => {
                        warn!(location = %location, error = %e, "Skipping location");
                        None
                    }
                },
            )
            .collect();

        Ok(locations)
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        let column_names = df.get_column_names();

        // Look for common time column names
        for name in &column_names {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(name.to_string());
            }
        }

        // If not found, use the first column if it looks like a date
        if let Some(first_col) = df.get_columns().first() {
            if first_col.dtype().is_temporal() {
                return Ok(first_col.name().to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }

    fn has_column(df: &DataFrame, name: &str) -> bool {
        df.get_column_names().iter().any(|c| *c == name)
    }

    pub(crate) fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
        let col = df.column(name)?.cast(&DataType::Utf8)?;
        col.utf8()?
            .into_iter()
            .map(|value| value.map(parse_date).transpose())
            .collect()
    }

    pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
        if !Self::has_column(df, name) {
            return Ok(None);
        }

        let col = df.column(name)?;
        if !col.dtype().is_numeric() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64",
                name
            )));
        }

        let col = col.cast(&DataType::Float64)?;
        let values = col
            .f64()?
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()))
            .collect();
        Ok(Some(values))
    }

    pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
        if !Self::has_column(df, name) {
            return Ok(None);
        }

        let col = df.column(name)?.cast(&DataType::Utf8)?;
        let values = col
            .utf8()?
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();
        Ok(Some(values))
    }

    fn label_at(labels: &Option<Vec<Option<String>>>, row: usize) -> String {
        labels
            .as_ref()
            .and_then(|values| values[row].clone())
            .unwrap_or_default()
    }

    /// Derive renewable scores from the raw weather columns
    fn derive_targets(df: &DataFrame) -> Result<Vec<Option<f64>>> {
        let mut columns = BTreeMap::new();
        for name in RAW_WEATHER_COLUMNS {
            if let Some(values) = Self::float_column(df, name)? {
                columns.insert(name, values);
            }
        }

        if columns.is_empty() {
            return Err(ForecastError::DataError(
                "No target column and no raw weather columns to derive it from".to_string(),
            ));
        }

        let value = |name: &str, row: usize| columns.get(name).and_then(|values| values[row]);
        let readings: Vec<WeatherReading> = (0..df.height())
            .map(|row| WeatherReading {
                prcp: value("PRCP", row),
                tavg: value("TAVG", row),
                awnd: value("AWND", row),
                wsf2: value("WSF2", row),
                snow: value("SNOW", row),
                snwd: value("SNWD", row),
            })
            .collect();

        let indices = compute_indices(&readings)?;
        Ok(indices.into_iter().map(|index| Some(index.score)).collect())
    }
}

/// Parse a calendar date, ignoring any time-of-day suffix
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| ForecastError::DataError(format!("Invalid date '{}': {}", value, e)))
}

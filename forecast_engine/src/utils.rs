//! Utility functions for the forecast_engine crate

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::path::Path;

/// Shuffle row indices with a fixed seed and split off a test share
///
/// Returns `(train, test)` where the test set holds `ceil(n * test_fraction)`
/// rows.
pub fn shuffled_split(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test fraction must be between 0 and 1, got {}",
            test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64 * test_fraction).ceil() as usize).min(n);
    let test = indices.split_off(n - test_size);
    Ok((indices, test))
}

/// Consecutive daily dates after `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|i| last_date + Duration::days(i))
        .collect()
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Write a DataFrame to CSV with a header row
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;
    Ok(())
}

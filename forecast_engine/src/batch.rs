//! Multi-location forecasting and ranking
//!
//! Every location gets its own ensemble, so locations are forecast in
//! parallel with rayon. Results keep the input location order.

use crate::config::{EngineConfig, HorizonConfig};
use crate::data::{DataLoader, LocationKey, LocationSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::EvaluationReport;
use crate::models::ensemble::WeightPolicy;
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// One forecast day for one location and horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationForecastRow {
    pub province: String,
    pub city: String,
    /// Horizon label, e.g. `30_days`
    pub period: String,
    pub date: NaiveDate,
    pub forecast: f64,
}

/// Mean forecast of a location over one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLocation {
    pub province: String,
    pub city: String,
    pub period: String,
    pub avg_forecast: f64,
}

/// Held-out evaluation of one location
#[derive(Debug, Clone)]
pub struct LocationEvaluation {
    pub location: LocationKey,
    pub report: EvaluationReport,
}

fn weight_policy(config: &EngineConfig) -> WeightPolicy {
    if config.ensemble.adaptive {
        WeightPolicy::Adaptive
    } else {
        WeightPolicy::Static
    }
}

/// Train one ensemble and forecast every configured horizon
pub fn forecast_location(
    location: &LocationSeries,
    config: &EngineConfig,
) -> Result<Vec<LocationForecastRow>> {
    let mut ensemble = config.build_ensemble()?;
    ensemble.train(&location.series)?;

    let policy = weight_policy(config);
    let mut rows = Vec::new();
    for HorizonConfig { label, days } in &config.horizons {
        let forecast = ensemble.predict_with(&location.series, *days, policy)?;
        rows.extend(forecast.points().iter().map(|point| LocationForecastRow {
            province: location.location.province.clone(),
            city: location.location.city.clone(),
            period: label.clone(),
            date: point.date,
            forecast: point.forecast,
        }));
    }

    Ok(rows)
}

/// Forecast every location with enough history
///
/// Locations shorter than `min_history` are skipped. A failing location is
/// logged and skipped without affecting the others.
pub fn forecast_locations(
    locations: &[LocationSeries],
    config: &EngineConfig,
) -> Vec<LocationForecastRow> {
    let per_location: Vec<Vec<LocationForecastRow>> = locations
        .par_iter()
        .map(|location| {
            if location.series.len() < config.min_history {
                debug!(
                    location = %location.location,
                    rows = location.series.len(),
                    "Skipping location with short history"
                );
                return Vec::new();
            }

            match forecast_location(location, config) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(location = %location.location, error = %e, "Forecast failed");
                    Vec::new()
                }
            }
        })
        .collect();

    let forecast_count = per_location.iter().filter(|rows| !rows.is_empty()).count();
    info!(
        locations = locations.len(),
        forecasted = forecast_count,
        "Batch forecast complete"
    );

    per_location.into_iter().flatten().collect()
}

/// Evaluate every location with enough history for the configured hold-out
pub fn evaluate_locations(
    locations: &[LocationSeries],
    config: &EngineConfig,
) -> Vec<LocationEvaluation> {
    locations
        .par_iter()
        .filter_map(|location| {
            let result = config
                .build_ensemble()
                .and_then(|ensemble| ensemble.evaluate(&location.series, config.test_days));

            match result {
                Ok(report) => Some(LocationEvaluation {
                    location: location.location.clone(),
                    report,
                }),
                Err(e) => {
                    warn!(location = %location.location, error = %e, "Evaluation skipped");
                    None
                }
            }
        })
        .collect()
}

/// Top `top_n` locations per (province, period) by mean forecast
///
/// Output is sorted by province, then period, then descending mean.
pub fn rank_top_locations(rows: &[LocationForecastRow], top_n: usize) -> Vec<RankedLocation> {
    let mut sums: BTreeMap<(&str, &str, &str), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = sums
            .entry((row.province.as_str(), row.city.as_str(), row.period.as_str()))
            .or_insert((0.0, 0));
        entry.0 += row.forecast;
        entry.1 += 1;
    }

    let mut summary: Vec<RankedLocation> = sums
        .into_iter()
        .map(|((province, city, period), (sum, count))| RankedLocation {
            province: province.to_string(),
            city: city.to_string(),
            period: period.to_string(),
            avg_forecast: sum / count as f64,
        })
        .collect();

    summary.sort_by(|a, b| {
        a.province
            .cmp(&b.province)
            .then_with(|| a.period.cmp(&b.period))
            .then_with(|| b.avg_forecast.total_cmp(&a.avg_forecast))
    });

    let mut ranked = Vec::new();
    let mut group: Option<(String, String)> = None;
    let mut taken = 0;
    for entry in summary {
        let key = (entry.province.clone(), entry.period.clone());
        if group.as_ref() != Some(&key) {
            group = Some(key);
            taken = 0;
        }
        if taken < top_n {
            ranked.push(entry);
            taken += 1;
        }
    }

    ranked
}

/// Table with `date`, `forecast`, `province`, `city`, `period`
pub fn forecast_rows_to_dataframe(rows: &[LocationForecastRow]) -> Result<DataFrame> {
    let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
    let forecasts: Vec<f64> = rows.iter().map(|r| r.forecast).collect();
    let provinces: Vec<&str> = rows.iter().map(|r| r.province.as_str()).collect();
    let cities: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
    let periods: Vec<&str> = rows.iter().map(|r| r.period.as_str()).collect();

    Ok(DataFrame::new(vec![
        Series::new("date", dates),
        Series::new("forecast", forecasts),
        Series::new("province", provinces),
        Series::new("city", cities),
        Series::new("period", periods),
    ])?)
}

/// Table with `province`, `city`, `period`, `avg_forecast`
pub fn rankings_to_dataframe(ranked: &[RankedLocation]) -> Result<DataFrame> {
    let provinces: Vec<&str> = ranked.iter().map(|r| r.province.as_str()).collect();
    let cities: Vec<&str> = ranked.iter().map(|r| r.city.as_str()).collect();
    let periods: Vec<&str> = ranked.iter().map(|r| r.period.as_str()).collect();
    let averages: Vec<f64> = ranked.iter().map(|r| r.avg_forecast).collect();

    Ok(DataFrame::new(vec![
        Series::new("province", provinces),
        Series::new("city", cities),
        Series::new("period", periods),
        Series::new("avg_forecast", averages),
    ])?)
}

/// Read forecast rows previously written by [`forecast_rows_to_dataframe`]
pub fn read_forecast_rows<P: AsRef<Path>>(path: P) -> Result<Vec<LocationForecastRow>> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;

    let required = |name: &str| -> Result<Vec<Option<String>>> {
        DataLoader::string_column(&df, name)?.ok_or_else(|| {
            ForecastError::DataError(format!("Forecast table is missing column '{}'", name))
        })
    };

    let provinces = required("province")?;
    let cities = required("city")?;
    let periods = required("period")?;
    let dates = DataLoader::date_column(&df, "date")?;
    let forecasts = DataLoader::float_column(&df, "forecast")?.ok_or_else(|| {
        ForecastError::DataError("Forecast table is missing column 'forecast'".to_string())
    })?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(date), Some(forecast), Some(period)) = (dates[i], forecasts[i], &periods[i])
        else {
            continue;
        };
        rows.push(LocationForecastRow {
            province: provinces[i].clone().unwrap_or_default(),
            city: cities[i].clone().unwrap_or_default(),
            period: period.clone(),
            date,
            forecast,
        });
    }

    debug!(rows = rows.len(), "Loaded forecast rows");
    Ok(rows)
}

//! Renewable potential indices
//!
//! Derives three raw indicators from daily weather readings and combines them
//! into a single score:
//! - Solar: average temperature penalized by precipitation (`TAVG - PRCP / 10`)
//! - Wind: mean of average and fastest two-minute wind speed (`(AWND + WSF2) / 2`)
//! - Hydro: liquid and frozen precipitation (`PRCP + SNOW + SNWD`)
//!
//! Each raw indicator is min-max normalized across the whole batch and the
//! renewable score is the mean of the three normalized indicators.

use crate::stats::min_max_normalize;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// One day of weather observations; missing readings count as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Precipitation
    pub prcp: Option<f64>,
    /// Average temperature
    pub tavg: Option<f64>,
    /// Average wind speed
    pub awnd: Option<f64>,
    /// Fastest 2-minute wind speed
    pub wsf2: Option<f64>,
    /// Snowfall
    pub snow: Option<f64>,
    /// Snow depth
    pub snwd: Option<f64>,
}

impl WeatherReading {
    fn solar_raw(&self) -> f64 {
        self.tavg.unwrap_or(0.0) - self.prcp.unwrap_or(0.0) / 10.0
    }

    fn wind_raw(&self) -> f64 {
        (self.awnd.unwrap_or(0.0) + self.wsf2.unwrap_or(0.0)) / 2.0
    }

    fn hydro_raw(&self) -> f64 {
        self.prcp.unwrap_or(0.0) + self.snow.unwrap_or(0.0) + self.snwd.unwrap_or(0.0)
    }
}

/// Normalized indicators for one reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenewableIndex {
    pub solar: f64,
    pub wind: f64,
    pub hydro: f64,
    /// Mean of the three normalized indicators, in [0, 1]
    pub score: f64,
}

/// Compute normalized indices and the renewable score for a batch of readings
pub fn compute_indices(readings: &[WeatherReading]) -> Result<Vec<RenewableIndex>> {
    if readings.is_empty() {
        return Err(MathError::InsufficientData(
            "No weather readings to index".to_string(),
        ));
    }

    let solar_raw: Vec<f64> = readings.iter().map(WeatherReading::solar_raw).collect();
    let wind_raw: Vec<f64> = readings.iter().map(WeatherReading::wind_raw).collect();
    let hydro_raw: Vec<f64> = readings.iter().map(WeatherReading::hydro_raw).collect();

    let solar = min_max_normalize(&solar_raw)?;
    let wind = min_max_normalize(&wind_raw)?;
    let hydro = min_max_normalize(&hydro_raw)?;

    Ok(solar
        .into_iter()
        .zip(wind)
        .zip(hydro)
        .map(|((solar, wind), hydro)| RenewableIndex {
            solar,
            wind,
            hydro,
            score: (solar + wind + hydro) / 3.0,
        })
        .collect())
}

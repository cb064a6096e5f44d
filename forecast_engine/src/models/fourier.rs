//! Linear trend plus Fourier seasonality decomposition
//!
//! The trend is a line in scaled time (`t` in [0, 1] across the training
//! window). Seasonality is a ridge-regularized Fourier series: yearly (period
//! 365.25 days) always, weekly optionally, never daily. Trend and seasonal
//! coefficients are solved jointly by penalized least squares. Intervals
//! assume Gaussian residuals with constant spread.

use crate::config::SeasonalConfig;
use crate::error::{ForecastError, Result};
use crate::models::{DecompositionModel, DecompositionPoint, FittedDecomposition};
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;

/// Trend plus seasonality decomposition model
#[derive(Debug, Clone)]
pub struct FourierTrendModel {
    /// Name of the model
    name: String,
    /// Fourier order of the yearly component
    yearly_order: usize,
    /// Fourier order of the weekly component (0 disables it)
    weekly_order: usize,
    /// Coverage of the uncertainty interval
    interval_width: f64,
    /// Ridge penalty on seasonal coefficients
    ridge: f64,
}

/// Fitted trend plus seasonality model
#[derive(Debug, Clone)]
pub struct FittedFourierTrend {
    /// First training date
    origin: NaiveDate,
    /// Days spanned by the training window
    span_days: f64,
    /// Seasonal terms as (period, order) pairs
    terms: Vec<(f64, usize)>,
    /// Intercept, slope in scaled time, then seasonal coefficients
    beta: Vec<f64>,
    /// Half-width of the interval
    margin: f64,
}

impl FourierTrendModel {
    /// Create a model with yearly seasonality only
    pub fn new(yearly_order: usize, interval_width: f64) -> Result<Self> {
        Self::from_config(&SeasonalConfig {
            yearly_order,
            interval_width,
            ..SeasonalConfig::default()
        })
    }

    /// Create a model from configuration
    pub fn from_config(config: &SeasonalConfig) -> Result<Self> {
        if config.yearly_order == 0 {
            return Err(ForecastError::InvalidParameter(
                "Yearly Fourier order must be positive".to_string(),
            ));
        }
        if !(config.interval_width > 0.0 && config.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Interval width must be between 0 and 1".to_string(),
            ));
        }
        if !(config.ridge >= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Ridge penalty must be non-negative".to_string(),
            ));
        }

        let weekly_order = if config.weekly_seasonality {
            config.weekly_order
        } else {
            0
        };

        Ok(Self {
            name: format!(
                "Fourier Trend (yearly={}, weekly={})",
                config.yearly_order, weekly_order
            ),
            yearly_order: config.yearly_order,
            weekly_order,
            interval_width: config.interval_width,
            ridge: config.ridge,
        })
    }
}

impl Default for FourierTrendModel {
    fn default() -> Self {
        let config = SeasonalConfig::default();
        Self {
            name: format!("Fourier Trend (yearly={}, weekly=0)", config.yearly_order),
            yearly_order: config.yearly_order,
            weekly_order: 0,
            interval_width: config.interval_width,
            ridge: config.ridge,
        }
    }
}

impl DecompositionModel for FourierTrendModel {
    type Fitted = FittedFourierTrend;

    fn fit(&self, dates: &[NaiveDate], values: &[f64]) -> Result<Self::Fitted> {
        if dates.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if values.len() < 2 {
            return Err(ForecastError::InsufficientData(
                "Trend fitting needs at least 2 observations".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ValidationError(
                "Training values must be finite".to_string(),
            ));
        }

        let origin = dates[0];
        let days: Vec<f64> = dates.iter().map(|d| days_since(origin, *d)).collect();
        let span_days = days[days.len() - 1] - days[0];
        if span_days <= 0.0 {
            return Err(ForecastError::ValidationError(
                "Training dates must span more than one day".to_string(),
            ));
        }

        // Cap the orders so the seasonal design never outgrows the sample
        let max_order = (values.len() / 4).max(1);
        let mut terms = vec![(YEARLY_PERIOD, self.yearly_order.min(max_order))];
        if self.weekly_order > 0 {
            terms.push((WEEKLY_PERIOD, self.weekly_order.min(max_order)));
        }

        let design: Vec<Vec<f64>> = days
            .iter()
            .map(|&d| design_row(d, span_days, &terms))
            .collect();

        // Trend coefficients stay unpenalized
        let width = design[0].len();
        let penalties: Vec<f64> = (0..width)
            .map(|j| if j < 2 { 0.0 } else { self.ridge })
            .collect();
        let beta = solve_ridge(&design, values, &penalties).ok_or_else(|| {
            ForecastError::ValidationError("Decomposition design matrix is singular".to_string())
        })?;

        let sse: f64 = design
            .iter()
            .zip(values)
            .map(|(row, y)| (y - dot(row, &beta)).powi(2))
            .sum();
        let sigma = (sse / values.len() as f64).sqrt().max(1e-6);

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ValidationError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + self.interval_width / 2.0);

        Ok(FittedFourierTrend {
            origin,
            span_days,
            terms,
            beta,
            margin: z * sigma,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedDecomposition for FittedFourierTrend {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<DecompositionPoint>> {
        Ok(dates
            .iter()
            .map(|date| {
                let d = days_since(self.origin, *date);
                let yhat = dot(&design_row(d, self.span_days, &self.terms), &self.beta);
                DecompositionPoint {
                    yhat,
                    lower: yhat - self.margin,
                    upper: yhat + self.margin,
                }
            })
            .collect())
    }
}

fn days_since(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

/// Intercept, scaled time, then sine/cosine pairs for each (period, order) term
fn design_row(day: f64, span_days: f64, terms: &[(f64, usize)]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + terms.iter().map(|(_, order)| 2 * order).sum::<usize>());
    row.push(1.0);
    row.push(day / span_days);
    for &(period, order) in terms {
        for k in 1..=order {
            let angle = 2.0 * std::f64::consts::PI * k as f64 * day / period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
    row
}

fn dot(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}

/// Solve `(X'X + diag(λ)) β = X'y` by Gauss-Jordan elimination with partial pivoting
fn solve_ridge(x: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Option<Vec<f64>> {
    let p = x.first().map(|row| row.len()).unwrap_or(0);
    if p == 0 {
        return Some(Vec::new());
    }

    let mut a = vec![vec![0.0; p]; p];
    let mut b = vec![0.0; p];
    for (row, &yi) in x.iter().zip(y) {
        for i in 0..p {
            b[i] += row[i] * yi;
            for j in 0..p {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, diag) in a.iter_mut().enumerate() {
        diag[i] += penalties.get(i).copied().unwrap_or(0.0).max(1e-8);
    }

    for col in 0..p {
        let pivot_row = (col..p).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let inv = 1.0 / a[col][col];
        for j in col..p {
            a[col][j] *= inv;
        }
        b[col] *= inv;

        for r in 0..p {
            if r == col {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..p {
                a[r][j] -= factor * a[col][j];
            }
            b[r] -= factor * b[col];
        }
    }

    Some(b)
}

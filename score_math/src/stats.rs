//! Descriptive statistics over plain slices
//!
//! The median of an even-length sample is the mean of the two middle values.
//! Standard deviation comes in both the sample (`n - 1`) and population (`n`)
//! forms.

use crate::{MathError, Result};

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty sample".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the values
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the median of an empty sample".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample standard deviation (`n - 1` degrees of freedom)
pub fn sample_std(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation needs at least 2 values, have {}",
            values.len()
        )));
    }

    Ok((squared_deviations(values)? / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (`n` degrees of freedom)
pub fn population_std(values: &[f64]) -> Result<f64> {
    Ok((squared_deviations(values)? / values.len() as f64).sqrt())
}

fn squared_deviations(values: &[f64]) -> Result<f64> {
    let avg = mean(values)?;
    Ok(values
        .iter()
        .map(|&v| {
            let diff = v - avg;
            diff * diff
        })
        .sum())
}

/// Scale values linearly into [0, 1]
///
/// A constant sample maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Result<Vec<f64>> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Min-max normalization requires finite values".to_string(),
        ));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    Ok(values
        .iter()
        .map(|&v| if range > 0.0 { (v - min) / range } else { 0.0 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_median() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_relative_eq!(mean(&values).unwrap(), 2.8);
        assert_eq!(median(&values).unwrap(), 3.0);

        // Even sample averages the two middle values
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median(&[]).is_err());
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn test_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population std is 2.0, sample std is sqrt(32 / 7)
        assert_relative_eq!(sample_std(&values).unwrap(), (32.0_f64 / 7.0).sqrt());
        assert!(sample_std(&[1.0]).is_err());
    }

    #[test]
    fn test_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std(&values).unwrap(), 2.0);
        assert_eq!(population_std(&[0.4]).unwrap(), 0.0);
        assert!(population_std(&[]).is_err());
    }

    #[test]
    fn test_min_max_normalize() {
        let scaled = min_max_normalize(&[10.0, 15.0, 20.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.5, 1.0]);

        let flat = min_max_normalize(&[3.0, 3.0]).unwrap();
        assert_eq!(flat, vec![0.0, 0.0]);

        assert!(min_max_normalize(&[1.0, f64::NAN]).is_err());
    }
}

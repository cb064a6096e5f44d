//! Fixed-capacity rolling window
//!
//! Holds at most `capacity` of the most recent values. Pushing beyond the
//! capacity evicts the oldest value, so memory stays bounded no matter how
//! many values stream through.

use crate::{stats, MathError, Result};
use std::collections::VecDeque;

/// Trailing window over the most recent values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` values
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MathError::InvalidInput(
                "Window capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
            sum: 0.0,
        })
    }

    /// Create a window pre-filled with the tail of `values`
    pub fn from_tail(capacity: usize, values: &[f64]) -> Result<Self> {
        let mut window = Self::new(capacity)?;
        let start = values.len().saturating_sub(capacity);
        for &value in &values[start..] {
            window.push(value);
        }
        Ok(window)
    }

    /// Push a value, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.capacity {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the window holds `capacity` values
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed value
    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Values from oldest to newest
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Mean of the held values
    pub fn mean(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(MathError::InsufficientData(
                "Rolling window is empty".to_string(),
            ));
        }
        Ok(self.sum / self.values.len() as f64)
    }

    /// Sample standard deviation of the held values
    pub fn sample_std(&self) -> Result<f64> {
        let (front, back) = self.values.as_slices();
        if back.is_empty() {
            stats::sample_std(front)
        } else {
            let contiguous: Vec<f64> = self.values.iter().copied().collect();
            stats::sample_std(&contiguous)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = RollingWindow::new(3).unwrap();
        assert!(window.mean().is_err());

        window.push(2.0);
        window.push(4.0);
        assert!(!window.is_full());

        window.push(6.0);
        assert!(window.is_full());
        assert_eq!(window.mean().unwrap(), 4.0);

        // The window slides, dropping the oldest value
        window.push(8.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean().unwrap(), 6.0);
        assert_eq!(window.values().collect::<Vec<_>>(), vec![4.0, 6.0, 8.0]);
        assert_eq!(window.last(), Some(8.0));
    }

    #[test]
    fn test_from_tail_and_std() {
        let window = RollingWindow::from_tail(4, &[9.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(window.values().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(window.sample_std().unwrap(), (5.0_f64 / 3.0).sqrt());

        let short = RollingWindow::from_tail(7, &[0.5]).unwrap();
        assert_eq!(short.len(), 1);
        assert!(short.sample_std().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(RollingWindow::new(0).is_err());
    }
}

//! Gradient-boosted regression trees
//!
//! Squared-error boosting: each round fits a depth-limited regression tree to
//! the current residuals on a random subsample of rows and feature columns,
//! then adds the shrunken tree to the ensemble. Leaf weights and split gains
//! carry an L2 penalty on the leaf values. Sampling is driven by a seeded
//! `StdRng`, so fits are reproducible.

use crate::config::BoostingConfig;
use crate::error::{ForecastError, Result};
use crate::models::{FittedRegression, RegressionModel};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

/// Gradient-boosted regression tree model
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    /// Name of the model
    name: String,
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    subsample: f64,
    colsample: f64,
    lambda: f64,
    seed: u64,
}

/// Fitted boosted ensemble
#[derive(Debug, Clone)]
pub struct FittedBoostedTrees {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    /// Total split gain per feature
    gains: Vec<f64>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Best split found for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Builds one tree on residuals
struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    residuals: &'a [f64],
    columns: &'a [usize],
    max_depth: usize,
    lambda: f64,
    nodes: Vec<Node>,
    gains: &'a mut [f64],
}

impl<'a> TreeBuilder<'a> {
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let sum: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        sum / (rows.len() as f64 + self.lambda)
    }

    fn score(&self, sum: f64, count: usize) -> f64 {
        sum * sum / (count as f64 + self.lambda)
    }

    fn best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let total: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let parent_score = self.score(total, rows.len());
        let mut best: Option<SplitCandidate> = None;
        let mut order = rows.to_vec();

        for &feature in self.columns {
            order.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left_sum = 0.0;
            for i in 0..order.len() - 1 {
                left_sum += self.residuals[order[i]];
                let here = self.features[order[i]][feature];
                let next = self.features[order[i + 1]][feature];
                if next <= here {
                    continue;
                }

                let left_count = i + 1;
                let gain = self.score(left_sum, left_count)
                    + self.score(total - left_sum, order.len() - left_count)
                    - parent_score;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf(self.leaf_value(&rows)));

        if depth >= self.max_depth || rows.len() < 2 {
            return idx;
        }

        let Some(split) = self.best_split(&rows) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.features[r][split.feature] < split.threshold);

        self.gains[split.feature] += split.gain;
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

impl GradientBoostedTrees {
    /// Create a model with default settings
    pub fn new() -> Self {
        Self::from_parts(&BoostingConfig::default())
    }

    /// Create a model from configuration
    pub fn from_config(config: &BoostingConfig) -> Result<Self> {
        if config.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Learning rate must be in (0, 1]".to_string(),
            ));
        }
        if config.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be positive".to_string(),
            ));
        }
        if !(config.subsample > 0.0 && config.subsample <= 1.0)
            || !(config.colsample > 0.0 && config.colsample <= 1.0)
        {
            return Err(ForecastError::InvalidParameter(
                "Sampling fractions must be in (0, 1]".to_string(),
            ));
        }
        if !(config.lambda >= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "lambda must be non-negative".to_string(),
            ));
        }

        Ok(Self::from_parts(config))
    }

    fn from_parts(config: &BoostingConfig) -> Self {
        Self {
            name: format!(
                "Gradient Boosted Trees (n={}, depth={}, lr={})",
                config.n_estimators, config.max_depth, config.learning_rate
            ),
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            subsample: config.subsample,
            colsample: config.colsample,
            lambda: config.lambda,
            seed: config.seed,
        }
    }
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1, total)
}

impl RegressionModel for GradientBoostedTrees {
    type Fitted = FittedBoostedTrees;

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        if features.is_empty() {
            return Err(ForecastError::ValidationError(
                "Cannot fit on an empty feature matrix".to_string(),
            ));
        }
        if features.len() != targets.len() {
            return Err(ForecastError::ValidationError(format!(
                "Feature rows ({}) don't match targets ({})",
                features.len(),
                targets.len()
            )));
        }

        let n_features = features[0].len();
        if n_features == 0 || features.iter().any(|row| row.len() != n_features) {
            return Err(ForecastError::ValidationError(
                "Feature rows must share a non-zero width".to_string(),
            ));
        }
        if targets.iter().any(|v| !v.is_finite())
            || features.iter().flatten().any(|v| !v.is_finite())
        {
            return Err(ForecastError::ValidationError(
                "Features and targets must be finite".to_string(),
            ));
        }

        let n_rows = features.len();
        let base_score = targets.iter().sum::<f64>() / n_rows as f64;
        let mut predictions = vec![base_score; n_rows];
        let mut residuals = vec![0.0; n_rows];
        let mut gains = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let row_count = sample_count(n_rows, self.subsample);
        let column_count = sample_count(n_features, self.colsample);

        for _ in 0..self.n_estimators {
            for i in 0..n_rows {
                residuals[i] = targets[i] - predictions[i];
            }

            let mut rows = sample(&mut rng, n_rows, row_count).into_vec();
            rows.sort_unstable();
            let mut columns = sample(&mut rng, n_features, column_count).into_vec();
            columns.sort_unstable();

            let mut builder = TreeBuilder {
                features,
                residuals: &residuals,
                columns: &columns,
                max_depth: self.max_depth,
                lambda: self.lambda,
                nodes: Vec::new(),
                gains: &mut gains,
            };
            builder.build(rows, 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };

            for (prediction, row) in predictions.iter_mut().zip(features) {
                *prediction += self.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(FittedBoostedTrees {
            base_score,
            learning_rate: self.learning_rate,
            trees,
            n_features,
            gains,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegression for FittedBoostedTrees {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(ForecastError::ValidationError(format!(
                "Expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        Ok(self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>())
    }

    fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.gains.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.n_features];
        }
        self.gains.iter().map(|g| g / total).collect()
    }
}

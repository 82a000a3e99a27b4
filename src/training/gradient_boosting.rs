//! Gradient Boosting implementation
//!
//! Binary classifier with log-loss. Each round fits a regression tree to the
//! negative gradient (y - p) and replaces its leaf values with a single
//! Newton step, sum(y - p) / sum(p * (1 - p)), before shrinkage.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::{Criterion, DecisionTree};
use crate::error::{Result, RetentionError};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio for each tree
    pub colsample_bytree: f64,
    /// Split criterion for the regression trees
    pub criterion: Criterion,
    /// Random seed, only consulted when subsampling
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            criterion: Criterion::FriedmanMSE,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String| {
            Err(RetentionError::ConfigError(format!("invalid {}: {}", name, value)))
        };
        if self.n_estimators == 0 {
            return invalid("n_estimators", self.n_estimators.to_string());
        }
        if self.max_depth == 0 {
            return invalid("max_depth", self.max_depth.to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate", self.learning_rate.to_string());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid("subsample", self.subsample.to_string());
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid("colsample_bytree", self.colsample_bytree.to_string());
        }
        Ok(())
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
    /// Mean training deviance after each round
    train_loss: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
            train_loss: Vec::new(),
        }
    }

    /// Fit binary classification; `y` must hold only 0.0 and 1.0
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(RetentionError::EmptyFeatureTable);
        }
        if n_samples != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(RetentionError::ValidationError(
                "Labels must be 0 or 1".to_string(),
            ));
        }

        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 {
            return Err(RetentionError::DegenerateLabel(0));
        }
        if positives == n_samples {
            return Err(RetentionError::DegenerateLabel(1));
        }

        let p = positives as f64 / n_samples as f64;
        self.initial_log_odds = (p / (1.0 - p)).ln();
        self.n_features = n_features;
        self.trees.clear();
        self.col_indices_per_tree.clear();
        self.train_loss.clear();

        let mut raw = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut importance_sum = vec![0.0; n_features];

        for round in 0..self.config.n_estimators {
            let probs = raw.mapv(sigmoid);
            let residuals = y - &probs;

            let sample_indices = draw_indices(n_samples, self.config.subsample, &mut rng);
            let col_indices = draw_indices(n_features, self.config.colsample_bytree, &mut rng);

            let x_cols = x.select(Axis(1), &col_indices);
            let x_sub = x_cols.select(Axis(0), &sample_indices);
            let residual_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_split(self.config.min_samples_split)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_criterion(self.config.criterion);
            tree.fit(&x_sub, &residual_sub)?;

            // Newton step per leaf
            let leaves = tree.apply(&x_sub)?;
            let mut numerator = vec![0.0; tree.get_n_leaves()];
            let mut denominator = vec![0.0; tree.get_n_leaves()];
            for (row, &leaf) in leaves.iter().enumerate() {
                let idx = sample_indices[row];
                numerator[leaf] += residuals[idx];
                denominator[leaf] += probs[idx] * (1.0 - probs[idx]);
            }
            let leaf_values: Vec<f64> = numerator
                .iter()
                .zip(&denominator)
                .map(|(&num, &den)| if den.abs() < 1e-150 { 0.0 } else { num / den })
                .collect();
            tree.set_leaf_values(&leaf_values)?;

            let update = tree.predict(&x_cols)?;
            raw.scaled_add(self.config.learning_rate, &update);

            if let Some(tree_importance) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    importance_sum[col_idx] += tree_importance[j];
                }
            }

            let loss = deviance(y, &raw);
            self.train_loss.push(loss);
            if (round + 1) % 100 == 0 {
                debug!(round = round + 1, deviance = loss, "Boosting progress");
            }

            self.trees.push(tree);
            self.col_indices_per_tree.push(col_indices);
        }

        let total: f64 = importance_sum.iter().sum();
        self.feature_importances = if total > 0.0 {
            importance_sum.iter().map(|v| v / total).collect()
        } else {
            importance_sum
        };

        Ok(())
    }

    /// Raw log-odds
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted(x)?;
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);

        for (tree, col_indices) in self.trees.iter().zip(&self.col_indices_per_tree) {
            let x_sub = x.select(Axis(1), col_indices);
            let tree_pred = tree.predict(&x_sub)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);
        }

        Ok(log_odds)
    }

    /// Predict probabilities of class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|lo| if lo > 0.0 { 1.0 } else { 0.0 }))
    }

    /// Partial dependence of the log-odds on one feature, by tree traversal
    ///
    /// Splits on `feature_idx` follow the grid value; every other split
    /// averages both children weighted by their training sample counts.
    /// Only the shrunken tree contributions are summed; the prior log-odds
    /// is left out.
    pub fn partial_dependence_recursion(&self, feature_idx: usize, grid: &[f64]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(RetentionError::ModelNotFitted);
        }
        if feature_idx >= self.n_features {
            return Err(RetentionError::ValidationError(format!(
                "Feature index {} out of bounds (n_features={})",
                feature_idx, self.n_features
            )));
        }

        Ok(grid
            .iter()
            .map(|&value| {
                self.trees
                    .iter()
                    .zip(&self.col_indices_per_tree)
                    .fold(0.0, |acc, (tree, cols)| {
                        let local = cols.iter().position(|&c| c == feature_idx);
                        acc + self.config.learning_rate * tree.partial_dependence(local, value)
                    })
            })
            .collect())
    }

    fn check_fitted(&self, x: &Array2<f64>) -> Result<()> {
        if self.trees.is_empty() {
            return Err(RetentionError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(RetentionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Mean training deviance after each round
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Mean binomial deviance, numerically stable in the raw score
fn deviance(y: &Array1<f64>, raw: &Array1<f64>) -> f64 {
    let n = y.len().max(1) as f64;
    let total: f64 = y
        .iter()
        .zip(raw.iter())
        .map(|(&yi, &r)| {
            let log1p_exp = if r > 0.0 { r + (-r).exp().ln_1p() } else { r.exp().ln_1p() };
            log1p_exp - yi * r
        })
        .sum();
    2.0 * total / n
}

/// Sorted sample of `ceil(n * ratio)` indices, or all indices when ratio is 1
fn draw_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if ratio >= 1.0 {
        return indices;
    }
    let sample_size = ((n as f64) * ratio).ceil().max(1.0) as usize;
    indices.shuffle(rng);
    indices.truncate(sample_size);
    indices.sort_unstable();
    indices
}

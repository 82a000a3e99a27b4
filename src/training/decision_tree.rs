//! Regression tree used as the weak learner for boosting
//!
//! Split search presorts the samples once per feature at the root and keeps
//! every node's per-feature ordering by stable partitioning, so each level
//! costs a linear sweep per feature instead of a re-sort.

use crate::error::{Result, RetentionError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Node count above which features are scanned in parallel
const PARALLEL_SCAN_MIN_SAMPLES: usize = 4096;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        id: usize,
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    /// Training samples that reached this node
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }
}

/// Split quality criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Mean squared error
    MSE,
    /// Friedman's improvement score: n_l * n_r * (mean_l - mean_r)^2 / n
    FriedmanMSE,
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    /// Position of the last left sample in the feature's sorted order
    position: usize,
    threshold: f64,
    score: f64,
}

/// Running sums for a node
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn from_indices(y: &ArrayView1<f64>, indices: &[usize]) -> Self {
        indices.iter().fold(Self::default(), |mut acc, &i| {
            acc.count += 1;
            acc.sum += y[i];
            acc.sq_sum += y[i] * y[i];
            acc
        })
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Sum of squared deviations from the mean
    fn sse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sq_sum - self.sum * self.sum / self.count as f64).max(0.0)
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sse() / self.count as f64
        }
    }
}

/// Regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Split criterion
    pub criterion: Criterion,
    /// Number of features seen at fit
    n_features: usize,
    /// Number of leaves
    n_leaves: usize,
    /// Normalized impurity decrease per feature
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_regressor()
    }
}

impl DecisionTree {
    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::FriedmanMSE,
            n_features: 0,
            n_leaves: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(RetentionError::ValidationError(format!(
                "Cannot fit a tree on a {}x{} matrix",
                n_samples, n_features
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(RetentionError::ValidationError(
                "Feature matrix contains non-finite values".to_string(),
            ));
        }

        self.n_features = n_features;
        self.n_leaves = 0;

        let sorted: Vec<Vec<usize>> = (0..n_features)
            .map(|f| {
                let mut order: Vec<usize> = (0..n_samples).collect();
                order.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
                order
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        let mut goes_left = vec![false; n_samples];
        let root = self.build_node(x, &y.view(), sorted, 0, &mut importances, &mut goes_left);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_node(
        &mut self,
        x: &Array2<f64>,
        y: &ArrayView1<f64>,
        sorted: Vec<Vec<usize>>,
        depth: usize,
        importances: &mut [f64],
        goes_left: &mut [bool],
    ) -> TreeNode {
        let stats = NodeStats::from_indices(y, &sorted[0]);
        let n_samples = stats.count;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || stats.variance() < 1e-14;

        let split = if should_stop {
            None
        } else {
            self.find_best_split(x, y, &sorted, &stats)
        };

        let Some(split) = split else {
            return self.make_leaf(stats);
        };

        let order = &sorted[split.feature_idx];
        for (pos, &idx) in order.iter().enumerate() {
            goes_left[idx] = pos <= split.position;
        }

        let left_stats = NodeStats::from_indices(y, &order[..=split.position]);
        let right_stats = NodeStats::from_indices(y, &order[split.position + 1..]);
        importances[split.feature_idx] += (stats.sse() - left_stats.sse() - right_stats.sse()).max(0.0);

        let (left_sorted, right_sorted): (Vec<Vec<usize>>, Vec<Vec<usize>>) = sorted
            .into_iter()
            .map(|feature_order| {
                let halves: (Vec<usize>, Vec<usize>) =
                    feature_order.into_iter().partition(|&i| goes_left[i]);
                halves
            })
            .unzip();

        let left = Box::new(self.build_node(x, y, left_sorted, depth + 1, importances, goes_left));
        let right = Box::new(self.build_node(x, y, right_sorted, depth + 1, importances, goes_left));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: stats.variance(),
        }
    }

    fn make_leaf(&mut self, stats: NodeStats) -> TreeNode {
        let id = self.n_leaves;
        self.n_leaves += 1;
        TreeNode::Leaf {
            id,
            value: stats.mean(),
            n_samples: stats.count,
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &ArrayView1<f64>,
        sorted: &[Vec<usize>],
        parent: &NodeStats,
    ) -> Option<SplitCandidate> {
        let scan = |feature_idx: usize| self.scan_feature(x, y, &sorted[feature_idx], feature_idx, parent);

        let candidates: Vec<Option<SplitCandidate>> = if parent.count >= PARALLEL_SCAN_MIN_SAMPLES {
            (0..sorted.len()).into_par_iter().map(scan).collect()
        } else {
            (0..sorted.len()).map(scan).collect()
        };

        // First feature wins ties so the tree does not depend on scan order
        let mut best: Option<SplitCandidate> = None;
        for candidate in candidates.into_iter().flatten() {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    fn scan_feature(
        &self,
        x: &Array2<f64>,
        y: &ArrayView1<f64>,
        order: &[usize],
        feature_idx: usize,
        parent: &NodeStats,
    ) -> Option<SplitCandidate> {
        let n = order.len();
        let min_leaf = self.min_samples_leaf;
        let parent_proxy = parent.sum * parent.sum / n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;

        for pos in 0..n - 1 {
            let idx = order[pos];
            left_sum += y[idx];

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf {
                continue;
            }
            if n_right < min_leaf {
                break;
            }

            let value = x[[idx, feature_idx]];
            let next_value = x[[order[pos + 1], feature_idx]];
            if next_value <= value {
                continue;
            }

            let right_sum = parent.sum - left_sum;
            let (nl, nr) = (n_left as f64, n_right as f64);
            let score = match self.criterion {
                Criterion::MSE => left_sum * left_sum / nl + right_sum * right_sum / nr - parent_proxy,
                Criterion::FriedmanMSE => {
                    let diff = left_sum / nl - right_sum / nr;
                    nl * nr * diff * diff / (nl + nr)
                }
            };

            if score > 1e-12 && best.map_or(true, |b| score > b.score) {
                best = Some(SplitCandidate {
                    feature_idx,
                    position: pos,
                    threshold: (value + next_value) / 2.0,
                    score,
                });
            }
        }

        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(RetentionError::ModelNotFitted)?;
        self.check_width(x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| match Self::leaf_for(root, &row) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => 0.0,
            })
            .collect())
    }

    /// Leaf id reached by each row
    pub fn apply(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let root = self.root.as_ref().ok_or(RetentionError::ModelNotFitted)?;
        self.check_width(x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| match Self::leaf_for(root, &row) {
                TreeNode::Leaf { id, .. } => *id,
                TreeNode::Split { .. } => 0,
            })
            .collect())
    }

    /// Overwrite leaf values by leaf id; `values.len()` must equal the leaf count
    pub fn set_leaf_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.n_leaves {
            return Err(RetentionError::ShapeError {
                expected: format!("{} leaf values", self.n_leaves),
                actual: format!("{} leaf values", values.len()),
            });
        }
        let root = self.root.as_mut().ok_or(RetentionError::ModelNotFitted)?;
        Self::assign_leaves(root, values);
        Ok(())
    }

    fn assign_leaves(node: &mut TreeNode, values: &[f64]) {
        match node {
            TreeNode::Leaf { id, value, .. } => *value = values[*id],
            TreeNode::Split { left, right, .. } => {
                Self::assign_leaves(left, values);
                Self::assign_leaves(right, values);
            }
        }
    }

    /// Training-weighted average output with one feature pinned to `value`
    ///
    /// `feature_idx` of `None` means the feature is not among this tree's
    /// columns, which yields the tree's weighted mean output.
    pub fn partial_dependence(&self, feature_idx: Option<usize>, value: f64) -> f64 {
        fn walk(node: &TreeNode, feature_idx: Option<usize>, value: f64) -> f64 {
            match node {
                TreeNode::Leaf { value: leaf, .. } => *leaf,
                TreeNode::Split { feature_idx: f, threshold, left, right, .. } => {
                    if Some(*f) == feature_idx {
                        let next = if value <= *threshold { left } else { right };
                        walk(next, feature_idx, value)
                    } else {
                        let (nl, nr) = (left.n_samples() as f64, right.n_samples() as f64);
                        let total = (nl + nr).max(1.0);
                        (nl * walk(left, feature_idx, value) + nr * walk(right, feature_idx, value)) / total
                    }
                }
            }
        }
        self.root.as_ref().map_or(0.0, |root| walk(root, feature_idx, value))
    }

    fn leaf_for<'a>(mut node: &'a TreeNode, sample: &ArrayView1<f64>) -> &'a TreeNode {
        while let TreeNode::Split { feature_idx, threshold, left, right, .. } = node {
            node = if sample[*feature_idx] <= *threshold { &**left } else { &**right };
        }
        node
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(RetentionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth (a single leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.n_leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor().with_criterion(Criterion::MSE);
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 1e-12, "unbounded tree should interpolate, MSE = {}", mse);
    }

    #[test]
    fn test_step_function_split() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
        let predictions = tree.predict(&array![[1.5], [6.5], [20.0]]).unwrap();
        assert_eq!(predictions[0], 0.0);
        assert_eq!(predictions[1], 1.0);
        assert_eq!(predictions[2], 1.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 1.0], [6.0, 0.0]];
        let y = array![0.0, 0.3, 1.0, 1.2, 0.1, 2.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
        assert!(tree.get_n_leaves() <= 4);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 9.0];

        let mut tree = DecisionTree::new_regressor().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();

        // The only admissible split puts two samples on each side
        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions[3], 4.5);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_apply_and_set_leaf_values() {
        let x = array![[0.0], [1.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        let leaves = tree.apply(&x).unwrap();
        assert_eq!(leaves[0], leaves[1]);
        assert_ne!(leaves[1], leaves[2]);

        let mut values = vec![0.0; tree.get_n_leaves()];
        values[leaves[0]] = -7.0;
        values[leaves[3]] = 7.0;
        tree.set_leaf_values(&values).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions.to_vec(), vec![-7.0, -7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.5, 0.5, 0.5];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.get_n_leaves(), 1);
    }

    #[test]
    fn test_partial_dependence_weights_children() {
        // Root splits on feature 0; feature 1 never matters
        let x = array![[0.0, 0.0], [0.0, 1.0], [0.0, 2.0], [1.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 4.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.partial_dependence(Some(0), 0.0), 0.0);
        assert_eq!(tree.partial_dependence(Some(0), 1.0), 4.0);
        // Unpinned: 3/4 of samples on the left leaf, 1/4 on the right
        assert_eq!(tree.partial_dependence(Some(1), 0.0), 1.0);
        assert_eq!(tree.partial_dependence(None, 0.0), 1.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_regressor();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(RetentionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut tree = DecisionTree::new_regressor();
        let err = tree.fit(&array![[1.0], [2.0]], &array![1.0]).unwrap_err();
        assert!(matches!(err, RetentionError::ShapeError { .. }));
    }
}

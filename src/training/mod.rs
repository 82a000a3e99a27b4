//! Model training module
//!
//! Provides the attrition model:
//! - Regression trees with presorted split search
//! - Gradient boosted binary classification on top of them

pub mod decision_tree;
pub mod gradient_boosting;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};

//! Model explainability module
//!
//! Partial dependence curves for the attrition model, computed either by
//! weighted tree traversal or by brute-force averaging of predictions.

mod pdp;

pub use pdp::{feature_grid, recursion_partial_dependence, PDPResult, PartialDependence, PdpMethod};

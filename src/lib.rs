//! Employee retention - attrition analysis of employee records
//!
//! This crate loads an employee file, removes seniority outliers, derives
//! model features, and explains attrition with:
//! - Mean attrition per half-year tenure bucket
//! - A gradient-boosted tree classifier and its feature importances
//! - Partial dependence curves for every model feature
//!
//! # Modules
//!
//! ## Data
//! - [`utils`] - CSV loading and worker pool settings
//! - [`dataset`] - Record types and descriptive summaries
//! - [`preprocessing`] - Outlier filter and label encoding
//! - [`feature_engineering`] - Feature table and tenure buckets
//!
//! ## Modeling
//! - [`training`] - Regression trees and gradient boosting
//! - [`explainability`] - Partial dependence
//!
//! ## Output
//! - [`visualization`] - Chart descriptions and SVG rendering
//! - [`pipeline`] - End-to-end run and report
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Data
pub mod utils;
pub mod dataset;
pub mod preprocessing;
pub mod feature_engineering;

// Modeling
pub mod training;
pub mod explainability;

// Output
pub mod visualization;
pub mod pipeline;
pub mod cli;

pub use error::{Result, RetentionError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, RetentionError};

    // Configuration
    pub use crate::config::{AnalysisConfig, PartialDependenceConfig};

    // Data
    pub use crate::dataset::{CleanTable, DescribeStats, EmployeeRecord, EmployeeTable, FeatureRecord};
    pub use crate::utils::{EmployeeLoader, ParallelConfig};

    // Preprocessing
    pub use crate::preprocessing::{Cleaner, LabelEncoder};

    // Feature engineering
    pub use crate::feature_engineering::{FeatureBuilder, FeatureTable, TenureBinner, FEATURE_NAMES};

    // Training
    pub use crate::training::{GradientBoostingClassifier, GradientBoostingConfig};

    // Explainability
    pub use crate::explainability::{PDPResult, PartialDependence, PdpMethod};

    // Output
    pub use crate::visualization::{Chart, ChartSink, RecordingSink, SvgChartSink};
    pub use crate::pipeline::{AnalysisReport, RetentionPipeline};
}

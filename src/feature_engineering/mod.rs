//! Feature engineering module
//!
//! Turns cleaned employee records into model inputs:
//! - Sorted label encoding of departments
//! - Salary rescaling
//! - Tenure in days against a reference date
//! - Half-year tenure buckets for the attrition curve

mod binning;
mod builder;
mod tenure;

pub use binning::{BucketRate, BucketReport, TenureBinner, TenureBucket};
pub use builder::{FeatureBuilder, FeatureTable, FEATURE_NAMES};
pub use tenure::{checked_tenure_days, tenure_days};

//! Employee dataset types
//!
//! Each pipeline stage consumes one of these tables and produces the next:
//! - [`EmployeeTable`] from the loader
//! - [`CleanTable`] from the cleaner
//! - [`FeatureTable`](crate::feature_engineering::FeatureTable) from the feature builder

mod record;
pub mod summary;

pub use record::{CleanRecord, CleanTable, EmployeeRecord, EmployeeTable, FeatureRecord};
pub use summary::{company_summary, dept_counts, CompanySummary, DeptCount, DescribeStats};

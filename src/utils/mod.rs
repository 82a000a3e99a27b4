//! Utility functions and types

mod parallel;
pub mod data_loader;

pub use data_loader::{EmployeeLoader, REQUIRED_COLUMNS};
pub use parallel::ParallelConfig;

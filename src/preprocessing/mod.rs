//! Data preprocessing module
//!
//! - [`Cleaner`]: seniority outlier filter and quit flag
//! - [`LabelEncoder`]: sorted, deterministic categorical codes

mod cleaner;
mod encoder;

pub use cleaner::Cleaner;
pub use encoder::LabelEncoder;

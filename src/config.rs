//! Analysis configuration
//!
//! Every literal the analysis depends on (seniority cutoff, reference date,
//! salary unit, tenure bucket edges, model size) lives here as a named,
//! overridable value.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetentionError};
use crate::explainability::PdpMethod;
use crate::training::GradientBoostingConfig;

/// Records with seniority at or above this value are treated as outliers
pub const DEFAULT_SENIORITY_CUTOFF: i64 = 60;

/// Cutoff date used as the tenure end for employees who have not quit
pub const REFERENCE_DATE: (i32, u32, u32) = (2015, 12, 13);

/// Raw salaries are divided by this
pub const DEFAULT_SALARY_SCALE: f64 = 10_000.0;

/// Half-year tenure bucket edges in days; the last bucket runs to 20 years
pub const TENURE_EDGES_DAYS: [f64; 11] = [
    0.0,
    365.0 * 0.5,
    365.0,
    365.0 * 1.5,
    365.0 * 2.0,
    365.0 * 2.5,
    365.0 * 3.0,
    365.0 * 3.5,
    365.0 * 4.0,
    365.0 * 4.5,
    365.0 * 20.0,
];

/// Default input file name
pub const DEFAULT_DATA_FILE: &str = "employee_retention_data.csv";

/// The reference date as a calendar date
pub fn default_reference_date() -> NaiveDate {
    let (year, month, day) = REFERENCE_DATE;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Partial dependence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialDependenceConfig {
    /// Maximum number of grid points per feature
    pub grid_resolution: usize,
    /// Lower and upper percentile (as fractions) bounding the grid
    pub percentiles: (f64, f64),
    pub method: PdpMethod,
}

impl Default for PartialDependenceConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 100,
            percentiles: (0.05, 0.95),
            method: PdpMethod::Recursion,
        }
    }
}

/// Configuration for a full analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input CSV path
    pub data_path: PathBuf,

    /// Field separator
    pub delimiter: u8,

    /// Directory chart files and the report are written into
    pub output_dir: PathBuf,

    /// Seniority outlier cutoff (exclusive upper bound)
    pub seniority_cutoff: i64,

    /// Tenure end date for employees still employed
    pub reference_date: NaiveDate,

    /// Divisor applied to raw salaries
    pub salary_scale: f64,

    /// Tenure bucket edges in days, strictly increasing
    pub tenure_edges: Vec<f64>,

    /// Gradient boosting hyperparameters
    pub boosting: GradientBoostingConfig,

    /// Partial dependence grid
    pub partial_dependence: PartialDependenceConfig,

    /// Worker threads for parallel stages (None = rayon default)
    pub n_jobs: Option<usize>,

    /// Whether SVG charts are rendered
    pub render_charts: bool,

    /// Whether `analysis_report.json` is written
    pub write_report: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            delimiter: b',',
            output_dir: PathBuf::from("."),
            seniority_cutoff: DEFAULT_SENIORITY_CUTOFF,
            reference_date: default_reference_date(),
            salary_scale: DEFAULT_SALARY_SCALE,
            tenure_edges: TENURE_EDGES_DAYS.to_vec(),
            boosting: GradientBoostingConfig::default(),
            partial_dependence: PartialDependenceConfig::default(),
            n_jobs: Some(3),
            render_charts: true,
            write_report: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_seniority_cutoff(mut self, cutoff: i64) -> Self {
        self.seniority_cutoff = cutoff;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn with_boosting(mut self, boosting: GradientBoostingConfig) -> Self {
        self.boosting = boosting;
        self
    }

    pub fn with_grid_resolution(mut self, n: usize) -> Self {
        self.partial_dependence.grid_resolution = n;
        self
    }

    pub fn with_pdp_method(mut self, method: PdpMethod) -> Self {
        self.partial_dependence.method = method;
        self
    }

    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    pub fn with_render_charts(mut self, render: bool) -> Self {
        self.render_charts = render;
        self
    }

    pub fn with_write_report(mut self, write: bool) -> Self {
        self.write_report = write;
        self
    }

    /// Check value ranges before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.salary_scale <= 0.0 || !self.salary_scale.is_finite() {
            return Err(RetentionError::ConfigError(format!(
                "salary_scale must be positive, got {}",
                self.salary_scale
            )));
        }
        if self.tenure_edges.len() < 2 {
            return Err(RetentionError::ConfigError(
                "tenure_edges needs at least two edges".to_string(),
            ));
        }
        if self.tenure_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RetentionError::ConfigError(
                "tenure_edges must be strictly increasing".to_string(),
            ));
        }
        if self.partial_dependence.grid_resolution < 2 {
            return Err(RetentionError::ConfigError(
                "grid_resolution must be at least 2".to_string(),
            ));
        }
        let (low, high) = self.partial_dependence.percentiles;
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low >= high {
            return Err(RetentionError::ConfigError(format!(
                "percentiles must satisfy 0 <= low < high <= 1, got ({}, {})",
                low, high
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(RetentionError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        self.boosting.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_literals() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seniority_cutoff, 60);
        assert_eq!(config.reference_date.to_string(), "2015-12-13");
        assert_eq!(config.tenure_edges.len(), 11);
        assert_eq!(config.tenure_edges[1], 182.5);
        assert_eq!(config.tenure_edges[10], 7300.0);
        assert_eq!(config.boosting.n_estimators, 500);
        assert_eq!(config.boosting.max_depth, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"seniority_cutoff": 40, "reference_date": "2016-01-01"}"#)
                .unwrap();
        assert_eq!(config.seniority_cutoff, 40);
        assert_eq!(config.reference_date.to_string(), "2016-01-01");
        assert_eq!(config.salary_scale, DEFAULT_SALARY_SCALE);
        assert_eq!(config.partial_dependence.method, PdpMethod::Recursion);
    }

    #[test]
    fn test_pdp_method_from_json() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"partial_dependence": {"method": "brute"}}"#).unwrap();
        assert_eq!(config.partial_dependence.method, PdpMethod::Brute);
        assert_eq!(config.partial_dependence.grid_resolution, 100);
    }

    #[test]
    fn test_validate_rejects_unsorted_edges() {
        let mut config = AnalysisConfig::default();
        config.tenure_edges = vec![0.0, 10.0, 5.0];
        assert!(matches!(config.validate(), Err(RetentionError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_percentiles() {
        let mut config = AnalysisConfig::default();
        config.partial_dependence.percentiles = (0.9, 0.1);
        assert!(config.validate().is_err());
    }
}

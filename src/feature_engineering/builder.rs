//! Model features from cleaned records

use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::tenure::checked_tenure_days;
use crate::config::{default_reference_date, AnalysisConfig, DEFAULT_SALARY_SCALE};
use crate::dataset::{CleanTable, FeatureRecord};
use crate::error::{Result, RetentionError};
use crate::preprocessing::LabelEncoder;

/// Model input columns, in matrix order
pub const FEATURE_NAMES: [&str; 5] = ["company_id", "dept", "seniority", "salary", "tenure"];

/// Model-ready records plus the department encoding used to build them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    pub records: Vec<FeatureRecord>,
    pub encoder: LabelEncoder,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn feature_names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// `n x 5` matrix in [`FEATURE_NAMES`] order
    pub fn feature_matrix(&self) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self
            .records
            .iter()
            .flat_map(|r| {
                [
                    r.company_id as f64,
                    r.dept_code as f64,
                    r.seniority as f64,
                    r.salary,
                    r.tenure_days as f64,
                ]
            })
            .collect();
        Ok(Array2::from_shape_vec((self.records.len(), FEATURE_NAMES.len()), flat)?)
    }

    /// Quit flags as 0.0 / 1.0
    pub fn labels(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.quit as f64).collect()
    }

    /// Error unless both classes are present
    pub fn check_trainable(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(RetentionError::EmptyFeatureTable);
        }
        let first = self.records[0].quit;
        if self.records.iter().all(|r| r.quit == first) {
            return Err(RetentionError::DegenerateLabel(first));
        }
        Ok(())
    }
}

/// Encodes departments, rescales salary and derives tenure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBuilder {
    pub salary_scale: f64,
    pub reference_date: NaiveDate,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self {
            salary_scale: DEFAULT_SALARY_SCALE,
            reference_date: default_reference_date(),
        }
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            salary_scale: config.salary_scale,
            reference_date: config.reference_date,
        }
    }

    pub fn with_salary_scale(mut self, scale: f64) -> Self {
        self.salary_scale = scale;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn build(&self, table: &CleanTable) -> Result<FeatureTable> {
        let mut encoder = LabelEncoder::new();
        encoder.fit(table.records.iter().map(|r| r.employee.dept.as_str()));

        let records = table
            .records
            .iter()
            .map(|r| {
                let e = &r.employee;
                Ok(FeatureRecord {
                    employee_id: e.employee_id,
                    company_id: e.company_id,
                    dept_code: encoder.transform(&e.dept)?,
                    seniority: e.seniority,
                    salary: e.salary / self.salary_scale,
                    tenure_days: checked_tenure_days(
                        e.employee_id,
                        e.join_date,
                        e.quit_date,
                        self.reference_date,
                    )?,
                    quit: r.quit,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            rows = records.len(),
            departments = encoder.n_classes(),
            reference_date = %self.reference_date,
            "Built feature table"
        );
        Ok(FeatureTable { records, encoder })
    }
}

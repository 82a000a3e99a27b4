//! Employee records and the tables each pipeline stage produces

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetentionError};

/// One row of the input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: i64,
    pub company_id: i64,
    pub dept: String,
    pub seniority: i64,
    /// Raw salary as recorded
    pub salary: f64,
    pub join_date: NaiveDate,
    /// `None` while still employed
    pub quit_date: Option<NaiveDate>,
}

impl EmployeeRecord {
    pub fn has_quit(&self) -> bool {
        self.quit_date.is_some()
    }
}

/// Loaded records, sorted by `employee_id` with no duplicates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeTable {
    records: Vec<EmployeeRecord>,
}

impl EmployeeTable {
    /// Sort by id and reject duplicate ids
    pub fn new(mut records: Vec<EmployeeRecord>) -> Result<Self> {
        records.sort_by_key(|r| r.employee_id);
        if let Some(pair) = records.windows(2).find(|w| w[0].employee_id == w[1].employee_id) {
            return Err(RetentionError::DuplicateEmployee(pair[0].employee_id));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, employee_id: i64) -> Option<&EmployeeRecord> {
        self.records
            .binary_search_by_key(&employee_id, |r| r.employee_id)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn seniorities(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.seniority as f64).collect()
    }
}

/// A record that survived cleaning, with its attrition label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub employee: EmployeeRecord,
    /// 1 iff `employee.quit_date` is present
    pub quit: u8,
}

/// Output of the cleaner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanTable {
    pub records: Vec<CleanRecord>,
    /// Records removed by the seniority filter
    pub n_dropped: usize,
}

impl CleanTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Model-ready row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub employee_id: i64,
    pub company_id: i64,
    pub dept_code: usize,
    pub seniority: i64,
    /// Salary divided by the salary scale
    pub salary: f64,
    pub tenure_days: i64,
    pub quit: u8,
}

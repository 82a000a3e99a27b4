//! Seniority outlier filter and attrition label

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DEFAULT_SENIORITY_CUTOFF;
use crate::dataset::{CleanRecord, CleanTable, EmployeeTable};

/// Drops seniority outliers and derives the quit flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cleaner {
    /// Records with seniority at or above this are dropped
    pub seniority_cutoff: i64,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(DEFAULT_SENIORITY_CUTOFF)
    }
}

impl Cleaner {
    pub fn new(seniority_cutoff: i64) -> Self {
        Self { seniority_cutoff }
    }

    pub fn clean(&self, table: &EmployeeTable) -> CleanTable {
        let records: Vec<CleanRecord> = table
            .records()
            .iter()
            .filter(|r| r.seniority < self.seniority_cutoff)
            .map(|r| CleanRecord {
                employee: r.clone(),
                quit: u8::from(r.has_quit()),
            })
            .collect();

        let n_dropped = table.len() - records.len();
        info!(
            kept = records.len(),
            dropped = n_dropped,
            cutoff = self.seniority_cutoff,
            "Removed seniority outliers"
        );

        CleanTable { records, n_dropped }
    }
}

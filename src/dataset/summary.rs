//! Descriptive summaries printed alongside the model results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::CleanTable;

/// Count, moments, quartiles and box-plot whiskers of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Lowest value within q1 - 1.5 * IQR
    pub lower_whisker: f64,
    /// Highest value within q3 + 1.5 * IQR
    pub upper_whisker: f64,
    /// Values beyond the whiskers
    pub outliers: Vec<f64>,
}

impl DescribeStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let lower_whisker = sorted.iter().copied().find(|&v| v >= low_fence).unwrap_or(q1);
        let upper_whisker = sorted.iter().rev().copied().find(|&v| v <= high_fence).unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < low_fence || v > high_fence)
            .collect();

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[count - 1],
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear-interpolated quantile of sorted values
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Per-company headcount, mean raw salary and quit rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company_id: i64,
    pub headcount: usize,
    pub mean_salary: f64,
    pub quit_rate: f64,
}

/// Headcount of one department within one company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeptCount {
    pub company_id: i64,
    pub dept: String,
    pub count: usize,
}

/// Company summaries ordered by company id
pub fn company_summary(table: &CleanTable) -> Vec<CompanySummary> {
    let mut groups: BTreeMap<i64, (usize, f64, usize)> = BTreeMap::new();
    for record in &table.records {
        let entry = groups.entry(record.employee.company_id).or_default();
        entry.0 += 1;
        entry.1 += record.employee.salary;
        entry.2 += record.quit as usize;
    }

    groups
        .into_iter()
        .map(|(company_id, (headcount, salary_sum, quits))| CompanySummary {
            company_id,
            headcount,
            mean_salary: salary_sum / headcount as f64,
            quit_rate: quits as f64 / headcount as f64,
        })
        .collect()
}

/// Department headcounts ordered by company then department
pub fn dept_counts(table: &CleanTable) -> Vec<DeptCount> {
    let mut groups: BTreeMap<(i64, &str), usize> = BTreeMap::new();
    for record in &table.records {
        *groups
            .entry((record.employee.company_id, record.employee.dept.as_str()))
            .or_default() += 1;
    }

    groups
        .into_iter()
        .map(|((company_id, dept), count)| DeptCount {
            company_id,
            dept: dept.to_string(),
            count,
        })
        .collect()
}

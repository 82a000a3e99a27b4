//! Analysis results

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::{CompanySummary, DeptCount, DescribeStats};
use crate::error::Result;
use crate::explainability::PDPResult;
use crate::feature_engineering::BucketReport;

/// File name of the serialized report inside the output directory
pub const REPORT_FILE: &str = "analysis_report.json";

/// Wall time of one pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_secs: f64,
}

/// Boosted model summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Feature names in matrix order
    pub feature_names: Vec<String>,
    /// Same order as `feature_names`, sums to 1
    pub feature_importances: Vec<f64>,
    /// Accuracy on the rows the model was fitted on
    pub training_accuracy: f64,
    /// Mean log-loss after the last round
    pub final_train_deviance: Option<f64>,
    pub training_time_secs: f64,
}

impl ModelSummary {
    /// Importances paired with names, highest first
    pub fn ranked_importances(&self) -> Vec<(&str, f64)> {
        let mut pairs: Vec<(&str, f64)> = self
            .feature_names
            .iter()
            .map(String::as_str)
            .zip(self.feature_importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }
}

/// Everything one analysis run computed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub n_loaded: usize,
    pub n_dropped: usize,
    pub seniority_cutoff: i64,
    pub reference_date: String,
    /// Seniority before outlier removal
    pub seniority: Option<DescribeStats>,
    pub companies: Vec<CompanySummary>,
    pub departments: Vec<DeptCount>,
    /// Department names in code order
    pub dept_classes: Vec<String>,
    pub tenure_buckets: BucketReport,
    pub model: ModelSummary,
    pub partial_dependence: Vec<PDPResult>,
    /// Chart files emitted, in order
    pub charts: Vec<String>,
    pub stages: Vec<StageTiming>,
}

impl AnalysisReport {
    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Plain-text summary
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Employee Retention Report ===\n\n");

        report.push_str("--- Data ---\n");
        report.push_str(&format!("Loaded:          {}\n", self.n_loaded));
        report.push_str(&format!(
            "Dropped:         {} (seniority >= {})\n",
            self.n_dropped, self.seniority_cutoff
        ));
        report.push_str(&format!("Reference date:  {}\n\n", self.reference_date));

        if let Some(ref s) = self.seniority {
            report.push_str("--- Seniority (before cleaning) ---\n");
            report.push_str(&format!(
                "mean {:.2}  std {:.2}  min {}  q1 {}  median {}  q3 {}  max {}\n\n",
                s.mean, s.std, s.min, s.q1, s.median, s.q3, s.max
            ));
        }

        report.push_str("--- Companies ---\n");
        for c in &self.companies {
            report.push_str(&format!(
                "  {:>3}  headcount {:>6}  mean salary {:>10.1}  quit rate {:.3}\n",
                c.company_id, c.headcount, c.mean_salary, c.quit_rate
            ));
        }
        report.push('\n');

        report.push_str("--- Attrition by tenure ---\n");
        for r in &self.tenure_buckets.rates {
            report.push_str(&format!(
                "  {:>4.1} years  n {:>6}  quit rate {:.3}\n",
                r.bucket.label, r.count, r.quit_rate
            ));
        }
        if self.tenure_buckets.n_unbinned > 0 {
            report.push_str(&format!("  unbinned: {}\n", self.tenure_buckets.n_unbinned));
        }
        report.push('\n');

        report.push_str("--- Model ---\n");
        report.push_str(&format!(
            "{} trees, depth {}, learning rate {}\n",
            self.model.n_trees, self.model.max_depth, self.model.learning_rate
        ));
        report.push_str(&format!(
            "Training-set accuracy: {:.4}\n",
            self.model.training_accuracy
        ));
        report.push_str(&format!("{:.4} seconds\n\n", self.model.training_time_secs));

        report.push_str("--- Feature Importance ---\n");
        for (name, imp) in self.model.ranked_importances() {
            report.push_str(&format!("  {:<20} {:.4}\n", name, imp));
        }

        report
    }
}

//! Visualization module
//!
//! Charts are described as plain data ([`Chart`]) and handed to a
//! [`ChartSink`]. [`SvgChartSink`] renders them to standalone SVG files;
//! [`RecordingSink`] keeps them in memory.

mod svg;

pub use svg::{render_svg, SvgChartSink};

use serde::{Deserialize, Serialize};

use crate::dataset::DescribeStats;
use crate::error::Result;
use crate::explainability::PDPResult;
use crate::feature_engineering::BucketReport;

pub const SENIORITY_BOXPLOT_FILE: &str = "seniority_boxplot.svg";
pub const TENURE_CHART_FILE: &str = "tenure_bin.svg";
pub const PDP_CHART_FILE: &str = "feature_importances_1.svg";

/// Panels per row in the partial dependence grid
const PDP_COLUMNS: usize = 3;

/// What a chart shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChartKind {
    /// Single box with whiskers and outliers
    BoxPlot { label: String, stats: DescribeStats },
    /// Unconnected points
    Scatter {
        points: Vec<(f64, f64)>,
        x_label: String,
        y_label: String,
    },
    /// One line panel per feature, sharing the y axis
    PartialDependenceGrid { panels: Vec<PDPResult>, n_cols: usize },
}

/// A chart and the file name it is saved under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    pub file_name: String,
    pub title: String,
    pub kind: ChartKind,
}

impl Chart {
    /// Box plot of seniority before outlier removal
    pub fn seniority_boxplot(stats: &DescribeStats) -> Self {
        Self {
            file_name: SENIORITY_BOXPLOT_FILE.to_string(),
            title: "Seniority".to_string(),
            kind: ChartKind::BoxPlot {
                label: "seniority".to_string(),
                stats: stats.clone(),
            },
        }
    }

    /// Attrition rate against tenure bucket label (years)
    pub fn tenure_attrition(report: &BucketReport) -> Self {
        Self {
            file_name: TENURE_CHART_FILE.to_string(),
            title: "Attrition rate by tenure".to_string(),
            kind: ChartKind::Scatter {
                points: report
                    .rates
                    .iter()
                    .map(|r| (r.bucket.label, r.quit_rate))
                    .collect(),
                x_label: "Tenure".to_string(),
                y_label: "Attrition Rate".to_string(),
            },
        }
    }

    pub fn partial_dependence(panels: &[PDPResult]) -> Self {
        Self {
            file_name: PDP_CHART_FILE.to_string(),
            title: "Partial dependence".to_string(),
            kind: ChartKind::PartialDependenceGrid {
                panels: panels.to_vec(),
                n_cols: PDP_COLUMNS,
            },
        }
    }
}

/// Destination for rendered charts
pub trait ChartSink {
    fn emit(&mut self, chart: &Chart) -> Result<()>;
}

/// Keeps every emitted chart in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub charts: Vec<Chart>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.charts.iter().map(|c| c.file_name.as_str()).collect()
    }
}

impl ChartSink for RecordingSink {
    fn emit(&mut self, chart: &Chart) -> Result<()> {
        self.charts.push(chart.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_engineering::{BucketRate, TenureBinner};

    #[test]
    fn test_tenure_chart_points() {
        let binner = TenureBinner::default();
        let report = BucketReport {
            rates: vec![
                BucketRate {
                    bucket: binner.bucket(0).unwrap(),
                    count: 4,
                    quit_rate: 0.25,
                },
                BucketRate {
                    bucket: binner.bucket(2).unwrap(),
                    count: 2,
                    quit_rate: 1.0,
                },
            ],
            n_unbinned: 0,
        };

        let chart = Chart::tenure_attrition(&report);
        assert_eq!(chart.file_name, "tenure_bin.svg");
        match chart.kind {
            ChartKind::Scatter { points, x_label, y_label } => {
                assert_eq!(points, vec![(0.0, 0.25), (1.0, 1.0)]);
                assert_eq!(x_label, "Tenure");
                assert_eq!(y_label, "Attrition Rate");
            }
            other => panic!("unexpected chart kind: {:?}", other),
        }
    }

    #[test]
    fn test_recording_sink() {
        let stats = DescribeStats::from_values(&[1.0, 2.0, 3.0]).unwrap();
        let mut sink = RecordingSink::new();
        sink.emit(&Chart::seniority_boxplot(&stats)).unwrap();
        sink.emit(&Chart::partial_dependence(&[])).unwrap();
        assert_eq!(sink.file_names(), vec!["seniority_boxplot.svg", "feature_importances_1.svg"]);
    }
}

//! Employee retention CLI
//!
//! Runs the full analysis with optional overrides and prints a summary.

use clap::Parser;
use colored::*;
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{AnalysisConfig, DEFAULT_DATA_FILE};
use crate::pipeline::{RetentionPipeline, REPORT_FILE};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "retention")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Employee attrition analysis: tenure buckets, boosted model, partial dependence")]
#[command(long_about = None)]
pub struct Cli {
    /// Employee CSV file
    #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
    pub data: PathBuf,

    /// Directory for charts and the JSON report
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Drop records with seniority at or above this
    #[arg(long)]
    pub seniority_cutoff: Option<i64>,

    /// Tenure end date for current employees (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub reference_date: Option<NaiveDate>,

    /// Number of boosting rounds
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub n_jobs: Option<usize>,

    /// Partial dependence grid points per feature
    #[arg(long)]
    pub grid_resolution: Option<usize>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

impl Cli {
    /// Configuration file (or defaults) with flag overrides applied
    pub fn to_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        // The flag default only wins when no config file set a path
        if self.config.is_none() || self.data != PathBuf::from(DEFAULT_DATA_FILE) {
            config.data_path = self.data.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(cutoff) = self.seniority_cutoff {
            config.seniority_cutoff = cutoff;
        }
        if let Some(date) = self.reference_date {
            config.reference_date = date;
        }
        if let Some(n) = self.n_estimators {
            config.boosting.n_estimators = n;
        }
        if let Some(depth) = self.max_depth {
            config.boosting.max_depth = depth;
        }
        if let Some(n) = self.n_jobs {
            config.n_jobs = Some(n);
        }
        if let Some(n) = self.grid_resolution {
            config.partial_dependence.grid_resolution = n;
        }
        if self.no_charts {
            config.render_charts = false;
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_analyze(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.to_config()?;

    section("Employee Retention");
    line_box_top();
    line_box(&kv("data      ", &config.data_path.display().to_string()));
    line_box(&kv("output    ", &config.output_dir.display().to_string()));
    line_box(&kv("reference ", &config.reference_date.to_string()));
    line_box(&kv(
        "model     ",
        &format!(
            "{} trees, depth {}",
            config.boosting.n_estimators, config.boosting.max_depth
        ),
    ));
    line_box_bottom();
    println!();

    let pipeline = RetentionPipeline::new(config)?;

    step_run("Running analysis");
    let start = Instant::now();
    let report = pipeline.run()?;
    step_done(&format!("{:?}", start.elapsed()));

    for stage in &report.stages {
        step_ok(&format!("{:<20} {}", stage.stage, dim(&format!("{:.3}s", stage.elapsed_secs))));
    }
    for chart in &report.charts {
        step_ok(&format!("Saved {}", chart.cyan()));
    }
    if pipeline.config().write_report {
        step_ok(&format!("Saved {}", REPORT_FILE.cyan()));
    }

    section("Results");
    println!("{}", report.generate_report());

    // Importances in feature order, as a plain array
    println!("{}", format_importances(&report.model.feature_importances));
    Ok(())
}

/// `[a b c d e]` with eight decimals
pub fn format_importances(importances: &[f64]) -> String {
    let values: Vec<String> = importances.iter().map(|v| format!("{:.8}", v)).collect();
    format!("[{}]", values.join(" "))
}

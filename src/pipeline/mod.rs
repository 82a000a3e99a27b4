//! End-to-end retention analysis
//!
//! Runs load → clean → features → (tenure buckets, boosted model) and
//! collects the results into an [`AnalysisReport`]. Each stage returns a new
//! table; nothing is mutated in place.

mod report;

pub use report::{AnalysisReport, ModelSummary, StageTiming, REPORT_FILE};

use std::time::Instant;

use ndarray::{Array1, Array2};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::dataset::{company_summary, dept_counts, CleanTable, DescribeStats, EmployeeTable};
use crate::error::Result;
use crate::explainability::{recursion_partial_dependence, PDPResult, PartialDependence, PdpMethod};
use crate::feature_engineering::{BucketReport, FeatureBuilder, FeatureTable, TenureBinner};
use crate::preprocessing::Cleaner;
use crate::training::GradientBoostingClassifier;
use crate::utils::{EmployeeLoader, ParallelConfig};
use crate::visualization::{Chart, ChartSink, SvgChartSink};

/// A fitted model and the matrix it was fitted on
pub struct FittedModel {
    pub model: GradientBoostingClassifier,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub training_time_secs: f64,
}

impl FittedModel {
    /// Fraction of training rows predicted correctly
    pub fn training_accuracy(&self) -> Result<f64> {
        let predicted = self.model.predict(&self.x)?;
        let correct = predicted
            .iter()
            .zip(self.y.iter())
            .filter(|(p, y)| p == y)
            .count();
        Ok(correct as f64 / self.y.len().max(1) as f64)
    }
}

/// Runs the analysis described by an [`AnalysisConfig`]
pub struct RetentionPipeline {
    config: AnalysisConfig,
}

impl RetentionPipeline {
    /// Validate the configuration and build the pipeline
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn parallel(&self) -> ParallelConfig {
        match self.config.n_jobs {
            Some(n) => ParallelConfig::new().with_threads(n),
            None => ParallelConfig::new(),
        }
    }

    /// Run with SVG charts written to the output directory
    pub fn run(&self) -> Result<AnalysisReport> {
        let mut sink = SvgChartSink::new(&self.config.output_dir);
        self.run_with_sink(&mut sink)
    }

    /// Run, handing charts to `sink` when chart rendering is enabled
    pub fn run_with_sink(&self, sink: &mut dyn ChartSink) -> Result<AnalysisReport> {
        let mut stages = Vec::new();
        let mut charts = Vec::new();
        let mut timed = |stage: &str, start: Instant| {
            stages.push(StageTiming {
                stage: stage.to_string(),
                elapsed_secs: start.elapsed().as_secs_f64(),
            })
        };

        let start = Instant::now();
        let employees = self.load()?;
        timed("load", start);

        let seniority = DescribeStats::from_values(&employees.seniorities());
        if let Some(ref stats) = seniority {
            self.emit(sink, &mut charts, Chart::seniority_boxplot(stats))?;
        }

        let start = Instant::now();
        let cleaned = self.clean(&employees);
        let companies = company_summary(&cleaned);
        let departments = dept_counts(&cleaned);
        timed("clean", start);

        let start = Instant::now();
        let features = self.build_features(&cleaned)?;
        timed("features", start);

        let start = Instant::now();
        let buckets = self.bin_tenure(&features)?;
        timed("tenure buckets", start);
        self.emit(sink, &mut charts, Chart::tenure_attrition(&buckets))?;

        let start = Instant::now();
        let fitted = self.fit_model(&features)?;
        let training_accuracy = fitted.training_accuracy()?;
        timed("model", start);

        let names = FeatureTable::feature_names();
        let importances = fitted.model.feature_importances().to_vec();
        info!(
            importances = ?importances,
            training_accuracy,
            "Fitted attrition model"
        );

        let start = Instant::now();
        let partial_dependence = self.partial_dependence(&fitted)?;
        timed("partial dependence", start);
        self.emit(sink, &mut charts, Chart::partial_dependence(&partial_dependence))?;

        let boosting = fitted.model.config();
        let report = AnalysisReport {
            n_loaded: employees.len(),
            n_dropped: cleaned.n_dropped,
            seniority_cutoff: self.config.seniority_cutoff,
            reference_date: self.config.reference_date.to_string(),
            seniority,
            companies,
            departments,
            dept_classes: features.encoder.classes().to_vec(),
            tenure_buckets: buckets,
            model: ModelSummary {
                n_trees: fitted.model.n_trees(),
                max_depth: boosting.max_depth,
                learning_rate: boosting.learning_rate,
                feature_names: names,
                feature_importances: importances,
                training_accuracy,
                final_train_deviance: fitted.model.train_loss().last().copied(),
                training_time_secs: fitted.training_time_secs,
            },
            partial_dependence,
            charts,
            stages,
        };

        if self.config.write_report {
            let path = self.config.output_dir.join(REPORT_FILE);
            report.save(&path)?;
            info!(path = %path.display(), "Saved analysis report");
        }

        Ok(report)
    }

    pub fn load(&self) -> Result<EmployeeTable> {
        EmployeeLoader::new()
            .with_delimiter(self.config.delimiter)
            .load(&self.config.data_path)
    }

    pub fn clean(&self, employees: &EmployeeTable) -> CleanTable {
        Cleaner::new(self.config.seniority_cutoff).clean(employees)
    }

    pub fn build_features(&self, cleaned: &CleanTable) -> Result<FeatureTable> {
        FeatureBuilder::from_config(&self.config).build(cleaned)
    }

    pub fn bin_tenure(&self, features: &FeatureTable) -> Result<BucketReport> {
        let binner = TenureBinner::new(self.config.tenure_edges.clone())?;
        Ok(binner.attrition_by_bucket(features))
    }

    /// Fit the boosted classifier on the pool sized by `n_jobs`
    pub fn fit_model(&self, features: &FeatureTable) -> Result<FittedModel> {
        features.check_trainable()?;
        let x = features.feature_matrix()?;
        let y = features.labels();

        let start = Instant::now();
        let mut model = GradientBoostingClassifier::new(self.config.boosting.clone());
        self.parallel().install(|| model.fit(&x, &y))??;
        let training_time_secs = start.elapsed().as_secs_f64();

        info!(
            trees = model.n_trees(),
            rows = x.nrows(),
            secs = training_time_secs,
            "Trained gradient boosting"
        );
        Ok(FittedModel {
            model,
            x,
            y,
            training_time_secs,
        })
    }

    /// Partial dependence of the log-odds on every feature
    pub fn partial_dependence(&self, fitted: &FittedModel) -> Result<Vec<PDPResult>> {
        let pdp = &self.config.partial_dependence;
        let names = FeatureTable::feature_names();
        let indices: Vec<usize> = (0..names.len()).collect();

        match pdp.method {
            PdpMethod::Recursion => recursion_partial_dependence(
                &fitted.model,
                &fitted.x,
                &indices,
                pdp.grid_resolution,
                pdp.percentiles,
                Some(names.as_slice()),
                &self.parallel(),
            ),
            PdpMethod::Brute => {
                let model = &fitted.model;
                PartialDependence::new(|x: &Array2<f64>| model.decision_function(x))
                    .with_grid_resolution(pdp.grid_resolution)
                    .with_percentiles(pdp.percentiles.0, pdp.percentiles.1)
                    .with_feature_names(names)
                    .with_parallel(self.parallel())
                    .compute_batch(&fitted.x, &indices)
            }
        }
    }

    fn emit(&self, sink: &mut dyn ChartSink, charts: &mut Vec<String>, chart: Chart) -> Result<()> {
        if !self.config.render_charts {
            return Ok(());
        }
        sink.emit(&chart)?;
        charts.push(chart.file_name);
        Ok(())
    }
}

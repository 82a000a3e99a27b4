//! Partial dependence of the model output on single features

use crate::error::{Result, RetentionError};
use crate::training::GradientBoostingClassifier;
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How partial dependence is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdpMethod {
    /// Weighted tree traversal; only available for the boosted model
    Recursion,
    /// Overwrite the feature for every row and average the predictions
    Brute,
}

/// Result of Partial Dependence computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDPResult {
    /// Feature index
    pub feature_index: usize,
    /// Feature name (if provided)
    pub feature_name: Option<String>,
    /// Grid values for the feature
    pub grid_values: Vec<f64>,
    /// Average model output (log-odds) at each grid point
    pub average_predictions: Vec<f64>,
}

/// Grid for one feature column
///
/// With fewer distinct values than `grid_resolution` the sorted distinct
/// values are used as-is; otherwise `grid_resolution` evenly spaced points
/// between the given percentiles (fractions, see `grid_quantile`).
pub fn feature_grid(
    column: ArrayView1<f64>,
    grid_resolution: usize,
    percentiles: (f64, f64),
) -> Result<Vec<f64>> {
    let mut values: Vec<f64> = column.iter().copied().collect();
    if values.is_empty() {
        return Err(RetentionError::EmptyFeatureTable);
    }
    values.sort_by(f64::total_cmp);

    let mut distinct = values.clone();
    distinct.dedup();
    if distinct.len() < grid_resolution {
        return Ok(distinct);
    }

    let low = grid_quantile(&values, percentiles.0);
    let high = grid_quantile(&values, percentiles.1);
    if high <= low {
        return Err(RetentionError::ValidationError(format!(
            "Percentiles {:?} are too close to build a grid (both {})",
            percentiles, low
        )));
    }

    let step = (high - low) / (grid_resolution - 1) as f64;
    Ok((0..grid_resolution).map(|i| low + i as f64 * step).collect())
}

/// Quantile of sorted `values` with plotting positions alpha = beta = 0.4
///
/// With `m = 0.4 + 0.2 * p` and `aleph = n * p + m`, interpolates between the
/// 1-based order statistics `floor(aleph)` and `floor(aleph) + 1`.
fn grid_quantile(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    match n {
        0 => return f64::NAN,
        1 => return values[0],
        _ => {}
    }
    let aleph = n as f64 * p + 0.4 + 0.2 * p;
    let k = aleph.floor().clamp(1.0, (n - 1) as f64);
    let gamma = (aleph - k).clamp(0.0, 1.0);
    let k = k as usize;
    (1.0 - gamma) * values[k - 1] + gamma * values[k]
}

/// Partial Dependence calculator
pub struct PartialDependence<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    /// Prediction function
    predict_fn: F,
    /// Maximum number of grid points
    grid_resolution: usize,
    /// Percentile range for grid (fractions)
    percentiles: (f64, f64),
    /// Feature names
    feature_names: Option<Vec<String>>,
    /// Worker pool settings
    parallel: ParallelConfig,
}

impl<F> PartialDependence<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    /// Create new PDP calculator
    pub fn new(predict_fn: F) -> Self {
        Self {
            predict_fn,
            grid_resolution: 100,
            percentiles: (0.05, 0.95),
            feature_names: None,
            parallel: ParallelConfig::default(),
        }
    }

    /// Set the maximum number of grid points
    pub fn with_grid_resolution(mut self, n: usize) -> Self {
        self.grid_resolution = n.max(2);
        self
    }

    /// Set percentile range for grid
    pub fn with_percentiles(mut self, low: f64, high: f64) -> Self {
        self.percentiles = (low.clamp(0.0, 1.0), high.clamp(0.0, 1.0));
        self
    }

    /// Set feature names
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Set worker pool settings
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compute PDP for a single feature
    pub fn compute(&self, x: &Array2<f64>, feature_index: usize) -> Result<PDPResult> {
        let mut results = self.compute_batch(x, &[feature_index])?;
        results.pop().ok_or(RetentionError::EmptyFeatureTable)
    }

    /// Compute PDP for multiple features, grid points evaluated in parallel
    pub fn compute_batch(&self, x: &Array2<f64>, feature_indices: &[usize]) -> Result<Vec<PDPResult>> {
        let grids = build_grids(x, feature_indices, self.grid_resolution, self.percentiles)?;

        let averages: Vec<Vec<f64>> = self.parallel.install(|| {
            feature_indices
                .iter()
                .zip(&grids)
                .map(|(&feature_index, grid)| {
                    grid.par_iter()
                        .map(|&value| {
                            let mut x_modified = x.clone();
                            x_modified.column_mut(feature_index).fill(value);
                            let predictions = (self.predict_fn)(&x_modified)?;
                            predictions.mean().ok_or(RetentionError::EmptyFeatureTable)
                        })
                        .collect::<Result<Vec<f64>>>()
                })
                .collect::<Result<Vec<_>>>()
        })??;

        Ok(assemble(feature_indices, grids, averages, self.feature_names.as_deref()))
    }
}

/// Partial dependence of the boosted model's log-odds by tree traversal
pub fn recursion_partial_dependence(
    model: &GradientBoostingClassifier,
    x: &Array2<f64>,
    feature_indices: &[usize],
    grid_resolution: usize,
    percentiles: (f64, f64),
    feature_names: Option<&[String]>,
    parallel: &ParallelConfig,
) -> Result<Vec<PDPResult>> {
    let grids = build_grids(x, feature_indices, grid_resolution, percentiles)?;

    let averages: Vec<Vec<f64>> = parallel.install(|| {
        feature_indices
            .par_iter()
            .zip(grids.par_iter())
            .map(|(&feature_index, grid)| model.partial_dependence_recursion(feature_index, grid))
            .collect::<Result<Vec<_>>>()
    })??;

    Ok(assemble(feature_indices, grids, averages, feature_names))
}

fn build_grids(
    x: &Array2<f64>,
    feature_indices: &[usize],
    grid_resolution: usize,
    percentiles: (f64, f64),
) -> Result<Vec<Vec<f64>>> {
    if x.nrows() == 0 {
        return Err(RetentionError::EmptyFeatureTable);
    }
    feature_indices
        .iter()
        .map(|&feature_index| {
            if feature_index >= x.ncols() {
                return Err(RetentionError::ValidationError(format!(
                    "Feature index {} out of bounds (n_features={})",
                    feature_index,
                    x.ncols()
                )));
            }
            feature_grid(x.column(feature_index), grid_resolution, percentiles)
        })
        .collect()
}

fn assemble(
    feature_indices: &[usize],
    grids: Vec<Vec<f64>>,
    averages: Vec<Vec<f64>>,
    feature_names: Option<&[String]>,
) -> Vec<PDPResult> {
    feature_indices
        .iter()
        .zip(grids.into_iter().zip(averages))
        .map(|(&feature_index, (grid_values, average_predictions))| PDPResult {
            feature_index,
            feature_name: feature_names.and_then(|names| names.get(feature_index).cloned()),
            grid_values,
            average_predictions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::GradientBoostingConfig;

    fn linear_predict(x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(x.rows().into_iter().map(|row| row[0] + 2.0 * row[1]).collect())
    }

    fn linear_data() -> Array2<f64> {
        Array2::from_shape_vec(
            (10, 2),
            vec![
                0.0, 0.0, 1.0, 0.5, 2.0, 1.0, 3.0, 1.5, 4.0, 2.0, 5.0, 2.5, 6.0, 3.0, 7.0, 3.5,
                8.0, 4.0, 9.0, 4.5,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pdp_linear_model() {
        let x = linear_data();
        let pdp = PartialDependence::new(linear_predict).with_grid_resolution(100);
        let result = pdp.compute(&x, 0).unwrap();

        // Ten distinct values, fewer than the resolution: grid is the values
        assert_eq!(result.grid_values, (0..10).map(|i| i as f64).collect::<Vec<_>>());
        // Mean of 2 * x1 is 4.5, so PD(x0 = v) = v + 4.5
        for (v, pd) in result.grid_values.iter().zip(&result.average_predictions) {
            assert!((pd - (v + 4.5)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_grid_uses_percentiles_when_dense() {
        let column = Array1::from_vec((0..=100).map(|i| i as f64).collect());
        let grid = feature_grid(column.view(), 5, (0.05, 0.95)).unwrap();
        let expected = [4.46, 27.23, 50.0, 72.77, 95.54];
        assert_eq!(grid.len(), expected.len());
        for (g, e) in grid.iter().zip(expected) {
            assert!((g - e).abs() < 1e-9, "{} != {}", g, e);
        }
    }

    #[test]
    fn test_grid_quantile_plotting_positions() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert!((grid_quantile(&values, 0.05) - 4.46).abs() < 1e-9);
        assert!((grid_quantile(&values, 0.95) - 95.54).abs() < 1e-9);
        assert!((grid_quantile(&values, 0.5) - 50.0).abs() < 1e-9);
        // Clamped to the extremes
        assert_eq!(grid_quantile(&values, 0.0), 0.0);
        assert_eq!(grid_quantile(&values, 1.0), 100.0);
        assert_eq!(grid_quantile(&[7.0], 0.3), 7.0);
    }

    #[test]
    fn test_results_independent_of_thread_count() {
        let x = linear_data();
        let single = PartialDependence::new(linear_predict)
            .with_grid_resolution(4)
            .with_parallel(ParallelConfig::new().with_threads(1))
            .compute_batch(&x, &[0, 1])
            .unwrap();
        let multi = PartialDependence::new(linear_predict)
            .with_grid_resolution(4)
            .with_parallel(ParallelConfig::new().with_threads(3))
            .compute_batch(&x, &[0, 1])
            .unwrap();

        for (a, b) in single.iter().zip(&multi) {
            assert_eq!(a.grid_values, b.grid_values);
            assert_eq!(a.average_predictions, b.average_predictions);
        }
    }

    #[test]
    fn test_feature_out_of_bounds() {
        let x = linear_data();
        let pdp = PartialDependence::new(linear_predict);
        assert!(pdp.compute(&x, 5).is_err());
    }

    #[test]
    fn test_recursion_names_and_shapes() {
        let x = Array2::from_shape_vec((30, 2), (0..30).flat_map(|i| [i as f64, (i % 3) as f64]).collect())
            .unwrap();
        let y: Array1<f64> = (0..30).map(|i| if i >= 15 { 1.0 } else { 0.0 }).collect();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 10,
            max_depth: 2,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let names = vec!["tenure".to_string(), "dept".to_string()];
        let results = recursion_partial_dependence(
            &model,
            &x,
            &[0, 1],
            10,
            (0.05, 0.95),
            Some(&names),
            &ParallelConfig::new().with_threads(2),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].grid_values.len(), 10);
        assert_eq!(results[1].grid_values, vec![0.0, 1.0, 2.0]);
        assert_eq!(results[1].feature_name.as_deref(), Some("dept"));
        let spread = |r: &PDPResult| {
            let lo = r.average_predictions.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = r.average_predictions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            hi - lo
        };
        assert!(spread(&results[0]) > spread(&results[1]));
    }
}

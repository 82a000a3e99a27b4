//! Integration tests for the boosted attrition model

mod common;

use employee_retention::explainability::{feature_grid, recursion_partial_dependence};
use employee_retention::feature_engineering::{FeatureBuilder, FeatureTable};
use employee_retention::preprocessing::Cleaner;
use employee_retention::training::{Criterion, GradientBoostingClassifier, GradientBoostingConfig};
use employee_retention::utils::{EmployeeLoader, ParallelConfig};
use employee_retention::RetentionError;

fn feature_table(n: usize, seed: u64) -> FeatureTable {
    let file = common::write_csv(&common::synthetic_rows(n, seed));
    let table = EmployeeLoader::new().load(file.path()).unwrap();
    FeatureBuilder::new()
        .build(&Cleaner::default().clean(&table))
        .unwrap()
}

fn config(n_estimators: usize) -> GradientBoostingConfig {
    GradientBoostingConfig {
        n_estimators,
        max_depth: 3,
        ..Default::default()
    }
}

#[test]
fn test_fit_on_features() {
    let features = feature_table(250, 4);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();

    let mut model = GradientBoostingClassifier::new(config(40));
    model.fit(&x, &y).unwrap();

    assert_eq!(model.n_trees(), 40);
    assert_eq!(model.feature_importances().len(), 5);

    let probs = model.predict_proba(&x).unwrap();
    assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));

    // Training deviance drops over the rounds
    let loss = model.train_loss();
    assert!(loss.last().unwrap() < loss.first().unwrap());
}

#[test]
fn test_fit_is_deterministic() {
    let features = feature_table(150, 8);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();

    let mut a = GradientBoostingClassifier::new(config(15));
    a.fit(&x, &y).unwrap();
    let mut b = GradientBoostingClassifier::new(config(15));
    b.fit(&x, &y).unwrap();

    assert_eq!(a.feature_importances(), b.feature_importances());
    assert_eq!(a.decision_function(&x).unwrap(), b.decision_function(&x).unwrap());
}

#[test]
fn test_subsampling_seeded() {
    let features = feature_table(150, 10);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();
    let sampled = GradientBoostingConfig {
        subsample: 0.7,
        colsample_bytree: 0.8,
        random_state: Some(7),
        ..config(15)
    };

    let mut a = GradientBoostingClassifier::new(sampled.clone());
    a.fit(&x, &y).unwrap();
    let mut b = GradientBoostingClassifier::new(sampled);
    b.fit(&x, &y).unwrap();

    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    assert_eq!(a.feature_importances().len(), 5);
}

#[test]
fn test_plain_mse_criterion() {
    let features = feature_table(120, 12);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();
    let mse = GradientBoostingConfig {
        criterion: Criterion::MSE,
        ..config(10)
    };

    let mut model = GradientBoostingClassifier::new(mse);
    model.fit(&x, &y).unwrap();
    assert!((model.feature_importances().iter().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn test_single_class_rejected() {
    let mut features = feature_table(60, 6);
    features.records.retain(|r| r.quit == 0);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();

    let mut model = GradientBoostingClassifier::new(config(5));
    assert!(matches!(model.fit(&x, &y), Err(RetentionError::DegenerateLabel(0))));
}

#[test]
fn test_partial_dependence_on_tenure() {
    let features = feature_table(200, 14);
    let x = features.feature_matrix().unwrap();
    let y = features.labels();
    let mut model = GradientBoostingClassifier::new(config(20));
    model.fit(&x, &y).unwrap();

    let names = FeatureTable::feature_names();
    let curves = recursion_partial_dependence(
        &model,
        &x,
        &[4],
        100,
        (0.05, 0.95),
        Some(names.as_slice()),
        &ParallelConfig::new().with_threads(2),
    )
    .unwrap();

    let grid = feature_grid(x.column(4), 100, (0.05, 0.95)).unwrap();
    assert_eq!(curves.len(), 1);
    assert_eq!(curves[0].feature_name.as_deref(), Some("tenure"));
    assert_eq!(curves[0].grid_values, grid);
    assert!(curves[0].average_predictions.iter().all(|v| v.is_finite()));
}

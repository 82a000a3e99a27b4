use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use employee_retention::training::{GradientBoostingClassifier, GradientBoostingConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Five columns shaped like the employee features
fn create_employee_matrix(n_rows: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut x = Array2::zeros((n_rows, 5));
    let mut y = Array1::zeros(n_rows);

    for i in 0..n_rows {
        let salary = rng.gen_range(4.0..30.0);
        let tenure = rng.gen_range(0.0..1800.0);
        x[[i, 0]] = rng.gen_range(1..=12) as f64;
        x[[i, 1]] = rng.gen_range(0..6) as f64;
        x[[i, 2]] = rng.gen_range(1..30) as f64;
        x[[i, 3]] = salary;
        x[[i, 4]] = tenure;
        let p = if salary < 12.0 || (330.0..420.0).contains(&tenure) { 0.7 } else { 0.35 };
        y[i] = if rng.gen_bool(p) { 1.0 } else { 0.0 };
    }
    (x, y)
}

fn bench_boosting_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("boosting_fit");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000, 10000].iter() {
        let (x, y) = create_employee_matrix(*n_rows);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let config = GradientBoostingConfig {
                    n_estimators: 50,
                    ..Default::default()
                };
                let mut model = GradientBoostingClassifier::new(config);
                model.fit(black_box(x), black_box(y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

fn bench_partial_dependence(c: &mut Criterion) {
    let (x, y) = create_employee_matrix(5000);
    let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
        n_estimators: 100,
        ..Default::default()
    });
    model.fit(&x, &y).unwrap();
    let grid: Vec<f64> = (0..100).map(|i| i as f64 * 18.0).collect();

    c.bench_function("partial_dependence_recursion", |b| {
        b.iter(|| model.partial_dependence_recursion(black_box(4), black_box(&grid)).unwrap())
    });
}

criterion_group!(benches, bench_boosting_fit, bench_partial_dependence);
criterion_main!(benches);

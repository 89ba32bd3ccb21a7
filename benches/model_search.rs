//! Benchmarks for likelihood evaluation, single fits and the candidate search.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sarima_engine::core::Series;
use sarima_engine::models::arima::{
    arma_likelihood, ModelSearch, SarimaEstimator, SarimaOrder, SearchConfig,
};

fn generate_seasonal(n: usize, period: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let step = Normal::new(0.0, 0.3).unwrap();
    let noise = Normal::new(0.0, 0.3).unwrap();
    let mut level = 300.0_f64;
    (0..n)
        .map(|i| {
            level += step.sample(&mut rng);
            level
                + 20.0 * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
                + noise.sample(&mut rng)
        })
        .collect()
}

fn bench_likelihood(c: &mut Criterion) {
    let mut group = c.benchmark_group("arma_likelihood");
    let w: Vec<f64> = generate_seasonal(2048, 7)
        .windows(2)
        .map(|p| p[1] - p[0])
        .collect();

    for size in [256, 512, 1024, 2047].iter() {
        group.bench_with_input(BenchmarkId::new("arma(1,1)", size), size, |b, &n| {
            b.iter(|| arma_likelihood(black_box(&w[..n]), &[0.5], &[0.3]))
        });
        group.bench_with_input(BenchmarkId::new("seasonal_ma", size), size, |b, &n| {
            let mut theta = vec![0.0; 8];
            theta[0] = -0.4;
            theta[6] = -0.6;
            theta[7] = 0.24;
            b.iter(|| arma_likelihood(black_box(&w[..n]), &[], &theta))
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let series = Arc::new(Series::new(generate_seasonal(321, 7)).unwrap());
    let estimator = SarimaEstimator::default();

    c.bench_function("fit_sarima_011_011_7", |b| {
        let order = SarimaOrder::seasonal((0, 1, 1), (0, 1, 1, 7));
        b.iter(|| estimator.fit(black_box(&series), &order))
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_search");
    group.sample_size(10);
    let series = Arc::new(Series::new(generate_seasonal(321, 7)).unwrap());
    let candidates = vec![
        SarimaOrder::seasonal((1, 1, 1), (1, 1, 1, 7)),
        SarimaOrder::seasonal((1, 1, 1), (0, 1, 2, 7)),
        SarimaOrder::seasonal((0, 1, 1), (0, 1, 1, 7)),
        SarimaOrder::seasonal((1, 1, 0), (1, 1, 0, 7)),
    ];

    group.bench_function("parallel", |b| {
        let search = ModelSearch::default();
        b.iter(|| search.run(black_box(&series), &candidates))
    });
    group.bench_function("sequential", |b| {
        let search = ModelSearch::new(SearchConfig::default().sequential());
        b.iter(|| search.run(black_box(&series), &candidates))
    });
    group.finish();
}

criterion_group!(benches, bench_likelihood, bench_fit, bench_search);
criterion_main!(benches);

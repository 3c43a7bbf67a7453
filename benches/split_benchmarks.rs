//! Split and scoring benchmarks
//!
//! Measures split cost per method as the dataset grows, plus metric and
//! multi-seed group scoring throughput.
//!
//! Run with: cargo bench --bench split_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tdc_bench::benchmark::{Benchmark, BenchmarkGroup, GroupConfig, ResubmissionPolicy, SeedPredictions};
use tdc_bench::dataset::{Dataset, Label, Record};
use tdc_bench::keyer::ColumnKeyer;
use tdc_bench::metric::{MetricEvaluator, MetricName};
use tdc_bench::split::{SplitEngine, SplitPolicy};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

/// Drug-target pairs, roughly 20 records per scaffold.
#[allow(clippy::cast_precision_loss)]
fn dataset(n: usize) -> Dataset {
    let records = (0..n)
        .map(|i| {
            Record::builder(format!("r{i}"), Label::Scalar(i as f64))
                .field("Drug", format!("D{}", i / 20))
                .field("Target", format!("T{}", i % 97))
                .build()
        })
        .collect();
    Dataset::new("bench", records).unwrap()
}

/// Benchmark each split method across dataset sizes
fn bench_split_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let keyer = ColumnKeyer::new("Drug");
    let engine = SplitEngine::with_keyer(&keyer);
    let fractions = [0.7, 0.1, 0.2];

    for size in SIZES {
        let data = dataset(size);
        let policies = [
            ("random", SplitPolicy::random(fractions, 1).unwrap()),
            ("scaffold", SplitPolicy::scaffold(fractions, 1).unwrap()),
            ("cold_split", SplitPolicy::cold_split(["Target"], fractions, 1).unwrap()),
            (
                "combination",
                SplitPolicy::combination(["Drug", "Target"], fractions, 1).unwrap(),
            ),
        ];
        for (name, policy) in &policies {
            group.bench_with_input(BenchmarkId::new(*name, size), &data, |b, data| {
                b.iter(|| engine.split(black_box(data), policy).unwrap());
            });
        }
    }

    group.finish();
}

/// Benchmark the rank-based metrics on large prediction vectors
#[allow(clippy::cast_precision_loss)]
fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metric");
    let n = 100_000;
    let truth: Vec<Label> = (0..n).map(|i| Label::Scalar((i % 2) as f64)).collect();
    let scores: Vec<Label> = (0..n)
        .map(|i| Label::Scalar(((i * 7919) % n) as f64 / n as f64))
        .collect();

    for name in [MetricName::RocAuc, MetricName::PrAuc, MetricName::Spearman, MetricName::Mae] {
        let evaluator = MetricEvaluator::from_name(name);
        group.bench_function(name.as_str(), |b| {
            b.iter(|| evaluator.evaluate(black_box(&truth), black_box(&scores)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark a five-seed group evaluation (scored fresh each iteration)
fn bench_group_evaluation(c: &mut Criterion) {
    let keyer = ColumnKeyer::new("Drug");
    let policy = SplitPolicy::scaffold([0.7, 0.1, 0.2], 1).unwrap();
    let benchmark =
        Benchmark::from_dataset("bench", MetricName::Mae, &dataset(10_000), &policy, Some(&keyer))
            .unwrap();
    let test_len = benchmark.test().len();
    let config = GroupConfig::default().with_resubmission(ResubmissionPolicy::Append);

    c.bench_function("evaluate_many_5_seeds", |b| {
        b.iter_batched(
            || {
                let group = BenchmarkGroup::builder("bench")
                    .benchmark(benchmark.clone())
                    .config(config.clone())
                    .build()
                    .unwrap();
                let submissions: Vec<SeedPredictions> = (0..5)
                    .map(|_| SeedPredictions::new().insert("bench", vec![0.5; test_len]))
                    .collect();
                (group, submissions)
            },
            |(group, submissions)| group.evaluate_many(&submissions).unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_split_methods, bench_metrics, bench_group_evaluation);
criterion_main!(benches);

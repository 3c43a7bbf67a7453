//! ADMET Benchmark Group Walkthrough
//!
//! Builds a two-benchmark group from synthetic data, trains nothing, and
//! scores two "models" over five seeds:
//!
//! 1. Scaffold split of a regression dataset into train_val/test
//! 2. Per-seed train/valid resplits
//! 3. Multi-seed evaluation and leaderboard ranking
//!
//! Run with: RUST_LOG=tdc_bench=debug cargo run --example admet_group

use anyhow::{Context, Result};
use std::sync::Arc;
use tdc_bench::benchmark::{Benchmark, BenchmarkGroup, GroupConfig, SeedPredictions, DEFAULT_SEEDS};
use tdc_bench::dataset::{Dataset, Label, Record};
use tdc_bench::keyer::{EntityKeyer, ScaffoldKeyer};
use tdc_bench::leaderboard::Leaderboard;
use tdc_bench::metric::MetricName;
use tdc_bench::split::SplitPolicy;
use tracing_subscriber::EnvFilter;

/// Stand-in for scaffold extraction: the ring system is the part before ':'.
fn toy_scaffold(smiles: &str) -> Option<String> {
    smiles.split_once(':').map(|(core, _)| core.to_string())
}

fn synthetic(name: &str, n: u32, classify: bool) -> Result<Dataset> {
    let records = (0..n)
        .map(|i| {
            let y = f64::from(i % 11) / 10.0;
            let label = if classify { Label::Scalar(f64::from(u8::from(y > 0.5))) } else { Label::Scalar(y) };
            Record::builder(format!("{name}-{i}"), label)
                .field("Drug", format!("ring{}:sub{i}", i % 17))
                .build()
        })
        .collect();
    Ok(Dataset::new(name, records)?)
}

/// A "model" that knows the generating rule, plus noise scaled by `skill`.
fn predict(group: &BenchmarkGroup, seed: u64, skill: f64) -> Result<SeedPredictions> {
    let mut submission = SeedPredictions::for_seed(seed);
    for name in group.dataset_names() {
        let view = group.get(name)?;
        let predictions: Vec<f64> = view
            .test
            .iter()
            .map(|input| {
                let index: u32 = input
                    .id()
                    .rsplit('-')
                    .next()
                    .and_then(|i| i.parse().ok())
                    .unwrap_or_default();
                let y = f64::from(index % 11) / 10.0;
                let wobble = f64::from((index + u32::try_from(seed).unwrap_or(0)) % 3) - 1.0;
                (y + wobble * skill * 0.1).clamp(0.0, 1.0)
            })
            .collect();
        submission = submission.insert(name, predictions);
    }
    Ok(submission)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let keyer: Arc<dyn EntityKeyer> = Arc::new(ScaffoldKeyer::new("Drug", toy_scaffold));
    let policy = SplitPolicy::scaffold([0.7, 0.1, 0.2], 42)?;

    let caco2 = Benchmark::from_dataset(
        "caco2_wang",
        MetricName::Mae,
        &synthetic("caco2", 900, false)?,
        &policy,
        Some(keyer.as_ref()),
    )?;
    let hia = Benchmark::from_dataset(
        "hia_hou",
        MetricName::RocAuc,
        &synthetic("hia", 600, true)?,
        &policy,
        Some(keyer.as_ref()),
    )?;

    println!("📦 Benchmarks");
    for benchmark in [&caco2, &hia] {
        println!(
            "  • {}: {} train_val, {} sealed test, metric {}",
            benchmark.name(),
            benchmark.train_val().len(),
            benchmark.test().len(),
            benchmark.metric()
        );
    }
    println!();

    let mut board = Leaderboard::new();
    for (participant, skill) in [("baseline", 3.0), ("gnn", 1.0)] {
        let group = BenchmarkGroup::builder("admet_group")
            .benchmark(caco2.clone())
            .benchmark(hia.clone())
            .config(GroupConfig::default())
            .keyer(Arc::clone(&keyer))
            .build()?;

        let split = group
            .get_train_valid_split("caco2_wang", DEFAULT_SEEDS[0])
            .context("resplit caco2_wang")?;
        println!(
            "🔀 {participant}: seed {} resplit → {} train / {} valid",
            DEFAULT_SEEDS[0],
            split.train.len(),
            split.valid.len()
        );

        let submissions = DEFAULT_SEEDS
            .iter()
            .map(|seed| predict(&group, *seed, skill))
            .collect::<Result<Vec<_>>>()?;
        let evaluation = group.evaluate_many(&submissions)?;
        for (name, [mean, std]) in evaluation.summary() {
            println!("  • {name}: {mean:.3} ± {std:.3}");
        }
        for (name, error) in &evaluation.failures {
            println!("  ⚠️  {name}: {error}");
        }
        board.submit(participant, &evaluation);
    }
    println!();

    for benchmark in ["caco2_wang", "hia_hou"] {
        println!("{}", board.to_markdown(benchmark));
    }
    println!("🏆 Average rank");
    for (participant, rank) in board.average_rank() {
        println!("  • {participant}: {rank:.1}");
    }

    Ok(())
}

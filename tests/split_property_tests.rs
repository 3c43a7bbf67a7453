//! Property-based tests for the split engine
//!
//! - Partitions are disjoint and, with exclusions and discards, cover the dataset
//! - No entity key (or cold value) spans two partitions
//! - Same (dataset, policy, seed) gives the same partition
//! - Run with ProptestConfig::with_cases(64)

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use tdc_bench::dataset::{Dataset, Label, Record};
use tdc_bench::keyer::ColumnKeyer;
use tdc_bench::split::{SplitEngine, SplitLabel, SplitOutcome, SplitPolicy};

// ============================================================================
// Strategies
// ============================================================================

/// Records with a scaffold drawn from a small pool so groups form.
fn arb_dataset(max_records: usize, scaffolds: usize) -> impl Strategy<Value = Dataset> {
    proptest::collection::vec((0..scaffolds, 0..scaffolds), 1..max_records).prop_map(|keys| {
        let records = keys
            .into_iter()
            .enumerate()
            .map(|(i, (drug, target))| {
                Record::builder(format!("r{i}"), Label::Scalar(0.0))
                    .field("Scaffold", format!("S{drug}"))
                    .field("Drug", format!("D{drug}"))
                    .field("Target", format!("T{target}"))
                    .build()
            })
            .collect();
        Dataset::new("prop", records).unwrap()
    })
}

/// Valid train/valid/test fractions with a positive train share.
fn arb_fractions() -> impl Strategy<Value = [f64; 3]> {
    (1u32..=8, 0u32..=3).prop_map(|(train, valid)| {
        let train = f64::from(train) / 10.0;
        let valid = f64::from(valid.min(9 - (train * 10.0) as u32)) / 10.0;
        [train, valid, 1.0 - train - valid]
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn labels_by_id(outcome: &SplitOutcome) -> HashMap<&str, SplitLabel> {
    outcome.partition().iter().map(|(label, id)| (id, label)).collect()
}

fn assert_disjoint_cover(dataset: &Dataset, outcome: &SplitOutcome) {
    let labels = labels_by_id(outcome);
    assert_eq!(labels.len(), outcome.partition().len(), "an id appears twice");

    let mut covered: HashSet<&str> = labels.keys().copied().collect();
    for excluded in outcome.excluded() {
        assert!(covered.insert(excluded.record_id.as_str()));
    }
    for discarded in outcome.discarded() {
        assert!(covered.insert(discarded.as_str()));
    }
    assert_eq!(covered.len(), dataset.len());
}

fn assert_no_leakage(dataset: &Dataset, outcome: &SplitOutcome, column: &str) {
    let mut seen: HashMap<&str, SplitLabel> = HashMap::new();
    for (id, label) in labels_by_id(outcome) {
        let value = dataset.get(id).and_then(|r| r.field(column)).unwrap();
        let first = *seen.entry(value).or_insert(label);
        assert_eq!(first, label, "{column} value {value} in {first} and {label}");
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: random split covers every record exactly once
    #[test]
    fn prop_random_disjoint_cover(dataset in arb_dataset(200, 10), fractions in arb_fractions(), seed in any::<u64>()) {
        let policy = SplitPolicy::random(fractions, seed).unwrap();
        let outcome = SplitEngine::new().split(&dataset, &policy).unwrap();
        assert_disjoint_cover(&dataset, &outcome);
        prop_assert!(outcome.excluded().is_empty());
    }

    /// Property: scaffold split never puts one scaffold in two partitions
    #[test]
    fn prop_scaffold_zero_leakage(dataset in arb_dataset(200, 15), fractions in arb_fractions(), seed in any::<u64>()) {
        let keyer = ColumnKeyer::new("Scaffold");
        let policy = SplitPolicy::scaffold(fractions, seed).unwrap();
        let outcome = SplitEngine::with_keyer(&keyer).split(&dataset, &policy).unwrap();
        assert_disjoint_cover(&dataset, &outcome);
        assert_no_leakage(&dataset, &outcome, "Scaffold");
    }

    /// Property: cold split never puts one cold value in two partitions
    #[test]
    fn prop_cold_split_zero_leakage(dataset in arb_dataset(200, 20), seed in any::<u64>()) {
        let policy = SplitPolicy::cold_split(["Drug"], [0.7, 0.1, 0.2], seed).unwrap();
        match SplitEngine::new().split(&dataset, &policy) {
            Ok(outcome) => {
                assert_disjoint_cover(&dataset, &outcome);
                assert_no_leakage(&dataset, &outcome, "Drug");
            }
            Err(tdc_bench::Error::InsufficientDiversity { distinct, required, .. }) => {
                prop_assert!(distinct < required);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Property: combination split keeps both entity types novel in test
    #[test]
    fn prop_combination_joint_novelty(dataset in arb_dataset(200, 12), seed in any::<u64>()) {
        let policy = SplitPolicy::combination(["Drug", "Target"], [0.7, 0.1, 0.2], seed).unwrap();
        if let Ok(outcome) = SplitEngine::new().split(&dataset, &policy) {
            assert_disjoint_cover(&dataset, &outcome);
            assert_no_leakage(&dataset, &outcome, "Drug");
            assert_no_leakage(&dataset, &outcome, "Target");
        }
    }

    /// Property: identical inputs give identical partitions
    #[test]
    fn prop_split_is_deterministic(dataset in arb_dataset(150, 8), fractions in arb_fractions(), seed in any::<u64>()) {
        let keyer = ColumnKeyer::new("Scaffold");
        let engine = SplitEngine::with_keyer(&keyer);
        for policy in [
            SplitPolicy::random(fractions, seed).unwrap(),
            SplitPolicy::scaffold(fractions, seed).unwrap(),
        ] {
            let first = engine.split(&dataset, &policy).unwrap();
            let second = engine.split(&dataset, &policy).unwrap();
            prop_assert_eq!(first.partition(), second.partition());
        }
    }

    /// Property: random split does not depend on record load order
    #[test]
    fn prop_random_ignores_load_order(dataset in arb_dataset(100, 5), seed in any::<u64>()) {
        let mut reversed = dataset.records().to_vec();
        reversed.reverse();
        let reversed = Dataset::new("prop", reversed).unwrap();
        let policy = SplitPolicy::random([0.7, 0.1, 0.2], seed).unwrap();
        let a = SplitEngine::new().split(&dataset, &policy).unwrap();
        let b = SplitEngine::new().split(&reversed, &policy).unwrap();
        prop_assert_eq!(labels_by_id(&a), labels_by_id(&b));
    }

    /// Property: fractions outside tolerance are rejected before splitting
    #[test]
    fn prop_bad_fraction_sum_rejected(excess in 0.001f64..0.5) {
        prop_assert!(SplitPolicy::random([0.7 + excess, 0.1, 0.2], 1).is_err());
    }
}

// ============================================================================
// Fraction fidelity
// ============================================================================

fn singletons(n: usize) -> Dataset {
    let records = (0..n)
        .map(|i| {
            Record::builder(format!("mol{i}"), Label::Scalar(0.0))
                .field("Scaffold", format!("unique{i}"))
                .field("Drug", format!("drug{i}"))
                .build()
        })
        .collect();
    Dataset::new("singletons", records).unwrap()
}

#[test]
fn test_fraction_fidelity_on_singleton_groups() {
    let dataset = singletons(1000);
    let keyer = ColumnKeyer::new("Scaffold");
    let engine = SplitEngine::with_keyer(&keyer);
    let target = [0.7, 0.1, 0.2];
    for policy in [
        SplitPolicy::random(target, 5).unwrap(),
        SplitPolicy::scaffold(target, 5).unwrap(),
        SplitPolicy::cold_split(["Drug"], target, 5).unwrap(),
    ] {
        let realized = engine.split(&dataset, &policy).unwrap().realized().as_array();
        for (got, want) in realized.iter().zip(target) {
            assert!((got - want).abs() <= 0.02, "{policy}: {realized:?}");
        }
    }
}

#[test]
fn test_scaffold_seed_only_breaks_ties() {
    // Distinct group sizes leave nothing for the seed to decide.
    let mut records = Vec::new();
    for (key, size) in [("A", 1usize), ("B", 2), ("C", 3), ("D", 4), ("E", 10)] {
        for i in 0..size {
            records.push(
                Record::builder(format!("{key}{i}"), Label::Scalar(0.0))
                    .field("Scaffold", key)
                    .build(),
            );
        }
    }
    let dataset = Dataset::new("sizes", records).unwrap();
    let keyer = ColumnKeyer::new("Scaffold");
    let engine = SplitEngine::with_keyer(&keyer);
    let a = engine
        .split(&dataset, &SplitPolicy::scaffold([0.6, 0.2, 0.2], 1).unwrap())
        .unwrap();
    let b = engine
        .split(&dataset, &SplitPolicy::scaffold([0.6, 0.2, 0.2], 99).unwrap())
        .unwrap();
    assert_eq!(labels_by_id(&a), labels_by_id(&b));
}

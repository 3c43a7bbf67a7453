//! End-to-end split scenarios on small hand-built datasets

use std::collections::HashSet;
use tdc_bench::dataset::{Dataset, Label, PairedDataset, Record, SplitSeed};
use tdc_bench::keyer::{ColumnKeyer, ScaffoldKeyer};
use tdc_bench::split::{SplitEngine, SplitMethod, SplitPolicy, SplitRequest};
use tdc_bench::Error;

fn keyed(keys: &[&str]) -> Dataset {
    let records = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            Record::builder(format!("r{i}"), Label::Scalar(0.0))
                .field("Scaffold", *key)
                .build()
        })
        .collect();
    Dataset::new("scenario", records).unwrap()
}

fn scaffolds_of<'a>(dataset: &'a Dataset, ids: &[String]) -> HashSet<&'a str> {
    ids.iter()
        .filter_map(|id| dataset.get(id).and_then(|r| r.field("Scaffold")))
        .collect()
}

#[test]
fn test_scaffold_scenario_largest_group_to_train() {
    let dataset = keyed(&["A", "A", "A", "B", "B", "C", "C", "C", "C", "C"]);
    let keyer = ColumnKeyer::new("Scaffold");
    let policy = SplitPolicy::scaffold([0.6, 0.0, 0.4], 1).unwrap();
    let outcome = SplitEngine::with_keyer(&keyer).split(&dataset, &policy).unwrap();
    let partition = outcome.partition();

    // C(5) ties on deficit and goes to train; A(3) then B(2) go to test.
    assert_eq!(partition.train().len(), 5);
    assert_eq!(scaffolds_of(&dataset, partition.train()), HashSet::from(["C"]));
    assert_eq!(scaffolds_of(&dataset, partition.test()), HashSet::from(["A", "B"]));
    assert!(partition.valid().is_none());
    assert_eq!(outcome.realized().as_array(), [0.5, 0.0, 0.5]);

    let data = outcome.materialize(&dataset).unwrap();
    assert!(data.valid.is_none());
    assert_eq!(data.test.len(), 5);
}

#[test]
fn test_scaffold_scenario_is_reproducible_across_seeds() {
    let dataset = keyed(&["A", "A", "A", "B", "B", "C", "C", "C", "C", "C"]);
    let keyer = ColumnKeyer::new("Scaffold");
    let engine = SplitEngine::with_keyer(&keyer);
    let first = engine
        .split(&dataset, &SplitPolicy::scaffold([0.6, 0.0, 0.4], 1).unwrap())
        .unwrap();
    let second = engine
        .split(&dataset, &SplitPolicy::scaffold([0.6, 0.0, 0.4], 1).unwrap())
        .unwrap();
    assert_eq!(first.partition(), second.partition());
}

#[test]
fn test_unparseable_structures_are_excluded_and_reported() {
    let mut keys = vec!["ring.a", "ring.b", "chain.a", "chain.b", "bicycle.a"];
    keys.extend(["!bad", "!worse"]);
    let records = keys
        .iter()
        .enumerate()
        .map(|(i, smiles)| {
            Record::builder(format!("m{i}"), Label::Class(1))
                .field("Drug", *smiles)
                .build()
        })
        .collect();
    let dataset = Dataset::new("scaffold", records).unwrap();
    let keyer = ScaffoldKeyer::new("Drug", |s: &str| {
        (!s.starts_with('!')).then(|| s.split('.').next().unwrap_or_default().to_string())
    });
    let policy = SplitPolicy::scaffold([0.6, 0.2, 0.2], 3).unwrap();
    let outcome = SplitEngine::with_keyer(&keyer).split(&dataset, &policy).unwrap();

    let excluded: Vec<&str> = outcome.excluded().iter().map(|e| e.record_id.as_str()).collect();
    assert_eq!(excluded, vec!["m5", "m6"]);
    assert_eq!(outcome.partition().len(), 5);
}

#[test]
fn test_scaffold_without_keyer_is_invalid_policy() {
    let dataset = keyed(&["A", "B", "C"]);
    let policy = SplitPolicy::scaffold([0.6, 0.2, 0.2], 1).unwrap();
    let err = SplitEngine::new().split(&dataset, &policy).unwrap_err();
    assert!(matches!(err, Error::InvalidPolicy { .. }));
}

// ============================================================================
// Drug-target interaction
// ============================================================================

/// Every drug paired with every target, 8 × 6.
fn dti() -> Dataset {
    let mut records = Vec::new();
    for d in 0..8 {
        for t in 0..6 {
            records.push(
                Record::builder(format!("D{d}-T{t}"), Label::Scalar(f64::from(d * t)))
                    .field("Drug", format!("D{d}"))
                    .field("Target", format!("T{t}"))
                    .build(),
            );
        }
    }
    Dataset::new("dti", records).unwrap()
}

fn column_values<'a>(dataset: &'a Dataset, ids: &[String], column: &str) -> HashSet<&'a str> {
    ids.iter()
        .filter_map(|id| dataset.get(id).and_then(|r| r.field(column)))
        .collect()
}

#[test]
fn test_combination_split_joint_novelty() {
    let dataset = dti();
    let policy = SplitPolicy::combination(["Drug", "Target"], [0.7, 0.1, 0.2], 11).unwrap();
    let outcome = SplitEngine::new().split(&dataset, &policy).unwrap();
    let partition = outcome.partition();

    assert!(!partition.test().is_empty());
    for column in ["Drug", "Target"] {
        let train = column_values(&dataset, partition.train(), column);
        let test = column_values(&dataset, partition.test(), column);
        assert!(train.is_disjoint(&test), "{column} leaks into test");
    }

    // Pairs whose drug and target landed in different partitions are dropped.
    assert!(!outcome.discarded().is_empty());
    assert_eq!(
        partition.len() + outcome.discarded().len(),
        dataset.len()
    );
    assert!(outcome.realized().train < 0.7);
}

#[test]
fn test_cold_split_insufficient_diversity() {
    let records = (0..20)
        .map(|i| {
            Record::builder(format!("r{i}"), Label::Scalar(0.0))
                .field("Drug", format!("D{i}"))
                .field("Target", if i % 2 == 0 { "T0" } else { "T1" })
                .build()
        })
        .collect();
    let dataset = Dataset::new("narrow", records).unwrap();
    let policy = SplitPolicy::cold_split(["Target"], [0.7, 0.1, 0.2], 5).unwrap();
    let err = SplitEngine::new().split(&dataset, &policy).unwrap_err();
    match err {
        Error::InsufficientDiversity {
            column,
            distinct,
            required,
            seed,
        } => {
            assert_eq!(column, "Target");
            assert_eq!((distinct, required, seed), (2, 3, 5));
        }
        other => panic!("expected InsufficientDiversity, got {other:?}"),
    }

    // A two-way split only needs two values.
    let two_way = SplitPolicy::cold_split(["Target"], [0.5, 0.0, 0.5], 5).unwrap();
    assert!(SplitEngine::new().split(&dataset, &two_way).is_ok());
}

#[test]
fn test_split_request_from_json() {
    let request = SplitRequest::from_json(
        r#"{"method": "cold_split", "seed": 4, "fractions": [0.8, 0.0, 0.2], "cold_columns": ["Drug"]}"#,
    )
    .unwrap();
    let policy = SplitPolicy::try_from(request).unwrap();
    assert_eq!(policy.method(), SplitMethod::ColdSplit);
    assert!(!policy.has_valid());

    let outcome = SplitEngine::new().split(&dti(), &policy).unwrap();
    let drugs_in_test = column_values(&dti(), outcome.partition().test(), "Drug").len();
    assert!(drugs_in_test >= 1);

    let bad = SplitRequest::from_json(r#"{"method": "random", "seed": 1, "fractions": [0.5, 0.5, 0.5]}"#)
        .unwrap();
    assert!(matches!(
        SplitPolicy::try_from(bad),
        Err(Error::InvalidPolicy { .. })
    ));
}

#[test]
fn test_paired_dataset_random_split() {
    let inputs = (0..40).map(|i| format!("reactants{i}")).collect();
    let outputs = (0..40).map(|i| format!("product{i}")).collect();
    let paired = PairedDataset::new("reaction", "input", "output", inputs, outputs).unwrap();

    let split = paired
        .get_split(SplitMethod::Random, SplitSeed::Benchmark, Some([0.5, 0.25, 0.25]))
        .unwrap();
    assert_eq!(split.train.len(), 20);
    assert_eq!(split.valid.as_ref().map(Dataset::len), Some(10));
    assert_eq!(split.test.len(), 10);

    // Inputs stay attached to their outputs after the split.
    for record in &split.test {
        let input = record.field("input").unwrap();
        let output = record.field("output").unwrap();
        assert_eq!(input.trim_start_matches("reactants"), output.trim_start_matches("product"));
    }
}

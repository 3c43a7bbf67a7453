//! Leakage-aware dataset splitting
//!
//! ## Methods
//!
//! ```text
//! random       seeded permutation, sizes rounded from the fractions
//! scaffold     group by EntityKey, largest groups first, greedy by deficit
//! cold_split   group by the value of the cold column(s), same greedy rule
//! combination  cold split per column, keep records all columns agree on
//! ```
//!
//! Group-aware methods never let one key (or cold value) appear in two
//! partitions. Records whose key cannot be derived are excluded and reported
//! on the [`SplitOutcome`]; combination splits also report discarded records.
//! Partitions, exclusions and discards together cover the whole dataset.
//!
//! ## Usage
//!
//! ```rust
//! use tdc_bench::dataset::{Dataset, Label, Record};
//! use tdc_bench::split::{SplitEngine, SplitPolicy};
//!
//! let records = (0..100)
//!     .map(|i| Record::builder(format!("r{i}"), Label::Scalar(f64::from(i))).build())
//!     .collect();
//! let dataset = Dataset::new("toy", records)?;
//!
//! let policy = SplitPolicy::random([0.7, 0.1, 0.2], 1)?;
//! let outcome = SplitEngine::new().split(&dataset, &policy)?;
//! assert_eq!(outcome.partition().train().len(), 70);
//! assert_eq!(outcome.partition().test().len(), 20);
//! # Ok::<(), tdc_bench::Error>(())
//! ```

mod combination;
mod grouped;
mod policy;
mod random;

pub use policy::{
    SplitMethod, SplitPolicy, SplitPolicyBuilder, SplitRequest, DEFAULT_FRACTIONS,
    FRACTION_TOLERANCE,
};

use crate::dataset::{Dataset, RecordId};
use crate::error::KeyDerivationError;
use crate::keyer::{ColumnKeyer, EntityKeyer};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitLabel {
    /// Training partition
    Train,
    /// Validation partition
    Valid,
    /// Test partition
    Test,
}

impl SplitLabel {
    /// All labels in fraction order.
    pub const ALL: [Self; 3] = [Self::Train, Self::Valid, Self::Test];

    /// Partition name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers per partition while a split is being built.
#[derive(Debug, Default, Clone)]
pub(crate) struct Assignment {
    pub(crate) train: Vec<RecordId>,
    pub(crate) valid: Vec<RecordId>,
    pub(crate) test: Vec<RecordId>,
}

impl Assignment {
    pub(crate) fn push(&mut self, label: SplitLabel, id: RecordId) {
        match label {
            SplitLabel::Train => self.train.push(id),
            SplitLabel::Valid => self.valid.push(id),
            SplitLabel::Test => self.test.push(id),
        }
    }

    pub(crate) fn into_labels(self) -> impl Iterator<Item = (RecordId, SplitLabel)> {
        self.train
            .into_iter()
            .map(|id| (id, SplitLabel::Train))
            .chain(self.valid.into_iter().map(|id| (id, SplitLabel::Valid)))
            .chain(self.test.into_iter().map(|id| (id, SplitLabel::Test)))
    }

    fn into_partition(self, with_valid: bool) -> Partition {
        Partition {
            train: self.train,
            valid: with_valid.then_some(self.valid),
            test: self.test,
        }
    }
}

/// Disjoint identifier sets for train, valid (optional) and test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    train: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    valid: Option<Vec<RecordId>>,
    test: Vec<RecordId>,
}

impl Partition {
    /// Training identifiers.
    #[must_use]
    pub fn train(&self) -> &[RecordId] {
        &self.train
    }

    /// Validation identifiers, absent for a two-way split.
    #[must_use]
    pub fn valid(&self) -> Option<&[RecordId]> {
        self.valid.as_deref()
    }

    /// Test identifiers.
    #[must_use]
    pub fn test(&self) -> &[RecordId] {
        &self.test
    }

    /// Identifiers of one partition.
    #[must_use]
    pub fn get(&self, label: SplitLabel) -> Option<&[RecordId]> {
        match label {
            SplitLabel::Train => Some(&self.train),
            SplitLabel::Valid => self.valid(),
            SplitLabel::Test => Some(&self.test),
        }
    }

    /// Total number of assigned identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.train.len() + self.valid.as_ref().map_or(0, Vec::len) + self.test.len()
    }

    /// Check if nothing was assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(label, identifier)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SplitLabel, &str)> + '_ {
        SplitLabel::ALL.into_iter().flat_map(move |label| {
            self.get(label)
                .unwrap_or_default()
                .iter()
                .map(move |id| (label, id.as_str()))
        })
    }
}

/// Share of the input dataset that landed in each partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealizedFractions {
    /// Train share
    pub train: f64,
    /// Valid share
    pub valid: f64,
    /// Test share
    pub test: f64,
}

impl RealizedFractions {
    #[allow(clippy::cast_precision_loss)]
    fn of(partition: &Partition, total: usize) -> Self {
        if total == 0 {
            return Self {
                train: 0.0,
                valid: 0.0,
                test: 0.0,
            };
        }
        let share = |n: usize| n as f64 / total as f64;
        Self {
            train: share(partition.train.len()),
            valid: share(partition.valid.as_ref().map_or(0, Vec::len)),
            test: share(partition.test.len()),
        }
    }

    /// Fractions as a `[train, valid, test]` triple.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.train, self.valid, self.test]
    }
}

/// Partition plus everything needed to audit it.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    policy: SplitPolicy,
    partition: Partition,
    excluded: Vec<KeyDerivationError>,
    discarded: Vec<RecordId>,
    realized: RealizedFractions,
}

impl SplitOutcome {
    /// Policy that produced this outcome.
    #[must_use]
    pub const fn policy(&self) -> &SplitPolicy {
        &self.policy
    }

    /// The partition.
    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Records left out because their entity key could not be derived.
    #[must_use]
    pub fn excluded(&self) -> &[KeyDerivationError] {
        &self.excluded
    }

    /// Records dropped because per-column cold splits disagreed.
    #[must_use]
    pub fn discarded(&self) -> &[RecordId] {
        &self.discarded
    }

    /// Realized fractions relative to the full input dataset.
    #[must_use]
    pub const fn realized(&self) -> RealizedFractions {
        self.realized
    }

    /// Consume the outcome, keeping the partition.
    #[must_use]
    pub fn into_partition(self) -> Partition {
        self.partition
    }

    /// Resolve identifiers back to records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `dataset` is not the dataset that was
    /// split.
    pub fn materialize(&self, dataset: &Dataset) -> Result<SplitData> {
        let name = dataset.name();
        Ok(SplitData {
            train: dataset.subset(format!("{name}/train"), self.partition.train.as_slice())?,
            valid: self
                .partition
                .valid
                .as_ref()
                .map(|ids| dataset.subset(format!("{name}/valid"), ids.as_slice()))
                .transpose()?,
            test: dataset.subset(format!("{name}/test"), self.partition.test.as_slice())?,
        })
    }
}

/// Split result as records.
#[derive(Debug, Clone)]
pub struct SplitData {
    /// Training records
    pub train: Dataset,
    /// Validation records, absent for a two-way split
    pub valid: Option<Dataset>,
    /// Test records
    pub test: Dataset,
}

/// Stateless split engine.
///
/// Borrows an [`EntityKeyer`] for scaffold splits; random and cold splits do
/// not need one.
#[derive(Clone, Copy, Default)]
pub struct SplitEngine<'k> {
    keyer: Option<&'k dyn EntityKeyer>,
}

impl<'k> SplitEngine<'k> {
    /// Engine without an entity keyer.
    #[must_use]
    pub const fn new() -> Self {
        Self { keyer: None }
    }

    /// Engine using `keyer` for scaffold splits.
    #[must_use]
    pub const fn with_keyer(keyer: &'k dyn EntityKeyer) -> Self {
        Self { keyer: Some(keyer) }
    }

    /// Partition `dataset` according to `policy`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPolicy`] if the policy is malformed (checked before any
    ///   work) or a scaffold split has no keyer
    /// - [`Error::InsufficientDiversity`] if a cold column has too few distinct
    ///   values to fill every requested partition
    pub fn split(&self, dataset: &Dataset, policy: &SplitPolicy) -> Result<SplitOutcome> {
        policy.validate()?;
        let fractions = policy.fractions();
        let seed = policy.seed();

        let (assignment, excluded, discarded) = match policy.method() {
            SplitMethod::Random => (random::assign(dataset, fractions, seed), Vec::new(), Vec::new()),
            SplitMethod::Scaffold => {
                let keyer = self.keyer.ok_or_else(|| Error::InvalidPolicy {
                    policy: policy.to_string(),
                    reason: "scaffold split needs an entity keyer".to_string(),
                })?;
                let (groups, excluded) = grouped::group_records(dataset, |r| keyer.key(r));
                if groups.len() < fractions.iter().filter(|f| **f > 0.0).count() {
                    tracing::warn!(
                        keyer = %keyer.describe(),
                        groups = groups.len(),
                        "fewer scaffolds than partitions, some partitions stay empty"
                    );
                }
                let assignment = grouped::assign(grouped::order_groups(groups, seed), fractions);
                (assignment, excluded, Vec::new())
            }
            SplitMethod::ColdSplit => {
                let keyer = ColumnKeyer::with_columns(policy.cold_columns().iter().cloned());
                let (groups, excluded) = grouped::group_records(dataset, |r| keyer.key(r));
                grouped::check_diversity(
                    &groups,
                    fractions,
                    &policy.cold_columns().join(","),
                    seed,
                )?;
                let assignment = grouped::assign(grouped::order_groups(groups, seed), fractions);
                (assignment, excluded, Vec::new())
            }
            SplitMethod::Combination => {
                let result = combination::assign(dataset, policy.cold_columns(), fractions, seed)?;
                (result.assignment, result.excluded, result.discarded)
            }
        };

        if !excluded.is_empty() {
            tracing::warn!(
                policy = %policy,
                excluded = excluded.len(),
                first = %excluded[0],
                "records excluded from split: entity key not derivable"
            );
        }

        let partition = assignment.into_partition(policy.has_valid());
        let realized = RealizedFractions::of(&partition, dataset.len());
        tracing::info!(
            dataset = dataset.name(),
            method = %policy.method(),
            seed,
            train = partition.train.len(),
            valid = partition.valid.as_ref().map_or(0, Vec::len),
            test = partition.test.len(),
            excluded = excluded.len(),
            discarded = discarded.len(),
            "split complete"
        );

        Ok(SplitOutcome {
            policy: policy.clone(),
            partition,
            excluded,
            discarded,
            realized,
        })
    }
}

impl fmt::Debug for SplitEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitEngine")
            .field("keyer", &self.keyer.map(|keyer| keyer.describe()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, Record};
    use crate::keyer::ColumnKeyer;
    use std::collections::HashSet;

    fn scaffold_dataset(keys: &[&str]) -> Dataset {
        let records = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                Record::builder(format!("m{i}"), Label::Scalar(0.0))
                    .field("Scaffold", *key)
                    .build()
            })
            .collect();
        Dataset::new("scaffolds", records).unwrap()
    }

    #[test]
    fn test_random_split_is_deterministic() {
        let dataset = scaffold_dataset(&["a"; 50]);
        let policy = SplitPolicy::random([0.7, 0.1, 0.2], 3).unwrap();
        let first = SplitEngine::new().split(&dataset, &policy).unwrap();
        let second = SplitEngine::new().split(&dataset, &policy).unwrap();
        assert_eq!(first.partition(), second.partition());
        assert_eq!(first.partition().len(), 50);
    }

    #[test]
    fn test_random_split_seed_changes_partition() {
        let dataset = scaffold_dataset(&["a"; 50]);
        let a = SplitEngine::new()
            .split(&dataset, &SplitPolicy::random([0.7, 0.1, 0.2], 1).unwrap())
            .unwrap();
        let b = SplitEngine::new()
            .split(&dataset, &SplitPolicy::random([0.7, 0.1, 0.2], 2).unwrap())
            .unwrap();
        assert_ne!(a.partition(), b.partition());
    }

    #[test]
    fn test_scaffold_needs_keyer() {
        let dataset = scaffold_dataset(&["a", "b"]);
        let policy = SplitPolicy::scaffold([0.5, 0.0, 0.5], 1).unwrap();
        assert!(matches!(
            SplitEngine::new().split(&dataset, &policy),
            Err(Error::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn test_scaffold_excludes_underivable_keys() {
        let mut records: Vec<Record> = scaffold_dataset(&["a", "a", "b", "b"]).records().to_vec();
        records.push(Record::builder("broken", Label::Scalar(0.0)).build());
        let dataset = Dataset::new("with-broken", records).unwrap();
        let keyer = ColumnKeyer::new("Scaffold");
        let policy = SplitPolicy::scaffold([0.5, 0.0, 0.5], 1).unwrap();
        let outcome = SplitEngine::with_keyer(&keyer).split(&dataset, &policy).unwrap();

        assert_eq!(outcome.excluded().len(), 1);
        assert_eq!(outcome.excluded()[0].record_id, "broken");
        let assigned: HashSet<&str> = outcome.partition().iter().map(|(_, id)| id).collect();
        assert!(!assigned.contains("broken"));
        assert_eq!(assigned.len(), 4);
    }

    #[test]
    fn test_two_way_split_omits_valid() {
        let dataset = scaffold_dataset(&["a"; 10]);
        let policy = SplitPolicy::random([0.8, 0.0, 0.2], 1).unwrap();
        let outcome = SplitEngine::new().split(&dataset, &policy).unwrap();
        assert!(outcome.partition().valid().is_none());
        let data = outcome.materialize(&dataset).unwrap();
        assert!(data.valid.is_none());
        assert_eq!(data.train.len() + data.test.len(), 10);
        assert_eq!(data.test.name(), "scaffolds/test");
    }

    #[test]
    fn test_cold_split_insufficient_diversity() {
        let dataset = scaffold_dataset(&["a", "a", "b"]);
        let policy = SplitPolicy::cold_split(["Scaffold"], [0.7, 0.1, 0.2], 1).unwrap();
        let err = SplitEngine::new().split(&dataset, &policy).unwrap_err();
        assert!(matches!(err, Error::InsufficientDiversity { distinct: 2, required: 3, .. }));
    }

    #[test]
    fn test_realized_fractions_sum_to_one_without_losses() {
        let dataset = scaffold_dataset(&["a"; 40]);
        let policy = SplitPolicy::random([0.5, 0.25, 0.25], 11).unwrap();
        let realized = SplitEngine::new().split(&dataset, &policy).unwrap().realized();
        let sum: f64 = realized.as_array().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((realized.train - 0.5).abs() < 1e-12);
    }
}

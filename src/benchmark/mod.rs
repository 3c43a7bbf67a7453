//! Sealed benchmarks and multi-seed benchmark groups
//!
//! ## Lifecycle
//!
//! ```text
//! Benchmark ──seal──> SealedTestSet (labels private)
//!     │
//!     ├── get_train_valid_split(seed)   re-derive {train, valid}, idempotent
//!     └── evaluate(seed, predictions)   Sealed ──> Scored (ResultCache)
//! ```
//!
//! A [`BenchmarkGroup`] holds several benchmarks, the seeds a participant is
//! expected to submit for, and the result cache that enforces the group's
//! [`ResubmissionPolicy`].
//!
//! ## Usage
//!
//! ```rust
//! use tdc_bench::benchmark::{Benchmark, BenchmarkGroup, SeedPredictions};
//! use tdc_bench::dataset::{Dataset, Label, Record};
//! use tdc_bench::metric::MetricName;
//!
//! let record = |id: &str, y: f64| {
//!     Record::builder(id, Label::Scalar(y)).field("Drug", id).build()
//! };
//! let train_val = Dataset::new("caco2", (0..8).map(|i| record(&format!("a{i}"), 1.0)).collect())?;
//! let test = Dataset::new("caco2", vec![record("t0", 0.5), record("t1", 1.5)])?;
//! let benchmark = Benchmark::new("caco2", MetricName::Mae, train_val, &test)?;
//!
//! let group = BenchmarkGroup::builder("admet").benchmark(benchmark).build()?;
//! let submission = SeedPredictions::new().insert("caco2", vec![0.5, 1.5]);
//! let evaluation = group.evaluate_many(&[submission])?;
//! assert_eq!(evaluation.summary()["caco2"], [0.0, 0.0]);
//! # Ok::<(), tdc_bench::Error>(())
//! ```

mod cache;
mod group;
mod record;
mod sealed;

pub use cache::ResubmissionPolicy;
pub use group::{
    AggregateScore, BenchmarkGroup, BenchmarkGroupBuilder, BenchmarkView, GroupConfig,
    GroupEvaluation, SeedPredictions, DEFAULT_PRECISION, DEFAULT_SEEDS,
};
pub use record::{submission_digest, ScoreRecord, ScoreRecordBuilder};
pub use sealed::{Predictions, SealedTestSet};

use crate::dataset::{Dataset, RecordId};
use crate::error::KeyDerivationError;
use crate::keyer::EntityKeyer;
use crate::metric::MetricName;
use crate::split::{SplitEngine, SplitPolicy};
use crate::{Error, Result};

/// Fractions used to re-derive {train, valid} from train_val.
pub const DEFAULT_RESPLIT_FRACTIONS: [f64; 3] = [0.875, 0.125, 0.0];

/// Train/valid pair re-derived from a benchmark's train_val records.
///
/// `train`, `valid`, `excluded` and `discarded` together cover train_val.
#[derive(Debug, Clone)]
pub struct TrainValidSplit {
    /// Training records
    pub train: Dataset,
    /// Validation records
    pub valid: Dataset,
    /// Records whose entity key could not be derived
    pub excluded: Vec<KeyDerivationError>,
    /// Records dropped by a combination resplit
    pub discarded: Vec<RecordId>,
}

/// One benchmark: public train_val records, sealed test set and a metric.
#[derive(Debug, Clone)]
pub struct Benchmark {
    name: String,
    metric: MetricName,
    train_val: Dataset,
    test: SealedTestSet,
    resplit: SplitPolicy,
    excluded: Vec<KeyDerivationError>,
    discarded: Vec<RecordId>,
}

impl Benchmark {
    /// Create a benchmark from already separated train_val and test records.
    ///
    /// The test labels are sealed here. The default resplit policy is a
    /// scaffold split with [`DEFAULT_RESPLIT_FRACTIONS`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the test set is empty or shares a
    /// record identifier with train_val.
    pub fn new(
        name: impl Into<String>,
        metric: MetricName,
        train_val: Dataset,
        test: &Dataset,
    ) -> Result<Self> {
        let name = name.into();
        if test.is_empty() {
            return Err(Error::InvalidInput(format!(
                "benchmark '{name}' has an empty test set"
            )));
        }
        if let Some(shared) = test.iter().find(|record| train_val.contains(record.id())) {
            return Err(Error::InvalidInput(format!(
                "benchmark '{name}': record '{}' is in both train_val and test",
                shared.id()
            )));
        }
        let resplit = SplitPolicy::scaffold(DEFAULT_RESPLIT_FRACTIONS, 0)?;
        tracing::debug!(
            benchmark = %name,
            metric = %metric,
            train_val = train_val.len(),
            test = test.len(),
            "benchmark sealed"
        );
        Ok(Self {
            name,
            metric,
            train_val,
            test: SealedTestSet::seal(test),
            resplit,
            excluded: Vec::new(),
            discarded: Vec::new(),
        })
    }

    /// Split a full dataset with `policy` and seal its test partition.
    ///
    /// Train and valid partitions become train_val. The resplit policy keeps the
    /// method and cold columns of `policy` with [`DEFAULT_RESPLIT_FRACTIONS`].
    ///
    /// # Errors
    ///
    /// Propagates split errors, and fails like [`Benchmark::new`] if the
    /// policy leaves the test partition empty.
    ///
    /// Records the split could not place are kept on the benchmark, see
    /// [`Benchmark::excluded`] and [`Benchmark::discarded`].
    pub fn from_dataset(
        name: impl Into<String>,
        metric: MetricName,
        dataset: &Dataset,
        policy: &SplitPolicy,
        keyer: Option<&dyn EntityKeyer>,
    ) -> Result<Self> {
        let engine = keyer.map_or_else(SplitEngine::new, SplitEngine::with_keyer);
        let outcome = engine.split(dataset, policy)?;
        let partition = outcome.partition();
        let train_val_ids: Vec<&RecordId> = partition
            .train()
            .iter()
            .chain(partition.valid().unwrap_or_default())
            .collect();
        let train_val = dataset.subset(
            format!("{}/train_val", dataset.name()),
            train_val_ids.as_slice(),
        )?;
        let test = dataset.subset(format!("{}/test", dataset.name()), partition.test())?;

        let resplit = SplitPolicy::builder(policy.method())
            .fractions(DEFAULT_RESPLIT_FRACTIONS)
            .cold_columns(policy.cold_columns().iter().cloned())
            .build()?;
        let mut benchmark = Self::new(name, metric, train_val, &test)?.with_resplit_policy(resplit)?;
        benchmark.excluded = outcome.excluded().to_vec();
        benchmark.discarded = outcome.discarded().to_vec();
        Ok(benchmark)
    }

    /// Replace the policy used by [`Benchmark::train_valid_split`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the policy is malformed, has a
    /// non-zero test fraction or an empty valid fraction.
    pub fn with_resplit_policy(mut self, policy: SplitPolicy) -> Result<Self> {
        policy.validate()?;
        let [_, valid, test] = policy.fractions();
        if test != 0.0 || valid <= 0.0 {
            return Err(Error::InvalidPolicy {
                policy: policy.to_string(),
                reason: "a resplit policy divides train_val into train and valid only".to_string(),
            });
        }
        self.resplit = policy;
        Ok(self)
    }

    /// Benchmark name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metric the benchmark is scored with.
    #[must_use]
    pub const fn metric(&self) -> MetricName {
        self.metric
    }

    /// Labelled training pool.
    #[must_use]
    pub const fn train_val(&self) -> &Dataset {
        &self.train_val
    }

    /// Sealed test set.
    #[must_use]
    pub const fn test(&self) -> &SealedTestSet {
        &self.test
    }

    /// Records of the source dataset left out by [`Benchmark::from_dataset`]
    /// because their entity key could not be derived.
    #[must_use]
    pub fn excluded(&self) -> &[KeyDerivationError] {
        &self.excluded
    }

    /// Records of the source dataset dropped by a combination split in
    /// [`Benchmark::from_dataset`].
    #[must_use]
    pub fn discarded(&self) -> &[RecordId] {
        &self.discarded
    }

    /// Stored resplit policy (its seed is replaced per call).
    #[must_use]
    pub const fn resplit_policy(&self) -> &SplitPolicy {
        &self.resplit
    }

    /// Deterministically re-derive {train, valid} from train_val.
    ///
    /// # Errors
    ///
    /// Propagates split errors; a scaffold resplit needs `keyer`.
    pub fn train_valid_split(&self, seed: u64, keyer: Option<&dyn EntityKeyer>) -> Result<TrainValidSplit> {
        let policy = self.resplit.with_seed(seed);
        let engine = keyer.map_or_else(SplitEngine::new, SplitEngine::with_keyer);
        let outcome = engine.split(&self.train_val, &policy)?;
        let data = outcome.materialize(&self.train_val)?;
        let valid = data.valid.ok_or_else(|| {
            Error::Other(format!("resplit of '{}' produced no valid partition", self.name))
        })?;
        Ok(TrainValidSplit {
            train: data.train,
            valid,
            excluded: outcome.excluded().to_vec(),
            discarded: outcome.discarded().to_vec(),
        })
    }
}

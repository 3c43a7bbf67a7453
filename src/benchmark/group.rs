//! Benchmark groups: multi-seed scoring against sealed labels

use super::cache::{Lookup, ResultCache, ResubmissionPolicy};
use super::record::{submission_digest, ScoreRecord};
use super::sealed::Predictions;
use super::{Benchmark, TrainValidSplit};
use crate::dataset::{Dataset, TestInput};
use crate::keyer::{ColumnKeyer, EntityKeyer};
use crate::metric::{MetricEvaluator, MetricName};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Seeds a participant submits for when predictions are aligned by position.
pub const DEFAULT_SEEDS: [u64; 5] = [1, 2, 3, 4, 5];

/// Decimal places kept in aggregated scores.
pub const DEFAULT_PRECISION: u32 = 3;

const MAX_PRECISION: u32 = 15;

/// Group configuration.
///
/// Deserializes with defaults for every missing field:
///
/// ```rust
/// use tdc_bench::benchmark::{GroupConfig, ResubmissionPolicy};
///
/// let config = GroupConfig::from_json(r#"{"resubmission": "append"}"#)?;
/// assert_eq!(config.seeds, vec![1, 2, 3, 4, 5]);
/// assert_eq!(config.resubmission, ResubmissionPolicy::Append);
/// # Ok::<(), tdc_bench::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Seeds used for position-aligned submissions
    pub seeds: Vec<u64>,
    /// Decimal places for aggregated mean and std
    pub precision: u32,
    /// Behaviour on resubmission with different predictions
    pub resubmission: ResubmissionPolicy,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.to_vec(),
            precision: DEFAULT_PRECISION,
            resubmission: ResubmissionPolicy::Reject,
        }
    }
}

impl GroupConfig {
    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed JSON and
    /// [`Error::InvalidInput`] if validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the seeds.
    #[must_use]
    pub fn with_seeds(mut self, seeds: impl IntoIterator<Item = u64>) -> Self {
        self.seeds = seeds.into_iter().collect();
        self
    }

    /// Set the aggregation precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Set the resubmission policy.
    #[must_use]
    pub const fn with_resubmission(mut self, policy: ResubmissionPolicy) -> Self {
        self.resubmission = policy;
        self
    }

    /// Check seeds are present and unique and precision is representable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.seeds.is_empty() {
            return Err(Error::InvalidInput("group config needs at least one seed".to_string()));
        }
        let unique: BTreeSet<u64> = self.seeds.iter().copied().collect();
        if unique.len() != self.seeds.len() {
            return Err(Error::InvalidInput(format!(
                "group config repeats a seed: {:?}",
                self.seeds
            )));
        }
        if self.precision > MAX_PRECISION {
            return Err(Error::InvalidInput(format!(
                "precision {} exceeds {MAX_PRECISION} decimal places",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Predictions for one seed, keyed by benchmark name.
///
/// Without an explicit seed the submission's position in the list passed to
/// [`BenchmarkGroup::evaluate_many`] selects a seed from [`GroupConfig::seeds`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedPredictions {
    /// Explicit seed tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Benchmark name → predictions
    pub predictions: BTreeMap<String, Predictions>,
}

impl SeedPredictions {
    /// Empty, position-aligned submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty submission tagged with `seed`.
    #[must_use]
    pub fn for_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            predictions: BTreeMap::new(),
        }
    }

    /// Add predictions for a benchmark.
    #[must_use]
    pub fn insert(mut self, benchmark: impl Into<String>, predictions: impl Into<Predictions>) -> Self {
        self.predictions.insert(benchmark.into(), predictions.into());
        self
    }
}

/// Mean and population standard deviation across seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    /// Metric the scores were computed with
    pub metric: MetricName,
    /// Rounded mean
    pub mean: f64,
    /// Rounded population standard deviation
    pub std: f64,
    /// Seeds that contributed, ascending
    pub seeds: Vec<u64>,
}

impl AggregateScore {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn from_records(metric: MetricName, records: &[ScoreRecord], precision: u32) -> Self {
        let values: Vec<f64> = records.iter().map(ScoreRecord::summary).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
        let round = |x: f64| (x * scale).round() / scale;
        let mut seeds: Vec<u64> = records.iter().map(ScoreRecord::seed).collect();
        seeds.sort_unstable();
        Self {
            metric,
            mean: round(mean),
            std: round(variance.sqrt()),
            seeds,
        }
    }

    /// `[mean, std]`.
    #[must_use]
    pub const fn as_pair(&self) -> [f64; 2] {
        [self.mean, self.std]
    }
}

/// Outcome of [`BenchmarkGroup::evaluate_many`].
///
/// Benchmarks that failed are listed in `failures`; their siblings still
/// appear in `scores`.
#[derive(Debug, Default)]
pub struct GroupEvaluation {
    /// Aggregated scores per benchmark
    pub scores: BTreeMap<String, AggregateScore>,
    /// Per-benchmark failures
    pub failures: BTreeMap<String, Error>,
}

impl GroupEvaluation {
    /// `benchmark name → [mean, std]`.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<String, [f64; 2]> {
        self.scores
            .iter()
            .map(|(name, score)| (name.clone(), score.as_pair()))
            .collect()
    }

    /// Check whether every submitted benchmark scored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Participant view of one benchmark: train_val records and label-free test
/// inputs.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkView<'a> {
    /// Benchmark name
    pub name: &'a str,
    /// Metric used for scoring
    pub metric: MetricName,
    /// Labelled training pool
    pub train_val: &'a Dataset,
    /// Test inputs without labels
    pub test: &'a [TestInput],
}

/// A named set of benchmarks scored over several seeds.
///
/// The result cache lives and dies with the group.
pub struct BenchmarkGroup {
    name: String,
    benchmarks: BTreeMap<String, Benchmark>,
    config: GroupConfig,
    keyer: Arc<dyn EntityKeyer>,
    cache: ResultCache,
}

impl BenchmarkGroup {
    /// Create a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> BenchmarkGroupBuilder {
        BenchmarkGroupBuilder::new(name)
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group configuration.
    #[must_use]
    pub const fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Benchmark names, sorted.
    #[must_use]
    pub fn dataset_names(&self) -> Vec<&str> {
        self.benchmarks.keys().map(String::as_str).collect()
    }

    /// Number of (benchmark, seed) pairs with a committed score.
    #[must_use]
    pub fn scored_count(&self) -> usize {
        self.cache.len()
    }

    fn benchmark(&self, name: &str) -> Result<&Benchmark> {
        self.benchmarks.get(name).ok_or_else(|| Error::UnknownBenchmark {
            name: name.to_string(),
            group: self.name.clone(),
        })
    }

    /// Retrieve a benchmark for training.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBenchmark`] if `name` is not in the group.
    pub fn get(&self, name: &str) -> Result<BenchmarkView<'_>> {
        let benchmark = self.benchmark(name)?;
        Ok(BenchmarkView {
            name: benchmark.name(),
            metric: benchmark.metric(),
            train_val: benchmark.train_val(),
            test: benchmark.test().inputs(),
        })
    }

    /// Re-derive {train, valid} for `seed` with the benchmark's resplit policy.
    ///
    /// Repeated calls with the same seed return the same partition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBenchmark`] or propagates split errors.
    pub fn get_train_valid_split(&self, name: &str, seed: u64) -> Result<TrainValidSplit> {
        self.benchmark(name)?
            .train_valid_split(seed, Some(self.keyer.as_ref()))
    }

    /// Score one benchmark at one seed.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownBenchmark`] if `name` is not in the group
    /// - [`Error::PredictionShape`] if the predictions do not match the test set
    /// - [`Error::AlreadyScored`] on a different resubmission under
    ///   [`ResubmissionPolicy::Reject`]
    /// - metric errors ([`Error::ShapeMismatch`], [`Error::InvalidInput`])
    pub fn evaluate(&self, name: &str, seed: u64, predictions: &Predictions) -> Result<ScoreRecord> {
        let benchmark = self.benchmark(name)?;
        self.score_seed(benchmark, seed, predictions, None)
    }

    /// Committed score records for a (benchmark, seed), oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBenchmark`] if `name` is not in the group.
    pub fn score_history(&self, name: &str, seed: u64) -> Result<Vec<ScoreRecord>> {
        let benchmark = self.benchmark(name)?;
        Ok(self.cache.history(benchmark.name(), seed))
    }

    /// Score a list of per-seed submissions and aggregate per benchmark.
    ///
    /// # Errors
    ///
    /// Aborts with [`Error::UnknownBenchmark`] if any submission names a
    /// benchmark outside the group, or [`Error::InvalidInput`] if seeds cannot
    /// be resolved (too many untagged submissions, repeated seeds). Errors
    /// confined to one benchmark are reported in [`GroupEvaluation::failures`].
    pub fn evaluate_many(&self, submissions: &[SeedPredictions]) -> Result<GroupEvaluation> {
        self.evaluate_many_with_cancel(submissions, &AtomicBool::new(false))
    }

    /// [`BenchmarkGroup::evaluate_many`] with a cancellation flag.
    ///
    /// The flag is checked before each seed is scored. Seeds not yet scored
    /// when it is raised commit nothing and the benchmark reports
    /// [`Error::Cancelled`].
    ///
    /// # Errors
    ///
    /// Same as [`BenchmarkGroup::evaluate_many`].
    pub fn evaluate_many_with_cancel(
        &self,
        submissions: &[SeedPredictions],
        cancel: &AtomicBool,
    ) -> Result<GroupEvaluation> {
        let seeds = self.resolve_seeds(submissions)?;
        for submission in submissions {
            for name in submission.predictions.keys() {
                self.benchmark(name)?;
            }
        }

        let mut jobs: BTreeMap<&str, Vec<(u64, &Predictions)>> = BTreeMap::new();
        for (seed, submission) in seeds.iter().zip(submissions) {
            for (name, predictions) in &submission.predictions {
                jobs.entry(name.as_str()).or_default().push((*seed, predictions));
            }
        }

        let mut evaluation = GroupEvaluation::default();
        for (name, seed_jobs) in jobs {
            let benchmark = self.benchmark(name)?;
            match self.score_seeds(benchmark, &seed_jobs, cancel) {
                Ok(records) => {
                    let score = AggregateScore::from_records(
                        benchmark.metric(),
                        &records,
                        self.config.precision,
                    );
                    tracing::info!(
                        group = %self.name,
                        benchmark = name,
                        metric = %score.metric,
                        mean = score.mean,
                        std = score.std,
                        seeds = records.len(),
                        "benchmark aggregated"
                    );
                    evaluation.scores.insert(name.to_string(), score);
                }
                Err(err) if err.is_per_benchmark() => {
                    tracing::warn!(group = %self.name, benchmark = name, error = %err, "benchmark failed");
                    evaluation.failures.insert(name.to_string(), err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(evaluation)
    }

    fn resolve_seeds(&self, submissions: &[SeedPredictions]) -> Result<Vec<u64>> {
        let seeds = submissions
            .iter()
            .enumerate()
            .map(|(position, submission)| {
                submission
                    .seed
                    .or_else(|| self.config.seeds.get(position).copied())
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "submission {position} has no seed tag and group '{}' defines only {} seeds",
                            self.name,
                            self.config.seeds.len()
                        ))
                    })
            })
            .collect::<Result<Vec<u64>>>()?;
        let mut seen = BTreeSet::new();
        if let Some(repeated) = seeds.iter().find(|seed| !seen.insert(**seed)) {
            return Err(Error::InvalidInput(format!(
                "seed {repeated} is submitted more than once"
            )));
        }
        Ok(seeds)
    }

    /// Score every seed of one benchmark; the first failing seed wins.
    fn score_seeds(
        &self,
        benchmark: &Benchmark,
        jobs: &[(u64, &Predictions)],
        cancel: &AtomicBool,
    ) -> Result<Vec<ScoreRecord>> {
        #[cfg(feature = "rayon")]
        let results: Vec<Result<ScoreRecord>> = {
            use rayon::prelude::*;
            jobs.par_iter()
                .map(|&(seed, predictions)| self.score_seed(benchmark, seed, predictions, Some(cancel)))
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let results: Vec<Result<ScoreRecord>> = jobs
            .iter()
            .map(|&(seed, predictions)| self.score_seed(benchmark, seed, predictions, Some(cancel)))
            .collect();

        results.into_iter().collect()
    }

    fn score_seed(
        &self,
        benchmark: &Benchmark,
        seed: u64,
        predictions: &Predictions,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScoreRecord> {
        if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
            return Err(Error::Cancelled {
                benchmark: benchmark.name().to_string(),
                seed,
            });
        }
        let test = benchmark.test();
        let aligned = test.align(predictions, benchmark.name(), seed)?;
        let digest = submission_digest(&aligned);
        let policy = self.config.resubmission;

        if let Lookup::Cached(record) = self.cache.lookup(benchmark.name(), seed, digest, policy)? {
            tracing::debug!(benchmark = benchmark.name(), seed, "identical resubmission, returning cached score");
            return Ok(record);
        }

        let value = test.score(MetricEvaluator::from_name(benchmark.metric()), &aligned)?;
        let record = ScoreRecord::new(benchmark.name(), seed, benchmark.metric(), value, digest);
        let committed = self.cache.commit(record, policy)?;
        tracing::debug!(
            benchmark = benchmark.name(),
            seed,
            value = committed.summary(),
            "seed scored"
        );
        Ok(committed)
    }
}

impl fmt::Debug for BenchmarkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkGroup")
            .field("name", &self.name)
            .field("benchmarks", &self.dataset_names())
            .field("config", &self.config)
            .field("keyer", &self.keyer.describe())
            .field("scored", &self.cache.len())
            .finish()
    }
}

/// Builder for `BenchmarkGroup`.
pub struct BenchmarkGroupBuilder {
    name: String,
    benchmarks: Vec<Benchmark>,
    config: GroupConfig,
    keyer: Option<Arc<dyn EntityKeyer>>,
}

impl BenchmarkGroupBuilder {
    /// Create a new builder with the default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            benchmarks: Vec::new(),
            config: GroupConfig::default(),
            keyer: None,
        }
    }

    /// Add a benchmark.
    #[must_use]
    pub fn benchmark(mut self, benchmark: Benchmark) -> Self {
        self.benchmarks.push(benchmark);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: GroupConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the entity keyer used by scaffold resplits (default: the `Drug`
    /// column as is).
    #[must_use]
    pub fn keyer(mut self, keyer: Arc<dyn EntityKeyer>) -> Self {
        self.keyer = Some(keyer);
        self
    }

    /// Build the `BenchmarkGroup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid configuration, an empty
    /// group or two benchmarks with the same name.
    pub fn build(self) -> Result<BenchmarkGroup> {
        self.config.validate()?;
        if self.benchmarks.is_empty() {
            return Err(Error::InvalidInput(format!(
                "benchmark group '{}' has no benchmarks",
                self.name
            )));
        }
        let mut benchmarks = BTreeMap::new();
        for benchmark in self.benchmarks {
            let name = benchmark.name().to_string();
            if benchmarks.insert(name.clone(), benchmark).is_some() {
                return Err(Error::InvalidInput(format!(
                    "benchmark '{name}' appears twice in group '{}'",
                    self.name
                )));
            }
        }
        let keyer = self
            .keyer
            .unwrap_or_else(|| Arc::new(ColumnKeyer::new("Drug")));
        tracing::info!(
            group = %self.name,
            benchmarks = benchmarks.len(),
            seeds = ?self.config.seeds,
            resubmission = ?self.config.resubmission,
            "benchmark group ready"
        );
        Ok(BenchmarkGroup {
            name: self.name,
            benchmarks,
            config: self.config,
            keyer,
            cache: ResultCache::new(),
        })
    }
}

impl fmt::Debug for BenchmarkGroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkGroupBuilder")
            .field("name", &self.name)
            .field("benchmarks", &self.benchmarks.len())
            .field("config", &self.config)
            .field("keyer", &self.keyer.as_ref().map(|keyer| keyer.describe()))
            .finish()
    }
}

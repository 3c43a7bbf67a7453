//! Score Record - one scored submission for a (benchmark, seed)

use crate::dataset::{Label, Prediction};
use crate::metric::{MetricName, MetricValue};
use chrono::{DateTime, Utc};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// Digest of aligned predictions, used to recognise identical resubmissions.
#[must_use]
pub fn submission_digest(predictions: &[Prediction]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(predictions.len());
    for prediction in predictions {
        match prediction {
            Label::Scalar(value) => {
                hasher.write_u8(0);
                hasher.write_u64(value.to_bits());
            }
            Label::Vector(values) => {
                hasher.write_u8(1);
                hasher.write_usize(values.len());
                for value in values {
                    hasher.write_u64(value.to_bits());
                }
            }
            Label::Class(class) => {
                hasher.write_u8(2);
                hasher.write_u32(*class);
            }
        }
    }
    hasher.finish()
}

/// Score Record represents one committed scoring of a benchmark at a seed.
///
/// Records are immutable once committed to the group's result cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    benchmark: String,
    seed: u64,
    metric: MetricName,
    value: MetricValue,
    digest: u64,
    scored_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Create a new score record stamped with the current time.
    #[must_use]
    pub fn new(
        benchmark: impl Into<String>,
        seed: u64,
        metric: MetricName,
        value: MetricValue,
        digest: u64,
    ) -> Self {
        Self::builder(benchmark, seed, metric, value)
            .digest(digest)
            .build()
    }

    /// Create a builder for constructing a score record with optional fields.
    #[must_use]
    pub fn builder(
        benchmark: impl Into<String>,
        seed: u64,
        metric: MetricName,
        value: MetricValue,
    ) -> ScoreRecordBuilder {
        ScoreRecordBuilder::new(benchmark, seed, metric, value)
    }

    /// Get the benchmark name.
    #[must_use]
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Get the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the metric.
    #[must_use]
    pub const fn metric(&self) -> MetricName {
        self.metric
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Scalar used for aggregation (vector values reduce to their mean).
    #[must_use]
    pub fn summary(&self) -> f64 {
        self.value.summary()
    }

    /// Get the submission digest.
    #[must_use]
    pub const fn digest(&self) -> u64 {
        self.digest
    }

    /// Get the time the record was scored.
    #[must_use]
    pub const fn scored_at(&self) -> DateTime<Utc> {
        self.scored_at
    }
}

/// Builder for `ScoreRecord`.
#[derive(Debug)]
pub struct ScoreRecordBuilder {
    benchmark: String,
    seed: u64,
    metric: MetricName,
    value: MetricValue,
    digest: u64,
    scored_at: DateTime<Utc>,
}

impl ScoreRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        benchmark: impl Into<String>,
        seed: u64,
        metric: MetricName,
        value: MetricValue,
    ) -> Self {
        Self {
            benchmark: benchmark.into(),
            seed,
            metric,
            value,
            digest: 0,
            scored_at: Utc::now(),
        }
    }

    /// Set the submission digest.
    #[must_use]
    pub const fn digest(mut self, digest: u64) -> Self {
        self.digest = digest;
        self
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn scored_at(mut self, scored_at: DateTime<Utc>) -> Self {
        self.scored_at = scored_at;
        self
    }

    /// Build the `ScoreRecord`.
    #[must_use]
    pub fn build(self) -> ScoreRecord {
        ScoreRecord {
            benchmark: self.benchmark,
            seed: self.seed,
            metric: self.metric,
            value: self.value,
            digest: self.digest,
            scored_at: self.scored_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_distinguishes_predictions() {
        let a = vec![Label::Scalar(0.5), Label::Class(1)];
        let b = vec![Label::Scalar(0.5), Label::Class(2)];
        assert_eq!(submission_digest(&a), submission_digest(&a.clone()));
        assert_ne!(submission_digest(&a), submission_digest(&b));
        assert_ne!(
            submission_digest(&[Label::Scalar(1.0)]),
            submission_digest(&[Label::Vector(vec![1.0])])
        );
    }

    #[test]
    fn test_vector_summary_is_mean() {
        let record = ScoreRecord::new(
            "tox21",
            1,
            MetricName::RocAuc,
            MetricValue::Vector(vec![0.8, 0.6]),
            7,
        );
        assert!((record.summary() - 0.7).abs() < 1e-12);
        assert_eq!(record.digest(), 7);
    }

    #[test]
    fn test_custom_timestamp() {
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = ScoreRecord::builder("caco2", 3, MetricName::Mae, MetricValue::Scalar(0.3))
            .scored_at(at)
            .build();
        assert_eq!(record.scored_at(), at);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"metric\":\"mae\""));
    }
}

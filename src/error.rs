//! Error types for tdc-bench
//!
//! Every variant carries enough context (policy, record, seed, benchmark) to
//! reproduce the failure deterministically.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// A record whose entity field could not be turned into a grouping key.
///
/// Reported alongside a best-effort partition, never fatal to a whole split.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot derive entity key for record '{record_id}' from field '{field}': {reason}")]
pub struct KeyDerivationError {
    /// Identifier of the offending record
    pub record_id: String,
    /// Entity field that failed
    pub field: String,
    /// Why canonicalization failed
    pub reason: String,
}

impl KeyDerivationError {
    /// Create a new key derivation error.
    #[must_use]
    pub fn new(
        record_id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// tdc-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed split request, raised before any assignment work
    #[error("Invalid split policy {policy}: {reason}")]
    InvalidPolicy {
        /// Policy (or request) as given by the caller
        policy: String,
        /// What is wrong with it
        reason: String,
    },

    /// Cold or combination split cannot reach its partitions
    #[error("Insufficient diversity in column '{column}' (seed {seed}): {distinct} distinct value(s), {required} required\nUse a column with more entities or drop the empty partition from the fractions")]
    InsufficientDiversity {
        /// Cold column (or entity key) that is too coarse
        column: String,
        /// Distinct values found
        distinct: usize,
        /// Distinct values needed to fill every non-empty partition
        required: usize,
        /// Seed of the failing policy
        seed: u64,
    },

    /// Entity key derivation failed for a record
    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    /// Metric name does not resolve
    #[error("Unknown metric: '{0}'\nKnown metrics: mae, mse, rmse, r2, pcc, spearman, roc-auc, pr-auc, accuracy, precision, recall, f1, micro-f1, macro-f1, kappa")]
    UnknownMetric(String),

    /// Benchmark is not part of the group
    #[error("Unknown benchmark '{name}' in group '{group}'")]
    UnknownBenchmark {
        /// Requested benchmark name
        name: String,
        /// Group that was asked
        group: String,
    },

    /// `y_true` and `y_pred` disagree in length or layout
    #[error("Shape mismatch for metric {metric}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Metric being evaluated
        metric: String,
        /// Shape implied by `y_true`
        expected: String,
        /// Shape of `y_pred`
        actual: String,
    },

    /// Submission does not line up with the sealed test inputs
    #[error("Malformed predictions for benchmark '{benchmark}' (seed {seed}): {detail}")]
    PredictionShape {
        /// Benchmark name
        benchmark: String,
        /// Seed of the submission
        seed: u64,
        /// Missing/unexpected identifiers or length information
        detail: String,
    },

    /// (benchmark, seed) already holds a different scored submission
    #[error("Benchmark '{benchmark}' already scored for seed {seed}\nResubmission with different predictions is rejected by the group's resubmission policy")]
    AlreadyScored {
        /// Benchmark name
        benchmark: String,
        /// Seed already scored
        seed: u64,
    },

    /// Scoring was aborted before this (benchmark, seed) committed
    #[error("Scoring cancelled for benchmark '{benchmark}' at seed {seed}")]
    Cancelled {
        /// Benchmark name
        benchmark: String,
        /// First seed left unscored
        seed: u64,
    },

    /// Two records share an identifier
    #[error("Duplicate record identifier: '{0}'\nCall Dataset::deduplicate to drop repeats explicitly")]
    DuplicateRecord(String),

    /// Oracle name does not resolve
    #[error("Unknown oracle: '{0}'")]
    UnknownOracle(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arrow error
    #[cfg(feature = "arrow")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is confined to one benchmark of a group evaluation.
    ///
    /// Structural errors abort the whole call instead.
    #[must_use]
    pub const fn is_per_benchmark(&self) -> bool {
        matches!(
            self,
            Self::PredictionShape { .. }
                | Self::ShapeMismatch { .. }
                | Self::AlreadyScored { .. }
                | Self::Cancelled { .. }
                | Self::InvalidInput(_)
        )
    }
}

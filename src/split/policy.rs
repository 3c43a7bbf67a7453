//! Split policies and split requests

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance on the sum of split fractions.
pub const FRACTION_TOLERANCE: f64 = 1e-6;

/// Default train/valid/test fractions.
pub const DEFAULT_FRACTIONS: [f64; 3] = [0.7, 0.1, 0.2];

/// Splitting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Seeded random permutation of records
    Random,
    /// Whole scaffold groups move together
    Scaffold,
    /// Entities in the cold column(s) never cross partitions
    ColdSplit,
    /// Independent cold splits per column, intersected
    Combination,
}

impl SplitMethod {
    /// Name used in split requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Scaffold => "scaffold",
            Self::ColdSplit => "cold_split",
            Self::Combination => "combination",
        }
    }

    /// Whether records are grouped before assignment.
    #[must_use]
    pub const fn is_group_aware(self) -> bool {
        !matches!(self, Self::Random)
    }

    /// Whether the policy needs cold columns.
    #[must_use]
    pub const fn needs_cold_columns(self) -> bool {
        matches!(self, Self::ColdSplit | Self::Combination)
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "scaffold" => Ok(Self::Scaffold),
            "cold_split" | "cold" => Ok(Self::ColdSplit),
            "combination" => Ok(Self::Combination),
            other => Err(Error::InvalidPolicy {
                policy: format!("method={other}"),
                reason: "method must be one of random, scaffold, cold_split, combination"
                    .to_string(),
            }),
        }
    }
}

/// Immutable split configuration.
///
/// A policy fully determines the partition produced for a given dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPolicy {
    method: SplitMethod,
    fractions: [f64; 3],
    seed: u64,
    #[serde(default)]
    cold_columns: Vec<String>,
}

impl SplitPolicy {
    /// Create a builder for a policy of the given method.
    #[must_use]
    pub fn builder(method: SplitMethod) -> SplitPolicyBuilder {
        SplitPolicyBuilder::new(method)
    }

    /// Random split.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the fractions are malformed.
    pub fn random(fractions: [f64; 3], seed: u64) -> Result<Self> {
        Self::builder(SplitMethod::Random)
            .fractions(fractions)
            .seed(seed)
            .build()
    }

    /// Scaffold (entity key) split.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the fractions are malformed.
    pub fn scaffold(fractions: [f64; 3], seed: u64) -> Result<Self> {
        Self::builder(SplitMethod::Scaffold)
            .fractions(fractions)
            .seed(seed)
            .build()
    }

    /// Cold split on one or more columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the fractions are malformed or no
    /// column is given.
    pub fn cold_split<I, S>(columns: I, fractions: [f64; 3], seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(SplitMethod::ColdSplit)
            .cold_columns(columns)
            .fractions(fractions)
            .seed(seed)
            .build()
    }

    /// Combination split requiring joint novelty across columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if the fractions are malformed or fewer
    /// than two columns are given.
    pub fn combination<I, S>(columns: I, fractions: [f64; 3], seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(SplitMethod::Combination)
            .cold_columns(columns)
            .fractions(fractions)
            .seed(seed)
            .build()
    }

    /// Get the split method.
    #[must_use]
    pub const fn method(&self) -> SplitMethod {
        self.method
    }

    /// Get the train/valid/test fractions.
    #[must_use]
    pub const fn fractions(&self) -> [f64; 3] {
        self.fractions
    }

    /// Get the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the cold columns (empty for random and scaffold).
    #[must_use]
    pub fn cold_columns(&self) -> &[String] {
        &self.cold_columns
    }

    /// Whether a validation partition is produced.
    #[must_use]
    pub fn has_valid(&self) -> bool {
        self.fractions[1] > 0.0
    }

    /// Same policy with a different seed.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    /// Check the policy before any assignment work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidPolicy {
            policy: self.to_string(),
            reason,
        };

        if let Some(bad) = self
            .fractions
            .iter()
            .find(|f| !f.is_finite() || **f < 0.0)
        {
            return Err(invalid(format!("fraction {bad} is not a finite non-negative number")));
        }
        let sum: f64 = self.fractions.iter().sum();
        if (sum - 1.0).abs() > FRACTION_TOLERANCE {
            return Err(invalid(format!(
                "fractions must sum to 1.0 (±{FRACTION_TOLERANCE}), got {sum}"
            )));
        }
        if self.fractions[0] <= 0.0 {
            return Err(invalid("train fraction must be positive".to_string()));
        }
        match self.method {
            SplitMethod::ColdSplit if self.cold_columns.is_empty() => {
                Err(invalid("cold_split needs at least one cold column".to_string()))
            }
            SplitMethod::Combination if self.cold_columns.len() < 2 => {
                Err(invalid("combination needs at least two cold columns".to_string()))
            }
            SplitMethod::Random | SplitMethod::Scaffold if !self.cold_columns.is_empty() => {
                Err(invalid(format!(
                    "cold columns are only meaningful for cold_split and combination, not {}",
                    self.method
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [train, valid, test] = self.fractions;
        write!(
            f,
            "{}[{train}, {valid}, {test}] seed={}",
            self.method, self.seed
        )?;
        if !self.cold_columns.is_empty() {
            write!(f, " cold=[{}]", self.cold_columns.join(","))?;
        }
        Ok(())
    }
}

/// Builder for `SplitPolicy`.
#[derive(Debug)]
pub struct SplitPolicyBuilder {
    method: SplitMethod,
    fractions: [f64; 3],
    seed: u64,
    cold_columns: Vec<String>,
}

impl SplitPolicyBuilder {
    /// Create a new builder with default fractions and seed 0.
    #[must_use]
    pub const fn new(method: SplitMethod) -> Self {
        Self {
            method,
            fractions: DEFAULT_FRACTIONS,
            seed: 0,
            cold_columns: Vec::new(),
        }
    }

    /// Set train/valid/test fractions.
    #[must_use]
    pub const fn fractions(mut self, fractions: [f64; 3]) -> Self {
        self.fractions = fractions;
        self
    }

    /// Set the seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the cold columns; duplicates are dropped, order is kept.
    #[must_use]
    pub fn cold_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.cold_columns.contains(&column) {
                self.cold_columns.push(column);
            }
        }
        self
    }

    /// Build and validate the `SplitPolicy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] if validation fails.
    pub fn build(self) -> Result<SplitPolicy> {
        let policy = SplitPolicy {
            method: self.method,
            fractions: self.fractions,
            seed: self.seed,
            cold_columns: self.cold_columns,
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// Wire form of a split request: `{method, seed, fractions, cold_columns?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRequest {
    /// Method name (`random`, `scaffold`, `cold_split`, `combination`)
    pub method: String,
    /// Seed; negative values are rejected on conversion
    pub seed: i64,
    /// Train/valid/test fractions
    pub fractions: Vec<f64>,
    /// Cold columns (cold_split and combination only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cold_columns: Option<Vec<String>>,
}

impl SplitRequest {
    /// Parse a JSON split request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<SplitRequest> for SplitPolicy {
    type Error = Error;

    fn try_from(request: SplitRequest) -> Result<Self> {
        let method: SplitMethod = request.method.parse()?;
        let seed = u64::try_from(request.seed).map_err(|_| Error::InvalidPolicy {
            policy: format!("{method} seed={}", request.seed),
            reason: "seed must be non-negative".to_string(),
        })?;
        let fractions: [f64; 3] =
            request
                .fractions
                .as_slice()
                .try_into()
                .map_err(|_| Error::InvalidPolicy {
                    policy: format!("{method} fractions={:?}", request.fractions),
                    reason: format!(
                        "expected 3 fractions (train, valid, test), got {}",
                        request.fractions.len()
                    ),
                })?;
        Self::builder(method)
            .fractions(fractions)
            .seed(seed)
            .cold_columns(request.cold_columns.unwrap_or_default())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions_must_sum_to_one() {
        let err = SplitPolicy::random([0.7, 0.1, 0.1], 1).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy { .. }));
        assert!(err.to_string().contains("sum to 1.0"));
        assert!(SplitPolicy::random([0.7, 0.1, 0.2 + 5e-7], 1).is_ok());
    }

    #[test]
    fn test_negative_fraction_rejected() {
        assert!(SplitPolicy::random([1.2, -0.2, 0.0], 1).is_err());
    }

    #[test]
    fn test_cold_columns_required() {
        assert!(SplitPolicy::cold_split(Vec::<String>::new(), DEFAULT_FRACTIONS, 1).is_err());
        assert!(SplitPolicy::combination(["Drug"], DEFAULT_FRACTIONS, 1).is_err());
        assert!(SplitPolicy::combination(["Drug", "Target"], DEFAULT_FRACTIONS, 1).is_ok());
    }

    #[test]
    fn test_request_conversion() {
        let request = SplitRequest::from_json(
            r#"{"method": "cold_split", "seed": 42, "fractions": [0.8, 0.0, 0.2], "cold_columns": ["Drug"]}"#,
        )
        .unwrap();
        let policy = SplitPolicy::try_from(request).unwrap();
        assert_eq!(policy.method(), SplitMethod::ColdSplit);
        assert_eq!(policy.seed(), 42);
        assert!(!policy.has_valid());
        assert_eq!(policy.cold_columns(), ["Drug".to_string()]);
    }

    #[test]
    fn test_request_rejects_unknown_method_and_bad_length() {
        let unknown = SplitRequest {
            method: "stratified".to_string(),
            seed: 1,
            fractions: vec![0.7, 0.1, 0.2],
            cold_columns: None,
        };
        assert!(SplitPolicy::try_from(unknown).is_err());

        let short = SplitRequest {
            method: "random".to_string(),
            seed: 1,
            fractions: vec![0.8, 0.2],
            cold_columns: None,
        };
        let err = SplitPolicy::try_from(short).unwrap_err();
        assert!(err.to_string().contains("expected 3 fractions"));
    }

    #[test]
    fn test_request_rejects_negative_seed() {
        let request = SplitRequest::from_json(
            r#"{"method": "scaffold", "seed": -1, "fractions": [0.8, 0.1, 0.1]}"#,
        )
        .unwrap();
        let err = SplitPolicy::try_from(request).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy { .. }));
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_with_seed_keeps_everything_else() {
        let policy = SplitPolicy::scaffold([0.8, 0.1, 0.1], 1).unwrap();
        let reseeded = policy.with_seed(7);
        assert_eq!(reseeded.seed(), 7);
        assert_eq!(reseeded.fractions(), policy.fractions());
        assert_eq!(reseeded.method(), policy.method());
    }
}

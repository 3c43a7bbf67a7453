//! Paired input/output datasets for generation tasks (e.g. reaction
//! reactant → product pairs). Only random splits make sense here.

use super::{Dataset, Label, Record};
use crate::split::{SplitData, SplitEngine, SplitMethod, SplitPolicy, DEFAULT_FRACTIONS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Seed used when a caller asks for the benchmark split.
pub const BENCHMARK_SEED: u64 = 1234;

/// Seed selection for paired splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitSeed {
    /// The fixed benchmark seed ([`BENCHMARK_SEED`])
    #[default]
    Benchmark,
    /// An explicit seed
    Value(u64),
}

impl SplitSeed {
    /// Resolve to a concrete seed.
    #[must_use]
    pub const fn resolve(self) -> u64 {
        match self {
            Self::Benchmark => BENCHMARK_SEED,
            Self::Value(seed) => seed,
        }
    }
}

/// Input → output structure pairs.
#[derive(Debug, Clone)]
pub struct PairedDataset {
    name: String,
    input_name: String,
    output_name: String,
    records: Dataset,
}

impl PairedDataset {
    /// Build from aligned input and output lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the lists differ in length.
    pub fn new(
        name: impl Into<String>,
        input_name: impl Into<String>,
        output_name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        let input_name = input_name.into();
        let output_name = output_name.into();
        if inputs.len() != outputs.len() {
            return Err(Error::InvalidInput(format!(
                "paired dataset '{name}' has {} inputs but {} outputs",
                inputs.len(),
                outputs.len()
            )));
        }
        let records = inputs
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(i, (input, output))| {
                Record::builder(format!("{name}-{i}"), Label::Scalar(0.0))
                    .field(input_name.as_str(), input)
                    .field(output_name.as_str(), output)
                    .build()
            })
            .collect();
        let records = Dataset::new(name.clone(), records)?;
        tracing::debug!(dataset = %name, pairs = records.len(), "paired dataset loaded");
        Ok(Self {
            name,
            input_name,
            output_name,
            records,
        })
    }

    /// Dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pairs in load order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.records.iter().map(|record| {
            (
                record.field(&self.input_name).unwrap_or_default(),
                record.field(&self.output_name).unwrap_or_default(),
            )
        })
    }

    /// Underlying records (fields named after the input/output columns).
    #[must_use]
    pub const fn records(&self) -> &Dataset {
        &self.records
    }

    /// Split the pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] for any method other than random or for
    /// malformed fractions.
    pub fn get_split(
        &self,
        method: SplitMethod,
        seed: SplitSeed,
        fractions: Option<[f64; 3]>,
    ) -> Result<SplitData> {
        if method != SplitMethod::Random {
            return Err(Error::InvalidPolicy {
                policy: format!("{method} on paired dataset '{}'", self.name),
                reason: "paired datasets only support random splits".to_string(),
            });
        }
        let policy = SplitPolicy::random(fractions.unwrap_or(DEFAULT_FRACTIONS), seed.resolve())?;
        SplitEngine::new()
            .split(&self.records, &policy)?
            .materialize(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uspto_like(n: usize) -> PairedDataset {
        let inputs = (0..n).map(|i| format!("reactant{i}")).collect();
        let outputs = (0..n).map(|i| format!("product{i}")).collect();
        PairedDataset::new("uspto", "reactant", "product", inputs, outputs).unwrap()
    }

    #[test]
    fn test_length_mismatch() {
        let err = PairedDataset::new("p", "in", "out", vec!["a".into()], vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_benchmark_seed_is_default() {
        assert_eq!(SplitSeed::default().resolve(), 1234);
        let paired = uspto_like(50);
        let a = paired
            .get_split(SplitMethod::Random, SplitSeed::Benchmark, None)
            .unwrap();
        let b = paired
            .get_split(SplitMethod::Random, SplitSeed::Value(BENCHMARK_SEED), None)
            .unwrap();
        assert_eq!(a.test.ids(), b.test.ids());
        assert_eq!(a.train.len(), 35);
    }

    #[test]
    fn test_only_random_supported() {
        let paired = uspto_like(10);
        assert!(paired
            .get_split(SplitMethod::Scaffold, SplitSeed::Value(1), None)
            .is_err());
    }

    #[test]
    fn test_pairs_are_preserved() {
        let paired = uspto_like(3);
        let pairs: Vec<(&str, &str)> = paired.pairs().collect();
        assert_eq!(pairs[1], ("reactant1", "product1"));
    }
}

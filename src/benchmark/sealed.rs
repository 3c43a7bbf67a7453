//! Sealed test set
//!
//! Ground-truth labels are held in a private field and never returned. The only
//! code path that reads them is [`SealedTestSet::score`], which yields a
//! [`MetricValue`].

use crate::dataset::{Dataset, Label, Prediction, RecordId, TestInput};
use crate::metric::{MetricEvaluator, MetricValue};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Predictions for one benchmark at one seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predictions {
    /// Aligned by position with [`SealedTestSet::inputs`]
    Ordered(Vec<Prediction>),
    /// Keyed by record identifier
    ById(BTreeMap<RecordId, Prediction>),
}

impl Predictions {
    /// Number of predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ordered(values) => values.len(),
            Self::ById(values) => values.len(),
        }
    }

    /// Check if there are no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Prediction>> for Predictions {
    fn from(values: Vec<Prediction>) -> Self {
        Self::Ordered(values)
    }
}

impl From<Vec<f64>> for Predictions {
    fn from(values: Vec<f64>) -> Self {
        Self::Ordered(values.into_iter().map(Label::Scalar).collect())
    }
}

impl From<BTreeMap<RecordId, Prediction>> for Predictions {
    fn from(values: BTreeMap<RecordId, Prediction>) -> Self {
        Self::ById(values)
    }
}

/// Test partition with labels sealed away from participants.
#[derive(Clone)]
pub struct SealedTestSet {
    inputs: Vec<TestInput>,
    labels: Vec<Label>,
    index: FxHashMap<RecordId, usize>,
}

impl SealedTestSet {
    /// Seal a labelled test dataset.
    #[must_use]
    pub fn seal(test: &Dataset) -> Self {
        let inputs: Vec<TestInput> = test.iter().map(|record| record.to_input()).collect();
        let labels = test.iter().map(|record| record.label().clone()).collect();
        let index = inputs
            .iter()
            .enumerate()
            .map(|(position, input)| (input.id().to_string(), position))
            .collect();
        Self {
            inputs,
            labels,
            index,
        }
    }

    /// Label-free test inputs, in scoring order.
    #[must_use]
    pub fn inputs(&self) -> &[TestInput] {
        &self.inputs
    }

    /// Number of test records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Check if the test set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Put `predictions` in test-input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PredictionShape`] if the length (ordered form) or the
    /// identifier set (keyed form) does not match the test inputs.
    pub fn align(&self, predictions: &Predictions, benchmark: &str, seed: u64) -> Result<Vec<Prediction>> {
        let shape_error = |detail: String| Error::PredictionShape {
            benchmark: benchmark.to_string(),
            seed,
            detail,
        };
        match predictions {
            Predictions::Ordered(values) => {
                if values.len() != self.len() {
                    return Err(shape_error(format!(
                        "expected {} predictions, got {}",
                        self.len(),
                        values.len()
                    )));
                }
                Ok(values.clone())
            }
            Predictions::ById(values) => {
                let missing: Vec<&str> = self
                    .inputs
                    .iter()
                    .map(TestInput::id)
                    .filter(|id| !values.contains_key(*id))
                    .collect();
                let unexpected: Vec<&str> = values
                    .keys()
                    .map(String::as_str)
                    .filter(|id| !self.index.contains_key(*id))
                    .collect();
                if !missing.is_empty() || !unexpected.is_empty() {
                    return Err(shape_error(format!(
                        "{} missing id(s) {}, {} unexpected id(s) {}",
                        missing.len(),
                        preview(&missing),
                        unexpected.len(),
                        preview(&unexpected)
                    )));
                }
                Ok(self
                    .inputs
                    .iter()
                    .filter_map(|input| values.get(input.id()).cloned())
                    .collect())
            }
        }
    }

    /// Score aligned predictions against the sealed labels.
    pub(crate) fn score(&self, evaluator: MetricEvaluator, aligned: &[Prediction]) -> Result<MetricValue> {
        evaluator.evaluate(&self.labels, aligned)
    }
}

fn preview(ids: &[&str]) -> String {
    const SHOWN: usize = 5;
    let mut shown = ids.iter().take(SHOWN).copied().collect::<Vec<_>>().join(", ");
    if ids.len() > SHOWN {
        shown.push_str(", ...");
    }
    format!("[{shown}]")
}

impl fmt::Debug for SealedTestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedTestSet")
            .field("inputs", &self.inputs.len())
            .finish_non_exhaustive()
    }
}

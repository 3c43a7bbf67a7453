//! In-memory dataset records
//!
//! Retrieval and parsing of raw dataset files happen outside this crate; the
//! engine only needs a stable collection of [`Record`]s with unique identifiers.
//!
//! ## Usage
//!
//! ```rust
//! use tdc_bench::dataset::{Dataset, Label, Record};
//!
//! let records = vec![
//!     Record::builder("r1", Label::Scalar(0.5)).field("Drug", "CCO").build(),
//!     Record::builder("r2", Label::Scalar(1.5)).field("Drug", "c1ccccc1").build(),
//! ];
//! let dataset = Dataset::new("caco2", records)?;
//! assert_eq!(dataset.len(), 2);
//! assert_eq!(dataset.get("r2").and_then(|r| r.field("Drug")), Some("c1ccccc1"));
//! # Ok::<(), tdc_bench::Error>(())
//! ```

#[cfg(feature = "arrow")]
mod columnar;
mod paired;

#[cfg(feature = "arrow")]
pub use columnar::RecordBatchSource;
pub use paired::{PairedDataset, SplitSeed, BENCHMARK_SEED};

use crate::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record identifier.
pub type RecordId = String;

/// Label (or prediction) attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Label {
    /// Single real value (regression target, binary label or probability)
    Scalar(f64),
    /// One value per output (multi-output regression, multi-label)
    Vector(Vec<f64>),
    /// Categorical class index
    Class(u32),
}

/// Prediction submitted for a record; same shape as a [`Label`].
pub type Prediction = Label;

/// One immutable row of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    fields: BTreeMap<String, String>,
    label: Label,
    group: Option<String>,
}

impl Record {
    /// Create a record from its entity fields.
    #[must_use]
    pub fn new<I, K, V>(id: impl Into<String>, fields: I, label: Label) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            label,
            group: None,
        }
    }

    /// Create a builder for constructing a record with optional fields.
    #[must_use]
    pub fn builder(id: impl Into<String>, label: Label) -> RecordBuilder {
        RecordBuilder::new(id, label)
    }

    /// Get the record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get an entity field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Get all entity fields, ordered by name.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Get the label.
    #[must_use]
    pub const fn label(&self) -> &Label {
        &self.label
    }

    /// Get the grouping metadata, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Strip the label, keeping only what a participant may see.
    #[must_use]
    pub fn to_input(&self) -> TestInput {
        TestInput {
            id: self.id.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// Builder for `Record`.
#[derive(Debug)]
pub struct RecordBuilder {
    id: RecordId,
    fields: BTreeMap<String, String>,
    label: Label,
    group: Option<String>,
}

impl RecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, label: Label) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            label,
            group: None,
        }
    }

    /// Add an entity field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set grouping metadata.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Build the `Record`.
    #[must_use]
    pub fn build(self) -> Record {
        Record {
            id: self.id,
            fields: self.fields,
            label: self.label,
            group: self.group,
        }
    }
}

/// Label-free view of a test record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInput {
    id: RecordId,
    fields: BTreeMap<String, String>,
}

impl TestInput {
    /// Get the record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get an entity field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Get all entity fields, ordered by name.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// A named collection of records with unique identifiers.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    records: Vec<Record>,
    index: FxHashMap<RecordId, usize>,
}

impl Dataset {
    /// Create a dataset, rejecting repeated identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] on the first repeated identifier.
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Result<Self> {
        let mut index = FxHashMap::default();
        index.reserve(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), position).is_some() {
                return Err(Error::DuplicateRecord(record.id.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            records,
            index,
        })
    }

    /// Create a dataset keeping the first occurrence of each identifier.
    ///
    /// Returns the dataset and the identifiers of the dropped repeats. Drops
    /// are logged so that no record disappears silently.
    #[must_use]
    pub fn deduplicate(name: impl Into<String>, records: Vec<Record>) -> (Self, Vec<RecordId>) {
        let name = name.into();
        let mut seen = FxHashSet::default();
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = Vec::new();
        for record in records {
            if seen.insert(record.id.clone()) {
                kept.push(record);
            } else {
                dropped.push(record.id);
            }
        }
        if !dropped.is_empty() {
            tracing::warn!(
                dataset = %name,
                dropped = dropped.len(),
                "dropped records with repeated identifiers"
            );
        }
        let index = kept
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.clone(), position))
            .collect();
        (
            Self {
                name,
                records: kept,
                index,
            },
            dropped,
        )
    }

    /// Get the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in load order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate over records in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Look up a record by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// Check whether an identifier is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiers in load order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(Record::id).collect()
    }

    /// Build a new dataset from the given identifiers, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an identifier is unknown and
    /// [`Error::DuplicateRecord`] if one is repeated.
    pub fn subset<S: AsRef<str>>(&self, name: impl Into<String>, ids: &[S]) -> Result<Self> {
        let records = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                self.get(id).cloned().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "record '{id}' is not part of dataset '{}'",
                        self.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record::builder(id, Label::Scalar(1.0))
            .field("Drug", "CCO")
            .build()
    }

    #[test]
    fn test_dataset_rejects_duplicates() {
        let err = Dataset::new("d", vec![record("a"), record("a")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(id) if id == "a"));
    }

    #[test]
    fn test_deduplicate_keeps_first_and_reports() {
        let first = Record::builder("a", Label::Scalar(1.0)).build();
        let second = Record::builder("a", Label::Scalar(2.0)).build();
        let (dataset, dropped) = Dataset::deduplicate("d", vec![first, second, record("b")]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dropped, vec!["a".to_string()]);
        assert_eq!(dataset.get("a").map(Record::label), Some(&Label::Scalar(1.0)));
    }

    #[test]
    fn test_subset_preserves_order() {
        let dataset = Dataset::new("d", vec![record("a"), record("b"), record("c")]).unwrap();
        let subset = dataset.subset("d/test", &["c", "a"]).unwrap();
        assert_eq!(subset.ids(), vec!["c", "a"]);
        assert!(dataset.subset("d/test", &["zz"]).is_err());
    }

    #[test]
    fn test_to_input_strips_label() {
        let input = Record::builder("a", Label::Class(3))
            .field("Target", "MKV")
            .group("g1")
            .build()
            .to_input();
        assert_eq!(input.id(), "a");
        assert_eq!(input.field("Target"), Some("MKV"));
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("Class"));
    }
}

//! Dataset ingestion from Arrow record batches
//!
//! Entity columns must be `Utf8`; the label column may be `Float64`,
//! `Float32`, `Int64` or `Int32` (integers become [`Label::Class`] only when
//! requested).

use super::{Dataset, Label, Record};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

/// Column mapping from a record batch to [`Record`]s.
#[derive(Debug, Clone)]
pub struct RecordBatchSource {
    id_column: String,
    label_column: String,
    entity_columns: Vec<String>,
    categorical: bool,
}

impl RecordBatchSource {
    /// Map `id_column` and `label_column`; entity columns must be added.
    #[must_use]
    pub fn new(id_column: impl Into<String>, label_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            label_column: label_column.into(),
            entity_columns: Vec::new(),
            categorical: false,
        }
    }

    /// Add an entity column.
    #[must_use]
    pub fn entity(mut self, column: impl Into<String>) -> Self {
        self.entity_columns.push(column.into());
        self
    }

    /// Read integer labels as class indices.
    #[must_use]
    pub const fn categorical(mut self) -> Self {
        self.categorical = true;
        self
    }

    /// Convert `batches` into a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for missing columns, unsupported types
    /// or null values, and [`Error::DuplicateRecord`] for repeated identifiers.
    pub fn load(&self, name: impl Into<String>, batches: &[RecordBatch]) -> Result<Dataset> {
        let mut records = Vec::new();
        for batch in batches {
            let ids = string_column(batch, &self.id_column)?;
            let labels = column(batch, &self.label_column)?;
            let entities = self
                .entity_columns
                .iter()
                .map(|name| string_column(batch, name).map(|array| (name.as_str(), array)))
                .collect::<Result<Vec<_>>>()?;

            for row in 0..batch.num_rows() {
                if ids.is_null(row) {
                    return Err(Error::InvalidInput(format!(
                        "null identifier in column '{}' at row {row}",
                        self.id_column
                    )));
                }
                let mut builder = Record::builder(ids.value(row), self.label_at(labels, row)?);
                for (name, array) in &entities {
                    if !array.is_null(row) {
                        builder = builder.field(*name, array.value(row));
                    }
                }
                records.push(builder.build());
            }
        }
        Dataset::new(name, records)
    }

    fn label_at(&self, labels: &ArrayRef, row: usize) -> Result<Label> {
        if labels.is_null(row) {
            return Err(Error::InvalidInput(format!(
                "null label in column '{}' at row {row}",
                self.label_column
            )));
        }
        let unsupported = || {
            Error::InvalidInput(format!(
                "label column '{}' has unsupported type {:?}",
                self.label_column,
                labels.data_type()
            ))
        };
        let label = match labels.data_type() {
            DataType::Float64 => labels
                .as_any()
                .downcast_ref::<Float64Array>()
                .map(|a| Label::Scalar(a.value(row))),
            DataType::Float32 => labels
                .as_any()
                .downcast_ref::<Float32Array>()
                .map(|a| Label::Scalar(f64::from(a.value(row)))),
            DataType::Int64 => labels
                .as_any()
                .downcast_ref::<Int64Array>()
                .map(|a| self.integer_label(a.value(row))),
            DataType::Int32 => labels
                .as_any()
                .downcast_ref::<Int32Array>()
                .map(|a| self.integer_label(i64::from(a.value(row)))),
            _ => None,
        };
        label.ok_or_else(unsupported)
    }

    #[allow(clippy::cast_precision_loss)]
    fn integer_label(&self, value: i64) -> Label {
        match u32::try_from(value) {
            Ok(class) if self.categorical => Label::Class(class),
            _ => Label::Scalar(value as f64),
        }
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::InvalidInput(format!("record batch has no column '{name}'")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::InvalidInput(format!("column '{name}' must be Utf8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Drug_ID", DataType::Utf8, false),
            Field::new("Drug", DataType::Utf8, true),
            Field::new("Y", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["d1", "d2", "d3"])),
                Arc::new(StringArray::from(vec![Some("CCO"), None, Some("CCN")])),
                Arc::new(Float64Array::from(vec![0.1, 0.2, 0.3])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_load_record_batch() {
        let source = RecordBatchSource::new("Drug_ID", "Y").entity("Drug");
        let dataset = source.load("caco2", &[batch()]).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get("d1").and_then(|r| r.field("Drug")), Some("CCO"));
        assert_eq!(dataset.get("d2").and_then(|r| r.field("Drug")), None);
        assert_eq!(dataset.get("d3").map(Record::label), Some(&Label::Scalar(0.3)));
    }

    #[test]
    fn test_missing_column() {
        let source = RecordBatchSource::new("Drug_ID", "Y").entity("Target");
        assert!(matches!(
            source.load("caco2", &[batch()]),
            Err(Error::InvalidInput(_))
        ));
    }
}

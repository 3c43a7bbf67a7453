//! Entity keys for leakage-aware grouping
//!
//! An [`EntityKeyer`] maps a record to the value that must never straddle two
//! partitions: the scaffold of a molecule, the identity of a target protein,
//! the tuple of cold columns. Keyers are pure; a record whose entity cannot be
//! canonicalized yields a [`KeyDerivationError`] and is left out of
//! group-aware splits.

use crate::dataset::Record;
use crate::error::KeyDerivationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Separator between column values in a multi-column key.
const KEY_SEPARATOR: char = '\u{1f}';

/// Canonical grouping value of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wrap a canonical key string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.replace(KEY_SEPARATOR, "|"))
    }
}

/// Derives the leakage-relevant grouping key of a record.
pub trait EntityKeyer: Send + Sync {
    /// Compute the key for `record`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyDerivationError`] when the entity field is missing or
    /// cannot be canonicalized.
    fn key(&self, record: &Record) -> Result<EntityKey, KeyDerivationError>;

    /// Short description used in logs and error context.
    fn describe(&self) -> String;
}

/// Groups records by the raw value of one or more entity fields.
///
/// Columns are kept in sorted order, so `["Target", "Drug"]` and
/// `["Drug", "Target"]` produce the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKeyer {
    columns: Vec<String>,
}

impl ColumnKeyer {
    /// Key on a single column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            columns: vec![column.into()],
        }
    }

    /// Key on the joint value of several columns.
    #[must_use]
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        columns.sort();
        columns.dedup();
        Self { columns }
    }

    /// Columns making up the key, sorted.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl EntityKeyer for ColumnKeyer {
    fn key(&self, record: &Record) -> Result<EntityKey, KeyDerivationError> {
        let mut key = String::new();
        for (position, column) in self.columns.iter().enumerate() {
            let value = record.field(column).ok_or_else(|| {
                KeyDerivationError::new(record.id(), column.as_str(), "field is missing")
            })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(KeyDerivationError::new(
                    record.id(),
                    column.as_str(),
                    "field is blank",
                ));
            }
            if position > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(value);
        }
        Ok(EntityKey(key))
    }

    fn describe(&self) -> String {
        format!("columns[{}]", self.columns.join(","))
    }
}

/// External structure canonicalization capability (e.g. scaffold extraction).
///
/// Returns `None` when the structure cannot be parsed.
pub trait Canonicalizer: Send + Sync {
    /// Canonical grouping string for `structure`.
    fn canonicalize(&self, structure: &str) -> Option<String>;
}

impl<F> Canonicalizer for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn canonicalize(&self, structure: &str) -> Option<String> {
        self(structure)
    }
}

/// Groups records by the canonical scaffold of a structure field.
#[derive(Clone)]
pub struct ScaffoldKeyer {
    column: String,
    canonicalizer: Arc<dyn Canonicalizer>,
}

impl ScaffoldKeyer {
    /// Use `canonicalizer` on the structure stored in `column`.
    pub fn new(column: impl Into<String>, canonicalizer: impl Canonicalizer + 'static) -> Self {
        Self {
            column: column.into(),
            canonicalizer: Arc::new(canonicalizer),
        }
    }

    /// Structure column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Debug for ScaffoldKeyer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaffoldKeyer")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

impl EntityKeyer for ScaffoldKeyer {
    fn key(&self, record: &Record) -> Result<EntityKey, KeyDerivationError> {
        let structure = record.field(&self.column).ok_or_else(|| {
            KeyDerivationError::new(record.id(), self.column.as_str(), "field is missing")
        })?;
        self.canonicalizer
            .canonicalize(structure)
            .map(EntityKey)
            .ok_or_else(|| {
                KeyDerivationError::new(
                    record.id(),
                    self.column.as_str(),
                    format!("structure '{structure}' could not be canonicalized"),
                )
            })
    }

    fn describe(&self) -> String {
        format!("scaffold[{}]", self.column)
    }
}

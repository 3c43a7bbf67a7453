//! Oracles for generation tasks
//!
//! An [`Oracle`] scores a candidate structure (e.g. a SMILES string). The
//! chemistry behind real oracles lives outside this crate; any
//! `Fn(&str) -> Result<f64>` closure is an oracle, and an [`OracleRegistry`]
//! resolves them by name.
//!
//! ## Usage
//!
//! ```rust
//! use tdc_bench::oracle::{MeanKind, Modifier, MultiObjective, Oracle, OracleRegistry};
//!
//! let mut registry = OracleRegistry::new();
//! registry.register("length", |smiles: &str| Ok(smiles.len() as f64))?;
//!
//! let length = registry.get("length")?;
//! assert_eq!(length.score("CCO")?, 3.0);
//!
//! let mpo = MultiObjective::new(MeanKind::Arithmetic)
//!     .component(length, Modifier::thresholded_linear(6.0)?);
//! assert_eq!(mpo.score("CCO")?, 0.5);
//! # Ok::<(), tdc_bench::Error>(())
//! ```

mod modifier;

pub use modifier::Modifier;

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Scores a candidate structure.
pub trait Oracle: Send + Sync {
    /// Score one candidate.
    ///
    /// # Errors
    ///
    /// Implementation specific, typically [`Error::InvalidInput`] for a
    /// candidate that cannot be parsed.
    fn score(&self, candidate: &str) -> Result<f64>;

    /// Score several candidates, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first error returned by [`Oracle::score`].
    fn score_batch(&self, candidates: &[&str]) -> Result<Vec<f64>> {
        candidates.iter().map(|candidate| self.score(candidate)).collect()
    }
}

impl<F> Oracle for F
where
    F: Fn(&str) -> Result<f64> + Send + Sync,
{
    fn score(&self, candidate: &str) -> Result<f64> {
        self(candidate)
    }
}

/// Named oracles.
#[derive(Default, Clone)]
pub struct OracleRegistry {
    oracles: BTreeMap<String, Arc<dyn Oracle>>,
}

impl OracleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scoring function under `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is already taken.
    pub fn register<F>(&mut self, name: &str, oracle: F) -> Result<()>
    where
        F: Fn(&str) -> Result<f64> + Send + Sync + 'static,
    {
        self.register_shared(name, Arc::new(oracle))
    }

    /// Register an already shared oracle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is already taken.
    pub fn register_shared(&mut self, name: &str, oracle: Arc<dyn Oracle>) -> Result<()> {
        let key = name.trim().to_ascii_lowercase();
        if self.oracles.contains_key(&key) {
            return Err(Error::InvalidInput(format!("oracle '{name}' is already registered")));
        }
        tracing::debug!(oracle = %key, "oracle registered");
        self.oracles.insert(key, oracle);
        Ok(())
    }

    /// Look up an oracle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOracle`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Oracle>> {
        self.oracles
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnknownOracle(name.to_string()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.oracles.keys().map(String::as_str).collect()
    }

    /// Number of registered oracles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl fmt::Debug for OracleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleRegistry")
            .field("oracles", &self.names())
            .finish()
    }
}

/// How component scores are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeanKind {
    /// Arithmetic mean
    Arithmetic,
    /// Geometric mean; any zero component gives zero
    #[default]
    Geometric,
}

impl MeanKind {
    /// Combine `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for no values, or a negative value under
    /// the geometric mean.
    #[allow(clippy::cast_precision_loss)]
    pub fn combine(self, values: &[f64]) -> Result<f64> {
        if values.is_empty() {
            return Err(Error::InvalidInput("cannot average zero scores".to_string()));
        }
        let n = values.len() as f64;
        match self {
            Self::Arithmetic => Ok(values.iter().sum::<f64>() / n),
            Self::Geometric => {
                if let Some(negative) = values.iter().find(|v| **v < 0.0) {
                    return Err(Error::InvalidInput(format!(
                        "geometric mean is undefined for negative score {negative}"
                    )));
                }
                if values.iter().any(|v| *v == 0.0) {
                    return Ok(0.0);
                }
                Ok((values.iter().map(|v| v.ln()).sum::<f64>() / n).exp())
            }
        }
    }
}

impl FromStr for MeanKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arithmetic" => Ok(Self::Arithmetic),
            "geometric" => Ok(Self::Geometric),
            other => Err(Error::InvalidInput(format!(
                "unknown mean '{other}', expected 'arithmetic' or 'geometric'"
            ))),
        }
    }
}

/// Multi-property objective: each component oracle's score passes through its
/// modifier, then the modified scores are averaged.
#[derive(Clone, Default)]
pub struct MultiObjective {
    components: Vec<(Arc<dyn Oracle>, Modifier)>,
    mean: MeanKind,
}

impl MultiObjective {
    /// Objective without components.
    #[must_use]
    pub const fn new(mean: MeanKind) -> Self {
        Self {
            components: Vec::new(),
            mean,
        }
    }

    /// Add a component.
    #[must_use]
    pub fn component(mut self, oracle: Arc<dyn Oracle>, modifier: Modifier) -> Self {
        self.components.push((oracle, modifier));
        self
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if there are no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Oracle for MultiObjective {
    fn score(&self, candidate: &str) -> Result<f64> {
        let scores = self
            .components
            .iter()
            .map(|(oracle, modifier)| oracle.score(candidate).map(|raw| modifier.apply(raw)))
            .collect::<Result<Vec<f64>>>()?;
        self.mean.combine(&scores)
    }
}

impl fmt::Debug for MultiObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiObjective")
            .field("components", &self.components.len())
            .field("mean", &self.mean)
            .finish()
    }
}

//! Metric evaluation with a fixed `(y_true, y_pred) -> scalar | vector` contract
//!
//! Metric names resolve to an enumerated [`MetricName`]; unknown names are
//! rejected at the boundary. Each name has one input convention
//! ([`PredictionKind`]) and no input is coerced into another.
//!
//! | Layout of `y_true` / `y_pred` | Result |
//! |-------------------------------|--------|
//! | all `Label::Scalar`           | `MetricValue::Scalar` |
//! | all `Label::Vector` (width w) | `MetricValue::Vector` with w values (one per output) |
//! | all `Label::Class`            | `MetricValue::Scalar` |
//!
//! ## Usage
//!
//! ```rust
//! use tdc_bench::dataset::Label;
//! use tdc_bench::metric::{evaluate, MetricValue};
//!
//! let y_true = vec![Label::Scalar(0.0), Label::Scalar(1.0)];
//! let y_pred = vec![Label::Scalar(0.2), Label::Scalar(0.9)];
//! assert_eq!(evaluate("roc-auc", &y_true, &y_pred)?, MetricValue::Scalar(1.0));
//! # Ok::<(), tdc_bench::Error>(())
//! ```

pub mod classification;
pub mod regression;

use crate::dataset::Label;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scoring function over real values.
type ValueFn = fn(&[f64], &[f64]) -> Result<f64>;

/// Scoring function over class indices.
type LabelFn = fn(&[u32], &[u32]) -> Result<f64>;

/// What a metric expects in `y_pred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    /// Real-valued predictions, same scale as `y_true`
    Value,
    /// Score or probability of the positive class; `y_true` holds 0/1
    Probability,
    /// Hard labels, 0/1 for binary metrics or class indices for accuracy
    BinaryLabel,
    /// Hard class indices (`Label::Class`)
    ClassLabel,
}

/// Known metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricName {
    /// Mean absolute error
    Mae,
    /// Mean squared error
    Mse,
    /// Root mean squared error
    Rmse,
    /// Coefficient of determination
    R2,
    /// Pearson correlation
    Pcc,
    /// Spearman rank correlation
    Spearman,
    /// Area under the ROC curve
    RocAuc,
    /// Area under the precision-recall curve (average precision)
    PrAuc,
    /// Accuracy
    Accuracy,
    /// Binary precision
    Precision,
    /// Binary recall
    Recall,
    /// Binary F1
    F1,
    /// Micro-averaged F1
    MicroF1,
    /// Macro-averaged F1
    MacroF1,
    /// Cohen's kappa
    Kappa,
}

impl MetricName {
    /// All metrics.
    pub const ALL: [Self; 15] = [
        Self::Mae,
        Self::Mse,
        Self::Rmse,
        Self::R2,
        Self::Pcc,
        Self::Spearman,
        Self::RocAuc,
        Self::PrAuc,
        Self::Accuracy,
        Self::Precision,
        Self::Recall,
        Self::F1,
        Self::MicroF1,
        Self::MacroF1,
        Self::Kappa,
    ];

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mae => "mae",
            Self::Mse => "mse",
            Self::Rmse => "rmse",
            Self::R2 => "r2",
            Self::Pcc => "pcc",
            Self::Spearman => "spearman",
            Self::RocAuc => "roc-auc",
            Self::PrAuc => "pr-auc",
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1 => "f1",
            Self::MicroF1 => "micro-f1",
            Self::MacroF1 => "macro-f1",
            Self::Kappa => "kappa",
        }
    }

    /// Whether higher values are better for this metric.
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        !matches!(self, Self::Mae | Self::Mse | Self::Rmse)
    }

    /// Input convention for `y_pred`.
    #[must_use]
    pub const fn expects(self) -> PredictionKind {
        match self {
            Self::Mae | Self::Mse | Self::Rmse | Self::R2 | Self::Pcc | Self::Spearman => {
                PredictionKind::Value
            }
            Self::RocAuc | Self::PrAuc => PredictionKind::Probability,
            Self::Accuracy | Self::Precision | Self::Recall | Self::F1 => {
                PredictionKind::BinaryLabel
            }
            Self::MicroF1 | Self::MacroF1 | Self::Kappa => PredictionKind::ClassLabel,
        }
    }

    /// Best attainable value.
    #[must_use]
    pub const fn ideal(self) -> f64 {
        if self.higher_is_better() {
            1.0
        } else {
            0.0
        }
    }

    const fn value_fn(self) -> Option<ValueFn> {
        Some(match self {
            Self::Mae => regression::mae,
            Self::Mse => regression::mse,
            Self::Rmse => regression::rmse,
            Self::R2 => regression::r2,
            Self::Pcc => regression::pearson,
            Self::Spearman => regression::spearman,
            Self::RocAuc => classification::roc_auc,
            Self::PrAuc => classification::pr_auc,
            _ => return None,
        })
    }

    const fn label_fn(self) -> Option<LabelFn> {
        Some(match self {
            Self::Accuracy => classification::accuracy,
            Self::Precision => classification::precision,
            Self::Recall => classification::recall,
            Self::F1 => classification::f1,
            Self::MicroF1 => classification::micro_f1,
            Self::MacroF1 => classification::macro_f1,
            Self::Kappa => classification::kappa,
            _ => return None,
        })
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let name = match normalized.as_str() {
            "mae" => Self::Mae,
            "mse" => Self::Mse,
            "rmse" => Self::Rmse,
            "r2" => Self::R2,
            "pcc" | "pearson" | "pearsonr" => Self::Pcc,
            "spearman" | "spearmanr" => Self::Spearman,
            "roc-auc" | "auroc" => Self::RocAuc,
            "pr-auc" | "auprc" | "average-precision" => Self::PrAuc,
            "accuracy" => Self::Accuracy,
            "precision" => Self::Precision,
            "recall" => Self::Recall,
            "f1" => Self::F1,
            "micro-f1" => Self::MicroF1,
            "macro-f1" => Self::MacroF1,
            "kappa" | "cohen-kappa" => Self::Kappa,
            _ => return Err(Error::UnknownMetric(s.to_string())),
        };
        Ok(name)
    }
}

impl TryFrom<String> for MetricName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.as_str().to_string()
    }
}

/// Metric result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// Single value
    Scalar(f64),
    /// One value per output column
    Vector(Vec<f64>),
}

impl MetricValue {
    /// Scalar summary: the value itself, or the mean over outputs.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Vector(values) if values.is_empty() => f64::NAN,
            Self::Vector(values) => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

/// Evaluates one metric against aligned `y_true` / `y_pred` slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricEvaluator {
    name: MetricName,
}

impl MetricEvaluator {
    /// Resolve a metric by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetric`] if the name is not known.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self { name: name.parse()? })
    }

    /// Evaluator for an already resolved metric.
    #[must_use]
    pub const fn from_name(name: MetricName) -> Self {
        Self { name }
    }

    /// Metric being evaluated.
    #[must_use]
    pub const fn name(&self) -> MetricName {
        self.name
    }

    /// Score `y_pred` against `y_true`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if lengths or label layouts differ, or the
    ///   layout does not fit the metric's convention
    /// - [`Error::InvalidInput`] for empty input, non-finite values, labels
    ///   outside {0, 1} for binary inputs, or undefined metrics (e.g. a single
    ///   class for ROC-AUC)
    pub fn evaluate(&self, y_true: &[Label], y_pred: &[Label]) -> Result<MetricValue> {
        if y_true.len() != y_pred.len() {
            return Err(self.mismatch(
                format!("{} predictions", y_true.len()),
                format!("{} predictions", y_pred.len()),
            ));
        }
        if y_true.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} needs at least one sample",
                self.name
            )));
        }
        match self.name.expects() {
            PredictionKind::Value | PredictionKind::Probability => self.evaluate_values(y_true, y_pred),
            PredictionKind::BinaryLabel | PredictionKind::ClassLabel => {
                self.evaluate_labels(y_true, y_pred)
            }
        }
    }

    fn evaluate_values(&self, y_true: &[Label], y_pred: &[Label]) -> Result<MetricValue> {
        let score = self.name.value_fn().ok_or_else(|| Error::Other(format!("{} is not value-based", self.name)))?;
        match (&y_true[0], &y_pred[0]) {
            (Label::Scalar(_), Label::Scalar(_)) => {
                let t = self.scalars(y_true)?;
                let p = self.scalars(y_pred)?;
                if self.name.expects() == PredictionKind::Probability {
                    check_binary(&t, self.name)?;
                }
                score(&t, &p).map(MetricValue::Scalar)
            }
            (Label::Vector(first), Label::Vector(_)) => {
                let width = first.len();
                let t = self.columns(y_true, width)?;
                let p = self.columns(y_pred, width)?;
                t.iter()
                    .zip(&p)
                    .map(|(t, p)| {
                        if self.name.expects() == PredictionKind::Probability {
                            check_binary(t, self.name)?;
                        }
                        score(t, p)
                    })
                    .collect::<Result<Vec<f64>>>()
                    .map(MetricValue::Vector)
            }
            (t, p) => Err(self.mismatch(layout(t), layout(p))),
        }
    }

    fn evaluate_labels(&self, y_true: &[Label], y_pred: &[Label]) -> Result<MetricValue> {
        let score = self.name.label_fn().ok_or_else(|| Error::Other(format!("{} is not label-based", self.name)))?;
        match (&y_true[0], &y_pred[0]) {
            (Label::Class(_), Label::Class(_)) => {
                let t = self.classes(y_true)?;
                let p = self.classes(y_pred)?;
                score(&t, &p).map(MetricValue::Scalar)
            }
            (Label::Scalar(_), Label::Scalar(_))
                if self.name.expects() == PredictionKind::BinaryLabel =>
            {
                let t = binary_labels(&self.scalars(y_true)?, self.name)?;
                let p = binary_labels(&self.scalars(y_pred)?, self.name)?;
                score(&t, &p).map(MetricValue::Scalar)
            }
            (Label::Vector(first), Label::Vector(_))
                if self.name.expects() == PredictionKind::BinaryLabel =>
            {
                let width = first.len();
                let t = self.columns(y_true, width)?;
                let p = self.columns(y_pred, width)?;
                t.iter()
                    .zip(&p)
                    .map(|(t, p)| {
                        score(&binary_labels(t, self.name)?, &binary_labels(p, self.name)?)
                    })
                    .collect::<Result<Vec<f64>>>()
                    .map(MetricValue::Vector)
            }
            (t, p) => Err(self.mismatch(layout(t), layout(p))),
        }
    }

    fn scalars(&self, labels: &[Label]) -> Result<Vec<f64>> {
        labels
            .iter()
            .map(|label| match label {
                Label::Scalar(v) if v.is_finite() => Ok(*v),
                Label::Scalar(v) => Err(Error::InvalidInput(format!(
                    "{} received non-finite value {v}",
                    self.name
                ))),
                other => Err(self.mismatch("scalar labels".to_string(), layout(other))),
            })
            .collect()
    }

    /// Transpose row vectors into per-output columns.
    fn columns(&self, labels: &[Label], width: usize) -> Result<Vec<Vec<f64>>> {
        let mut columns = vec![Vec::with_capacity(labels.len()); width];
        for label in labels {
            match label {
                Label::Vector(row) if row.len() == width => {
                    for (column, value) in columns.iter_mut().zip(row) {
                        if !value.is_finite() {
                            return Err(Error::InvalidInput(format!(
                                "{} received non-finite value {value}",
                                self.name
                            )));
                        }
                        column.push(*value);
                    }
                }
                other => {
                    return Err(self.mismatch(format!("vectors of width {width}"), layout(other)))
                }
            }
        }
        Ok(columns)
    }

    fn classes(&self, labels: &[Label]) -> Result<Vec<u32>> {
        labels
            .iter()
            .map(|label| match label {
                Label::Class(c) => Ok(*c),
                other => Err(self.mismatch("class labels".to_string(), layout(other))),
            })
            .collect()
    }

    fn mismatch(&self, expected: String, actual: String) -> Error {
        Error::ShapeMismatch {
            metric: self.name.to_string(),
            expected,
            actual,
        }
    }
}

fn layout(label: &Label) -> String {
    match label {
        Label::Scalar(_) => "scalar".to_string(),
        Label::Vector(v) => format!("vector of width {}", v.len()),
        Label::Class(_) => "class".to_string(),
    }
}

fn check_binary(values: &[f64], metric: MetricName) -> Result<()> {
    if let Some(bad) = values.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(Error::InvalidInput(format!(
            "{metric} expects 0/1 ground truth, found {bad}"
        )));
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn binary_labels(values: &[f64], metric: MetricName) -> Result<Vec<u32>> {
    check_binary(values, metric)?;
    Ok(values.iter().map(|&v| v as u32).collect())
}

/// Resolve `name` and evaluate it.
///
/// # Errors
///
/// Returns [`Error::UnknownMetric`] for an unknown name, otherwise the errors of
/// [`MetricEvaluator::evaluate`].
pub fn evaluate(name: &str, y_true: &[Label], y_pred: &[Label]) -> Result<MetricValue> {
    MetricEvaluator::new(name)?.evaluate(y_true, y_pred)
}

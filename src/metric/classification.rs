//! Classification metrics
//!
//! Ranking metrics (`roc-auc`, `pr-auc`) take scores or probabilities for the
//! positive class. Label metrics take hard class indices; binary label metrics
//! treat class 1 as positive.

use super::regression::average_ranks;
use crate::{Error, Result};
use std::collections::BTreeSet;

fn count_positives(y_true: &[f64]) -> Result<(usize, usize)> {
    let positives = y_true.iter().filter(|&&t| t == 1.0).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(Error::InvalidInput(
            "ranking metrics need both classes present in y_true".to_string(),
        ));
    }
    Ok((positives, negatives))
}

/// Area under the ROC curve (Mann-Whitney formulation, ties count half).
#[allow(clippy::cast_precision_loss)]
pub fn roc_auc(y_true: &[f64], y_score: &[f64]) -> Result<f64> {
    let (positives, negatives) = count_positives(y_true)?;
    let ranks = average_ranks(y_score);
    let positive_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1.0)
        .map(|(_, &r)| r)
        .sum();
    let p = positives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Area under the precision-recall curve as average precision.
#[allow(clippy::cast_precision_loss)]
pub fn pr_auc(y_true: &[f64], y_score: &[f64]) -> Result<f64> {
    let (positives, _) = count_positives(y_true)?;
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let mut true_pos = 0usize;
    let mut false_pos = 0usize;
    let mut previous_recall = 0.0;
    let mut average_precision = 0.0;
    let mut i = 0;
    while i < order.len() {
        // Consume one threshold: every sample sharing this score.
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if y_true[order[i]] == 1.0 {
                true_pos += 1;
            } else {
                false_pos += 1;
            }
            i += 1;
        }
        let precision = true_pos as f64 / (true_pos + false_pos) as f64;
        let recall = true_pos as f64 / positives as f64;
        average_precision += (recall - previous_recall) * precision;
        previous_recall = recall;
    }
    Ok(average_precision)
}

/// Fraction of exact label matches.
#[allow(clippy::cast_precision_loss, clippy::unnecessary_wraps)]
pub fn accuracy(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Counts {
    fn for_class(y_true: &[u32], y_pred: &[u32], class: u32) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == class, p == class) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    #[allow(clippy::cast_precision_loss)]
    fn precision(self) -> f64 {
        if self.tp + self.fp == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fp) as f64
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn recall(self) -> f64 {
        if self.tp + self.fn_ == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fn_) as f64
        }
    }

    fn f1(self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ensure_binary(y_true: &[u32], y_pred: &[u32], metric: &str) -> Result<()> {
    if let Some(bad) = y_true.iter().chain(y_pred).find(|&&c| c > 1) {
        return Err(Error::InvalidInput(format!(
            "{metric} is a binary metric but found class {bad}; use macro-f1 or micro-f1"
        )));
    }
    Ok(())
}

/// Binary precision for class 1 (0.0 when nothing is predicted positive).
pub fn precision(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    ensure_binary(y_true, y_pred, "precision")?;
    Ok(Counts::for_class(y_true, y_pred, 1).precision())
}

/// Binary recall for class 1.
pub fn recall(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    ensure_binary(y_true, y_pred, "recall")?;
    Ok(Counts::for_class(y_true, y_pred, 1).recall())
}

/// Binary F1 for class 1.
pub fn f1(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    ensure_binary(y_true, y_pred, "f1")?;
    Ok(Counts::for_class(y_true, y_pred, 1).f1())
}

/// Micro-averaged F1; equals accuracy for single-label problems.
pub fn micro_f1(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    accuracy(y_true, y_pred)
}

/// Unweighted mean of per-class F1 over every class seen in either input.
#[allow(clippy::cast_precision_loss, clippy::unnecessary_wraps)]
pub fn macro_f1(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    let classes: BTreeSet<u32> = y_true.iter().chain(y_pred).copied().collect();
    let total: f64 = classes
        .iter()
        .map(|&class| Counts::for_class(y_true, y_pred, class).f1())
        .sum();
    Ok(total / classes.len() as f64)
}

/// Cohen's kappa.
#[allow(clippy::cast_precision_loss, clippy::unnecessary_wraps)]
pub fn kappa(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    let n = y_true.len() as f64;
    let classes: BTreeSet<u32> = y_true.iter().chain(y_pred).copied().collect();
    let observed = accuracy(y_true, y_pred)?;
    let expected: f64 = classes
        .iter()
        .map(|&class| {
            let t = y_true.iter().filter(|&&c| c == class).count() as f64;
            let p = y_pred.iter().filter(|&&c| c == class).count() as f64;
            (t / n) * (p / n)
        })
        .sum();
    if (1.0 - expected).abs() < f64::EPSILON {
        // Single class on both sides: agreement is perfect by construction.
        return Ok(1.0);
    }
    Ok((observed - expected) / (1.0 - expected))
}

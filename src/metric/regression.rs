//! Regression metrics over real-valued targets

use crate::{Error, Result};

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean absolute error.
#[allow(clippy::cast_precision_loss, clippy::unnecessary_wraps)]
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(total / y_true.len() as f64)
}

/// Mean squared error.
#[allow(clippy::cast_precision_loss, clippy::unnecessary_wraps)]
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(total / y_true.len() as f64)
}

/// Root mean squared error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    mse(y_true, y_pred).map(f64::sqrt)
}

/// Coefficient of determination.
///
/// A constant `y_true` scores 1.0 on an exact fit and 0.0 otherwise.
#[allow(clippy::unnecessary_wraps)]
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let mean_true = mean(y_true);
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean_true).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Pearson correlation coefficient.
pub fn pearson(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let mean_true = mean(y_true);
    let mean_pred = mean(y_pred);
    let mut cov = 0.0;
    let mut var_true = 0.0;
    let mut var_pred = 0.0;
    for (t, p) in y_true.iter().zip(y_pred) {
        let dt = t - mean_true;
        let dp = p - mean_pred;
        cov += dt * dp;
        var_true += dt * dt;
        var_pred += dp * dp;
    }
    if var_true == 0.0 || var_pred == 0.0 {
        return Err(Error::InvalidInput(
            "correlation is undefined for a constant input".to_string(),
        ));
    }
    Ok(cov / (var_true.sqrt() * var_pred.sqrt()))
}

/// Spearman rank correlation (average ranks for ties).
pub fn spearman(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    pearson(&average_ranks(y_true), &average_ranks(y_pred))
}

/// 1-based ranks, ties share the mean of their positions.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold equal values; ranks are start+1..=end.
        let rank = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_on_exact_match_are_zero() {
        let y = [1.0, 2.0, 3.5];
        assert_eq!(mae(&y, &y).unwrap(), 0.0);
        assert_eq!(mse(&y, &y).unwrap(), 0.0);
        assert_eq!(rmse(&y, &y).unwrap(), 0.0);
        assert!((r2(&y, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mae_mse_values() {
        let t = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 1.0];
        assert!((mae(&t, &p).unwrap() - 1.0).abs() < 1e-12);
        assert!((mse(&t, &p).unwrap() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_r2_mean_prediction_is_zero() {
        let t = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!(r2(&t, &p).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_pearson_and_spearman() {
        let t = [1.0, 2.0, 3.0, 4.0];
        let p = [10.0, 20.0, 30.0, 400.0];
        assert!(pearson(&t, &p).unwrap() < 1.0);
        assert!((spearman(&t, &p).unwrap() - 1.0).abs() < 1e-12);
        assert!(pearson(&t, &[1.0; 4]).is_err());
    }

    #[test]
    fn test_average_ranks_ties() {
        assert_eq!(average_ranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
    }
}

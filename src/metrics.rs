//! Regression metrics for evaluating model fit

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

fn check_inputs(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.is_empty() {
        return Err(Error::EmptyDataset);
    }
    Error::check_len(y_true.len(), y_pred.len())
}

/// Mean Squared Error: (1/n) * Σ(y_true - y_pred)²
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let n = y_true.len() as f64;
    Ok(y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n)
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(y_true, y_pred)?.sqrt())
}

/// Mean Absolute Error: (1/n) * Σ|y_true - y_pred|
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let n = y_true.len() as f64;
    Ok(y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n)
}

/// R² = 1 - SS_res / SS_tot, or 0 when the targets are constant
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot < 1e-12 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Collection of regression metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Calculate all regression metrics
    pub fn calculate(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        let mse = mean_squared_error(y_true, y_pred)?;
        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae: mean_absolute_error(y_true, y_pred)?,
            r2: r_squared(y_true, y_pred)?,
            n_samples: y_true.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::longley;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perfect_predictor_has_zero_mse() {
        let data = longley();
        let mse = mean_squared_error(&data.targets, &data.targets).unwrap();
        assert_eq!(mse, 0.0);
        assert_abs_diff_eq!(r_squared(&data.targets, &data.targets).unwrap(), 1.0);
    }

    #[test]
    fn test_imperfect_predictor_has_positive_mse() {
        let data = longley();
        let mut preds = data.targets.clone();
        preds[3] += 0.5;
        let mse = mean_squared_error(&data.targets, &preds).unwrap();
        assert_abs_diff_eq!(mse, 0.25 / 16.0, epsilon = 1e-12);
        assert!(mse > 0.0);
    }

    #[test]
    fn test_metrics_bundle() {
        let y_true = [1.0, 2.0, 3.0, 4.0];
        let y_pred = [1.5, 2.0, 2.5, 4.0];
        let m = RegressionMetrics::calculate(&y_true, &y_pred).unwrap();
        assert_abs_diff_eq!(m.mse, 0.125);
        assert_abs_diff_eq!(m.rmse, 0.125f64.sqrt());
        assert_abs_diff_eq!(m.mae, 0.25);
        assert_abs_diff_eq!(m.r2, 1.0 - 0.5 / 5.0);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(mean_squared_error(&[], &[]), Err(Error::EmptyDataset)));
        assert!(matches!(
            mean_squared_error(&[1.0, 2.0], &[1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_constant_targets_r2() {
        assert_eq!(r_squared(&[2.0, 2.0], &[1.0, 3.0]).unwrap(), 0.0);
    }
}

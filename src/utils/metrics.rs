//! Regression metrics for comparing estimated and measured widths

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Mean Squared Error
pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let diff = y_true - y_pred;
    diff.mapv(|x| x * x).mean().unwrap_or(0.0)
}

/// Root Mean Squared Error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Mean Absolute Error
pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let diff = y_true - y_pred;
    diff.mapv(f64::abs).mean().unwrap_or(0.0)
}

/// Mean Absolute Percentage Error over the non-zero targets
pub fn mape(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let (sum, n) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, _)| **t != 0.0)
        .fold((0.0, 0usize), |(sum, n), (t, p)| (sum + ((t - p) / t).abs(), n + 1));

    if n == 0 {
        return 0.0;
    }
    (sum / n as f64) * 100.0
}

/// R² score (coefficient of determination)
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    }
}

/// All regression metrics at once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
    pub r2: f64,
}

impl RegressionReport {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mse = mse(y_true, y_pred);
        Self {
            mse,
            rmse: mse.sqrt(),
            mae: mae(y_true, y_pred),
            mape: mape(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
        }
    }
}

impl std::fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MSE: {:.2}, RMSE: {:.2} um, MAE: {:.2} um, MAPE: {:.2}%, R²: {:.4}",
            self.mse, self.rmse, self.mae, self.mape, self.r2
        )
    }
}

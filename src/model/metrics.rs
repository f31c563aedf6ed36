//! Regression accuracy metrics

use serde::{Deserialize, Serialize};

/// Accuracy of one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    pub rsq: f64,
}

impl Metrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            rsq: rsq(actual, predicted),
        }
    }
}

/// Mean Absolute Error
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

/// Root Mean Squared Error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}

/// Squared Pearson correlation between outcome and prediction.
///
/// NaN when either side is constant.
pub fn rsq(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.len() < 2 {
        return f64::NAN;
    }
    let n = actual.len() as f64;
    let mean_a = actual.iter().sum::<f64>() / n;
    let mean_p = predicted.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_p = 0.0;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        cov += (a - mean_a) * (p - mean_p);
        var_a += (a - mean_a).powi(2);
        var_p += (p - mean_p).powi(2);
    }
    if var_a == 0.0 || var_p == 0.0 {
        return f64::NAN;
    }
    cov * cov / (var_a * var_p)
}

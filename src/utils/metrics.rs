//! Accuracy metrics for hold-out evaluation.

use crate::error::{ForecastError, Result};

/// Accuracy of a forecast against held-out observations, in original units.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// MAE scaled by the in-sample seasonal naive MAE of the training data
    /// (None if that scale is zero or cannot be computed)
    pub mase: Option<f64>,
    /// Fraction of actuals inside the forecast band
    pub coverage: Option<f64>,
}

/// Compare `predicted` with `actual` for a hold-out slice following `training`.
///
/// `seasonal_period` sets the lag of the naive forecast used to scale MASE.
pub fn calculate_metrics(
    training: &[f64],
    actual: &[f64],
    predicted: &[f64],
    seasonal_period: usize,
) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let mae = mae(actual, predicted);
    let rmse = rmse(actual, predicted);

    let mape = if actual.contains(&0.0) {
        None
    } else {
        let sum: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| ((a - p) / a).abs())
            .sum();
        Some(100.0 * sum / n)
    };

    let mase = naive_scale(training, seasonal_period.max(1)).map(|scale| mae / scale);

    Ok(AccuracyMetrics {
        mae,
        rmse,
        mape,
        smape: smape(actual, predicted),
        mase,
        coverage: None,
    })
}

/// In-sample MAE of the lag-`period` naive forecast.
fn naive_scale(training: &[f64], period: usize) -> Option<f64> {
    if training.len() <= period {
        return None;
    }
    let scale = training
        .iter()
        .skip(period)
        .zip(training)
        .map(|(curr, prev)| (curr - prev).abs())
        .sum::<f64>()
        / (training.len() - period) as f64;
    (scale > 0.0).then_some(scale)
}

/// Mean absolute error; NaN for empty or mismatched input.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error; NaN for empty or mismatched input.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// Symmetric MAPE in percent.
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let n = actual.len() as f64;
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        * 100.0
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_prediction() {
        let training = [1.0, 3.0, 2.0, 4.0];
        let actual = [1.0, 2.0, 3.0];
        let metrics = calculate_metrics(&training, &actual, &actual, 1).unwrap();

        assert_relative_eq!(metrics.mae, 0.0);
        assert_relative_eq!(metrics.rmse, 0.0);
        assert_relative_eq!(metrics.smape, 0.0);
        assert_eq!(metrics.mase, Some(0.0));
    }

    #[test]
    fn known_values() {
        let training = [10.0, 12.0, 11.0, 13.0];
        let actual = [1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = [1.5, 2.5, 2.5, 4.5, 4.5];

        let metrics = calculate_metrics(&training, &actual, &predicted, 1).unwrap();

        assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-12);
        assert_relative_eq!(metrics.rmse, 0.5, epsilon = 1e-12);
        // naive scale: (2 + 1 + 2) / 3
        assert_relative_eq!(metrics.mase.unwrap(), 0.5 / (5.0 / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn seasonal_scale_uses_period() {
        let training = [1.0, 2.0, 1.5, 2.5];
        let metrics = calculate_metrics(&training, &[1.0], &[2.0], 2).unwrap();
        assert_relative_eq!(metrics.mase.unwrap(), 1.0 / 0.5, epsilon = 1e-12);
    }

    #[test]
    fn mape_undefined_with_zero_actuals() {
        let metrics = calculate_metrics(&[1.0, 2.0], &[0.0, 1.0], &[0.1, 1.1], 1).unwrap();
        assert!(metrics.mape.is_none());
        assert!(metrics.smape.is_finite());
    }

    #[test]
    fn dimension_mismatch_and_empty() {
        assert!(matches!(
            calculate_metrics(&[1.0, 2.0], &[1.0, 2.0, 3.0], &[1.0, 2.0], 1),
            Err(ForecastError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            calculate_metrics(&[1.0, 2.0], &[], &[], 1),
            Err(ForecastError::EmptyData)
        ));
    }

    #[test]
    fn constant_training_has_no_mase() {
        let metrics = calculate_metrics(&[5.0; 10], &[1.0], &[2.0], 1).unwrap();
        assert!(metrics.mase.is_none());
    }
}

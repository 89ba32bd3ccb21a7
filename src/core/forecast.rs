//! Forecast result structure holding transformed-scale and original-scale predictions.

use crate::transform::TransformSpec;

/// A forecast for steps `1..=horizon` beyond the end of the fitting series.
///
/// Point estimates, standard errors and interval bounds are kept on the
/// transformed scale the model was fit on; the original-scale columns are the
/// inverse-transformed point estimates and bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    std_errors: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    original_point: Vec<f64>,
    original_lower: Vec<f64>,
    original_upper: Vec<f64>,
    width: f64,
    transform: Option<TransformSpec>,
}

impl Forecast {
    /// Assemble a forecast from already computed columns.
    pub(crate) fn from_parts(
        point: Vec<f64>,
        std_errors: Vec<f64>,
        width: f64,
        original_point: Vec<f64>,
        original_lower: Vec<f64>,
        original_upper: Vec<f64>,
        transform: Option<TransformSpec>,
    ) -> Self {
        let lower = point
            .iter()
            .zip(&std_errors)
            .map(|(p, se)| p - width * se)
            .collect();
        let upper = point
            .iter()
            .zip(&std_errors)
            .map(|(p, se)| p + width * se)
            .collect();
        Self {
            point,
            std_errors,
            lower,
            upper,
            original_point,
            original_lower,
            original_upper,
            width,
            transform,
        }
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point forecasts on the transformed scale.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Standard errors on the transformed scale.
    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// Lower bounds on the transformed scale.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bounds on the transformed scale.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Point forecasts in original units.
    pub fn original_point(&self) -> &[f64] {
        &self.original_point
    }

    /// Lower bounds in original units.
    pub fn original_lower(&self) -> &[f64] {
        &self.original_lower
    }

    /// Upper bounds in original units.
    pub fn original_upper(&self) -> &[f64] {
        &self.original_upper
    }

    /// Multiple of the standard error used for the bounds.
    pub fn interval_width(&self) -> f64 {
        self.width
    }

    /// The transform that was inverted to produce the original-scale columns.
    pub fn transform(&self) -> Option<&TransformSpec> {
        self.transform.as_ref()
    }

    /// Fraction of `actuals` (original units) inside the original-scale band.
    pub fn coverage(&self, actuals: &[f64]) -> f64 {
        let n = actuals.len().min(self.horizon());
        if n == 0 {
            return 0.0;
        }
        let inside = (0..n)
            .filter(|&i| actuals[i] >= self.original_lower[i] && actuals[i] <= self.original_upper[i])
            .count();
        inside as f64 / n as f64
    }
}

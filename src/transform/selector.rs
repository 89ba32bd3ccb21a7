//! Choice between the estimated power transform and the log transform.

use tracing::debug;

use crate::core::Series;
use crate::error::Result;
use crate::transform::boxcox::boxcox_lambda;
use crate::transform::spec::{TransformFamily, TransformSpec};
use crate::utils::stats::variance;
use crate::validation::normality::{shapiro_wilk, SHAPIRO_WILK_MAX_N};

/// Statistics of one candidate transform.
#[derive(Debug, Clone)]
pub struct TransformCandidate {
    pub spec: TransformSpec,
    /// Shapiro-Wilk W of the transformed series, computed on an evenly
    /// spaced subsample when the series is longer than the test allows.
    pub normality: f64,
    /// Sample variance of the transformed series.
    pub variance: f64,
    pub transformed: Series,
}

/// Outcome of the transform selection.
#[derive(Debug, Clone)]
pub struct TransformSelection {
    pub power: TransformCandidate,
    pub log: TransformCandidate,
    /// Profile log-likelihood at the estimated λ.
    pub power_log_likelihood: f64,
    chosen: TransformFamily,
}

impl TransformSelection {
    pub fn chosen(&self) -> &TransformCandidate {
        match self.chosen {
            TransformFamily::Power => &self.power,
            TransformFamily::Log => &self.log,
        }
    }

    pub fn spec(&self) -> TransformSpec {
        self.chosen().spec
    }

    pub fn transformed(&self) -> &Series {
        &self.chosen().transformed
    }
}

/// Searches λ for the power transform and compares it with the log transform.
///
/// The power transform wins when its Shapiro-Wilk W plus `tie_tolerance` is at
/// least the log transform's W.
#[derive(Debug, Clone)]
pub struct TransformSelector {
    range: (f64, f64),
    tie_tolerance: f64,
}

impl Default for TransformSelector {
    fn default() -> Self {
        Self {
            range: (-1.0, 2.0),
            tie_tolerance: 0.0,
        }
    }
}

impl TransformSelector {
    pub fn new(range: (f64, f64)) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    /// Margin in W by which the power transform may trail the log transform
    /// and still be chosen.
    pub fn with_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.tie_tolerance = tolerance;
        self
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Estimate λ on `series` and pick the transform.
    ///
    /// # Errors
    /// `Domain` for non-positive values, `Numerical` for a flat likelihood, and
    /// the errors of the Shapiro-Wilk test for degenerate transformed series.
    pub fn select(&self, series: &Series) -> Result<TransformSelection> {
        let search = boxcox_lambda(series, self.range)?;

        let power = Self::candidate(TransformSpec::power(search.lambda), series)?;
        let log = Self::candidate(TransformSpec::log(), series)?;

        let chosen = if power.normality + self.tie_tolerance >= log.normality {
            TransformFamily::Power
        } else {
            TransformFamily::Log
        };

        debug!(
            lambda = search.lambda,
            w_power = power.normality,
            w_log = log.normality,
            chosen = ?chosen,
            "transform selected"
        );

        Ok(TransformSelection {
            power,
            log,
            power_log_likelihood: search.log_likelihood,
            chosen,
        })
    }

    fn candidate(spec: TransformSpec, series: &Series) -> Result<TransformCandidate> {
        let transformed = spec.apply(series)?;
        let normality = normality_score(transformed.values())?;
        Ok(TransformCandidate {
            spec,
            normality,
            variance: variance(transformed.values()),
            transformed,
        })
    }
}

fn normality_score(values: &[f64]) -> Result<f64> {
    let n = values.len();
    if n <= SHAPIRO_WILK_MAX_N {
        return Ok(shapiro_wilk(values)?.statistic);
    }
    let sample: Vec<f64> = (0..SHAPIRO_WILK_MAX_N)
        .map(|i| values[i * n / SHAPIRO_WILK_MAX_N])
        .collect();
    Ok(shapiro_wilk(&sample)?.statistic)
}

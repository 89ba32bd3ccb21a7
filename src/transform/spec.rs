//! The variance-stabilizing transform chosen for a run.

use std::fmt;

use crate::core::Series;
use crate::error::Result;
use crate::transform::boxcox::{boxcox, inv_power_value};

/// Transform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformFamily {
    /// Box-Cox power transform with an estimated λ.
    Power,
    /// Natural logarithm.
    Log,
}

/// A transform family together with its parameter.
///
/// For [`TransformFamily::Log`] the stored λ is 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSpec {
    family: TransformFamily,
    lambda: f64,
}

impl TransformSpec {
    /// Box-Cox transform with parameter `lambda`.
    pub fn power(lambda: f64) -> Self {
        Self {
            family: TransformFamily::Power,
            lambda,
        }
    }

    /// Natural logarithm.
    pub fn log() -> Self {
        Self {
            family: TransformFamily::Log,
            lambda: 0.0,
        }
    }

    pub fn family(&self) -> TransformFamily {
        self.family
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Transform a strictly positive series.
    pub fn apply(&self, series: &Series) -> Result<Series> {
        boxcox(series, self.lambda)
    }

    /// Map one transformed value back to original units.
    pub fn inverse_value(&self, y: f64) -> Result<f64> {
        match self.family {
            TransformFamily::Log => Ok(y.exp()),
            TransformFamily::Power => inv_power_value(y, self.lambda),
        }
    }

    /// Map transformed values back to original units.
    pub fn inverse(&self, values: &[f64]) -> Result<Vec<f64>> {
        values.iter().map(|&y| self.inverse_value(y)).collect()
    }
}

impl fmt::Display for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            TransformFamily::Power => write!(f, "Box-Cox(lambda = {:.4})", self.lambda),
            TransformFamily::Log => write!(f, "log"),
        }
    }
}

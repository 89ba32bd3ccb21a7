//! Error types for the sarima-engine library.

use thiserror::Error;

/// Result type alias for modeling operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while transforming, fitting, diagnosing or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// A NaN or infinite value was found where finite data is required.
    #[error("non-finite value at index {index}")]
    NonFiniteValue { index: usize },

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A transform precondition was violated (non-positive input, invalid inverse region).
    #[error("domain error: {0}")]
    Domain(String),

    /// The optimizer failed to reach a stationary point.
    #[error("convergence failure: {0}")]
    Convergence(String),

    /// The fitted autoregressive operator has a root on or inside the unit circle.
    #[error("non-stationary fit: smallest AR root modulus {min_modulus:.6} is not outside the unit circle")]
    NonStationaryFit { min_modulus: f64 },

    /// The fitted moving-average operator has a root on or inside the unit circle.
    #[error("non-invertible fit: smallest MA root modulus {min_modulus:.6} is not outside the unit circle")]
    NonInvertibleFit { min_modulus: f64 },

    /// Degenerate numerical situation (flat likelihood, non-positive variance, ...).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A differencing step failed to reduce variance.
    #[error("overdifferenced at step {step}: variance {previous:.6} -> {current:.6}")]
    Overdifferenced {
        step: usize,
        previous: f64,
        current: f64,
    },
}

impl ForecastError {
    /// Whether this error belongs to a single candidate fit rather than the whole run.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            ForecastError::Convergence(_)
                | ForecastError::NonStationaryFit { .. }
                | ForecastError::NonInvertibleFit { .. }
                | ForecastError::Numerical(_)
                | ForecastError::InsufficientData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 8, got: 7 };
        assert_eq!(err.to_string(), "insufficient data: need at least 8, got 7");

        let err = ForecastError::Domain("value 0 at index 3 is not positive".to_string());
        assert_eq!(
            err.to_string(),
            "domain error: value 0 at index 3 is not positive"
        );

        let err = ForecastError::NonStationaryFit { min_modulus: 0.5 };
        assert_eq!(
            err.to_string(),
            "non-stationary fit: smallest AR root modulus 0.500000 is not outside the unit circle"
        );

        let err = ForecastError::NonFiniteValue { index: 4 };
        assert_eq!(err.to_string(), "non-finite value at index 4");
    }

    #[test]
    fn candidate_failures_are_classified() {
        assert!(ForecastError::Convergence("max iterations".into()).is_candidate_failure());
        assert!(ForecastError::NonInvertibleFit { min_modulus: 1.0 }.is_candidate_failure());
        assert!(!ForecastError::Domain("negative".into()).is_candidate_failure());
        assert!(!ForecastError::EmptyData.is_candidate_failure());
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::Numerical("flat".into());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}

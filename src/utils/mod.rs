//! Numerical utilities shared by the modeling components.

pub mod hessian;
pub mod metrics;
pub mod optimization;
pub mod stats;

pub use hessian::standard_errors;
pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{acf, chi_squared_sf, mean, pacf, quantile_normal, variance};

//! Statistical tests for transformed series and model residuals.
//!
//! # Example
//!
//! ```
//! use sarima_engine::validation::{ljung_box, shapiro_wilk};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, 5, 0).unwrap();
//! println!("Ljung-Box Q = {:.3}, p = {:.3}", lb.statistic, lb.p_value);
//!
//! let sw = shapiro_wilk(&residuals).unwrap();
//! assert!(sw.statistic > 0.0 && sw.statistic <= 1.0);
//! ```

pub mod diagnostics;
pub mod normality;

pub use diagnostics::{
    residual_order, DiagnosticsConfig, DiagnosticsEngine, DiagnosticsReport, OrderCheck,
    TestOutcome,
};
pub use normality::{jarque_bera, shapiro_wilk, NormalityResult};
pub use residual_tests::{box_pierce, ljung_box, PortmanteauResult};

//! # sarima-engine
//!
//! Seasonal ARIMA modeling for univariate series.
//!
//! A run selects a variance-stabilizing transform, differences the series to
//! stationarity, fits and ranks constrained SARIMA candidates by AICc, checks
//! their residuals and forecasts with error bounds in original units.
//!
//! ```no_run
//! use sarima_engine::prelude::*;
//!
//! let values: Vec<f64> = (0..400)
//!     .map(|t| 200.0 + 0.1 * t as f64 + 20.0 * (t as f64 * std::f64::consts::TAU / 7.0).sin())
//!     .collect();
//! let partition = Partition::new(&Series::new(values).unwrap(), 65, 321, 14).unwrap();
//!
//! let config = PipelineConfig::default().with_candidate_orders(vec![
//!     SarimaOrder::seasonal((1, 1, 1), (1, 1, 1, 7)),
//!     SarimaOrder::seasonal((1, 1, 1), (0, 1, 2, 7)),
//! ]);
//! let report = Pipeline::new(config).run(&partition).unwrap();
//! if let Some(forecast) = &report.forecast {
//!     println!("{:?}", forecast.original_point());
//! }
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, Partition, Series};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::arima::{
        Coefficient, CoefficientMask, DifferencingSpec, FittedModel, Forecaster, ModelSearch,
        SarimaEstimator, SarimaOrder,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
    pub use crate::transform::{TransformSelector, TransformSpec};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
    pub use crate::validation::{DiagnosticsEngine, DiagnosticsReport};
}

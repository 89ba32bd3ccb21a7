//! Variance-stabilizing transforms.
//!
//! # Example
//!
//! ```
//! use sarima_engine::core::Series;
//! use sarima_engine::transform::{TransformSelector, TransformFamily};
//!
//! let series = Series::new((1..=60).map(|i| 100.0 + (i as f64).powf(1.3)).collect()).unwrap();
//! let selection = TransformSelector::new((-1.0, 2.0)).select(&series).unwrap();
//!
//! let spec = selection.spec();
//! let back = spec.inverse(selection.transformed().values()).unwrap();
//! assert!((back[0] - series.values()[0]).abs() < 1e-8);
//! assert!(matches!(spec.family(), TransformFamily::Power | TransformFamily::Log));
//! ```

pub mod boxcox;
pub mod selector;
pub mod spec;

pub use boxcox::{boxcox, boxcox_lambda, inv_boxcox, inv_power_value, power_value, LambdaSearch};
pub use selector::{TransformCandidate, TransformSelection, TransformSelector};
pub use spec::{TransformFamily, TransformSpec};

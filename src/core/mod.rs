//! Core data structures: the input series, its partition and forecast results.

mod forecast;
mod series;

pub use forecast::Forecast;
pub use series::{Partition, Series};

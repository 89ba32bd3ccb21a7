//! Seasonal ARIMA models: orders, exact maximum-likelihood estimation,
//! candidate identification, ranked search and forecasting.
//!
//! This module provides:
//! - differencing and the stationarity reducer
//! - SARIMA(p, d, q)(P, D, Q)\[s\] orders with coefficient masks
//! - Kalman-filter likelihood and Nelder-Mead estimation
//! - ACF/PACF based candidate identification
//! - parallel model search ranked by AICc
//! - recursive forecasts with standard errors

mod diff;
mod identify;
mod kalman;
mod model;
mod order;
mod polynomial;
mod predict;
mod search;

pub use diff::{
    difference_lag, integrate_lag, DiffStep, DifferencingSpec, Stationarized,
    StationarityReducer, VarianceTrace,
};
pub use identify::{identify, IdentificationConfig, IdentificationReport};
pub use kalman::{arma_likelihood, KalmanOutput};
pub use model::{
    aic, aicc, bic, CoefficientEstimate, EstimatorConfig, FittedModel, Parameter, ResidualSet,
    SarimaEstimator,
};
pub use order::{Coefficient, CoefficientMask, SarimaOrder};
pub use polynomial::{
    ar_polynomial, differencing_polynomial, ma_polynomial, min_root_modulus, psi_weights, roots,
};
pub use predict::Forecaster;
pub use search::{rank_models, ModelSearch, RejectedCandidate, SearchConfig, SearchSummary};

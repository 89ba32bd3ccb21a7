//! Maximum-likelihood estimation of SARIMA models.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::difference_lag;
use crate::models::arima::kalman::{arma_likelihood, KalmanOutput};
use crate::models::arima::order::{Coefficient, SarimaOrder};
use crate::models::arima::polynomial::{
    ar_polynomial, ma_polynomial, min_root_modulus, min_root_modulus_seasonal, multiply,
    seasonal_expand,
};
use crate::utils::hessian::standard_errors;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Objective value assigned to inadmissible parameter vectors.
const PENALTY: f64 = 1e10;
/// Root moduli at or below `1 + ADMISSIBLE_MARGIN` are penalized during the search.
const ADMISSIBLE_MARGIN: f64 = 1e-8;

/// Akaike information criterion.
pub fn aic(log_likelihood: f64, k: usize) -> f64 {
    -2.0 * log_likelihood + 2.0 * k as f64
}

/// Small-sample corrected AIC; infinite when `n - k - 1 <= 0`.
pub fn aicc(log_likelihood: f64, k: usize, n: usize) -> f64 {
    if n <= k + 1 {
        return f64::INFINITY;
    }
    let kf = k as f64;
    aic(log_likelihood, k) + 2.0 * kf * (kf + 1.0) / (n - k - 1) as f64
}

/// Bayesian information criterion.
pub fn bic(log_likelihood: f64, k: usize, n: usize) -> f64 {
    -2.0 * log_likelihood + k as f64 * (n as f64).ln()
}

/// A model parameter other than σ².
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Arma(Coefficient),
    Mean,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Arma(c) => c.fmt(f),
            Parameter::Mean => write!(f, "mean"),
        }
    }
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientEstimate {
    pub parameter: Parameter,
    pub estimate: f64,
    /// NaN for fixed coefficients and when the Hessian is not positive definite.
    pub std_error: f64,
    pub fixed: bool,
}

/// One-step prediction errors, indexed like the training series.
///
/// The first [`skip`](Self::skip) positions are consumed by differencing and
/// hold zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSet {
    values: Vec<f64>,
    skip: usize,
}

impl ResidualSet {
    pub fn new(values: Vec<f64>, skip: usize) -> Self {
        let skip = skip.min(values.len());
        Self { values, skip }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Residuals after the positions consumed by differencing.
    pub fn effective(&self) -> &[f64] {
        &self.values[self.skip..]
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Coefficient vectors of a SARIMA model, with masked entries set to zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sar: Vec<f64>,
    pub sma: Vec<f64>,
    pub mean: Option<f64>,
}

impl SarimaCoefficients {
    /// Fill the coefficient vectors from the free parameter vector.
    fn unpack(order: &SarimaOrder, free: &[Coefficient], x: &[f64]) -> Self {
        let mut out = Self {
            ar: vec![0.0; order.p],
            ma: vec![0.0; order.q],
            sar: vec![0.0; order.cap_p],
            sma: vec![0.0; order.cap_q],
            mean: None,
        };
        for (c, &value) in free.iter().zip(x) {
            match *c {
                Coefficient::Ar(i) => out.ar[i - 1] = value,
                Coefficient::Ma(i) => out.ma[i - 1] = value,
                Coefficient::SeasonalAr(i) => out.sar[i - 1] = value,
                Coefficient::SeasonalMa(i) => out.sma[i - 1] = value,
            }
        }
        if order.has_mean() {
            out.mean = x.get(free.len()).copied();
        }
        out
    }

    fn get(&self, c: Coefficient) -> f64 {
        match c {
            Coefficient::Ar(i) => self.ar[i - 1],
            Coefficient::Ma(i) => self.ma[i - 1],
            Coefficient::SeasonalAr(i) => self.sar[i - 1],
            Coefficient::SeasonalMa(i) => self.sma[i - 1],
        }
    }

    /// `φ(B)Φ(Bˢ)`.
    pub fn ar_operator(&self, period: usize) -> Vec<f64> {
        multiply(
            &ar_polynomial(&self.ar),
            &seasonal_expand(&ar_polynomial(&self.sar), period),
        )
    }

    /// `θ(B)Θ(Bˢ)`.
    pub fn ma_operator(&self, period: usize) -> Vec<f64> {
        multiply(
            &ma_polynomial(&self.ma),
            &seasonal_expand(&ma_polynomial(&self.sma), period),
        )
    }

    fn min_ar_modulus(&self, period: usize) -> f64 {
        min_root_modulus(&ar_polynomial(&self.ar))
            .min(min_root_modulus_seasonal(&ar_polynomial(&self.sar), period))
    }

    fn min_ma_modulus(&self, period: usize) -> f64 {
        min_root_modulus(&ma_polynomial(&self.ma))
            .min(min_root_modulus_seasonal(&ma_polynomial(&self.sma), period))
    }

    /// Exact likelihood of the differenced series `w`.
    fn likelihood(&self, w: &[f64], period: usize) -> Result<KalmanOutput> {
        let phi: Vec<f64> = self.ar_operator(period)[1..].iter().map(|c| -c).collect();
        let theta: Vec<f64> = self.ma_operator(period)[1..].to_vec();
        match self.mean {
            Some(mu) => {
                let centered: Vec<f64> = w.iter().map(|v| v - mu).collect();
                arma_likelihood(&centered, &phi, &theta)
            }
            None => arma_likelihood(w, &phi, &theta),
        }
    }
}

/// A successfully estimated SARIMA model.
#[derive(Debug, Clone)]
pub struct FittedModel {
    order: SarimaOrder,
    pub(crate) coefficients: SarimaCoefficients,
    table: Vec<CoefficientEstimate>,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    aicc: f64,
    bic: f64,
    n_params: usize,
    n_effective: usize,
    min_ar_modulus: f64,
    min_ma_modulus: f64,
    residuals: ResidualSet,
    training: Arc<Series>,
}

impl FittedModel {
    pub fn order(&self) -> &SarimaOrder {
        &self.order
    }

    /// Coefficient table: free estimates with standard errors, then fixed zeros.
    pub fn coefficients(&self) -> &[CoefficientEstimate] {
        &self.table
    }

    /// Estimate of a named coefficient (0 when masked).
    pub fn coefficient(&self, c: Coefficient) -> Option<f64> {
        self.order
            .coefficients()
            .any(|x| x == c)
            .then(|| self.coefficients.get(c))
    }

    pub fn ar(&self) -> &[f64] {
        &self.coefficients.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn seasonal_ar(&self) -> &[f64] {
        &self.coefficients.sar
    }

    pub fn seasonal_ma(&self) -> &[f64] {
        &self.coefficients.sma
    }

    pub fn mean(&self) -> Option<f64> {
        self.coefficients.mean
    }

    /// Innovation variance.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn aicc(&self) -> f64 {
        self.aicc
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Number of estimated parameters including σ².
    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// Number of estimated ARMA coefficients.
    pub fn n_free_arma(&self) -> usize {
        self.order.n_free_arma()
    }

    /// Sample size after differencing.
    pub fn n_effective(&self) -> usize {
        self.n_effective
    }

    /// Smallest root modulus of the AR factors.
    pub fn min_ar_root_modulus(&self) -> f64 {
        self.min_ar_modulus
    }

    /// Smallest root modulus of the MA factors.
    pub fn min_ma_root_modulus(&self) -> f64 {
        self.min_ma_modulus
    }

    pub fn residuals(&self) -> &ResidualSet {
        &self.residuals
    }

    /// The series the model was fit on.
    pub fn training(&self) -> &Arc<Series> {
        &self.training
    }

    /// Expanded AR operator `φ(B)Φ(Bˢ)`.
    pub fn ar_operator(&self) -> Vec<f64> {
        self.coefficients.ar_operator(self.order.s)
    }

    /// Expanded MA operator `θ(B)Θ(Bˢ)`.
    pub fn ma_operator(&self) -> Vec<f64> {
        self.coefficients.ma_operator(self.order.s)
    }
}

/// Estimation settings.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub optimizer: NelderMeadConfig,
    /// A fitted root modulus must exceed `1 + root_tolerance`. The default
    /// matches the region the optimizer searches, so only roots on the unit
    /// circle are rejected; raise it to also reject near-unit roots.
    pub root_tolerance: f64,
    /// Wall-clock budget per fit.
    pub max_duration: Option<Duration>,
    pub compute_std_errors: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            optimizer: NelderMeadConfig::default(),
            root_tolerance: ADMISSIBLE_MARGIN,
            max_duration: None,
            compute_std_errors: true,
        }
    }
}

impl EstimatorConfig {
    pub fn with_root_tolerance(mut self, tolerance: f64) -> Self {
        self.root_tolerance = tolerance;
        self
    }

    pub fn with_max_duration(mut self, budget: Duration) -> Self {
        self.max_duration = Some(budget);
        self
    }

    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_std_errors(mut self, compute: bool) -> Self {
        self.compute_std_errors = compute;
        self
    }
}

/// Exact Gaussian maximum-likelihood estimator for SARIMA models.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sarima_engine::core::Series;
/// use sarima_engine::models::arima::{SarimaEstimator, SarimaOrder};
///
/// let mut level = 50.0;
/// let values: Vec<f64> = (0..120)
///     .map(|i| {
///         level += ((i * 7919 % 23) as f64 - 11.0) * 0.1;
///         level
///     })
///     .collect();
/// let series = Arc::new(Series::new(values).unwrap());
///
/// let model = SarimaEstimator::default()
///     .fit(&series, &SarimaOrder::new(1, 1, 0))
///     .unwrap();
/// assert_eq!(model.n_effective(), 119);
/// assert!(model.aicc().is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SarimaEstimator {
    config: EstimatorConfig,
}

impl SarimaEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fit `order` to `series` (undifferenced; the order's differencing is
    /// applied internally).
    ///
    /// # Errors
    /// * `InvalidParameter` for an inconsistent order.
    /// * `InsufficientData` when too few observations survive differencing.
    /// * `Convergence` when the optimizer stalls or exceeds its time budget.
    /// * `NonStationaryFit` / `NonInvertibleFit` when a fitted root lies on or
    ///   inside `1 + root_tolerance`.
    pub fn fit(&self, series: &Arc<Series>, order: &SarimaOrder) -> Result<FittedModel> {
        order.validate()?;

        let free = order.free_coefficients();
        let n_arma = free.len();
        let n_params = n_arma + usize::from(order.has_mean()) + 1;

        let w = differenced(series.values(), order)?;
        if w.len() < n_params + 1 {
            return Err(ForecastError::InsufficientData {
                needed: order.differencing_lag() + n_params + 1,
                got: series.len(),
            });
        }

        let s = order.s;
        let objective = |x: &[f64]| -> f64 {
            let coefs = SarimaCoefficients::unpack(order, &free, x);
            if coefs.min_ar_modulus(s) <= 1.0 + ADMISSIBLE_MARGIN
                || coefs.min_ma_modulus(s) <= 1.0 + ADMISSIBLE_MARGIN
            {
                return PENALTY;
            }
            match coefs.likelihood(&w, s) {
                Ok(out) if out.log_likelihood.is_finite() => -out.log_likelihood,
                _ => PENALTY,
            }
        };

        let initial = initial_point(&free, order.has_mean(), &w);
        let mut optimizer = self.config.optimizer.clone();
        if let Some(budget) = self.config.max_duration {
            optimizer = optimizer.with_max_duration(budget);
        }
        let result = nelder_mead(&objective, &initial, &optimizer);

        if result.timed_out {
            return Err(ForecastError::Convergence(format!(
                "{order}: time budget exhausted after {} iterations",
                result.iterations
            )));
        }
        if result.optimal_value >= PENALTY {
            return Err(ForecastError::Convergence(format!(
                "{order}: no admissible parameter vector found"
            )));
        }
        if !result.converged {
            return Err(ForecastError::Convergence(format!(
                "{order}: optimizer did not converge in {} iterations",
                result.iterations
            )));
        }

        let coefs = SarimaCoefficients::unpack(order, &free, &result.optimal_point);
        let min_ar = coefs.min_ar_modulus(s);
        if min_ar <= 1.0 + self.config.root_tolerance {
            return Err(ForecastError::NonStationaryFit {
                min_modulus: min_ar,
            });
        }
        let min_ma = coefs.min_ma_modulus(s);
        if min_ma <= 1.0 + self.config.root_tolerance {
            return Err(ForecastError::NonInvertibleFit {
                min_modulus: min_ma,
            });
        }

        let output = coefs.likelihood(&w, s)?;

        // Curvature of the plain likelihood; the root penalty would swamp it
        // when the optimum sits near the admissible edge.
        let likelihood_only = |x: &[f64]| -> f64 {
            match SarimaCoefficients::unpack(order, &free, x).likelihood(&w, s) {
                Ok(out) => -out.log_likelihood,
                Err(_) => f64::NAN,
            }
        };
        let std_errors = if self.config.compute_std_errors {
            standard_errors(&likelihood_only, &result.optimal_point)
        } else {
            None
        };
        if self.config.compute_std_errors && std_errors.is_none() {
            warn!(order = %order, "Hessian is not positive definite; standard errors unavailable");
        }
        let std_error = |i: usize| {
            std_errors
                .as_ref()
                .and_then(|se| se.get(i).copied())
                .unwrap_or(f64::NAN)
        };

        let mut table: Vec<CoefficientEstimate> = free
            .iter()
            .enumerate()
            .map(|(i, &c)| CoefficientEstimate {
                parameter: Parameter::Arma(c),
                estimate: coefs.get(c),
                std_error: std_error(i),
                fixed: false,
            })
            .collect();
        if let Some(mu) = coefs.mean {
            table.push(CoefficientEstimate {
                parameter: Parameter::Mean,
                estimate: mu,
                std_error: std_error(n_arma),
                fixed: false,
            });
        }
        table.extend(order.mask.iter().map(|&c| CoefficientEstimate {
            parameter: Parameter::Arma(c),
            estimate: 0.0,
            std_error: f64::NAN,
            fixed: true,
        }));

        let n = w.len();
        let log_likelihood = output.log_likelihood;
        let mut residuals = vec![0.0; order.differencing_lag()];
        residuals.extend_from_slice(&output.residuals);

        let model = FittedModel {
            order: order.clone(),
            coefficients: coefs,
            table,
            sigma2: output.sigma2,
            log_likelihood,
            aic: aic(log_likelihood, n_params),
            aicc: aicc(log_likelihood, n_params, n),
            bic: bic(log_likelihood, n_params, n),
            n_params,
            n_effective: n,
            min_ar_modulus: min_ar,
            min_ma_modulus: min_ma,
            residuals: ResidualSet::new(residuals, order.differencing_lag()),
            training: Arc::clone(series),
        };

        debug!(
            order = %order,
            log_likelihood,
            aicc = model.aicc,
            sigma2 = model.sigma2,
            iterations = result.iterations,
            "model estimated"
        );
        Ok(model)
    }
}

/// Apply the order's differencing to `values`.
pub(crate) fn differenced(values: &[f64], order: &SarimaOrder) -> Result<Vec<f64>> {
    let mut w = values.to_vec();
    for _ in 0..order.cap_d {
        w = difference_lag(&w, order.s)?;
    }
    for _ in 0..order.d {
        w = difference_lag(&w, 1)?;
    }
    Ok(w)
}

fn initial_point(free: &[Coefficient], has_mean: bool, w: &[f64]) -> Vec<f64> {
    let mut x: Vec<f64> = free
        .iter()
        .map(|c| match *c {
            Coefficient::Ar(i)
            | Coefficient::Ma(i)
            | Coefficient::SeasonalAr(i)
            | Coefficient::SeasonalMa(i) => 0.1 / i as f64,
        })
        .collect();
    if has_mean {
        x.push(w.iter().sum::<f64>() / w.len() as f64);
    }
    x
}

//! Candidate order identification from ACF/PACF spikes.

use tracing::debug;

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::arima::order::{Coefficient, CoefficientMask, SarimaOrder};
use crate::utils::stats::{acf, pacf, quantile_normal};

/// Configuration for candidate identification.
#[derive(Debug, Clone)]
pub struct IdentificationConfig {
    /// Largest lag of the ACF/PACF.
    pub max_lag: usize,
    /// Significance level of the confidence band.
    pub significance: f64,
    /// Maximum non-seasonal AR order.
    pub max_p: usize,
    /// Maximum non-seasonal MA order.
    pub max_q: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Also propose variants with non-significant intermediate lags fixed to zero.
    pub masked_variants: bool,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            max_lag: 40,
            significance: 0.05,
            max_p: 3,
            max_q: 3,
            max_cap_p: 2,
            max_cap_q: 2,
            masked_variants: true,
        }
    }
}

impl IdentificationConfig {
    pub fn with_max_lag(mut self, max_lag: usize) -> Self {
        self.max_lag = max_lag;
        self
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_cap_p = max_p;
        self.max_cap_q = max_q;
        self
    }
}

/// Correlogram analysis and the candidates derived from it.
#[derive(Debug, Clone)]
pub struct IdentificationReport {
    /// Autocorrelations at lags `1..=max_lag`.
    pub acf: Vec<f64>,
    /// Partial autocorrelations at lags `1..=max_lag`.
    pub pacf: Vec<f64>,
    /// Half-width of the confidence band `z / √n`.
    pub band: f64,
    /// Lags with a significant autocorrelation.
    pub acf_spikes: Vec<usize>,
    /// Lags with a significant partial autocorrelation.
    pub pacf_spikes: Vec<usize>,
    /// Suggested `(p, q, P, Q)`.
    pub suggested: (usize, usize, usize, usize),
    pub candidates: Vec<SarimaOrder>,
}

/// Analyze the stationary series and propose candidate orders with the given
/// differencing `(d, D, s)`.
///
/// # Errors
/// `InsufficientData` when the series is not longer than `max_lag`.
pub fn identify(
    stationary: &Series,
    (d, cap_d, s): (usize, usize, usize),
    config: &IdentificationConfig,
) -> Result<IdentificationReport> {
    let n = stationary.len();
    if n <= config.max_lag {
        return Err(ForecastError::InsufficientData {
            needed: config.max_lag + 1,
            got: n,
        });
    }
    if !(config.significance > 0.0 && config.significance < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "significance must be in (0, 1), got {}",
            config.significance
        )));
    }

    let values = stationary.values();
    let acf_values: Vec<f64> = acf(values, config.max_lag).into_iter().skip(1).collect();
    let pacf_values = pacf(values, config.max_lag);
    let band = quantile_normal(1.0 - config.significance / 2.0) / (n as f64).sqrt();

    let spikes = |values: &[f64]| -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > band)
            .map(|(i, _)| i + 1)
            .collect()
    };
    let acf_spikes = spikes(&acf_values);
    let pacf_spikes = spikes(&pacf_values);

    let seasonal = s > 1;
    let short_window = if seasonal { s - 1 } else { config.max_lag };
    let p = highest_spike(&pacf_spikes, short_window.min(config.max_p));
    let q = highest_spike(&acf_spikes, short_window.min(config.max_q));
    let (cap_p, cap_q) = if seasonal {
        (
            highest_seasonal_spike(&pacf_spikes, s, config.max_cap_p),
            highest_seasonal_spike(&acf_spikes, s, config.max_cap_q),
        )
    } else {
        (0, 0)
    };

    let ar_mask: Vec<Coefficient> = intermediate_gaps(&pacf_spikes, p)
        .into_iter()
        .map(Coefficient::Ar)
        .collect();
    let ma_mask: Vec<Coefficient> = intermediate_gaps(&acf_spikes, q)
        .into_iter()
        .map(Coefficient::Ma)
        .collect();

    let mut candidates: Vec<SarimaOrder> = Vec::new();
    let mut push = |order: SarimaOrder| {
        if !candidates.contains(&order) {
            candidates.push(order);
        }
    };
    for &pp in &options(p) {
        for &qq in &options(q) {
            for &sp in &options(cap_p) {
                for &sq in &options(cap_q) {
                    let order = SarimaOrder::seasonal((pp, d, qq), (sp, cap_d, sq, s));
                    if config.masked_variants {
                        let mask: CoefficientMask = ar_mask
                            .iter()
                            .filter(|_| pp == p)
                            .chain(ma_mask.iter().filter(|_| qq == q))
                            .copied()
                            .collect();
                        if !mask.is_empty() {
                            push(order.clone().with_mask(mask));
                        }
                    }
                    push(order);
                }
            }
        }
    }

    debug!(
        n,
        band,
        p,
        q,
        cap_p,
        cap_q,
        candidates = candidates.len(),
        "identified candidate orders"
    );

    Ok(IdentificationReport {
        acf: acf_values,
        pacf: pacf_values,
        band,
        acf_spikes,
        pacf_spikes,
        suggested: (p, q, cap_p, cap_q),
        candidates,
    })
}

fn options(suggested: usize) -> Vec<usize> {
    if suggested == 0 {
        vec![0]
    } else {
        vec![0, suggested]
    }
}

/// Highest significant lag not above `limit`.
fn highest_spike(spikes: &[usize], limit: usize) -> usize {
    spikes
        .iter()
        .copied()
        .filter(|&lag| lag <= limit)
        .max()
        .unwrap_or(0)
}

/// Highest multiple `k <= limit` such that lag `k·s` is significant.
fn highest_seasonal_spike(spikes: &[usize], s: usize, limit: usize) -> usize {
    (1..=limit)
        .filter(|k| spikes.contains(&(k * s)))
        .max()
        .unwrap_or(0)
}

/// Non-significant lags strictly between the lowest significant lag and `top`.
fn intermediate_gaps(spikes: &[usize], top: usize) -> Vec<usize> {
    let Some(lowest) = spikes.iter().copied().filter(|&lag| lag <= top).min() else {
        return Vec::new();
    };
    (lowest + 1..top).filter(|lag| !spikes.contains(lag)).collect()
}

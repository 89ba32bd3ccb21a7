//! Differencing, integration and the stationarity reducer.

use tracing::debug;

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::utils::stats::variance;

/// Lag difference `x[t] - x[t - lag]`.
///
/// The first `lag` observations are consumed, so the output has length
/// `n - lag`.
///
/// # Errors
/// `InsufficientData` if fewer than `lag + 1` values are given and
/// `InvalidParameter` for a zero lag.
pub fn difference_lag(values: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(ForecastError::InvalidParameter(
            "differencing lag must be at least 1".to_string(),
        ));
    }
    if values.len() < lag + 1 {
        return Err(ForecastError::InsufficientData {
            needed: lag + 1,
            got: values.len(),
        });
    }
    Ok(values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(curr, prev)| curr - prev)
        .collect())
}

/// Invert one lag difference.
///
/// `seed` holds the first `lag` values of the undifferenced series; the result
/// is the full series of length `seed.len() + differenced.len()`.
pub fn integrate_lag(differenced: &[f64], seed: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(ForecastError::InvalidParameter(
            "integration lag must be at least 1".to_string(),
        ));
    }
    if seed.len() != lag {
        return Err(ForecastError::DimensionMismatch {
            expected: lag,
            got: seed.len(),
        });
    }

    let mut result = Vec::with_capacity(seed.len() + differenced.len());
    result.extend_from_slice(seed);
    for (t, &d) in differenced.iter().enumerate() {
        let value = result[t] + d;
        result.push(value);
    }
    Ok(result)
}

/// One step of a differencing specification: difference at `lag`, `order` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffStep {
    pub lag: usize,
    pub order: usize,
}

/// Ordered sequence of differencing steps.
///
/// Order matters: reconstruction inverts the steps in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DifferencingSpec {
    steps: Vec<DiffStep>,
}

impl DifferencingSpec {
    pub fn new(steps: Vec<DiffStep>) -> Self {
        Self { steps }
    }

    /// Seasonal difference at `period` followed by a lag-1 difference.
    pub fn seasonal_then_trend(period: usize) -> Self {
        Self::new(vec![
            DiffStep {
                lag: period,
                order: 1,
            },
            DiffStep { lag: 1, order: 1 },
        ])
    }

    pub fn steps(&self) -> &[DiffStep] {
        &self.steps
    }

    /// Unit lag-difference applications, in order.
    pub fn expanded(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps
            .iter()
            .flat_map(|step| std::iter::repeat(step.lag).take(step.order))
    }

    /// Observations consumed by the whole specification.
    pub fn total_lag(&self) -> usize {
        self.expanded().sum()
    }

    /// Number of lag-1 differences.
    pub fn trend_order(&self) -> usize {
        self.expanded().filter(|&lag| lag == 1).count()
    }

    /// Number of differences at `period`.
    pub fn seasonal_order(&self, period: usize) -> usize {
        if period <= 1 {
            return 0;
        }
        self.expanded().filter(|&lag| lag == period).count()
    }
}

/// Variance of the series before differencing and after each unit step.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceTrace {
    /// `(lag, variance)`; the first entry has lag 0 and describes the input.
    entries: Vec<(usize, f64)>,
}

impl VarianceTrace {
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn initial(&self) -> f64 {
        self.entries.first().map_or(f64::NAN, |e| e.1)
    }

    pub fn last(&self) -> f64 {
        self.entries.last().map_or(f64::NAN, |e| e.1)
    }

    /// Ratio of each step's variance to the previous one.
    pub fn ratios(&self) -> Vec<f64> {
        self.entries.windows(2).map(|w| w[1].1 / w[0].1).collect()
    }

    /// First step (1-based) whose variance fails to drop by at least
    /// `min_reduction` relative to the step before it.
    pub fn overdifferenced_at(&self, min_reduction: f64) -> Option<usize> {
        self.ratios()
            .iter()
            .position(|&r| !(r.is_finite() && r <= 1.0 - min_reduction))
            .map(|i| i + 1)
    }
}

/// Result of [`StationarityReducer::reduce`].
#[derive(Debug, Clone)]
pub struct Stationarized {
    pub series: Series,
    pub trace: VarianceTrace,
}

/// Applies a differencing specification and records the variance trace.
#[derive(Debug, Clone, Default)]
pub struct StationarityReducer {
    min_remaining: usize,
}

impl StationarityReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require at least `min_remaining` observations after differencing.
    pub fn with_min_remaining(mut self, min_remaining: usize) -> Self {
        self.min_remaining = min_remaining;
        self
    }

    pub fn reduce(&self, series: &Series, spec: &DifferencingSpec) -> Result<Stationarized> {
        let needed = spec.total_lag() + self.min_remaining.max(1);
        if series.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: series.len(),
            });
        }

        let mut current = series.values().to_vec();
        let mut entries = vec![(0, variance(&current))];
        for lag in spec.expanded() {
            current = difference_lag(&current, lag)?;
            entries.push((lag, variance(&current)));
            debug!(lag, remaining = current.len(), variance = entries[entries.len() - 1].1, "differenced");
        }

        Ok(Stationarized {
            series: Series::new(current)?,
            trace: VarianceTrace { entries },
        })
    }
}

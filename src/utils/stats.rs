//! Statistical utility functions.

use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use sarima_engine::utils::quantile_normal;
///
/// // 95% two-sided band -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Upper tail probability of `N(mean, sd²)` at `x`.
pub fn normal_sf(x: f64, mean: f64, sd: f64) -> f64 {
    if sd.is_nan() || sd <= 0.0 {
        return f64::NAN;
    }
    0.5 * erfc((x - mean) / (sd * SQRT_2))
}

/// Upper tail probability of a chi-squared distribution with `df` degrees of freedom.
pub fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if df == 0 || x <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample autocorrelations for lags `0..=max_lag` (biased estimator, as in most
/// time series packages). Lags beyond `n - 1` are omitted.
pub fn acf(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let m = mean(values);
    let centered: Vec<f64> = values.iter().map(|x| x - m).collect();
    let denom: f64 = centered.iter().map(|x| x * x).sum();

    let max_lag = max_lag.min(n - 1);
    (0..=max_lag)
        .map(|lag| {
            if denom == 0.0 {
                return if lag == 0 { 1.0 } else { 0.0 };
            }
            centered
                .iter()
                .skip(lag)
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom
        })
        .collect()
}

/// Partial autocorrelations for lags `1..=max_lag` via Durbin-Levinson.
///
/// Element `k - 1` holds the PACF at lag `k`.
pub fn pacf(values: &[f64], max_lag: usize) -> Vec<f64> {
    let rho = acf(values, max_lag);
    if rho.len() < 2 {
        return Vec::new();
    }
    levinson(&rho)
        .into_iter()
        .map(|step| step.coefficients.last().copied().unwrap_or(0.0))
        .collect()
}

/// One order of the Durbin-Levinson recursion.
#[derive(Debug, Clone)]
pub(crate) struct LevinsonStep {
    /// AR coefficients `φ_{k,1..=k}`.
    pub coefficients: Vec<f64>,
    /// Innovation variance relative to the lag-0 autocovariance.
    pub relative_variance: f64,
}

/// Durbin-Levinson recursion over autocorrelations `rho[0..=K]`.
///
/// Returns one step per order `1..=K`; stops early if the recursion degenerates.
pub(crate) fn levinson(rho: &[f64]) -> Vec<LevinsonStep> {
    let max_order = rho.len().saturating_sub(1);
    let mut steps: Vec<LevinsonStep> = Vec::with_capacity(max_order);
    let mut phi: Vec<f64> = Vec::new();
    let mut v = 1.0_f64;

    for k in 1..=max_order {
        let mut num = rho[k];
        for j in 1..k {
            num -= phi[j - 1] * rho[k - j];
        }
        if v.abs() < 1e-12 {
            break;
        }
        let kappa = num / v;

        let mut next = vec![0.0; k];
        for j in 1..k {
            next[j - 1] = phi[j - 1] - kappa * phi[k - j - 1];
        }
        next[k - 1] = kappa;
        phi = next;
        v *= 1.0 - kappa * kappa;

        steps.push(LevinsonStep {
            coefficients: phi.clone(),
            relative_variance: v,
        });
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(quantile_normal(0.975), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(quantile_normal(0.025), -1.959964, epsilon = 1e-5);
    }

    #[test]
    fn quantile_normal_boundary_values() {
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn chi_squared_sf_known_values() {
        // chi2(2) is exponential with mean 2
        assert_relative_eq!(chi_squared_sf(2.0, 2), (-1.0f64).exp(), epsilon = 1e-9);
        assert_relative_eq!(chi_squared_sf(18.307, 10), 0.05, epsilon = 1e-3);
        assert_eq!(chi_squared_sf(0.0, 5), 1.0);
    }

    #[test]
    fn normal_sf_is_symmetric() {
        assert_relative_eq!(normal_sf(0.0, 0.0, 1.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            normal_sf(1.0, 0.0, 1.0) + normal_sf(-1.0, 0.0, 1.0),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn variance_calculates_correctly() {
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
        assert_relative_eq!(std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5_f64.sqrt());
    }

    #[test]
    fn acf_lag_zero_is_one() {
        let values: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let rho = acf(&values, 5);
        assert_eq!(rho.len(), 6);
        assert_relative_eq!(rho[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn acf_constant_series() {
        let rho = acf(&[3.0; 10], 3);
        assert_eq!(rho, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn pacf_of_ar1_cuts_off() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![0.0; 400];
        for t in 1..400 {
            x[t] = 0.6 * x[t - 1] + noise.sample(&mut rng);
        }
        let partial = pacf(&x, 4);
        assert_eq!(partial.len(), 4);
        assert!(partial[0] > 0.4);
        assert!(partial[2].abs() < 0.15);
    }

    #[test]
    fn levinson_matches_yule_walker_for_order_one() {
        let steps = levinson(&[1.0, 0.5]);
        assert_eq!(steps.len(), 1);
        assert_relative_eq!(steps[0].coefficients[0], 0.5);
        assert_relative_eq!(steps[0].relative_variance, 0.75);
    }

    #[test]
    fn levinson_stops_when_variance_collapses() {
        // rho_1 = 1 leaves no innovation variance after the first order.
        let steps = levinson(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(steps.len(), 1);
        assert_relative_eq!(steps[0].relative_variance, 0.0);
    }
}

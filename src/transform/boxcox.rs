//! Box-Cox power transformation and profile-likelihood λ estimation.
//!
//! λ is chosen to maximize the profile log-likelihood of a linear-trend
//! regression `y(λ) = a + b·t + e` fit to the transformed values, i.e. the
//! Box-Cox likelihood including the Jacobian of the transform.

use crate::core::Series;
use crate::error::{ForecastError, Result};

/// |λ| below this is treated as the logarithmic limit of the power transform.
pub const LAMBDA_ZERO_TOLERANCE: f64 = 1e-10;

/// Number of grid intervals in the coarse λ search.
const GRID_INTERVALS: usize = 200;

/// Result of the λ search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaSearch {
    /// The maximizing λ.
    pub lambda: f64,
    /// Profile log-likelihood at `lambda`.
    pub log_likelihood: f64,
}

/// Power transform of a single positive value.
///
/// For lambda != 0: y = (x^lambda - 1) / lambda
/// For lambda == 0: y = ln(x)
pub fn power_value(x: f64, lambda: f64) -> f64 {
    if lambda.abs() < LAMBDA_ZERO_TOLERANCE {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse power transform of a single value.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda)
/// For lambda == 0: x = exp(y)
///
/// Fails with [`ForecastError::Domain`] when `lambda * y + 1` is negative, or
/// zero with a negative λ, since no real original value maps there.
pub fn inv_power_value(y: f64, lambda: f64) -> Result<f64> {
    if lambda.abs() < LAMBDA_ZERO_TOLERANCE {
        return Ok(y.exp());
    }
    let base = lambda * y + 1.0;
    if base < 0.0 || (base == 0.0 && lambda < 0.0) {
        return Err(ForecastError::Domain(format!(
            "inverse power transform undefined: lambda * y + 1 = {base:.6} (y = {y:.6}, lambda = {lambda:.6})"
        )));
    }
    Ok(base.powf(1.0 / lambda))
}

/// Apply the power transform to a strictly positive series.
pub fn boxcox(series: &Series, lambda: f64) -> Result<Series> {
    series.ensure_positive()?;
    series.map(|x| power_value(x, lambda))
}

/// Invert the power transform value by value.
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Result<Vec<f64>> {
    transformed
        .iter()
        .map(|&y| inv_power_value(y, lambda))
        .collect()
}

/// Box-Cox profile log-likelihood of the linear-trend regression at `lambda`.
///
/// `ℓ(λ) = -n/2 · ln(RSS(λ)/n) + (λ - 1) · Σ ln xᵢ` (constants dropped).
/// Returns `-inf` when the regression fits exactly or the transform overflows.
pub fn boxcox_llf(values: &[f64], lambda: f64) -> f64 {
    let n = values.len();
    if n < 3 {
        return f64::NEG_INFINITY;
    }
    let transformed: Vec<f64> = values.iter().map(|&x| power_value(x, lambda)).collect();
    if transformed.iter().any(|y| !y.is_finite()) {
        return f64::NEG_INFINITY;
    }

    let rss = trend_rss(&transformed);
    if !(rss.is_finite() && rss > 0.0) {
        return f64::NEG_INFINITY;
    }
    let log_sum: f64 = values.iter().map(|x| x.ln()).sum();
    -0.5 * n as f64 * (rss / n as f64).ln() + (lambda - 1.0) * log_sum
}

/// Residual sum of squares of `y ~ a + b·t` with `t = 0, 1, ...`.
fn trend_rss(y: &[f64]) -> f64 {
    let n = y.len() as f64;
    let t_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (t, &v) in y.iter().enumerate() {
        let dt = t as f64 - t_mean;
        let dy = v - y_mean;
        sxx += dt * dt;
        sxy += dt * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return syy;
    }
    (syy - sxy * sxy / sxx).max(0.0)
}

/// Find the λ in `range` maximizing the Box-Cox profile likelihood.
///
/// A coarse grid locates the maximum, then golden-section search refines it
/// inside the neighbouring grid cells.
///
/// # Errors
/// * [`ForecastError::Domain`] if any value is not strictly positive.
/// * [`ForecastError::InvalidParameter`] if the range is empty or not finite.
/// * [`ForecastError::InsufficientData`] for fewer than 3 observations.
/// * [`ForecastError::Numerical`] if the likelihood is flat or undefined over the range.
pub fn boxcox_lambda(series: &Series, range: (f64, f64)) -> Result<LambdaSearch> {
    let (lo, hi) = range;
    if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
        return Err(ForecastError::InvalidParameter(format!(
            "lambda search range ({lo}, {hi}) is empty"
        )));
    }
    series.ensure_positive()?;
    let values = series.values();
    if values.len() < 3 {
        return Err(ForecastError::InsufficientData {
            needed: 3,
            got: values.len(),
        });
    }

    let step = (hi - lo) / GRID_INTERVALS as f64;
    let grid: Vec<(f64, f64)> = (0..=GRID_INTERVALS)
        .map(|i| {
            let lambda = lo + step * i as f64;
            (lambda, boxcox_llf(values, lambda))
        })
        .collect();

    let finite: Vec<&(f64, f64)> = grid.iter().filter(|(_, l)| l.is_finite()).collect();
    let Some(&&(best_lambda, best_llf)) = finite
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Err(ForecastError::Numerical(
            "Box-Cox likelihood is undefined over the whole lambda range".to_string(),
        ));
    };
    let worst_llf = finite.iter().map(|(_, l)| *l).fold(f64::INFINITY, f64::min);
    if best_llf - worst_llf <= 1e-9 * (1.0 + best_llf.abs()) {
        return Err(ForecastError::Numerical(
            "Box-Cox likelihood is flat: no distinguishable optimum for lambda".to_string(),
        ));
    }

    let a = (best_lambda - step).max(lo);
    let b = (best_lambda + step).min(hi);
    let refined = golden_section_max(|l| boxcox_llf(values, l), a, b, 1e-8);
    let refined_llf = boxcox_llf(values, refined);

    Ok(if refined_llf >= best_llf {
        LambdaSearch {
            lambda: refined,
            log_likelihood: refined_llf,
        }
    } else {
        LambdaSearch {
            lambda: best_lambda,
            log_likelihood: best_llf,
        }
    })
}

/// Golden-section search for the maximum of a unimodal `f` on `[a, b]`.
fn golden_section_max<F>(f: F, mut a: f64, mut b: f64, tol: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    while (b - a).abs() > tol {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> Series {
        Series::from_slice(values).unwrap()
    }

    #[test]
    fn power_value_lambda_1_shifts() {
        for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
            assert_relative_eq!(power_value(x, 1.0), x - 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn power_value_lambda_0_is_log() {
        for x in [0.5, 1.0, 2.0, 10.0] {
            assert_relative_eq!(power_value(x, 0.0), x.ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn power_value_lambda_2() {
        assert_relative_eq!(power_value(1.0, 2.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(power_value(2.0, 2.0), 1.5, epsilon = 1e-12);
        assert_relative_eq!(power_value(3.0, 2.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn boxcox_rejects_non_positive_values() {
        let s = series(&[1.0, 0.0, 2.0]);
        assert!(matches!(boxcox(&s, 0.5), Err(ForecastError::Domain(_))));
        let s = series(&[1.0, -3.0, 2.0]);
        assert!(matches!(
            boxcox_lambda(&s, (-1.0, 2.0)),
            Err(ForecastError::Domain(_))
        ));
    }

    #[test]
    fn inverse_roundtrip() {
        for lambda in [-1.5, -0.5, 0.0, 0.3, 1.0, 2.0] {
            for x in [0.2, 1.0, 7.5, 1234.0] {
                let y = power_value(x, lambda);
                assert_relative_eq!(
                    inv_power_value(y, lambda).unwrap(),
                    x,
                    max_relative = 1e-9
                );
            }
        }
    }

    #[test]
    fn inverse_outside_domain_is_an_error() {
        // lambda * y + 1 = 0.5 * (-3) + 1 < 0
        assert!(matches!(
            inv_power_value(-3.0, 0.5),
            Err(ForecastError::Domain(_))
        ));
        // lambda < 0 and base exactly zero maps to infinity
        assert!(matches!(
            inv_power_value(1.0, -1.0),
            Err(ForecastError::Domain(_))
        ));
        assert!(inv_boxcox(&[0.1, -3.0], 0.5).is_err());
    }

    #[test]
    fn lambda_for_exponential_growth_is_near_zero() {
        let values: Vec<f64> = (0..60)
            .map(|i| (0.05 * i as f64).exp() * (1.0 + 0.05 * (i as f64 * 1.3).sin()))
            .collect();
        let search = boxcox_lambda(&series(&values), (-1.0, 2.0)).unwrap();
        assert!(search.lambda.abs() < 0.3, "lambda = {}", search.lambda);
    }

    #[test]
    fn lambda_for_linear_trend_is_near_one() {
        let values: Vec<f64> = (0..80)
            .map(|i| 50.0 + 2.0 * i as f64 + 3.0 * (i as f64 * 2.1).sin())
            .collect();
        let search = boxcox_lambda(&series(&values), (-1.0, 3.0)).unwrap();
        assert!((search.lambda - 1.0).abs() < 0.5, "lambda = {}", search.lambda);
    }

    #[test]
    fn refined_lambda_is_not_worse_than_grid() {
        let values: Vec<f64> = (1..=50).map(|i| (i as f64).powf(1.7) + 5.0).collect();
        let s = series(&values);
        let search = boxcox_lambda(&s, (-2.0, 2.0)).unwrap();
        for i in 0..=40 {
            let lambda = -2.0 + 0.1 * i as f64;
            assert!(search.log_likelihood >= boxcox_llf(&values, lambda) - 1e-9);
        }
    }

    #[test]
    fn constant_series_has_flat_likelihood() {
        let s = series(&[5.0; 20]);
        assert!(matches!(
            boxcox_lambda(&s, (-1.0, 2.0)),
            Err(ForecastError::Numerical(_))
        ));
    }

    #[test]
    fn empty_range_is_rejected() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            boxcox_lambda(&s, (1.0, 1.0)),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}

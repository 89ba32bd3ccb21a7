//! Normality tests for transformed series and model residuals.

use crate::error::{ForecastError, Result};
use crate::utils::stats::{chi_squared_sf, normal_sf, quantile_normal};

/// Outcome of a normality test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityResult {
    /// Test statistic (W for Shapiro-Wilk, JB for Jarque-Bera).
    pub statistic: f64,
    /// P-value under the normal null hypothesis.
    pub p_value: f64,
    /// Number of observations used.
    pub n: usize,
}

impl NormalityResult {
    /// True if normality is not rejected at `alpha`.
    pub fn is_normal(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Largest sample the Shapiro-Wilk approximation covers.
pub const SHAPIRO_WILK_MAX_N: usize = 5000;

/// Shapiro-Wilk W test using Royston's (1995) approximation.
///
/// Valid for `3 <= n <= SHAPIRO_WILK_MAX_N`. W lies in `(0, 1]`; values close to 1
/// indicate normality.
pub fn shapiro_wilk(values: &[f64]) -> Result<NormalityResult> {
    let n = values.len();
    if n < 3 {
        return Err(ForecastError::InsufficientData { needed: 3, got: n });
    }
    if n > SHAPIRO_WILK_MAX_N {
        return Err(ForecastError::InvalidParameter(format!(
            "Shapiro-Wilk is defined for at most {SHAPIRO_WILK_MAX_N} observations, got {n}"
        )));
    }

    let mut x = values.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let range = x[n - 1] - x[0];
    if range <= 0.0 || !range.is_finite() {
        return Err(ForecastError::Numerical(
            "Shapiro-Wilk needs a non-constant sample".to_string(),
        ));
    }

    let a = shapiro_wilk_coefficients(n);
    let mean = x.iter().sum::<f64>() / n as f64;
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ss).min(1.0);

    Ok(NormalityResult {
        statistic: w,
        p_value: shapiro_wilk_p_value(w, n),
        n,
    })
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Antisymmetric weights `a_1..a_{n/2}` applied to `x_(n+1-i) - x_(i)`.
fn shapiro_wilk_coefficients(n: usize) -> Vec<f64> {
    const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
    const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];

    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an25 = n as f64 + 0.25;
    let m: Vec<f64> = (1..=half)
        .map(|i| quantile_normal((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut a = vec![0.0; half];
    a[0] = a1;

    let (first_generic, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    for i in first_generic..half {
        a[i] = -m[i] / fac;
    }
    a
}

fn shapiro_wilk_p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        let pi6 = 6.0 / std::f64::consts::PI;
        let stqr = std::f64::consts::PI / 3.0;
        return (pi6 * (w.sqrt().asin() - stqr)).clamp(0.0, 1.0);
    }
    if w >= 1.0 {
        return 1.0;
    }

    let nf = n as f64;
    let w1 = (1.0 - w).ln();
    if n <= 11 {
        let gamma = poly(&[-2.273, 0.459], nf);
        if w1 >= gamma {
            return 1e-99;
        }
        let y = -(gamma - w1).ln();
        let m = poly(&[0.5440, -0.39978, 0.025054, -6.714e-4], nf);
        let s = poly(&[1.3822, -0.77857, 0.062767, -0.0020322], nf).exp();
        normal_sf(y, m, s)
    } else {
        let ln_n = nf.ln();
        let m = poly(&[-1.5861, -0.31082, -0.083751, 0.0038915], ln_n);
        let s = poly(&[-0.4803, -0.082676, 0.0030302], ln_n).exp();
        normal_sf(w1, m, s)
    }
}

/// Jarque-Bera test based on sample skewness and excess kurtosis.
pub fn jarque_bera(values: &[f64]) -> Result<NormalityResult> {
    let n = values.len();
    if n < 4 {
        return Err(ForecastError::InsufficientData { needed: 4, got: n });
    }
    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    if m2 <= 0.0 {
        return Err(ForecastError::Numerical(
            "Jarque-Bera needs a non-constant sample".to_string(),
        ));
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / nf;
    let skew = m3 / m2.powf(1.5);
    let excess = m4 / (m2 * m2) - 3.0;
    let jb = nf / 6.0 * (skew * skew + excess * excess / 4.0);

    Ok(NormalityResult {
        statistic: jb,
        p_value: chi_squared_sf(jb, 2),
        n,
    })
}

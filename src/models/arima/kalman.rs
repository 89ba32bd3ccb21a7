//! Exact Gaussian likelihood of an ARMA process via the Kalman filter.
//!
//! The process `w_t = Σ φᵢ w_{t-i} + e_t + Σ θⱼ e_{t-j}` is cast in Harvey's
//! state-space form with state dimension `r = max(p, q + 1)`:
//!
//! ```text
//! α_t = T α_{t-1} + R e_t      T = [φ | I_{r-1} ; 0]
//! w_t = α_t[0]                 R = (1, θ₁, ..., θ_{r-1})'
//! ```
//!
//! The filter starts from the stationary covariance and runs with σ² = 1, so the
//! innovation variance can be concentrated out of the likelihood.

use crate::error::{ForecastError, Result};

/// Maximum doubling steps when solving for the stationary covariance.
const MAX_DOUBLING: usize = 64;
/// Covariance change below which the filter switches to its steady state.
const STEADY_STATE_TOL: f64 = 1e-10;

/// Filter output with σ² concentrated out.
#[derive(Debug, Clone)]
pub struct KalmanOutput {
    /// Maximum-likelihood innovation variance.
    pub sigma2: f64,
    /// Concentrated Gaussian log-likelihood.
    pub log_likelihood: f64,
    /// Standardized innovations `v_t / √F_t`.
    pub residuals: Vec<f64>,
    /// Relative innovation variances `F_t`.
    pub innovation_variances: Vec<f64>,
}

struct StateSpace {
    phi: Vec<f64>,
    r_vec: Vec<f64>,
    dim: usize,
}

impl StateSpace {
    fn new(phi: &[f64], theta: &[f64]) -> Self {
        let dim = phi.len().max(theta.len() + 1);
        let mut phi_full = vec![0.0; dim];
        phi_full[..phi.len()].copy_from_slice(phi);
        let mut r_vec = vec![0.0; dim];
        r_vec[0] = 1.0;
        r_vec[1..=theta.len()].copy_from_slice(theta);
        Self {
            phi: phi_full,
            r_vec,
            dim,
        }
    }

    /// `T a`.
    fn transition(&self, a: &[f64]) -> Vec<f64> {
        (0..self.dim)
            .map(|i| self.phi[i] * a[0] + if i + 1 < self.dim { a[i + 1] } else { 0.0 })
            .collect()
    }

    /// `T P T' + R R'` using the companion structure of `T`.
    fn predict_covariance(&self, p: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let r = self.dim;
        // M = T P
        let mut m = vec![vec![0.0; r]; r];
        for i in 0..r {
            for j in 0..r {
                let shifted = if i + 1 < r { p[i + 1][j] } else { 0.0 };
                m[i][j] = self.phi[i] * p[0][j] + shifted;
            }
        }
        // M T' + R R'
        let mut out = vec![vec![0.0; r]; r];
        for i in 0..r {
            for j in 0..r {
                let shifted = if j + 1 < r { m[i][j + 1] } else { 0.0 };
                out[i][j] = self.phi[j] * m[i][0] + shifted + self.r_vec[i] * self.r_vec[j];
            }
        }
        out
    }

    fn transition_matrix(&self) -> Vec<Vec<f64>> {
        let r = self.dim;
        let mut t = vec![vec![0.0; r]; r];
        for i in 0..r {
            t[i][0] = self.phi[i];
            if i + 1 < r {
                t[i][i + 1] = 1.0;
            }
        }
        t
    }

    /// Solve `P = T P T' + R R'` with the doubling algorithm.
    fn stationary_covariance(&self) -> Result<Vec<Vec<f64>>> {
        let r = self.dim;
        let mut x: Vec<Vec<f64>> = (0..r)
            .map(|i| (0..r).map(|j| self.r_vec[i] * self.r_vec[j]).collect())
            .collect();
        let mut a = self.transition_matrix();

        for _ in 0..MAX_DOUBLING {
            let axa = matmul(&matmul(&a, &x), &transpose(&a));
            let mut change: f64 = 0.0;
            for i in 0..r {
                for j in 0..r {
                    x[i][j] += axa[i][j];
                    change = change.max(axa[i][j].abs());
                }
            }
            if !change.is_finite() {
                break;
            }
            let scale = x[0][0].abs().max(1.0);
            if change <= 1e-14 * scale {
                return Ok(x);
            }
            a = matmul(&a, &a);
        }
        Err(ForecastError::Numerical(
            "stationary state covariance did not converge; AR operator is not stationary"
                .to_string(),
        ))
    }
}

fn matmul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    let m = b.first().map_or(0, Vec::len);
    let mut out = vec![vec![0.0; m]; n];
    for i in 0..n {
        for (k, &aik) in a[i].iter().enumerate() {
            if aik == 0.0 {
                continue;
            }
            for j in 0..m {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    out
}

fn transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    let m = a.first().map_or(0, Vec::len);
    (0..m).map(|j| (0..n).map(|i| a[i][j]).collect()).collect()
}

/// Run the Kalman filter for a zero-mean ARMA process.
///
/// `phi` and `theta` are the expanded AR and MA coefficients (seasonal factors
/// already multiplied in), with sign convention `w_t = Σ φᵢ w_{t-i} + ...`.
///
/// # Errors
/// * `InsufficientData` for an empty series.
/// * `Numerical` when the AR part is not stationary or an innovation
///   variance degenerates.
pub fn arma_likelihood(w: &[f64], phi: &[f64], theta: &[f64]) -> Result<KalmanOutput> {
    let n = w.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }

    let model = StateSpace::new(phi, theta);
    let r = model.dim;
    let mut p = model.stationary_covariance()?;
    let mut a = vec![0.0; r];

    let mut residuals = Vec::with_capacity(n);
    let mut innovation_variances = Vec::with_capacity(n);
    let mut sum_log_f = 0.0;
    let mut ssq = 0.0;

    let mut steady = false;
    let mut previous: Option<Vec<Vec<f64>>> = None;
    let mut f = 1.0;
    let mut gain = vec![0.0; r];

    for (t, &y) in w.iter().enumerate() {
        if t > 0 {
            a = model.transition(&a);
        }

        if !steady {
            if t > 0 {
                p = model.predict_covariance(&p);
            }
            if let Some(prev) = &previous {
                steady = max_abs_diff(&p, prev) < STEADY_STATE_TOL;
            }
            f = p[0][0];
            if !(f.is_finite() && f > 0.0) {
                return Err(ForecastError::Numerical(format!(
                    "innovation variance {f} at t = {t} is not positive"
                )));
            }
            for i in 0..r {
                gain[i] = p[i][0] / f;
            }
            if !steady {
                previous = Some(p.clone());
                // Filtered covariance P - P[:,0] P[0,:] / F.
                let col: Vec<f64> = (0..r).map(|i| p[i][0]).collect();
                for i in 0..r {
                    for j in 0..r {
                        p[i][j] -= col[i] * col[j] / f;
                    }
                }
            }
        }

        let v = y - a[0];
        for i in 0..r {
            a[i] += gain[i] * v;
        }
        sum_log_f += f.ln();
        ssq += v * v / f;
        residuals.push(v / f.sqrt());
        innovation_variances.push(f);
    }

    let nf = n as f64;
    let sigma2 = ssq / nf;
    if !(sigma2.is_finite() && sigma2 > 0.0) {
        return Err(ForecastError::Numerical(format!(
            "innovation variance estimate {sigma2} is not positive"
        )));
    }
    let log_likelihood =
        -0.5 * (nf * (2.0 * std::f64::consts::PI * sigma2).ln() + sum_log_f + nf);

    Ok(KalmanOutput {
        sigma2,
        log_likelihood,
        residuals,
        innovation_variances,
    })
}

fn max_abs_diff(a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
    a.iter()
        .zip(b)
        .flat_map(|(x, y)| x.iter().zip(y).map(|(u, v)| (u - v).abs()))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn white_noise_likelihood_matches_closed_form() {
        let w = white_noise(100, 1);
        let out = arma_likelihood(&w, &[], &[]).unwrap();
        let sigma2 = w.iter().map(|x| x * x).sum::<f64>() / 100.0;
        assert_relative_eq!(out.sigma2, sigma2, epsilon = 1e-12);
        let expected = -50.0 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        assert_relative_eq!(out.log_likelihood, expected, epsilon = 1e-9);
        for (r, x) in out.residuals.iter().zip(&w) {
            assert_relative_eq!(r, x, epsilon = 1e-12);
        }
    }

    #[test]
    fn ar1_uses_stationary_initial_variance() {
        let phi = 0.6;
        let w = [1.0, 0.2, -0.5, 0.4];
        let out = arma_likelihood(&w, &[phi], &[]).unwrap();
        assert_relative_eq!(out.innovation_variances[0], 1.0 / (1.0 - phi * phi), epsilon = 1e-10);
        for f in &out.innovation_variances[1..] {
            assert_relative_eq!(*f, 1.0, epsilon = 1e-10);
        }
        // Later innovations are the one-step AR errors.
        assert_relative_eq!(out.residuals[2], -0.5 - phi * 0.2, epsilon = 1e-10);
    }

    #[test]
    fn ma1_innovation_variances_converge_to_one() {
        let w = white_noise(200, 2);
        let out = arma_likelihood(&w, &[], &[0.5]).unwrap();
        assert_relative_eq!(out.innovation_variances[0], 1.25, epsilon = 1e-10);
        let last = out.innovation_variances[199];
        assert_relative_eq!(last, 1.0, epsilon = 1e-8);
        assert!(out.innovation_variances.windows(2).all(|w| w[1] <= w[0] + 1e-12));
    }

    #[test]
    fn likelihood_prefers_true_ar_coefficient() {
        let e = white_noise(400, 3);
        let mut w = vec![0.0; 400];
        for t in 1..400 {
            w[t] = 0.7 * w[t - 1] + e[t];
        }
        let at_truth = arma_likelihood(&w, &[0.7], &[]).unwrap().log_likelihood;
        let at_zero = arma_likelihood(&w, &[0.0], &[]).unwrap().log_likelihood;
        let too_big = arma_likelihood(&w, &[0.95], &[]).unwrap().log_likelihood;
        assert!(at_truth > at_zero);
        assert!(at_truth > too_big);
    }

    #[test]
    fn explosive_ar_is_a_numerical_error() {
        let w = white_noise(20, 4);
        assert!(matches!(
            arma_likelihood(&w, &[1.2], &[]),
            Err(ForecastError::Numerical(_))
        ));
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(
            arma_likelihood(&[], &[0.5], &[]),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}

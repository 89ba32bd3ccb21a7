//! Lag-polynomial algebra for SARIMA operators.
//!
//! A polynomial is stored by ascending powers of the backshift operator `B`,
//! so `[1.0, -0.5]` is `1 - 0.5B`.

use num_complex::Complex64;

/// Coefficients with magnitude below this are treated as zero when trimming
/// the leading terms before root finding.
const COEFFICIENT_EPS: f64 = 1e-14;
const MAX_ROOT_ITERATIONS: usize = 500;

/// AR operator `1 - φ₁B - ... - φₚBᵖ`.
pub fn ar_polynomial(phi: &[f64]) -> Vec<f64> {
    std::iter::once(1.0).chain(phi.iter().map(|c| -c)).collect()
}

/// MA operator `1 + θ₁B + ... + θ_qB^q`.
pub fn ma_polynomial(theta: &[f64]) -> Vec<f64> {
    std::iter::once(1.0).chain(theta.iter().copied()).collect()
}

/// Product of two polynomials.
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Substitute `Bˢ` for `B`.
pub fn seasonal_expand(poly: &[f64], period: usize) -> Vec<f64> {
    if poly.is_empty() {
        return Vec::new();
    }
    let period = period.max(1);
    let mut out = vec![0.0; (poly.len() - 1) * period + 1];
    for (k, &c) in poly.iter().enumerate() {
        out[k * period] = c;
    }
    out
}

/// Differencing operator `(1 - B)ᵈ (1 - Bˢ)ᴰ`.
pub fn differencing_polynomial(d: usize, cap_d: usize, period: usize) -> Vec<f64> {
    let mut out = vec![1.0];
    for _ in 0..d {
        out = multiply(&out, &[1.0, -1.0]);
    }
    let seasonal = seasonal_expand(&[1.0, -1.0], period);
    for _ in 0..cap_d {
        out = multiply(&out, &seasonal);
    }
    out
}

fn horner(monic: &[f64], z: Complex64) -> Complex64 {
    monic
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
}

/// Complex roots of `poly` by Durand-Kerner iteration.
///
/// Trailing near-zero coefficients are dropped first, so the number of roots is
/// the effective degree.
pub fn roots(poly: &[f64]) -> Vec<Complex64> {
    let Some(degree) = poly.iter().rposition(|c| c.abs() > COEFFICIENT_EPS) else {
        return Vec::new();
    };
    if degree == 0 {
        return Vec::new();
    }
    let lead = poly[degree];
    if degree == 1 {
        return vec![Complex64::new(-poly[0] / lead, 0.0)];
    }
    let monic: Vec<f64> = poly[..=degree].iter().map(|c| c / lead).collect();

    let radius = 1.0
        + monic[..degree]
            .iter()
            .map(|c| c.abs())
            .fold(0.0, f64::max);
    let seed = Complex64::new(0.4, 0.9);
    let mut z: Vec<Complex64> = (0..degree)
        .map(|k| seed.powu(k as u32 + 1) * radius.min(2.0))
        .collect();

    for _ in 0..MAX_ROOT_ITERATIONS {
        let mut max_step: f64 = 0.0;
        for i in 0..degree {
            let numerator = horner(&monic, z[i]);
            let mut denominator = Complex64::new(1.0, 0.0);
            for j in 0..degree {
                if i != j {
                    denominator *= z[i] - z[j];
                }
            }
            if denominator.norm() < 1e-300 {
                denominator = Complex64::new(1e-12, 1e-12);
            }
            let step = numerator / denominator;
            z[i] -= step;
            max_step = max_step.max(step.norm() / (1.0 + z[i].norm()));
        }
        if max_step < 1e-13 {
            break;
        }
    }
    z
}

/// Smallest root modulus of `poly`; infinite for a constant polynomial.
pub fn min_root_modulus(poly: &[f64]) -> f64 {
    roots(poly)
        .iter()
        .map(|r| r.norm())
        .fold(f64::INFINITY, f64::min)
}

/// Smallest root modulus of `poly(Bˢ)`, computed from the roots of `poly`.
pub fn min_root_modulus_seasonal(poly: &[f64], period: usize) -> f64 {
    min_root_modulus(poly).powf(1.0 / period.max(1) as f64)
}

/// First `n` weights of the MA(∞) representation of `ma(B) / ar(B)`.
///
/// `ar` may contain unit roots (differencing); the weights then do not decay.
pub fn psi_weights(ar: &[f64], ma: &[f64], n: usize) -> Vec<f64> {
    let mut psi = vec![0.0; n];
    for j in 0..n {
        let mut value = if j == 0 {
            1.0
        } else {
            ma.get(j).copied().unwrap_or(0.0)
        };
        for i in 1..=j.min(ar.len().saturating_sub(1)) {
            value -= ar[i] * psi[j - i];
        }
        psi[j] = value;
    }
    psi
}

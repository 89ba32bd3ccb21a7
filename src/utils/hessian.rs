//! Finite-difference Hessians and the standard errors derived from them.
//!
//! The objective is a negative log-likelihood, so its Hessian at the optimum
//! is the observed information matrix. Standard errors are the square roots of
//! the diagonal of its inverse; the inverse is formed from a Cholesky factor so
//! a matrix that is not positive definite is detected rather than inverted.

/// Central-difference Hessian of `f` at `x`.
pub fn numerical_hessian<F>(f: F, x: &[f64]) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x.len();
    let steps: Vec<f64> = x.iter().map(|v| 1e-3 * v.abs().max(0.1)).collect();
    let f0 = f(x);
    let mut h = vec![vec![0.0; n]; n];
    let mut point = x.to_vec();

    for i in 0..n {
        let hi = steps[i];
        point[i] = x[i] + hi;
        let f_plus = f(&point);
        point[i] = x[i] - hi;
        let f_minus = f(&point);
        point[i] = x[i];
        h[i][i] = (f_plus - 2.0 * f0 + f_minus) / (hi * hi);

        for j in 0..i {
            let hj = steps[j];
            let mut eval = |di: f64, dj: f64| {
                point[i] = x[i] + di;
                point[j] = x[j] + dj;
                let v = f(&point);
                point[i] = x[i];
                point[j] = x[j];
                v
            };
            let value = (eval(hi, hj) - eval(hi, -hj) - eval(-hi, hj) + eval(-hi, -hj))
                / (4.0 * hi * hj);
            h[i][j] = value;
            h[j][i] = value;
        }
    }
    h
}

/// Lower-triangular Cholesky factor of a symmetric matrix, if positive definite.
pub fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - sum;
                if !d.is_finite() || d <= 0.0 {
                    return None;
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }
    Some(l)
}

/// Diagonal of the inverse of a positive definite matrix.
pub fn inverse_diagonal(a: &[Vec<f64>]) -> Option<Vec<f64>> {
    let l = cholesky(a)?;
    let n = l.len();
    // diag(A^-1)_i = sum_k (L^-1)_{k,i}^2; solve L * col = e_i by forward substitution.
    let mut diag = vec![0.0; n];
    for i in 0..n {
        let mut col = vec![0.0; n];
        for k in i..n {
            let rhs = if k == i { 1.0 } else { 0.0 };
            let sum: f64 = (i..k).map(|m| l[k][m] * col[m]).sum();
            col[k] = (rhs - sum) / l[k][k];
        }
        diag[i] = col.iter().map(|c| c * c).sum();
    }
    Some(diag)
}

/// Standard errors at the optimum of a negative log-likelihood.
///
/// Returns `None` when the observed information is not positive definite.
pub fn standard_errors<F>(neg_loglik: F, optimum: &[f64]) -> Option<Vec<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if optimum.is_empty() {
        return Some(Vec::new());
    }
    let hessian = numerical_hessian(neg_loglik, optimum);
    inverse_diagonal(&hessian).map(|d| d.into_iter().map(f64::sqrt).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hessian_of_quadratic_form() {
        // f = x^2 + 3xy + 4y^2 -> H = [[2, 3], [3, 8]]
        let h = numerical_hessian(|v| v[0] * v[0] + 3.0 * v[0] * v[1] + 4.0 * v[1] * v[1], &[0.3, -0.2]);
        assert_relative_eq!(h[0][0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(h[0][1], 3.0, epsilon = 1e-4);
        assert_relative_eq!(h[1][0], 3.0, epsilon = 1e-4);
        assert_relative_eq!(h[1][1], 8.0, epsilon = 1e-4);
    }

    #[test]
    fn inverse_diagonal_matches_closed_form() {
        // [[4, 2], [2, 3]]^-1 = 1/8 * [[3, -2], [-2, 4]]
        let diag = inverse_diagonal(&[vec![4.0, 2.0], vec![2.0, 3.0]]).unwrap();
        assert_relative_eq!(diag[0], 3.0 / 8.0, epsilon = 1e-12);
        assert_relative_eq!(diag[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        assert!(cholesky(&[vec![1.0, 2.0], vec![2.0, 1.0]]).is_none());
    }

    #[test]
    fn standard_errors_of_gaussian_mean() {
        // Negative log-likelihood of N(mu, 1) for n observations has curvature n.
        let data = [1.0, 2.0, 3.0, 4.0];
        let nll = |p: &[f64]| data.iter().map(|x| 0.5 * (x - p[0]).powi(2)).sum::<f64>();
        let se = standard_errors(nll, &[2.5]).unwrap();
        assert_relative_eq!(se[0], 0.5, epsilon = 1e-4);
    }
}

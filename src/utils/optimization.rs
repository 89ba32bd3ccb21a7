//! Derivative-free minimization used for likelihood maximization.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The best vertex found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Iterations performed (summed over restarts).
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance.
    pub converged: bool,
    /// Whether the run was stopped by `max_duration`.
    pub timed_out: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations per start.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Initial simplex step for coordinates at zero; other coordinates move
    /// by this fraction of their magnitude.
    pub initial_step: f64,
    /// Number of restarts from the previous optimum.
    pub restarts: usize,
    /// Wall-clock budget for the whole run.
    pub max_duration: Option<Duration>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
            restarts: 3,
            max_duration: None,
        }
    }
}

impl NelderMeadConfig {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_duration(mut self, budget: Duration) -> Self {
        self.max_duration = Some(budget);
        self
    }
}

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// After the first start converges, the simplex is rebuilt around the optimum
/// up to `config.restarts` times, stopping early once a restart no longer
/// improves the objective noticeably. The result is converged when the last
/// start converged.
///
/// # Example
/// ```
/// use sarima_engine::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     &NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(objective: F, initial: &[f64], config: &NelderMeadConfig) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: objective(initial),
            iterations: 0,
            converged: true,
            timed_out: false,
        };
    }

    let deadline = config.max_duration.map(|d| Instant::now() + d);
    let mut result = single_start(&objective, initial, config, deadline);

    for _ in 0..config.restarts {
        if !result.converged || result.timed_out {
            break;
        }
        let previous = result.optimal_value;
        let iterations = result.iterations;
        let restarted = single_start(&objective, &result.optimal_point, config, deadline);
        let improvement = previous - restarted.optimal_value;
        let improved_noticeably = improvement > config.tolerance.sqrt() * (1.0 + previous.abs());

        result = NelderMeadResult {
            iterations: iterations + restarted.iterations,
            ..restarted
        };
        if !improved_noticeably {
            break;
        }
    }
    result
}

fn single_start<F>(
    objective: &F,
    initial: &[f64],
    config: &NelderMeadConfig,
    deadline: Option<Instant>,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut timed_out = false;

    while iterations < config.max_iter {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            break;
        }
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = (values[worst] - values[best]).abs();
        if spread <= config.tolerance * (1.0 + values[best].abs()) {
            converged = true;
            break;
        }

        let centroid = centroid_excluding(&simplex, worst);
        let reflected = affine(&centroid, &simplex[worst], -config.alpha);
        let reflected_value = objective(&reflected);

        if reflected_value < values[best] {
            let expanded = affine(&centroid, &reflected, config.gamma);
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, threshold) = if reflected_value < values[worst] {
            (affine(&centroid, &reflected, config.rho), reflected_value)
        } else {
            (affine(&centroid, &simplex[worst], config.rho), values[worst])
        };
        let contracted_value = objective(&contracted);
        if contracted_value < threshold {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        // Shrink towards the best vertex.
        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            for j in 0..n {
                simplex[i][j] = anchor[j] + config.sigma * (simplex[i][j] - anchor[j]);
            }
            values[i] = objective(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
        timed_out,
    }
}

/// Centroid of all vertices except `exclude`.
fn centroid_excluding(simplex: &[Vec<f64>], exclude: usize) -> Vec<f64> {
    let dim = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dim];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == exclude {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `centroid + coef * (point - centroid)`.
fn affine(centroid: &[f64], point: &[f64], coef: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(point)
        .map(|(c, p)| c + coef * (p - c))
        .collect()
}

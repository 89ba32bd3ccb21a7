//! Multi-step forecasts from a fitted SARIMA model.

use tracing::debug;

use crate::core::Forecast;
use crate::error::{ForecastError, Result};
use crate::models::arima::model::FittedModel;
use crate::models::arima::polynomial::{differencing_polynomial, multiply, psi_weights};
use crate::transform::TransformSpec;

/// Produces point forecasts with ±`interval_width`·SE bounds.
///
/// The recursion runs on the scale the model was fit on. The full AR operator
/// `φ(B)Φ(Bˢ)(1 - B)ᵈ(1 - Bˢ)ᴰ` is applied to the last observations and the
/// MA operator `θ(B)Θ(Bˢ)` to the last residuals; future innovations are zero.
#[derive(Debug, Clone)]
pub struct Forecaster {
    interval_width: f64,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            interval_width: 2.0,
        }
    }
}

impl Forecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of standard errors on each side of the point forecast.
    pub fn with_interval_width(mut self, width: f64) -> Self {
        self.interval_width = width;
        self
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    /// Forecast `horizon` steps past the end of the model's training series.
    ///
    /// With a `transform`, the point forecasts and both bounds are mapped back
    /// to original units; otherwise the original-scale columns repeat the
    /// transformed ones.
    ///
    /// # Errors
    /// * `InvalidParameter` for a negative or non-finite interval width.
    /// * `Domain` when a bound falls outside the domain of the inverse
    ///   transform.
    pub fn forecast(
        &self,
        model: &FittedModel,
        horizon: usize,
        transform: Option<&TransformSpec>,
    ) -> Result<Forecast> {
        if !(self.interval_width.is_finite() && self.interval_width >= 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "interval width must be non-negative, got {}",
                self.interval_width
            )));
        }

        let order = model.order();
        let ar = multiply(
            &model.ar_operator(),
            &differencing_polynomial(order.d, order.cap_d, order.s),
        );
        let ma = model.ma_operator();
        let mean = model.mean().unwrap_or(0.0);

        let training = model.training();
        let n = training.len();
        let mut y: Vec<f64> = training.values().iter().map(|v| v - mean).collect();
        let mut e: Vec<f64> = model.residuals().values().to_vec();
        y.reserve(horizon);
        e.reserve(horizon);

        for t in n..n + horizon {
            let ar_part: f64 = (1..ar.len())
                .filter(|&i| i <= t)
                .map(|i| -ar[i] * y[t - i])
                .sum();
            let ma_part: f64 = (1..ma.len())
                .filter(|&j| j <= t)
                .map(|j| ma[j] * e[t - j])
                .sum();
            y.push(ar_part + ma_part);
            e.push(0.0);
        }
        let point: Vec<f64> = y[n..].iter().map(|v| v + mean).collect();

        let psi = psi_weights(&ar, &ma, horizon);
        let mut cumulative = 0.0;
        let std_errors: Vec<f64> = psi
            .iter()
            .map(|w| {
                cumulative += w * w;
                (model.sigma2() * cumulative).sqrt()
            })
            .collect();

        let width = self.interval_width;
        let lower: Vec<f64> = point.iter().zip(&std_errors).map(|(p, s)| p - width * s).collect();
        let upper: Vec<f64> = point.iter().zip(&std_errors).map(|(p, s)| p + width * s).collect();

        let (original_point, original_lower, original_upper) = match transform {
            Some(spec) => (spec.inverse(&point)?, spec.inverse(&lower)?, spec.inverse(&upper)?),
            None => (point.clone(), lower, upper),
        };

        debug!(
            order = %order,
            horizon,
            first = point.first().copied(),
            last_se = std_errors.last().copied(),
            "forecast produced"
        );

        Ok(Forecast::from_parts(
            point,
            std_errors,
            width,
            original_point,
            original_lower,
            original_upper,
            transform.copied(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Series;
    use crate::models::arima::model::SarimaEstimator;
    use crate::models::arima::order::SarimaOrder;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use std::sync::Arc;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn fit(values: Vec<f64>, order: SarimaOrder) -> FittedModel {
        SarimaEstimator::default()
            .fit(&Arc::new(Series::new(values).unwrap()), &order)
            .unwrap()
    }

    #[test]
    fn ar1_forecast_decays_to_mean() {
        let e = noise(400, 1);
        let mut y = vec![0.0; 400];
        for t in 1..400 {
            y[t] = 0.7 * y[t - 1] + e[t];
        }
        let values: Vec<f64> = y.iter().map(|v| v + 20.0).collect();
        let last = values[399];
        let model = fit(values, SarimaOrder::new(1, 0, 0));

        let forecast = Forecaster::default().forecast(&model, 30, None).unwrap();
        let mu = model.mean().unwrap();
        let phi = model.ar()[0];
        assert_relative_eq!(forecast.point()[0], mu + phi * (last - mu), epsilon = 1e-9);
        assert!((forecast.point()[29] - mu).abs() < 0.01);

        // SE_1 = σ and SE_h grows towards the unconditional standard deviation.
        let sigma = model.sigma2().sqrt();
        assert_relative_eq!(forecast.std_errors()[0], sigma, epsilon = 1e-12);
        let unconditional = sigma / (1.0 - phi * phi).sqrt();
        assert!(forecast.std_errors()[29] < unconditional + 1e-9);
        assert!(forecast.std_errors().windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn random_walk_forecast_is_flat_with_growing_bounds() {
        let e = noise(200, 2);
        let mut y = vec![50.0; 200];
        for t in 1..200 {
            y[t] = y[t - 1] + e[t];
        }
        let last = y[199];
        let model = fit(y, SarimaOrder::new(0, 1, 0));
        let forecast = Forecaster::default().forecast(&model, 9, None).unwrap();

        let sigma = model.sigma2().sqrt();
        for h in 0..9 {
            assert_relative_eq!(forecast.point()[h], last, epsilon = 1e-9);
            assert_relative_eq!(
                forecast.std_errors()[h],
                sigma * ((h + 1) as f64).sqrt(),
                epsilon = 1e-9
            );
            assert_relative_eq!(
                forecast.upper()[h] - forecast.point()[h],
                2.0 * forecast.std_errors()[h],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn seasonal_naive_structure_repeats_last_season() {
        // (1 - B^4) y = e with no other terms repeats the last observed season.
        let e = noise(80, 3);
        let mut y: Vec<f64> = vec![10.0, 20.0, 30.0, 40.0];
        for t in 4..80 {
            y.push(y[t - 4] + 0.1 * e[t]);
        }
        let tail: Vec<f64> = y[76..].to_vec();
        let model = fit(y, SarimaOrder::seasonal((0, 0, 0), (0, 1, 0, 4)));
        let forecast = Forecaster::default().forecast(&model, 8, None).unwrap();
        for h in 0..8 {
            assert_relative_eq!(forecast.point()[h], tail[h % 4], epsilon = 1e-9);
        }
        assert_relative_eq!(
            forecast.std_errors()[4],
            forecast.std_errors()[0] * 2f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn inverse_transform_applies_to_bounds() {
        let e = noise(150, 4);
        let mut y = vec![3.0; 150];
        for t in 1..150 {
            y[t] = 3.0 + 0.5 * (y[t - 1] - 3.0) + 0.05 * e[t];
        }
        let model = fit(y, SarimaOrder::new(1, 0, 0));
        let spec = TransformSpec::log();
        let forecast = Forecaster::default()
            .forecast(&model, 5, Some(&spec))
            .unwrap();

        for h in 0..5 {
            assert_relative_eq!(forecast.original_point()[h], forecast.point()[h].exp());
            assert_relative_eq!(forecast.original_lower()[h], forecast.lower()[h].exp());
            assert!(forecast.original_lower()[h] < forecast.original_upper()[h]);
        }
        assert_eq!(forecast.transform(), Some(&spec));
    }

    #[test]
    fn bounds_outside_inverse_domain_are_surfaced() {
        // Values near zero on a λ = 1 scale put the lower bound below -1/λ.
        let e = noise(120, 5);
        let y: Vec<f64> = e.iter().map(|v| -0.7 + 0.5 * v).collect();
        let model = fit(y, SarimaOrder::new(0, 0, 0));
        let spec = TransformSpec::power(1.0);
        let result = Forecaster::default().forecast(&model, 3, Some(&spec));
        assert!(matches!(result, Err(ForecastError::Domain(_))));
    }

    #[test]
    fn negative_width_is_rejected() {
        let model = fit(noise(50, 6), SarimaOrder::new(0, 0, 0));
        assert!(matches!(
            Forecaster::default()
                .with_interval_width(-1.0)
                .forecast(&model, 3, None),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}

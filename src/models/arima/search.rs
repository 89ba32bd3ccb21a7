//! Parallel SARIMA candidate search ranked by AICc.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::arima::model::{EstimatorConfig, FittedModel, SarimaEstimator};
use crate::models::arima::order::SarimaOrder;

/// Configuration for [`ModelSearch`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub estimator: EstimatorConfig,
    /// Wall-clock budget for each candidate fit.
    pub candidate_timeout: Option<Duration>,
    /// Fit candidates on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            candidate_timeout: Some(Duration::from_secs(60)),
            parallel: true,
        }
    }
}

impl SearchConfig {
    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_candidate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Fit candidates one after another on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// A candidate removed from the ranking, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub order: SarimaOrder,
    pub error: ForecastError,
}

/// Outcome of a search.
#[derive(Debug, Clone)]
pub struct SearchSummary {
    /// Successful fits, best AICc first.
    pub ranked: Vec<FittedModel>,
    pub rejected: Vec<RejectedCandidate>,
}

impl SearchSummary {
    pub fn best(&self) -> Option<&FittedModel> {
        self.ranked.first()
    }

    /// Number of candidates attempted.
    pub fn attempted(&self) -> usize {
        self.ranked.len() + self.rejected.len()
    }
}

/// Orders models by AICc, then by parameter count.
pub fn rank_models(models: &mut [FittedModel]) {
    models.sort_by(compare_models);
}

fn compare_models(a: &FittedModel, b: &FittedModel) -> Ordering {
    a.aicc()
        .total_cmp(&b.aicc())
        .then_with(|| a.n_params().cmp(&b.n_params()))
}

/// Fits every candidate independently and ranks the successful ones.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sarima_engine::core::Series;
/// use sarima_engine::models::arima::{ModelSearch, SarimaOrder};
///
/// let series = Arc::new(Series::new((0..200).map(|i| (i as f64 * 0.3).sin() + 5.0).collect()).unwrap());
/// let summary = ModelSearch::default()
///     .run(&series, &[SarimaOrder::new(1, 0, 0), SarimaOrder::new(2, 0, 1)])
///     .unwrap();
/// for model in &summary.ranked {
///     println!("{} AICc = {:.2}", model.order(), model.aicc());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelSearch {
    config: SearchConfig,
}

impl ModelSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Fit all `candidates` on `series` and rank them.
    ///
    /// Per-candidate failures are collected in [`SearchSummary::rejected`] and
    /// never abort the search.
    ///
    /// # Errors
    /// `InvalidParameter` when no candidates are given.
    pub fn run(&self, series: &Arc<Series>, candidates: &[SarimaOrder]) -> Result<SearchSummary> {
        if candidates.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "candidate set is empty".to_string(),
            ));
        }

        let mut estimator_config = self.config.estimator.clone();
        if let Some(timeout) = self.config.candidate_timeout {
            estimator_config = estimator_config.with_max_duration(timeout);
        }
        let estimator = SarimaEstimator::new(estimator_config);

        let fit = |order: &SarimaOrder| (order.clone(), estimator.fit(series, order));
        let outcomes: Vec<(SarimaOrder, Result<FittedModel>)> = if self.config.parallel {
            candidates.par_iter().map(fit).collect()
        } else {
            candidates.iter().map(fit).collect()
        };

        let mut ranked = Vec::new();
        let mut rejected = Vec::new();
        for (order, outcome) in outcomes {
            match outcome {
                Ok(model) => ranked.push(model),
                Err(error) => {
                    warn!(order = %order, %error, "candidate rejected");
                    rejected.push(RejectedCandidate { order, error });
                }
            }
        }
        rank_models(&mut ranked);

        for (rank, model) in ranked.iter().enumerate() {
            debug!(rank, order = %model.order(), aicc = model.aicc(), "ranked candidate");
        }
        info!(
            fitted = ranked.len(),
            rejected = rejected.len(),
            best = ?ranked.first().map(|m| m.order().to_string()),
            "model search finished"
        );

        Ok(SearchSummary { ranked, rejected })
    }
}

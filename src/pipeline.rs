//! End-to-end modeling run: transform, difference, search, diagnose, forecast.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::{Forecast, Partition, Series};
use crate::error::{ForecastError, Result};
use crate::models::arima::{
    identify, DifferencingSpec, EstimatorConfig, FittedModel, Forecaster, IdentificationConfig,
    IdentificationReport, ModelSearch, SarimaEstimator, SarimaOrder, SearchConfig, SearchSummary,
    Stationarized, StationarityReducer,
};
use crate::transform::{TransformSelection, TransformSelector};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use crate::validation::{DiagnosticsConfig, DiagnosticsEngine, DiagnosticsReport};

/// Configuration of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval searched for the power transform's λ.
    pub transform_search_range: (f64, f64),
    pub seasonal_period: usize,
    /// Orders to fit; identified from the correlogram when empty.
    pub candidate_orders: Vec<SarimaOrder>,
    /// Significance level of the correlogram band and the diagnostics.
    pub significance_level: f64,
    pub forecast_horizon: usize,
    /// Lag horizon of the portmanteau tests.
    pub diagnostics_lag: usize,
    /// Standard errors on each side of the point forecast.
    pub interval_width: f64,
    /// Largest correlogram lag; the stationary series must be longer.
    pub acf_max_lag: usize,
    /// Relative variance drop each differencing step must achieve.
    pub min_variance_reduction: f64,
    /// Abort when a differencing step fails to reduce variance; otherwise the
    /// step is logged and reported.
    pub stop_on_overdifferencing: bool,
    /// W margin by which the power transform may trail the log transform.
    pub normality_tie_tolerance: f64,
    /// Wall-clock budget of each candidate fit.
    pub candidate_timeout: Option<Duration>,
    /// Differencing applied before identification; seasonal then trend by
    /// default.
    pub differencing: Option<DifferencingSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transform_search_range: (-1.0, 2.0),
            seasonal_period: 7,
            candidate_orders: Vec::new(),
            significance_level: 0.05,
            forecast_horizon: 14,
            diagnostics_lag: 18,
            interval_width: 2.0,
            acf_max_lag: 40,
            min_variance_reduction: 0.0,
            stop_on_overdifferencing: false,
            normality_tie_tolerance: 0.0,
            candidate_timeout: Some(Duration::from_secs(60)),
            differencing: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_transform_search_range(mut self, lo: f64, hi: f64) -> Self {
        self.transform_search_range = (lo, hi);
        self
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    pub fn with_candidate_orders(mut self, orders: Vec<SarimaOrder>) -> Self {
        self.candidate_orders = orders;
        self
    }

    pub fn with_significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = alpha;
        self
    }

    pub fn with_forecast_horizon(mut self, horizon: usize) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    pub fn with_diagnostics_lag(mut self, lag: usize) -> Self {
        self.diagnostics_lag = lag;
        self
    }

    pub fn with_interval_width(mut self, width: f64) -> Self {
        self.interval_width = width;
        self
    }

    pub fn with_acf_max_lag(mut self, lag: usize) -> Self {
        self.acf_max_lag = lag;
        self
    }

    pub fn with_min_variance_reduction(mut self, reduction: f64) -> Self {
        self.min_variance_reduction = reduction;
        self
    }

    pub fn with_stop_on_overdifferencing(mut self, stop: bool) -> Self {
        self.stop_on_overdifferencing = stop;
        self
    }

    pub fn with_normality_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.normality_tie_tolerance = tolerance;
        self
    }

    pub fn with_candidate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    pub fn with_differencing(mut self, spec: DifferencingSpec) -> Self {
        self.differencing = Some(spec);
        self
    }

    /// The differencing specification in effect.
    pub fn differencing_spec(&self) -> DifferencingSpec {
        self.differencing
            .clone()
            .unwrap_or_else(|| DifferencingSpec::seasonal_then_trend(self.seasonal_period))
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ForecastError::InvalidParameter(msg));

        let (lo, hi) = self.transform_search_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return invalid(format!("transform search range ({lo}, {hi}) is empty"));
        }
        if self.seasonal_period == 0 {
            return invalid("seasonal period must be at least 1".to_string());
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return invalid(format!(
                "significance level must be in (0, 1), got {}",
                self.significance_level
            ));
        }
        if self.forecast_horizon == 0 {
            return invalid("forecast horizon must be at least 1".to_string());
        }
        if self.diagnostics_lag == 0 {
            return invalid("diagnostics lag must be at least 1".to_string());
        }
        if !(self.interval_width.is_finite() && self.interval_width > 0.0) {
            return invalid(format!(
                "interval width must be positive, got {}",
                self.interval_width
            ));
        }
        if !(0.0..1.0).contains(&self.min_variance_reduction) {
            return invalid(format!(
                "minimum variance reduction must be in [0, 1), got {}",
                self.min_variance_reduction
            ));
        }
        if !self.normality_tie_tolerance.is_finite() {
            return invalid("normality tie tolerance must be finite".to_string());
        }
        if self.differencing_spec().steps().iter().any(|step| step.lag == 0) {
            return invalid("differencing lags must be at least 1".to_string());
        }
        for order in &self.candidate_orders {
            order.validate()?;
            if order.is_seasonal() && order.s != self.seasonal_period {
                return invalid(format!(
                    "{order} uses period {} but the seasonal period is {}",
                    order.s, self.seasonal_period
                ));
            }
        }
        Ok(())
    }
}

/// Hold-out evaluation of the selected model.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Forecast over the validation slice from the training fit.
    pub forecast: Forecast,
    /// Accuracy in original units, with band coverage.
    pub metrics: AccuracyMetrics,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub transform: TransformSelection,
    pub differencing: DifferencingSpec,
    /// Differenced training series and its variance trace.
    pub stationary: Stationarized,
    /// First differencing step (1-based) that failed to reduce variance.
    pub overdifferenced_at: Option<usize>,
    pub identification: IdentificationReport,
    pub search: SearchSummary,
    /// Diagnostics for each ranked model, in ranking order. A model whose
    /// residuals cannot be tested carries the reason instead of a report.
    pub diagnostics: Vec<Result<DiagnosticsReport>>,
    /// Index into the ranking of the best model that passed diagnostics.
    pub selected: Option<usize>,
    pub validation: Option<ValidationOutcome>,
    /// The selected order refit on the combined series.
    pub final_model: Option<FittedModel>,
    pub forecast: Option<Forecast>,
}

impl PipelineReport {
    pub fn selected_model(&self) -> Option<&FittedModel> {
        self.selected.and_then(|i| self.search.ranked.get(i))
    }

    pub fn selected_diagnostics(&self) -> Option<&DiagnosticsReport> {
        self.selected
            .and_then(|i| self.diagnostics.get(i))
            .and_then(|d| d.as_ref().ok())
    }

    /// Ranked models paired with their diagnostics.
    pub fn ranked(
        &self,
    ) -> impl Iterator<Item = (&FittedModel, std::result::Result<&DiagnosticsReport, &ForecastError>)>
    {
        self.search
            .ranked
            .iter()
            .zip(self.diagnostics.iter().map(|d| d.as_ref()))
    }
}

/// Runs the full modeling sequence on a partition.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on `partition`.
    ///
    /// Per-candidate fit and diagnostics failures are recorded in the report.
    /// Invalid input, too little data for the differencing horizon, and
    /// over-differencing (when configured to stop) abort the run.
    pub fn run(&self, partition: &Partition) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;
        let s = config.seasonal_period;

        let transform = TransformSelector::new(config.transform_search_range)
            .with_tie_tolerance(config.normality_tie_tolerance)
            .select(partition.training())?;
        let spec = transform.spec();
        info!(transform = %spec, "transform chosen");

        let differencing = config.differencing_spec();
        let stationary = StationarityReducer::new()
            .with_min_remaining(config.acf_max_lag + 1)
            .reduce(transform.transformed(), &differencing)?;
        let overdifferenced_at = stationary
            .trace
            .overdifferenced_at(config.min_variance_reduction);
        if let Some(step) = overdifferenced_at {
            let entries = stationary.trace.entries();
            let (previous, current) = (entries[step - 1].1, entries[step].1);
            if config.stop_on_overdifferencing {
                return Err(ForecastError::Overdifferenced {
                    step,
                    previous,
                    current,
                });
            }
            warn!(step, previous, current, "differencing step did not reduce variance");
        }

        let identification = identify(
            &stationary.series,
            (differencing.trend_order(), differencing.seasonal_order(s), s),
            &IdentificationConfig::default()
                .with_max_lag(config.acf_max_lag)
                .with_significance(config.significance_level),
        )?;
        let candidates = if config.candidate_orders.is_empty() {
            identification.candidates.clone()
        } else {
            config.candidate_orders.clone()
        };

        let training = Arc::new(transform.transformed().clone());
        let search = ModelSearch::new(
            SearchConfig::default().with_candidate_timeout(config.candidate_timeout),
        )
        .run(&training, &candidates)?;

        let engine = DiagnosticsEngine::new(
            DiagnosticsConfig::default()
                .with_lag(config.diagnostics_lag)
                .with_significance(config.significance_level),
        );
        let diagnostics: Vec<Result<DiagnosticsReport>> = search
            .ranked
            .iter()
            .map(|model| {
                let outcome = engine.run(model);
                if let Err(error) = &outcome {
                    warn!(order = %model.order(), %error, "diagnostics could not be computed");
                }
                outcome
            })
            .collect();
        let selected = diagnostics
            .iter()
            .position(|outcome| matches!(outcome, Ok(report) if report.passed));

        let Some(index) = selected else {
            warn!(
                ranked = search.ranked.len(),
                rejected = search.rejected.len(),
                "no candidate passed diagnostics; no forecast produced"
            );
            return Ok(PipelineReport {
                transform,
                differencing,
                stationary,
                overdifferenced_at,
                identification,
                search,
                diagnostics,
                selected: None,
                validation: None,
                final_model: None,
                forecast: None,
            });
        };
        let chosen = &search.ranked[index];
        info!(order = %chosen.order(), aicc = chosen.aicc(), rank = index, "model selected");

        let forecaster = Forecaster::default().with_interval_width(config.interval_width);
        let validation = match partition.validation() {
            Some(actual) => Some(self.evaluate(&forecaster, chosen, &spec, partition, actual)?),
            None => None,
        };

        let combined = Arc::new(spec.apply(partition.combined())?);
        let estimator = SarimaEstimator::new(match config.candidate_timeout {
            Some(timeout) => EstimatorConfig::default().with_max_duration(timeout),
            None => EstimatorConfig::default(),
        });
        let final_model = estimator.fit(&combined, chosen.order())?;
        let forecast = forecaster.forecast(&final_model, config.forecast_horizon, Some(&spec))?;

        Ok(PipelineReport {
            transform,
            differencing,
            stationary,
            overdifferenced_at,
            identification,
            search,
            diagnostics,
            selected,
            validation,
            final_model: Some(final_model),
            forecast: Some(forecast),
        })
    }

    fn evaluate(
        &self,
        forecaster: &Forecaster,
        model: &FittedModel,
        spec: &crate::transform::TransformSpec,
        partition: &Partition,
        actual: &Series,
    ) -> Result<ValidationOutcome> {
        let forecast = forecaster.forecast(model, actual.len(), Some(spec))?;
        let mut metrics = calculate_metrics(
            partition.training().values(),
            actual.values(),
            forecast.original_point(),
            self.config.seasonal_period,
        )?;
        metrics.coverage = Some(forecast.coverage(actual.values()));
        info!(
            mae = metrics.mae,
            rmse = metrics.rmse,
            coverage = metrics.coverage,
            "validation metrics"
        );
        Ok(ValidationOutcome { forecast, metrics })
    }
}

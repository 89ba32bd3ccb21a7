//! Residual diagnostics for fitted SARIMA models.

use std::fmt;

use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::models::arima::FittedModel;
use crate::utils::stats::{acf, levinson, variance};
use crate::validation::normality::{jarque_bera, shapiro_wilk, NormalityResult};
use crate::validation::residual_tests::{box_pierce, ljung_box, PortmanteauResult};

/// Diagnostic settings.
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    /// Lag horizon of the portmanteau tests.
    pub lag: usize,
    /// Significance level of every test.
    pub significance: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            lag: 18,
            significance: 0.05,
        }
    }
}

impl DiagnosticsConfig {
    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }
}

/// Outcome of one hypothesis test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub name: &'static str,
    pub statistic: f64,
    /// Degrees of freedom of the reference distribution (0 when not applicable).
    pub df: usize,
    pub p_value: f64,
    pub alpha: f64,
    /// Whether the null hypothesis is rejected at `alpha`.
    pub rejected: bool,
}

impl TestOutcome {
    fn portmanteau(name: &'static str, result: PortmanteauResult, alpha: f64) -> Self {
        Self {
            name,
            statistic: result.statistic,
            df: result.df,
            p_value: result.p_value,
            alpha,
            rejected: !result.is_white_noise(alpha),
        }
    }

    fn normality(name: &'static str, result: NormalityResult, df: usize, alpha: f64) -> Self {
        Self {
            name,
            statistic: result.statistic,
            df,
            p_value: result.p_value,
            alpha,
            rejected: !result.is_normal(alpha),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: statistic {:.4}, df {}, p-value {:.4} (alpha {})",
            self.name, self.statistic, self.df, self.p_value, self.alpha
        )
    }
}

/// Autoregressive order selected for the residuals by AIC.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCheck {
    pub selected_order: usize,
    pub max_order: usize,
    /// AIC for orders `0..=max_order`.
    pub aic: Vec<f64>,
}

impl OrderCheck {
    /// White residuals select order 0.
    pub fn passed(&self) -> bool {
        self.selected_order == 0
    }
}

/// Structured diagnostics for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsReport {
    /// Shapiro-Wilk; absent when the sample is outside its range.
    pub shapiro_wilk: Option<TestOutcome>,
    pub jarque_bera: TestOutcome,
    pub ljung_box: TestOutcome,
    pub box_pierce: TestOutcome,
    pub squared_ljung_box: TestOutcome,
    pub squared_box_pierce: TestOutcome,
    pub order_check: OrderCheck,
    /// No autocorrelation or heteroskedasticity test rejects.
    pub passed: bool,
}

impl DiagnosticsReport {
    pub fn portmanteau_tests(&self) -> [&TestOutcome; 4] {
        [
            &self.ljung_box,
            &self.box_pierce,
            &self.squared_ljung_box,
            &self.squared_box_pierce,
        ]
    }

    /// Reasons the model failed; empty when it passed.
    pub fn failures(&self) -> Vec<String> {
        self.portmanteau_tests()
            .into_iter()
            .filter(|t| t.rejected)
            .map(|t| format!("{t} rejects white noise"))
            .collect()
    }

    /// Findings reported without disqualifying the model.
    pub fn caveats(&self) -> Vec<String> {
        let mut notes: Vec<String> = self
            .shapiro_wilk
            .iter()
            .chain(std::iter::once(&self.jarque_bera))
            .filter(|t| t.rejected)
            .map(|t| format!("{t} rejects normality"))
            .collect();
        if !self.order_check.passed() {
            notes.push(format!(
                "residual autoregression selects order {} (max {})",
                self.order_check.selected_order, self.order_check.max_order
            ));
        }
        notes
    }
}

/// Runs the residual test battery.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsEngine {
    config: DiagnosticsConfig,
}

impl DiagnosticsEngine {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Diagnose a fitted model's effective residuals with `fitdf` equal to its
    /// number of estimated ARMA coefficients.
    pub fn run(&self, model: &FittedModel) -> Result<DiagnosticsReport> {
        let report = self.run_residuals(model.residuals().effective(), model.n_free_arma())?;
        debug!(
            order = %model.order(),
            passed = report.passed,
            lb_p = report.ljung_box.p_value,
            squared_lb_p = report.squared_ljung_box.p_value,
            "diagnostics finished"
        );
        Ok(report)
    }

    /// Diagnose a residual sample directly.
    ///
    /// # Errors
    /// * `InsufficientData` when `lag <= fitdf` or fewer than `lag + 1`
    ///   residuals are available.
    /// * `InvalidParameter` for a significance level outside `(0, 1)`.
    /// * `Numerical` for constant residuals.
    pub fn run_residuals(&self, residuals: &[f64], fitdf: usize) -> Result<DiagnosticsReport> {
        let alpha = self.config.significance;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "significance must be in (0, 1), got {alpha}"
            )));
        }
        let lag = self.config.lag;

        let squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
        let ljung = ljung_box(residuals, lag, fitdf)?;
        let pierce = box_pierce(residuals, lag, fitdf)?;
        let squared_ljung = ljung_box(&squared, lag, 0)?;
        let squared_pierce = box_pierce(&squared, lag, 0)?;

        let shapiro = match shapiro_wilk(residuals) {
            Ok(result) => Some(TestOutcome::normality("Shapiro-Wilk", result, 0, alpha)),
            Err(ForecastError::InvalidParameter(_)) => None,
            Err(e) => return Err(e),
        };
        let jb = TestOutcome::normality("Jarque-Bera", jarque_bera(residuals)?, 2, alpha);

        let ljung_box = TestOutcome::portmanteau("Ljung-Box", ljung, alpha);
        let box_pierce = TestOutcome::portmanteau("Box-Pierce", pierce, alpha);
        let squared_ljung_box =
            TestOutcome::portmanteau("Ljung-Box (squared residuals)", squared_ljung, alpha);
        let squared_box_pierce =
            TestOutcome::portmanteau("Box-Pierce (squared residuals)", squared_pierce, alpha);

        let passed = !(ljung_box.rejected
            || box_pierce.rejected
            || squared_ljung_box.rejected
            || squared_box_pierce.rejected);

        Ok(DiagnosticsReport {
            shapiro_wilk: shapiro,
            jarque_bera: jb,
            ljung_box,
            box_pierce,
            squared_ljung_box,
            squared_box_pierce,
            order_check: residual_order(residuals),
            passed,
        })
    }
}

/// Yule-Walker autoregression order for `values`, chosen by AIC over orders
/// `0..=min(n - 1, ⌊10·log10 n⌋)`.
pub fn residual_order(values: &[f64]) -> OrderCheck {
    let n = values.len();
    if n < 2 {
        return OrderCheck {
            selected_order: 0,
            max_order: 0,
            aic: vec![0.0],
        };
    }
    let max_order = ((10.0 * (n as f64).log10()).floor() as usize).min(n - 1);
    let nf = n as f64;
    // Biased variance, matching the biased autocorrelations.
    let c0 = variance(values) * (nf - 1.0) / nf;

    let rho = acf(values, max_order);
    let mut aic = vec![nf * c0.ln()];
    for step in levinson(&rho) {
        let k = step.coefficients.len();
        aic.push(nf * (c0 * step.relative_variance).ln() + 2.0 * k as f64);
    }
    let selected_order = aic
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(k, _)| k);

    OrderCheck {
        selected_order,
        max_order,
        aic,
    }
}

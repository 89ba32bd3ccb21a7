//! Weekly-seasonal forecast of synthetic daily web traffic.
//!
//! Run with: cargo run --example traffic_forecast
//! Set RUST_LOG=debug for per-candidate output.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sarima_engine::prelude::*;
use tracing_subscriber::EnvFilter;

/// Daily visits: slow growth, a weekday/weekend pattern and multiplicative noise.
fn daily_traffic(days: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let shock = Normal::new(0.0, 0.04).unwrap();
    let weekly = [1.10, 1.15, 1.12, 1.08, 1.00, 0.78, 0.77];
    let mut level: f64 = 8.0;
    (0..days)
        .map(|day| {
            level += 0.001 + 0.01 * shock.sample(&mut rng);
            (level + shock.sample(&mut rng)).exp() * weekly[day % 7]
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let series = Series::new(daily_traffic(400, 7))?;
    let partition = Partition::new(&series, 65, 321, 14)?;
    println!(
        "{} observations: {} discarded, {} training, {} validation",
        series.len(),
        partition.discarded(),
        partition.training().len(),
        partition.validation().map_or(0, |v| v.len())
    );

    let config = PipelineConfig::default().with_candidate_orders(vec![
        SarimaOrder::seasonal((1, 1, 1), (1, 1, 1, 7)),
        SarimaOrder::seasonal((1, 1, 1), (0, 1, 2, 7)),
    ]);
    let report = Pipeline::new(config).run(&partition)?;

    println!("\n--- Transform ---");
    println!(
        "power λ = {:.3} (W = {:.4}), log (W = {:.4}) -> {}",
        report.transform.power.spec.lambda(),
        report.transform.power.normality,
        report.transform.log.normality,
        report.transform.spec()
    );

    println!("\n--- Differencing ---");
    for (lag, var) in report.stationary.trace.entries() {
        println!("lag {lag:>2}: variance {var:.6}");
    }

    println!("\n--- Candidates ---");
    for (model, diagnostics) in report.ranked() {
        let diagnostics = match diagnostics {
            Ok(diagnostics) => diagnostics,
            Err(error) => {
                println!("{:<28} AICc {:>10.2}  untested: {error}", model.order().to_string(), model.aicc());
                continue;
            }
        };
        println!(
            "{:<28} AICc {:>10.2}  {}",
            model.order().to_string(),
            model.aicc(),
            if diagnostics.passed { "passed" } else { "failed" }
        );
        for test in diagnostics.portmanteau_tests() {
            println!("    {test}");
        }
        for note in diagnostics.caveats() {
            println!("    caveat: {note}");
        }
    }
    if let Some(step) = report.overdifferenced_at {
        println!("note: differencing step {step} did not reduce variance");
    }
    for rejected in &report.search.rejected {
        println!("{:<28} rejected: {}", rejected.order.to_string(), rejected.error);
    }

    let Some(model) = report.selected_model() else {
        println!("\nNo candidate passed diagnostics.");
        return Ok(());
    };
    println!("\n--- Selected {} ---", model.order());
    for estimate in model.coefficients() {
        println!(
            "{:<6} {:>9.4}  se {:>7.4}{}",
            estimate.parameter.to_string(),
            estimate.estimate,
            estimate.std_error,
            if estimate.fixed { "  (fixed)" } else { "" }
        );
    }

    if let Some(validation) = &report.validation {
        let m = &validation.metrics;
        println!("\n--- Validation ---");
        println!("MAE   {:.1}", m.mae);
        println!("RMSE  {:.1}", m.rmse);
        if let Some(mape) = m.mape {
            println!("MAPE  {mape:.2}%");
        }
        if let Some(coverage) = m.coverage {
            println!("±2 SE coverage {:.0}%", 100.0 * coverage);
        }
    }

    if let Some(forecast) = &report.forecast {
        println!("\n--- Forecast ---");
        for h in 0..forecast.horizon() {
            println!(
                "day +{:>2}: {:>9.0}  [{:>9.0}, {:>9.0}]",
                h + 1,
                forecast.original_point()[h],
                forecast.original_lower()[h],
                forecast.original_upper()[h]
            );
        }
    }
    Ok(())
}

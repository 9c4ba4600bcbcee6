//! Efficient Frontier Example
//!
//! Estimates statistics from a synthetic monthly price history, solves one
//! target-return portfolio, then traces and prints the frontier:
//!
//! minimize    w' C w                (minimize risk)
//! subject to  mu' w >= target       (minimum return)
//!             sum(w) = 1            (fully invested)
//!             0 <= w <= 1           (long-only)
//!
//! Run with `RUST_LOG=efficient_frontier=debug` to see solver iterations.

use efficient_frontier::prelude::*;
use nalgebra::DMatrix;
use tracing_subscriber::EnvFilter;

/// Deterministic monthly prices for four assets.
fn synthetic_prices(months: usize) -> DMatrix<f64> {
    let drift = [0.004, 0.007, 0.010, 0.013];
    let swing = [0.010, 0.025, 0.045, 0.070];
    let mut prices = DMatrix::from_element(months + 1, drift.len(), 100.0);
    for t in 1..=months {
        let phase = t as f64;
        for j in 0..drift.len() {
            // Shifted sines give each asset its own, partly correlated, noise.
            let shock = (phase * (0.9 + 0.37 * j as f64)).sin();
            prices[(t, j)] = prices[(t - 1, j)] * (1.0 + drift[j] + swing[j] * shock);
        }
    }
    prices
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Efficient Frontier ===\n");

    let universe = AssetUniverse::new(["BONDS", "VALUE", "GROWTH", "EMERGING"])?;
    let stats = ReturnStatistics::from_prices(universe, &synthetic_prices(60))?.annualized(12.0)?;

    println!("Assets: {}", stats.universe.names().join(", "));
    print!("Expected returns:");
    for i in 0..stats.universe.len() {
        print!(" {:.2}%", stats.mean[i] * 100.0);
    }
    println!("\n");

    // One portfolio at the midpoint of the attainable returns
    let target = 0.5 * (stats.mean.min() + stats.mean.max());
    let solution = QpInstance::builder(&stats.mean, &stats.cov)
        .target_return(target)
        .solve()?;

    println!("Optimal portfolio for {:.2}% return:", target * 100.0);
    for (name, w) in solution.weights.labeled(&stats.universe) {
        println!("  {:<10} {:>6.2}%", name, w * 100.0);
    }
    println!("  Risk (std dev): {:.2}%", solution.std_dev * 100.0);
    println!("  Iterations: {}", solution.iterations);
    println!("  Binding: {:?}\n", solution.binding);

    // The whole frontier, solved in parallel
    println!("--- Efficient Frontier ---\n");
    let frontier = FrontierSweeper::new(SweepSettings::default().with_points(12).with_parallel(true))
        .sweep(&stats.mean, &stats.cov)?;

    let mut table = TableRenderer::new(std::io::stdout().lock()).with_risk_free(0.02);
    table.render(&stats.universe, &frontier)?;

    if let Some(best) = frontier.max_sharpe_point(0.02, 1e-12) {
        println!(
            "\nMax Sharpe: {:.2}% return at {:.2}% risk",
            best.achieved_return * 100.0,
            best.achieved_risk * 100.0
        );
        if let Some(i) = stats.universe.position("BONDS") {
            println!("  Bond allocation: {:.2}%", best.weights[i] * 100.0);
        }
    }

    Ok(())
}

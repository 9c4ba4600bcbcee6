//! Frontier sweep tests.

use efficient_frontier::prelude::*;
use nalgebra::DMatrix;

/// Tolerance for comparing weights.
const TOL: f64 = 1e-6;

fn three_assets() -> (MeanReturns, CovarianceMatrix) {
    #[rustfmt::skip]
    let cov = CovarianceMatrix::from_row_slice(3, &[
        0.010, 0.002, 0.001,
        0.002, 0.020, 0.004,
        0.001, 0.004, 0.040,
    ]).unwrap();
    (MeanReturns::from_vec(vec![0.08, 0.12, 0.15]).unwrap(), cov)
}

#[test]
fn test_ten_point_sweep() {
    let (mu, cov) = three_assets();
    let frontier = FrontierSweeper::new(SweepSettings::default().with_points(10))
        .sweep(&mu, &cov)
        .unwrap();

    assert_eq!(frontier.len(), 10);
    assert!(frontier.skipped.is_empty());
    assert!((frontier.points[0].target_return - 0.08).abs() < 1e-15);
    assert_eq!(frontier.points[9].target_return, 0.15);

    for pair in frontier.points.windows(2) {
        assert!(pair[1].target_return > pair[0].target_return);
    }
    assert!(frontier.is_risk_monotone(1e-9));

    for point in &frontier.points {
        assert!((point.weights.total() - 1.0).abs() < 1e-8);
        assert!(point.weights.as_slice().iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert!(point.achieved_return >= point.target_return - 1e-8);
        assert!((point.achieved_risk * point.achieved_risk - point.variance).abs() < 1e-12);
    }

    // The top of the frontier is the highest-return asset alone.
    let last = &frontier.points[9];
    assert!((last.weights[2] - 1.0).abs() < TOL);
    assert!((last.achieved_risk - 0.2).abs() < TOL);
}

#[test]
fn test_min_variance_point_is_first() {
    let (mu, cov) = three_assets();
    let frontier = FrontierSweeper::new(SweepSettings::default().with_points(10))
        .sweep(&mu, &cov)
        .unwrap();

    // Targets at or below the global minimum-variance return all give the
    // same portfolio, so the first point already has the lowest risk.
    let min = frontier.min_variance_point().unwrap();
    assert!((min.achieved_risk - frontier.points[0].achieved_risk).abs() < 1e-12);

    let best = frontier.max_sharpe_point(0.02, 1e-12).unwrap();
    let best_sharpe = best.sharpe_ratio(0.02, 1e-12).unwrap();
    for point in &frontier.points {
        assert!(point.sharpe_ratio(0.02, 1e-12).unwrap() <= best_sharpe);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let (mu, cov) = three_assets();
    let settings = SweepSettings::default().with_points(25).with_log_skipped(false);

    let sequential = FrontierSweeper::new(settings.clone()).sweep(&mu, &cov).unwrap();
    let parallel = FrontierSweeper::new(settings.with_parallel(true))
        .sweep(&mu, &cov)
        .unwrap();

    assert_eq!(sequential.len(), parallel.len());
    assert_eq!(sequential.skipped.len(), parallel.skipped.len());
    for (a, b) in sequential.points.iter().zip(&parallel.points) {
        assert_eq!(a.target_return, b.target_return);
        assert_eq!(a.weights, b.weights);
    }
}

#[test]
fn test_clarabel_sweep_agrees() {
    let (mu, cov) = three_assets();
    let settings = SweepSettings::default().with_points(10).with_log_skipped(false);

    let native = FrontierSweeper::new(settings.clone()).sweep(&mu, &cov).unwrap();
    let reference = FrontierSweeper::with_backend(ClarabelBackend::default(), settings)
        .sweep(&mu, &cov)
        .unwrap();

    assert_eq!(reference.len() + reference.skipped.len(), 10);
    // The last target leaves a single feasible portfolio with no interior.
    for point in reference.points.iter().filter(|p| p.target_return < mu.max()) {
        let Some(ours) = native
            .points
            .iter()
            .find(|p| p.target_return == point.target_return)
        else {
            panic!("target {} missing from native sweep", point.target_return);
        };
        for (a, b) in ours.weights.as_slice().iter().zip(point.weights.as_slice()) {
            assert!(
                (a - b).abs() < 1e-4,
                "target {}: {:?} vs {:?}",
                point.target_return,
                ours.weights.as_slice(),
                point.weights.as_slice()
            );
        }
    }
}

#[test]
fn test_identical_returns_collapse() {
    // Every target equals the common return, so every point is the global
    // minimum-variance portfolio.
    let mu = MeanReturns::from_vec(vec![0.1, 0.1]).unwrap();
    let cov = CovarianceMatrix::diagonal(&[0.01, 0.04]).unwrap();
    let frontier = FrontierSweeper::new(SweepSettings::default().with_points(5))
        .sweep(&mu, &cov)
        .unwrap();

    assert_eq!(frontier.len(), 5);
    for point in &frontier.points {
        assert!((point.weights[0] - 0.8).abs() < TOL);
        assert!((point.weights[1] - 0.2).abs() < TOL);
    }
}

#[test]
fn test_sweep_rejects_bad_inputs() {
    let (mu, cov) = three_assets();
    let err = FrontierSweeper::new(SweepSettings::default().with_points(0))
        .sweep(&mu, &cov)
        .unwrap_err();
    assert!(matches!(err, FrontierError::InvalidInput(_)));

    let short = MeanReturns::from_vec(vec![0.1, 0.2]).unwrap();
    let err = efficient_frontier(&short, &cov).unwrap_err();
    assert!(matches!(err, FrontierError::ShapeMismatch { .. }));
}

fn synthetic_prices() -> DMatrix<f64> {
    // Three assets over twelve periods with distinct drifts and
    // wiggles so the sample covariance is positive definite.
    #[rustfmt::skip]
    let returns = [
        [ 0.010,  0.020, -0.010],
        [ 0.005, -0.010,  0.030],
        [ 0.012,  0.025,  0.015],
        [-0.004,  0.010, -0.020],
        [ 0.008, -0.015,  0.040],
        [ 0.006,  0.030,  0.010],
        [ 0.009,  0.005, -0.005],
        [-0.002,  0.018,  0.035],
        [ 0.011, -0.008,  0.020],
        [ 0.007,  0.022, -0.015],
        [ 0.004,  0.012,  0.025],
    ];
    let mut prices = DMatrix::zeros(returns.len() + 1, 3);
    for j in 0..3 {
        prices[(0, j)] = 100.0;
    }
    for (i, row) in returns.iter().enumerate() {
        for (j, r) in row.iter().enumerate() {
            prices[(i + 1, j)] = prices[(i, j)] * (1.0 + r);
        }
    }
    prices
}

#[test]
fn test_prices_to_report() {
    let universe = AssetUniverse::new(["BOND", "EQUITY", "CRYPTO"]).unwrap();
    let stats = ReturnStatistics::from_prices(universe, &synthetic_prices())
        .unwrap()
        .annualized(12.0)
        .unwrap();
    assert_eq!(stats.observations, 11);

    let frontier = FrontierSweeper::new(SweepSettings::default().with_points(8))
        .sweep(&stats.mean, &stats.cov)
        .unwrap();
    assert_eq!(frontier.len() + frontier.skipped.len(), 8);
    assert!(frontier.is_risk_monotone(1e-9));

    let mut table = TableRenderer::new(Vec::new()).with_risk_free(0.02);
    table.render(&stats.universe, &frontier).unwrap();
    let text = String::from_utf8(table.into_inner()).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.contains("BOND") && header.contains("EQUITY") && header.contains("CRYPTO"));
    assert_eq!(text.lines().count(), 1 + frontier.len() + usize::from(!frontier.skipped.is_empty()));

    let mut json = JsonRenderer::new(Vec::new()).pretty(true);
    json.render(&stats.universe, &frontier).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json.into_inner()).unwrap();
    assert_eq!(value["assets"].as_array().unwrap().len(), 3);
    assert_eq!(value["points"].as_array().unwrap().len(), frontier.len());
}

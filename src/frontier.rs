//! Efficient frontier sweep.
//!
//! Solves the portfolio QP at evenly spaced target returns between the
//! smallest and largest expected asset return. Points whose solve fails with
//! a recoverable error are skipped and recorded; the sweep only fails when no
//! point survives or the inputs are malformed.

use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::error::{FrontierError, Result};
use crate::linalg;
use crate::model::{CovarianceMatrix, MeanReturns, PortfolioWeights};
use crate::problem::QpInstance;
use crate::solver::{ActiveSetSolver, QpBackend, Settings, Solution};

/// Number of frontier points when not configured.
pub const DEFAULT_POINTS: usize = 50;

/// One solved point on the frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Requested minimum return.
    pub target_return: f64,
    /// Expected return of the optimal weights.
    pub achieved_return: f64,
    /// Standard deviation of the optimal weights.
    pub achieved_risk: f64,
    /// Variance of the optimal weights.
    pub variance: f64,
    /// Optimal weights.
    pub weights: PortfolioWeights,
}

impl FrontierPoint {
    fn from_solution(target_return: f64, solution: Solution) -> Self {
        FrontierPoint {
            target_return,
            achieved_return: solution.expected_return,
            achieved_risk: solution.std_dev,
            variance: solution.variance,
            weights: solution.weights,
        }
    }

    /// Sharpe ratio against a risk-free rate; `None` for (near) riskless
    /// points.
    pub fn sharpe_ratio(&self, risk_free: f64, eps: f64) -> Option<f64> {
        crate::report::sharpe_ratio(self.target_return, self.achieved_risk, risk_free, eps)
    }
}

/// A target return that could not be solved.
#[derive(Debug, Serialize)]
pub struct SkippedPoint {
    /// Requested minimum return.
    pub target_return: f64,
    /// Why the solve failed. Serialized as its message.
    #[serde(serialize_with = "serialize_error")]
    pub error: FrontierError,
}

fn serialize_error<S: Serializer>(
    error: &FrontierError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of a sweep.
#[derive(Debug, Serialize)]
pub struct Frontier {
    /// Solved points, by increasing target return.
    pub points: Vec<FrontierPoint>,
    /// Targets that were skipped, by increasing target return.
    pub skipped: Vec<SkippedPoint>,
}

impl Frontier {
    /// Number of solved points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no point was solved. A sweep never returns such a frontier.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point with the smallest risk.
    pub fn min_variance_point(&self) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.achieved_risk.total_cmp(&b.achieved_risk))
    }

    /// Point with the largest Sharpe ratio.
    pub fn max_sharpe_point(&self, risk_free: f64, eps: f64) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .filter_map(|p| p.sharpe_ratio(risk_free, eps).map(|s| (p, s)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }

    /// Whether risk never decreases (beyond `tol`) as the target rises.
    pub fn is_risk_monotone(&self, tol: f64) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].achieved_risk >= w[0].achieved_risk - tol)
    }
}

/// Sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Number of target returns.
    pub points: usize,
    /// Log skipped points at warn level.
    pub log_skipped: bool,
    /// Solve points on the rayon thread pool.
    pub parallel: bool,
    /// Per-solve settings.
    pub solver: Settings,
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            points: DEFAULT_POINTS,
            log_skipped: true,
            parallel: false,
            solver: Settings::default(),
        }
    }
}

impl SweepSettings {
    /// Set the number of target returns.
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    /// Enable or disable warn-level logging of skipped points.
    pub fn with_log_skipped(mut self, log_skipped: bool) -> Self {
        self.log_skipped = log_skipped;
        self
    }

    /// Enable or disable the parallel sweep.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set per-solve settings.
    pub fn with_solver(mut self, solver: Settings) -> Self {
        self.solver = solver;
        self
    }
}

/// Drives a [`QpBackend`] across target returns.
#[derive(Debug, Clone, Default)]
pub struct FrontierSweeper<B = ActiveSetSolver> {
    backend: B,
    settings: SweepSettings,
}

impl FrontierSweeper<ActiveSetSolver> {
    /// Sweeper using the active-set solver.
    pub fn new(settings: SweepSettings) -> Self {
        FrontierSweeper {
            backend: ActiveSetSolver,
            settings,
        }
    }
}

impl<B: QpBackend> FrontierSweeper<B> {
    /// Sweeper using a custom backend.
    pub fn with_backend(backend: B, settings: SweepSettings) -> Self {
        FrontierSweeper { backend, settings }
    }

    /// Current settings.
    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Target returns the sweep will solve, in increasing order.
    pub fn targets(&self, mean: &MeanReturns) -> Vec<f64> {
        linalg::linspace(mean.min(), mean.max(), self.settings.points)
    }

    /// Trace the frontier.
    pub fn sweep(&self, mean: &MeanReturns, cov: &CovarianceMatrix) -> Result<Frontier> {
        if self.settings.points == 0 {
            return Err(FrontierError::InvalidInput(
                "frontier needs at least one point".into(),
            ));
        }
        // Surface malformed inputs once instead of at every point.
        QpInstance::new(mean, cov, None)?;

        let targets = self.targets(mean);
        let solve_one = |&target: &f64| {
            let result = QpInstance::new(mean, cov, Some(target))
                .and_then(|qp| self.backend.solve(&qp, &self.settings.solver));
            (target, result)
        };

        let mut results: Vec<(f64, Result<Solution>)> = if self.settings.parallel {
            targets.par_iter().map(solve_one).collect()
        } else {
            targets.iter().map(solve_one).collect()
        };
        results.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut points = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (target, result) in results {
            match result {
                Ok(solution) => {
                    debug!(
                        target,
                        risk = solution.std_dev,
                        iterations = solution.iterations,
                        "frontier point solved"
                    );
                    points.push(FrontierPoint::from_solution(target, solution));
                }
                Err(error) if error.is_recoverable() => {
                    if self.settings.log_skipped {
                        warn!(target, %error, "skipping frontier point");
                    }
                    skipped.push(SkippedPoint {
                        target_return: target,
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        if points.is_empty() {
            return Err(FrontierError::EmptyFrontier {
                requested: self.settings.points,
            });
        }

        info!(
            solved = points.len(),
            skipped = skipped.len(),
            backend = ?self.backend.kind(),
            "frontier sweep finished"
        );
        Ok(Frontier { points, skipped })
    }
}

/// Trace the frontier with the active-set solver and default settings.
pub fn efficient_frontier(mean: &MeanReturns, cov: &CovarianceMatrix) -> Result<Frontier> {
    FrontierSweeper::new(SweepSettings::default()).sweep(mean, cov)
}

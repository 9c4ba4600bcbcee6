//! QP solvers for the portfolio problem.
//!
//! This module provides:
//! - A native active-set solver (the default backend)
//! - A Clarabel interior-point backend used as a reference
//! - The `QpBackend` trait the frontier sweep is generic over

pub mod active_set;
pub mod clarabel;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{FrontierError, Result};
use crate::model::PortfolioWeights;
use crate::problem::{QpInstance, LOWER_BOUND, UPPER_BOUND};

pub use self::active_set::ActiveSetSolver;
pub use self::clarabel::ClarabelBackend;

/// A solver able to handle a [`QpInstance`].
///
/// Implementations must not keep state between calls; every solve is
/// independent so a sweep can run them in any order or in parallel.
pub trait QpBackend: Sync {
    /// Which backend this is.
    fn kind(&self) -> Backend;

    /// Solve one instance.
    fn solve(&self, instance: &QpInstance<'_>, settings: &Settings) -> Result<Solution>;
}

/// Identifies the backend that produced a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Native active-set method.
    ActiveSet,
    /// Clarabel interior-point solver.
    Clarabel,
}

/// Solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log every iteration at debug level (and enable Clarabel's printout).
    pub verbose: bool,
    /// Tolerance for "zero" and "on the boundary".
    pub epsilon: f64,
    /// Smallest accepted pivot ratio in KKT solves.
    pub pivot_tolerance: f64,
    /// Iteration cap as a multiple of the number of assets.
    pub iteration_factor: usize,
    /// Hard iteration cap overriding `iteration_factor`.
    pub max_iter: Option<usize>,
    /// Ridge term added to the covariance diagonal inside the KKT system.
    pub regularization: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            epsilon: 1e-9,
            pivot_tolerance: crate::linalg::DEFAULT_PIVOT_TOLERANCE,
            iteration_factor: 10,
            max_iter: None,
            regularization: 0.0,
        }
    }
}

impl Settings {
    /// Set the boundary tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the KKT pivot tolerance.
    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tolerance = tol;
        self
    }

    /// Set the iteration cap multiplier.
    pub fn with_iteration_factor(mut self, factor: usize) -> Self {
        self.iteration_factor = factor;
        self
    }

    /// Set a hard iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    /// Set the ridge regularization.
    pub fn with_regularization(mut self, ridge: f64) -> Self {
        self.regularization = ridge;
        self
    }

    /// Enable per-iteration logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Maximum active-set iterations for `n` assets.
    pub fn max_iterations(&self, n: usize) -> usize {
        self.max_iter
            .unwrap_or_else(|| self.iteration_factor.saturating_mul(n))
            .max(1)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(FrontierError::InvalidInput(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.pivot_tolerance > 0.0 && self.pivot_tolerance < 1.0) {
            return Err(FrontierError::InvalidInput(format!(
                "pivot tolerance must be in (0, 1), got {}",
                self.pivot_tolerance
            )));
        }
        if !(self.regularization >= 0.0 && self.regularization.is_finite()) {
            return Err(FrontierError::InvalidInput(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            )));
        }
        if self.iteration_factor == 0 {
            return Err(FrontierError::InvalidInput("iteration factor must be positive".into()));
        }
        Ok(())
    }
}

/// An inequality constraint of the portfolio QP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// mu' w >= target.
    MinReturn,
    /// w[i] >= 0.
    Lower(usize),
    /// w[i] <= 1.
    Upper(usize),
}

/// Solution of one portfolio QP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Optimal weights.
    pub weights: PortfolioWeights,
    /// Portfolio variance w' C w, recomputed from the final weights.
    pub variance: f64,
    /// Portfolio standard deviation.
    pub std_dev: f64,
    /// Expected return mu' w.
    pub expected_return: f64,
    /// Inequality constraints holding with equality at the solution.
    pub binding: Vec<ConstraintKind>,
    /// Number of iterations.
    pub iterations: usize,
    /// Backend that produced the solution.
    pub backend: Backend,
}

impl Solution {
    /// Assemble a solution from raw weights.
    ///
    /// Weights within `tol` outside [0, 1] are snapped onto the bound. The
    /// variance is recomputed from the snapped weights and must not be below
    /// `-tol`.
    pub(crate) fn from_weights(
        instance: &QpInstance<'_>,
        mut w: DVector<f64>,
        tol: f64,
        iterations: usize,
        backend: Backend,
    ) -> Result<Self> {
        for v in w.iter_mut() {
            if *v < LOWER_BOUND && *v >= LOWER_BOUND - tol {
                *v = LOWER_BOUND;
            } else if *v > UPPER_BOUND && *v <= UPPER_BOUND + tol {
                *v = UPPER_BOUND;
            }
        }
        let weights = PortfolioWeights::new(w);
        let variance = weights.variance(instance.cov());
        if variance < -tol {
            return Err(FrontierError::NumericalError(format!(
                "negative portfolio variance {:e}; covariance is not positive semi-definite",
                variance
            )));
        }
        let variance = variance.max(0.0);
        let expected_return = weights.expected_return(instance.mean());
        let binding = binding_constraints(instance, &weights, expected_return, tol);

        Ok(Solution {
            weights,
            variance,
            std_dev: variance.sqrt(),
            expected_return,
            binding,
            iterations,
            backend,
        })
    }

    /// Whether the return constraint is binding.
    pub fn return_binding(&self) -> bool {
        self.binding.contains(&ConstraintKind::MinReturn)
    }
}

/// Reject targets outside the range of asset returns.
///
/// Bounds and budget keep mu' w within [min(mu), max(mu)], so a target above
/// the largest return is unattainable; a target below the smallest return is
/// rejected as well.
pub(crate) fn check_target(instance: &QpInstance<'_>, eps: f64) -> Result<()> {
    let Some(t) = instance.target_return() else {
        return Ok(());
    };
    let (lo, hi) = (instance.mean().min(), instance.mean().max());
    if t > hi + eps {
        return Err(FrontierError::Infeasible(format!(
            "target return {} exceeds the maximum asset return {}",
            t, hi
        )));
    }
    if t < lo - eps {
        return Err(FrontierError::Infeasible(format!(
            "target return {} is below the minimum asset return {}",
            t, lo
        )));
    }
    Ok(())
}

fn binding_constraints(
    instance: &QpInstance<'_>,
    weights: &PortfolioWeights,
    expected_return: f64,
    tol: f64,
) -> Vec<ConstraintKind> {
    let mut binding = Vec::new();
    if let Some(t) = instance.target_return() {
        if (expected_return - t).abs() <= tol {
            binding.push(ConstraintKind::MinReturn);
        }
    }
    for (i, &w) in weights.as_slice().iter().enumerate() {
        if (w - LOWER_BOUND).abs() <= tol {
            binding.push(ConstraintKind::Lower(i));
        } else if (UPPER_BOUND - w).abs() <= tol {
            binding.push(ConstraintKind::Upper(i));
        }
    }
    binding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CovarianceMatrix, MeanReturns};

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.epsilon, 1e-9);
        assert_eq!(settings.iteration_factor, 10);
        assert_eq!(settings.max_iterations(5), 50);
        assert_eq!(settings.clone().with_max_iter(7).max_iterations(5), 7);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Settings::default().with_epsilon(0.0).validate().is_err());
        assert!(Settings::default().with_pivot_tolerance(2.0).validate().is_err());
        assert!(Settings::default().with_regularization(-1.0).validate().is_err());
        assert!(Settings::default().with_iteration_factor(0).validate().is_err());
    }

    #[test]
    fn test_from_weights_clamps_tiny_negative_variance() {
        let mu = MeanReturns::from_vec(vec![0.1, 0.2]).unwrap();
        // Eigenvalues +/-1e-11, inside the semi-definite tolerance.
        let cov = CovarianceMatrix::from_row_slice(2, &[0.0, -1e-11, -1e-11, 0.0]).unwrap();
        let qp = QpInstance::new(&mu, &cov, None).unwrap();
        let w = DVector::from_vec(vec![0.5, 0.5]);
        assert!(cov.variance(&w) < 0.0);

        // w' C w = -5e-12 is within tolerance and clamped.
        let sol = Solution::from_weights(&qp, w.clone(), 1e-9, 2, Backend::ActiveSet).unwrap();
        assert_eq!(sol.variance, 0.0);
        assert_eq!(sol.std_dev, 0.0);
        assert_eq!(sol.iterations, 2);

        // Beyond the tolerance it is an error.
        let err = Solution::from_weights(&qp, w, 1e-12, 2, Backend::ActiveSet).unwrap_err();
        assert!(matches!(err, FrontierError::NumericalError(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_from_weights_snaps_to_bounds() {
        let eps = 1e-9;
        let mu = MeanReturns::from_vec(vec![0.1, 0.2]).unwrap();
        let cov = CovarianceMatrix::diagonal(&[0.04, 0.09]).unwrap();
        let qp = QpInstance::new(&mu, &cov, Some(0.2)).unwrap();

        let w = DVector::from_vec(vec![-eps / 2.0, 1.0 + eps / 2.0]);
        let sol = Solution::from_weights(&qp, w, eps, 0, Backend::ActiveSet).unwrap();
        assert_eq!(sol.weights.as_slice(), &[0.0, 1.0]);
        assert_eq!(sol.variance, 0.09);
        assert!((sol.std_dev - 0.3).abs() < 1e-15);
        assert_eq!(
            sol.binding,
            vec![
                ConstraintKind::MinReturn,
                ConstraintKind::Lower(0),
                ConstraintKind::Upper(1)
            ]
        );
        assert!(sol.return_binding());

        // Violations beyond the tolerance are left for the caller to see.
        let w = DVector::from_vec(vec![-2.0 * eps, 1.0 + 2.0 * eps]);
        let sol = Solution::from_weights(&qp, w, eps, 0, Backend::ActiveSet).unwrap();
        assert_eq!(sol.weights[0], -2.0 * eps);
    }
}

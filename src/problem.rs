//! Portfolio QP instance definition.
//!
//! A `QpInstance` describes one long-only minimum-variance problem:
//!
//! ```text
//! minimize    w' C w
//! subject to  sum(w) = 1          (budget)
//!             mu' w >= target     (only when a target is set)
//!             0 <= w <= 1         (bounds)
//! ```
//!
//! Use the builder to construct instances:
//! ```ignore
//! let solution = QpInstance::builder(&mu, &cov)
//!     .target_return(0.12)
//!     .solve()?;
//! ```

use crate::error::{FrontierError, Result};
use crate::model::{CovarianceMatrix, MeanReturns};
use crate::solver::{ActiveSetSolver, QpBackend, Settings, Solution};

/// Lower bound on every weight.
pub const LOWER_BOUND: f64 = 0.0;
/// Upper bound on every weight.
pub const UPPER_BOUND: f64 = 1.0;
/// Required sum of weights.
pub const BUDGET: f64 = 1.0;

/// An immutable, validated portfolio QP.
#[derive(Debug, Clone, Copy)]
pub struct QpInstance<'a> {
    mean: &'a MeanReturns,
    cov: &'a CovarianceMatrix,
    target_return: Option<f64>,
}

impl<'a> QpInstance<'a> {
    /// Create an instance, validating dimensions and the target.
    pub fn new(
        mean: &'a MeanReturns,
        cov: &'a CovarianceMatrix,
        target_return: Option<f64>,
    ) -> Result<Self> {
        if mean.len() != cov.dim() {
            return Err(FrontierError::shape_mismatch(
                format!("covariance of dimension {}", mean.len()),
                format!("{}x{}", cov.dim(), cov.dim()),
            ));
        }
        if let Some(t) = target_return {
            if !t.is_finite() {
                return Err(FrontierError::InvalidInput(format!(
                    "target return {} is not finite",
                    t
                )));
            }
        }
        Ok(QpInstance {
            mean,
            cov,
            target_return,
        })
    }

    /// Start building an instance.
    pub fn builder(mean: &'a MeanReturns, cov: &'a CovarianceMatrix) -> QpInstanceBuilder<'a> {
        QpInstanceBuilder {
            mean,
            cov,
            target_return: None,
        }
    }

    /// Number of assets.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Expected returns.
    pub fn mean(&self) -> &'a MeanReturns {
        self.mean
    }

    /// Covariance matrix.
    pub fn cov(&self) -> &'a CovarianceMatrix {
        self.cov
    }

    /// Minimum required return, if any.
    pub fn target_return(&self) -> Option<f64> {
        self.target_return
    }

    /// Solve with the active-set solver and default settings.
    pub fn solve(&self) -> Result<Solution> {
        self.solve_with(&Settings::default())
    }

    /// Solve with the active-set solver and custom settings.
    pub fn solve_with(&self, settings: &Settings) -> Result<Solution> {
        ActiveSetSolver.solve(self, settings)
    }
}

/// Builder for [`QpInstance`].
#[derive(Debug, Clone)]
pub struct QpInstanceBuilder<'a> {
    mean: &'a MeanReturns,
    cov: &'a CovarianceMatrix,
    target_return: Option<f64>,
}

impl<'a> QpInstanceBuilder<'a> {
    /// Require `mu' w >= target`.
    pub fn target_return(mut self, target: f64) -> Self {
        self.target_return = Some(target);
        self
    }

    /// Set or clear the return target.
    pub fn maybe_target_return(mut self, target: Option<f64>) -> Self {
        self.target_return = target;
        self
    }

    /// Validate and build the instance.
    pub fn build(self) -> Result<QpInstance<'a>> {
        QpInstance::new(self.mean, self.cov, self.target_return)
    }

    /// Build and solve with default settings.
    pub fn solve(self) -> Result<Solution> {
        self.build()?.solve()
    }

    /// Build and solve with custom settings.
    pub fn solve_with(self, settings: &Settings) -> Result<Solution> {
        self.build()?.solve_with(settings)
    }
}

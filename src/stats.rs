//! Sample statistics from price histories.
//!
//! Converts a price series into the expected-return vector and covariance
//! matrix consumed by the solvers.

use nalgebra::{DMatrix, DVector};

use crate::error::{FrontierError, Result};
use crate::model::{AssetUniverse, CovarianceMatrix, MeanReturns};

/// Mean returns and covariance estimated from a return history.
#[derive(Debug, Clone)]
pub struct ReturnStatistics {
    /// Assets, in column order.
    pub universe: AssetUniverse,
    /// Per-period mean return.
    pub mean: MeanReturns,
    /// Per-period sample covariance.
    pub cov: CovarianceMatrix,
    /// Number of return observations.
    pub observations: usize,
}

impl ReturnStatistics {
    /// Estimate from prices: one row per period, one column per asset.
    ///
    /// Requires at least three rows (two returns) and strictly positive,
    /// finite prices.
    pub fn from_prices(universe: AssetUniverse, prices: &DMatrix<f64>) -> Result<Self> {
        let returns = simple_returns(prices)?;
        Self::from_returns(universe, &returns)
    }

    /// Estimate from per-period returns: one row per period, one column per
    /// asset.
    pub fn from_returns(universe: AssetUniverse, returns: &DMatrix<f64>) -> Result<Self> {
        let (t, n) = returns.shape();
        if n != universe.len() {
            return Err(FrontierError::shape_mismatch(
                format!("{} asset columns", universe.len()),
                format!("{} columns", n),
            ));
        }
        if t < 2 {
            return Err(FrontierError::InvalidInput(format!(
                "need at least 2 return observations, got {}",
                t
            )));
        }
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(FrontierError::InvalidInput("returns contain non-finite values".into()));
        }

        let mean = DVector::from_fn(n, |j, _| returns.column(j).mean());
        let mut centered = returns.clone();
        for j in 0..n {
            let m = mean[j];
            centered.column_mut(j).apply(|r| *r -= m);
        }
        let cov = centered.transpose() * &centered / (t - 1) as f64;
        // Enforce exact symmetry against rounding in the product.
        let cov = (&cov + cov.transpose()) * 0.5;

        Ok(ReturnStatistics {
            universe,
            mean: MeanReturns::new(mean)?,
            cov: CovarianceMatrix::new(cov)?,
            observations: t,
        })
    }

    /// Scale per-period statistics to annual figures.
    pub fn annualized(&self, periods_per_year: f64) -> Result<Self> {
        if !(periods_per_year > 0.0 && periods_per_year.is_finite()) {
            return Err(FrontierError::InvalidInput(format!(
                "periods per year must be positive, got {}",
                periods_per_year
            )));
        }
        Ok(ReturnStatistics {
            universe: self.universe.clone(),
            mean: MeanReturns::new(self.mean.as_vector() * periods_per_year)?,
            cov: CovarianceMatrix::new(self.cov.as_matrix() * periods_per_year)?,
            observations: self.observations,
        })
    }
}

/// Period-over-period simple returns `p[t] / p[t-1] - 1`.
pub fn simple_returns(prices: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (t, n) = prices.shape();
    if t < 3 {
        return Err(FrontierError::InvalidInput(format!(
            "need at least 3 price rows, got {}",
            t
        )));
    }
    if let Some(p) = prices.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
        return Err(FrontierError::InvalidInput(format!(
            "prices must be positive and finite, found {}",
            p
        )));
    }
    Ok(DMatrix::from_fn(t - 1, n, |i, j| {
        prices[(i + 1, j)] / prices[(i, j)] - 1.0
    }))
}

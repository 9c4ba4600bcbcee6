//! Portfolio data model.
//!
//! Inputs (`AssetUniverse`, `MeanReturns`, `CovarianceMatrix`) are validated
//! on construction and never mutated afterwards. `PortfolioWeights` is the
//! solver output handed to the caller.

use std::collections::HashSet;
use std::ops::Index;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FrontierError, Result};
use crate::linalg;

/// Relative tolerance used when checking covariance symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Relative diagonal shift allowed when checking positive semi-definiteness.
pub const PSD_TOLERANCE: f64 = 1e-10;

/// Ordered, immutable set of asset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUniverse {
    assets: Vec<String>,
}

impl AssetUniverse {
    /// Create a universe from asset identifiers.
    ///
    /// Identifiers must be non-empty and unique, and there must be at least
    /// one asset.
    pub fn new<S: Into<String>>(assets: impl IntoIterator<Item = S>) -> Result<Self> {
        let assets: Vec<String> = assets.into_iter().map(Into::into).collect();
        if assets.is_empty() {
            return Err(FrontierError::InvalidInput(
                "asset universe must contain at least one asset".into(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &assets {
            if name.trim().is_empty() {
                return Err(FrontierError::InvalidInput("empty asset identifier".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(FrontierError::InvalidInput(format!(
                    "duplicate asset identifier '{}'",
                    name
                )));
            }
        }
        Ok(AssetUniverse { assets })
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always false; a universe holds at least one asset.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Asset identifiers in order.
    pub fn names(&self) -> &[String] {
        &self.assets
    }

    /// Position of an asset in the universe.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == name)
    }
}

/// Expected return per asset, aligned with an [`AssetUniverse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReturns(DVector<f64>);

impl MeanReturns {
    /// Create from a vector of expected returns.
    pub fn new(values: DVector<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(FrontierError::InvalidInput("mean return vector is empty".into()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(FrontierError::InvalidInput(format!(
                "mean return for asset {} is not finite",
                i
            )));
        }
        Ok(MeanReturns(values))
    }

    /// Create from a plain vector.
    pub fn from_vec(values: Vec<f64>) -> Result<Self> {
        Self::new(DVector::from_vec(values))
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying vector.
    pub fn as_vector(&self) -> &DVector<f64> {
        &self.0
    }

    /// Smallest expected return.
    pub fn min(&self) -> f64 {
        self.0.min()
    }

    /// Largest expected return.
    pub fn max(&self) -> f64 {
        self.0.max()
    }

    /// Index of the first asset with the largest expected return.
    pub fn argmax(&self) -> usize {
        self.0.imax()
    }
}

impl Index<usize> for MeanReturns {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// Symmetric covariance matrix of asset returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix(DMatrix<f64>);

impl CovarianceMatrix {
    /// Create from a dense matrix.
    ///
    /// The matrix must be square, finite, symmetric within
    /// [`SYMMETRY_TOLERANCE`] (relative to its largest entry), have a
    /// non-negative diagonal and be positive semi-definite: `C + tol I` must
    /// admit a Cholesky factorization with `tol` scaled by
    /// [`PSD_TOLERANCE`]. Singular matrices pass and surface as a solver
    /// error instead.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        let n = matrix.nrows();
        if n == 0 {
            return Err(FrontierError::InvalidInput("covariance matrix is empty".into()));
        }
        if matrix.ncols() != n {
            return Err(FrontierError::shape_mismatch(
                format!("{}x{}", n, n),
                format!("{}x{}", n, matrix.ncols()),
            ));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(FrontierError::InvalidInput(
                "covariance matrix contains non-finite entries".into(),
            ));
        }
        let tol = SYMMETRY_TOLERANCE * linalg::max_abs(&matrix).max(1.0);
        if !linalg::is_symmetric(&matrix, tol) {
            return Err(FrontierError::InvalidInput("covariance matrix is not symmetric".into()));
        }
        if let Some(i) = (0..n).find(|&i| matrix[(i, i)] < 0.0) {
            return Err(FrontierError::InvalidInput(format!(
                "negative variance {} for asset {}",
                matrix[(i, i)],
                i
            )));
        }
        let shift = PSD_TOLERANCE * linalg::max_abs(&matrix).max(1.0);
        let shifted = &matrix + DMatrix::from_diagonal_element(n, n, shift);
        if shifted.cholesky().is_none() {
            return Err(FrontierError::InvalidInput(
                "covariance matrix is not positive semi-definite".into(),
            ));
        }
        Ok(CovarianceMatrix(matrix))
    }

    /// Create from row-major data.
    pub fn from_row_slice(n: usize, data: &[f64]) -> Result<Self> {
        if data.len() != n * n {
            return Err(FrontierError::shape_mismatch(
                format!("{} entries", n * n),
                format!("{} entries", data.len()),
            ));
        }
        Self::new(DMatrix::from_row_slice(n, n, data))
    }

    /// Diagonal covariance from per-asset variances.
    pub fn diagonal(variances: &[f64]) -> Result<Self> {
        Self::new(DMatrix::from_diagonal(&DVector::from_column_slice(variances)))
    }

    /// Number of assets.
    pub fn dim(&self) -> usize {
        self.0.nrows()
    }

    /// Underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.0
    }

    /// Portfolio variance w' C w.
    pub fn variance(&self, weights: &DVector<f64>) -> f64 {
        linalg::quad_form(weights, &self.0)
    }
}

impl Index<(usize, usize)> for CovarianceMatrix {
    type Output = f64;

    fn index(&self, idx: (usize, usize)) -> &f64 {
        &self.0[idx]
    }
}

/// Long-only, fully invested portfolio weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights(DVector<f64>);

impl PortfolioWeights {
    pub(crate) fn new(weights: DVector<f64>) -> Self {
        PortfolioWeights(weights)
    }

    /// Equal weighting over `n` assets.
    pub fn equal(n: usize) -> Self {
        PortfolioWeights(DVector::from_element(n, 1.0 / n as f64))
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-asset vector.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying vector.
    pub fn as_vector(&self) -> &DVector<f64> {
        &self.0
    }

    /// Weights as a slice.
    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    /// Sum of weights.
    pub fn total(&self) -> f64 {
        self.0.sum()
    }

    /// Expected portfolio return mu' w.
    pub fn expected_return(&self, mean: &MeanReturns) -> f64 {
        linalg::dot(&self.0, mean.as_vector())
    }

    /// Portfolio variance w' C w.
    pub fn variance(&self, cov: &CovarianceMatrix) -> f64 {
        cov.variance(&self.0)
    }

    /// Pair each weight with its asset identifier.
    pub fn labeled<'a>(&'a self, universe: &'a AssetUniverse) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        universe
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.0.iter().copied())
    }
}

impl Index<usize> for PortfolioWeights {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

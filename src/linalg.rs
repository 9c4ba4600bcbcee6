//! Dense linear algebra helpers.
//!
//! Thin wrappers over nalgebra used by the solvers. Everything here is a pure
//! function of its inputs.

use nalgebra::{DMatrix, DVector};

use crate::error::{FrontierError, Result};

/// Default relative pivot tolerance for [`solve_symmetric`].
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// Inner product of two vectors.
pub fn dot(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.dot(b)
}

/// Matrix-vector product.
pub fn mat_vec(m: &DMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    m * x
}

/// Quadratic form x' M x.
pub fn quad_form(x: &DVector<f64>, m: &DMatrix<f64>) -> f64 {
    x.dot(&(m * x))
}

/// Largest absolute entry of a matrix (0 for an empty matrix).
pub fn max_abs(m: &DMatrix<f64>) -> f64 {
    m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Check symmetry with an absolute tolerance.
pub fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[(i, j)] - m[(j, i)]).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Solve a symmetric linear system `a x = b`.
///
/// Tries a Cholesky factorization first; indefinite or badly scaled systems
/// (such as KKT matrices) fall back to a fully pivoted LU. A system whose
/// smallest-to-largest pivot ratio is below `tol` is rejected as
/// [`FrontierError::SingularSystem`].
pub fn solve_symmetric(a: &DMatrix<f64>, b: &DVector<f64>, tol: f64) -> Result<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(FrontierError::shape_mismatch(
            format!("square matrix with {} rows", n),
            format!("{}x{}", n, a.ncols()),
        ));
    }
    if b.len() != n {
        return Err(FrontierError::shape_mismatch(
            format!("rhs of length {}", n),
            format!("length {}", b.len()),
        ));
    }
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    if let Some(chol) = a.clone().cholesky() {
        let l = chol.l_dirty();
        let ratio = pivot_ratio((0..n).map(|i| l[(i, i)] * l[(i, i)]));
        if ratio >= tol {
            return finite_or_singular(chol.solve(b), ratio);
        }
    }

    let lu = a.clone().full_piv_lu();
    let u = lu.u();
    let ratio = pivot_ratio((0..n).map(|i| u[(i, i)]));
    if ratio < tol {
        return Err(FrontierError::SingularSystem { pivot_ratio: ratio });
    }
    match lu.solve(b) {
        Some(x) => finite_or_singular(x, ratio),
        None => Err(FrontierError::SingularSystem { pivot_ratio: ratio }),
    }
}

/// Ratio of smallest to largest pivot magnitude.
fn pivot_ratio(pivots: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = pivots.fold((f64::INFINITY, 0.0_f64), |(lo, hi), p| {
        (lo.min(p.abs()), hi.max(p.abs()))
    });
    if max == 0.0 || !min.is_finite() {
        0.0
    } else {
        min / max
    }
}

fn finite_or_singular(x: DVector<f64>, ratio: f64) -> Result<DVector<f64>> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FrontierError::SingularSystem { pivot_ratio: ratio })
    }
}

//! Sparse matrix utilities.
//!
//! Row-wise assembly of the nalgebra-sparse CSC matrices handed to the
//! reference solver.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Coordinate-format accumulator with a fixed column count and a growing
/// number of rows.
#[derive(Debug, Clone, Default)]
pub struct Triplets {
    ncols: usize,
    nrows: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl Triplets {
    /// Empty accumulator for matrices with `ncols` columns.
    pub fn new(ncols: usize) -> Self {
        Triplets {
            ncols,
            ..Default::default()
        }
    }

    /// Number of rows appended so far.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Append a row from `(col, value)` pairs and return its index.
    ///
    /// Zero values are not stored; duplicate columns are summed. Columns out
    /// of range are ignored.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) -> usize {
        let row = self.nrows;
        self.nrows += 1;
        for (col, val) in entries {
            if val != 0.0 && col < self.ncols {
                self.rows.push(row);
                self.cols.push(col);
                self.vals.push(val);
            }
        }
        row
    }

    /// Append `sign * I`, one row per column.
    pub fn push_identity(&mut self, sign: f64) {
        for j in 0..self.ncols {
            self.push_row([(j, sign)]);
        }
    }

    /// Compress into CSC.
    pub fn into_csc(self) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(self.nrows, self.ncols);
        for ((row, col), val) in self.rows.into_iter().zip(self.cols).zip(self.vals) {
            coo.push(row, col, val);
        }
        CscMatrix::from(&coo)
    }
}

/// Upper triangle (diagonal included) of a dense matrix in CSC format,
/// scaled by `scale`. Explicit zeros are dropped.
pub fn dense_upper_to_csc(dense: &DMatrix<f64>, scale: f64) -> CscMatrix<f64> {
    let mut triplets = Triplets::new(dense.ncols());
    for i in 0..dense.nrows() {
        triplets.push_row((i..dense.ncols()).map(|j| (j, dense[(i, j)] * scale)));
    }
    triplets.into_csc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
        for (row, col, val) in sparse.triplet_iter() {
            dense[(row, col)] = *val;
        }
        dense
    }

    #[test]
    fn test_push_row() {
        let mut t = Triplets::new(3);
        assert_eq!(t.push_row([(0, 1.0), (2, 0.0), (0, 2.0)]), 0);
        assert_eq!(t.push_row([(1, -1.0)]), 1);
        assert_eq!(t.nrows(), 2);
        let m = t.into_csc();
        assert_eq!(m.nnz(), 2);
        let d = to_dense(&m);
        assert_eq!(d.shape(), (2, 3));
        assert_eq!(d[(0, 0)], 3.0);
        assert_eq!(d[(1, 1)], -1.0);
    }

    #[test]
    fn test_push_identity() {
        let mut t = Triplets::new(2);
        t.push_row([(0, 1.0), (1, 1.0)]);
        t.push_identity(-1.0);
        let d = to_dense(&t.into_csc());
        assert_eq!(d.shape(), (3, 2));
        assert_eq!(d[(1, 0)], -1.0);
        assert_eq!(d[(2, 1)], -1.0);
        assert_eq!(d[(1, 1)], 0.0);
    }

    #[test]
    fn test_empty() {
        let m = Triplets::new(4).into_csc();
        assert_eq!(m.nrows(), 0);
        assert_eq!(m.ncols(), 4);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_dense_upper_to_csc() {
        let dense = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        let upper = to_dense(&dense_upper_to_csc(&dense, 2.0));
        assert_eq!(upper[(0, 0)], 0.08);
        assert_eq!(upper[(0, 1)], 0.02);
        assert_eq!(upper[(1, 0)], 0.0);
        assert_eq!(upper[(1, 1)], 0.18);
    }
}

//! Trait implementations for `faer` dense matrices and plain vectors.
//!
//! A dense `faer::Mat<f64>` is the reference assembly of an LDU system: the
//! distributed product is checked against it, and the direct LU in the
//! tests runs on it. The loops below are written out row by row so the
//! summation order is the obvious one.

use crate::core::traits::{Indexing, MatTransVec, MatVec};
use faer::Mat;

/// Computes `y = A * x` for a dense matrix.
impl MatVec for Mat<f64> {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            let mut sum = 0.0;
            for j in 0..self.ncols() {
                sum += self[(i, j)] * x[j];
            }
            y[i] = sum;
        }
    }
}

/// Computes `y = A^T * x` for a dense matrix.
impl MatTransVec for Mat<f64> {
    fn mattransvec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(self.ncols(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.nrows(), x.len(), "Input vector x has incorrect length");
        for j in 0..self.ncols() {
            let mut sum = 0.0;
            for i in 0..self.nrows() {
                sum += self[(i, j)] * x[i];
            }
            y[j] = sum;
        }
    }
}

impl<T> Indexing for Vec<T> {
    fn nrows(&self) -> usize {
        self.len()
    }
}

impl Indexing for Mat<f64> {
    fn nrows(&self) -> usize {
        Mat::nrows(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dense_matvec_and_transpose() {
        // [[1,2],[3,4]]
        let a = Mat::from_fn(2, 2, |i, j| (2 * i + j + 1) as f64);
        let x = [1.0, -1.0];
        let mut y = [0.0; 2];
        a.matvec(&x, &mut y);
        assert_abs_diff_eq!(y[0], -1.0);
        assert_abs_diff_eq!(y[1], -1.0);
        a.mattransvec(&x, &mut y);
        assert_abs_diff_eq!(y[0], -2.0);
        assert_abs_diff_eq!(y[1], -2.0);
    }
}

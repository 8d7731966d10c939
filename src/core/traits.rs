//! Core linear-algebra traits for ldusolve.

/// Matrix–vector product over the locally held coefficients: y ← A x.
pub trait MatVec {
    /// Compute y = A · x.
    fn matvec(&self, x: &[f64], y: &mut [f64]);
}

/// Transposed product: y ← Aᵀ x.
pub trait MatTransVec {
    /// Compute y = Aᵀ · x.
    fn mattransvec(&self, x: &[f64], y: &mut [f64]);
}

/// Uniform indexing into vectors and matrices.
pub trait Indexing {
    /// Number of rows (or length for a vector).
    fn nrows(&self) -> usize;
}

//! Lower-diagonal-upper sparse matrix.
//!
//! Coefficients are stored per face rather than per (row, column) pair: a
//! diagonal array of length N and an upper (and optionally lower) array of
//! length E indexed like the face addressing. A symmetric matrix keeps only
//! the upper array; `lower()` then hands out the same slice, so the
//! symmetric case never duplicates memory.

use crate::core::traits::{Indexing, MatTransVec, MatVec};
use crate::error::{LduError, Result};
use crate::matrix::addressing::LduAddressing;
use faer::Mat;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct LduMatrix {
    addr: Arc<LduAddressing>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    lower: Option<Vec<f64>>,
}

impl LduMatrix {
    /// Build a matrix, symmetric when `lower` is `None`.
    pub fn new(
        addr: Arc<LduAddressing>,
        diag: Vec<f64>,
        upper: Vec<f64>,
        lower: Option<Vec<f64>>,
    ) -> Result<Self> {
        if diag.len() != addr.size() {
            return Err(LduError::shape(format!(
                "diagonal has {} entries for {} cells",
                diag.len(),
                addr.size()
            )));
        }
        if upper.len() != addr.n_faces() {
            return Err(LduError::shape(format!(
                "upper has {} coefficients for {} faces",
                upper.len(),
                addr.n_faces()
            )));
        }
        if let Some(lower) = &lower {
            if lower.len() != addr.n_faces() {
                return Err(LduError::shape(format!(
                    "lower has {} coefficients for {} faces",
                    lower.len(),
                    addr.n_faces()
                )));
            }
        }
        Ok(Self { addr, diag, upper, lower })
    }

    pub fn symmetric(addr: Arc<LduAddressing>, diag: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        Self::new(addr, diag, upper, None)
    }

    pub fn asymmetric(
        addr: Arc<LduAddressing>,
        diag: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        Self::new(addr, diag, upper, Some(lower))
    }

    /// Convenience constructor from raw owner/neighbour lists.
    pub fn from_faces(
        diag: Vec<f64>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        upper: Vec<f64>,
        lower: Option<Vec<f64>>,
    ) -> Result<Self> {
        let addr = LduAddressing::new(diag.len(), owner, neighbour)?;
        Self::new(Arc::new(addr), diag, upper, lower)
    }

    pub fn addressing(&self) -> &LduAddressing {
        &self.addr
    }
    pub fn shared_addressing(&self) -> Arc<LduAddressing> {
        Arc::clone(&self.addr)
    }
    pub fn size(&self) -> usize {
        self.addr.size()
    }
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }
    pub fn diag_mut(&mut self) -> &mut [f64] {
        &mut self.diag
    }
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }
    pub fn upper_mut(&mut self) -> &mut [f64] {
        &mut self.upper
    }
    /// Lower coefficients; the upper array for a symmetric matrix.
    pub fn lower(&self) -> &[f64] {
        self.lower.as_deref().unwrap_or(&self.upper)
    }

    /// Mutable lower coefficients, promoting symmetric storage on first use.
    pub fn lower_mut(&mut self) -> &mut [f64] {
        let upper = &self.upper;
        self.lower.get_or_insert_with(|| upper.clone())
    }

    pub fn is_symmetric(&self) -> bool {
        self.lower.is_none()
    }
    pub fn is_asymmetric(&self) -> bool {
        self.lower.is_some()
    }
    pub fn is_diagonal(&self) -> bool {
        self.addr.n_faces() == 0
    }

    /// y = A x over the internal faces only, in fixed face order.
    pub fn amul_local(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.size(), "Input vector x has incorrect length");
        assert_eq!(y.len(), self.size(), "Output vector y has incorrect length");
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for (yi, (&d, &xi)) in y.iter_mut().zip(self.diag.iter().zip(x)) {
            *yi = d * xi;
        }
        for face in 0..l.len() {
            y[u[face]] += lower[face] * x[l[face]];
            y[l[face]] += self.upper[face] * x[u[face]];
        }
    }

    /// y = Aᵀ x over the internal faces only.
    pub fn tmul_local(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.size(), "Input vector x has incorrect length");
        assert_eq!(y.len(), self.size(), "Output vector y has incorrect length");
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for (yi, (&d, &xi)) in y.iter_mut().zip(self.diag.iter().zip(x)) {
            *yi = d * xi;
        }
        for face in 0..l.len() {
            y[u[face]] += self.upper[face] * x[l[face]];
            y[l[face]] += lower[face] * x[u[face]];
        }
    }

    /// Row sums of the internal coefficients.
    pub fn sum_a(&self) -> Vec<f64> {
        let mut sum = self.diag.clone();
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for face in 0..l.len() {
            sum[l[face]] += self.upper[face];
            sum[u[face]] += lower[face];
        }
        sum
    }

    /// Sum of off-diagonal magnitudes per row.
    pub fn sum_mag_offdiag(&self) -> Vec<f64> {
        let mut sum = vec![0.0; self.size()];
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for face in 0..l.len() {
            sum[l[face]] += self.upper[face].abs();
            sum[u[face]] += lower[face].abs();
        }
        sum
    }

    /// Off-diagonal action H(psi) = -(L + U) psi.
    pub fn h_op(&self, psi: &[f64]) -> Vec<f64> {
        assert_eq!(psi.len(), self.size(), "Input vector psi has incorrect length");
        let mut h = vec![0.0; self.size()];
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for face in 0..l.len() {
            h[u[face]] -= lower[face] * psi[l[face]];
            h[l[face]] -= self.upper[face] * psi[u[face]];
        }
        h
    }

    pub fn negate(&mut self) {
        self.diag.iter_mut().for_each(|d| *d = -*d);
        self.upper.iter_mut().for_each(|c| *c = -*c);
        if let Some(lower) = &mut self.lower {
            lower.iter_mut().for_each(|c| *c = -*c);
        }
    }

    /// Smallest ratio |diag| / Σ|offdiag| over all rows (∞ for a row without
    /// neighbours).
    pub fn diagonal_dominance(&self) -> f64 {
        self.diag
            .iter()
            .zip(self.sum_mag_offdiag())
            .map(|(d, off)| if off > 0.0 { d.abs() / off } else { f64::INFINITY })
            .fold(f64::INFINITY, f64::min)
    }

    /// Dense assembly of the internal coefficients.
    pub fn to_dense(&self) -> Mat<f64> {
        let n = self.size();
        let mut a = Mat::<f64>::zeros(n, n);
        for (i, &d) in self.diag.iter().enumerate() {
            a[(i, i)] = d;
        }
        let l = self.addr.lower_addr();
        let u = self.addr.upper_addr();
        let lower = self.lower();
        for face in 0..l.len() {
            a[(l[face], u[face])] += self.upper[face];
            a[(u[face], l[face])] += lower[face];
        }
        a
    }
}

impl MatVec for LduMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        self.amul_local(x, y);
    }
}

impl MatTransVec for LduMatrix {
    fn mattransvec(&self, x: &[f64], y: &mut [f64]) {
        self.tmul_local(x, y);
    }
}

impl Indexing for LduMatrix {
    fn nrows(&self) -> usize {
        self.size()
    }
}

//! The locally held part of a distributed sparse system.

use crate::error::{LduError, Result};
use crate::matrix::interface::LduInterface;
use crate::matrix::ldu::LduMatrix;
use crate::parallel::{CommsType, Communicator, HaloExchange};

/// Residuals are normalised by this much more than the measured scale so an
/// exactly solved system does not divide by zero.
pub const SMALL: f64 = 1e-20;

#[derive(Debug, Clone, PartialEq)]
pub struct LduSystem {
    matrix: LduMatrix,
    interfaces: Vec<LduInterface>,
}

impl LduSystem {
    pub fn new(matrix: LduMatrix, interfaces: Vec<LduInterface>) -> Result<Self> {
        let n = matrix.size();
        for (i, interface) in interfaces.iter().enumerate() {
            interface.validate(i, n)?;
        }
        Ok(Self { matrix, interfaces })
    }

    /// A system without couplings to anything outside the matrix.
    pub fn serial(matrix: LduMatrix) -> Self {
        Self { matrix, interfaces: Vec::new() }
    }

    pub fn matrix(&self) -> &LduMatrix {
        &self.matrix
    }
    pub fn matrix_mut(&mut self) -> &mut LduMatrix {
        &mut self.matrix
    }
    pub fn interfaces(&self) -> &[LduInterface] {
        &self.interfaces
    }
    pub fn size(&self) -> usize {
        self.matrix.size()
    }
    pub fn is_symmetric(&self) -> bool {
        self.matrix.is_symmetric()
    }
    /// No faces and no interfaces: every row stands alone.
    pub fn is_diagonal(&self) -> bool {
        self.matrix.is_diagonal() && self.interfaces.is_empty()
    }

    fn check_len(&self, what: &str, v: &[f64]) -> Result<()> {
        if v.len() != self.size() {
            return Err(LduError::shape(format!(
                "{what} has length {} for a system of {} cells",
                v.len(),
                self.size()
            )));
        }
        Ok(())
    }

    /// y = A x including the interface couplings. The halo round overlaps
    /// the local product.
    pub fn amul(&self, x: &[f64], y: &mut [f64], comm: &Communicator, mode: CommsType) -> Result<()> {
        self.check_len("x", x)?;
        self.check_len("y", y)?;
        let mut halo = HaloExchange::new(comm);
        let pending = halo.initiate(x, &self.interfaces, mode)?;
        self.matrix.amul_local(x, y);
        let buffers = pending.complete()?;
        buffers.add_contributions(&self.interfaces, y);
        Ok(())
    }

    /// r = b − A psi
    pub fn residual(
        &self,
        psi: &[f64],
        source: &[f64],
        r: &mut [f64],
        comm: &Communicator,
        mode: CommsType,
    ) -> Result<()> {
        self.check_len("source", source)?;
        self.amul(psi, r, comm, mode)?;
        for (ri, bi) in r.iter_mut().zip(source) {
            *ri = bi - *ri;
        }
        Ok(())
    }

    /// Only the interface couplings of A x, as a fresh vector.
    pub fn interface_product(&self, x: &[f64], comm: &Communicator, mode: CommsType) -> Result<Vec<f64>> {
        self.check_len("x", x)?;
        let mut y = vec![0.0; self.size()];
        if self.interfaces.is_empty() {
            return Ok(y);
        }
        let mut halo = HaloExchange::new(comm);
        let buffers = halo.initiate(x, &self.interfaces, mode)?.complete()?;
        buffers.add_contributions(&self.interfaces, &mut y);
        Ok(y)
    }

    /// Row sums including the interface coefficients.
    pub fn sum_a(&self) -> Vec<f64> {
        let mut sum = self.matrix.sum_a();
        for interface in &self.interfaces {
            for (&cell, &coeff) in interface.face_cells().iter().zip(interface.coeffs()) {
                sum[cell] += coeff;
            }
        }
        sum
    }

    /// Scale that turns a residual norm into the normalised residual:
    /// `Σ |A psi − Ā x̄| + |b − Ā x̄|` where `x̄` is the global average of
    /// `psi` and `Ā` the row sums. `w_a` holds `A psi`.
    pub fn norm_factor(
        &self,
        psi: &[f64],
        source: &[f64],
        w_a: &[f64],
        comm: &Communicator,
    ) -> Result<f64> {
        self.check_len("psi", psi)?;
        self.check_len("source", source)?;
        self.check_len("A psi", w_a)?;
        let x_ref = comm.average(psi)?;
        let local: f64 = self
            .sum_a()
            .iter()
            .zip(w_a.iter().zip(source))
            .map(|(&sa, (&wa, &b))| {
                let pa = sa * x_ref;
                (wa - pa).abs() + (b - pa).abs()
            })
            .sum();
        Ok(comm.sum(local)? + SMALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ring4() -> LduSystem {
        // 0-1-2-3 chain closed by a cyclic coupling between cells 3 and 0
        let m = LduMatrix::from_faces(vec![2.0; 4], vec![0, 1, 2], vec![1, 2, 3], vec![-0.5; 3], None)
            .unwrap();
        let cyclic = vec![
            LduInterface::cyclic(vec![0], vec![3], vec![-0.5]),
            LduInterface::cyclic(vec![3], vec![0], vec![-0.5]),
        ];
        LduSystem::new(m, cyclic).unwrap()
    }

    #[test]
    fn amul_adds_cyclic_coupling() {
        let sys = ring4();
        let comm = Communicator::serial();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 4];
        sys.amul(&x, &mut y, &comm, CommsType::NonBlocking).unwrap();
        assert_abs_diff_eq!(y[0], 2.0 - 1.0 - 2.0);
        assert_abs_diff_eq!(y[3], 8.0 - 1.5 - 0.5);
        assert_eq!(sys.sum_a(), vec![1.0; 4]);
    }

    #[test]
    fn norm_factor_of_uniform_solution_is_tiny() {
        let sys = ring4();
        let comm = Communicator::serial();
        let psi = [1.0; 4];
        let mut w_a = [0.0; 4];
        sys.amul(&psi, &mut w_a, &comm, CommsType::Blocking).unwrap();
        let source = w_a;
        let nf = sys.norm_factor(&psi, &source, &w_a, &comm).unwrap();
        assert_abs_diff_eq!(nf, SMALL);
    }

    #[test]
    fn rejects_bad_interfaces_and_lengths() {
        let m = LduMatrix::from_faces(vec![1.0; 2], vec![0], vec![1], vec![0.1], None).unwrap();
        let bad = LduInterface::processor(1, 0, vec![2], vec![1.0]);
        assert!(matches!(LduSystem::new(m.clone(), vec![bad]), Err(LduError::ShapeMismatch(_))));
        let sys = LduSystem::serial(m);
        let comm = Communicator::serial();
        let mut y = [0.0; 3];
        assert!(sys.amul(&[1.0, 1.0], &mut y, &comm, CommsType::Blocking).is_err());
    }
}

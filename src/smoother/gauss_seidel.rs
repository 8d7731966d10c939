use bitflags::bitflags;
use parking_lot::Mutex;

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::{CommsType, Communicator};
use crate::smoother::{Smoother, check_lengths};
use crate::utils::field_ops;

bitflags! {
    /// Direction(s) of a Gauss-Seidel sweep.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Sweep: u32 {
        const FORWARD   = 0b01;
        const BACKWARD  = 0b10;
        const SYMMETRIC = Self::FORWARD.bits() | Self::BACKWARD.bits();
    }
}

/// Gauss-Seidel over the local rows. Interface couplings are lagged: their
/// neighbour values come from a halo round at the start of each direction
/// and move to the right-hand side.
pub struct GaussSeidel<'a> {
    system: &'a LduSystem,
    comm: &'a Communicator,
    mode: CommsType,
    sweep: Sweep,
    b_prime: Mutex<Vec<f64>>,
}

impl<'a> GaussSeidel<'a> {
    pub fn new(system: &'a LduSystem, comm: &'a Communicator, sweep: Sweep) -> Result<Self> {
        if let Some(row) = system.matrix().diag().iter().position(|&d| d == 0.0) {
            return Err(LduError::ZeroPivot(row));
        }
        Ok(Self {
            system,
            comm,
            mode: comm.config().comms_type,
            sweep,
            b_prime: Mutex::new(vec![0.0; system.size()]),
        })
    }

    pub fn sweep(&self) -> Sweep {
        self.sweep
    }

    /// b' = b − (interface couplings of psi)
    fn refresh(&self, psi: &[f64], source: &[f64], b_prime: &mut [f64]) -> Result<()> {
        if self.system.interfaces().is_empty() {
            b_prime.copy_from_slice(source);
            return Ok(());
        }
        let coupled = self.system.interface_product(psi, self.comm, self.mode)?;
        field_ops::sub(source, &coupled, b_prime);
        Ok(())
    }

    fn relax_row(&self, row: usize, psi: &mut [f64], b_prime: &[f64]) {
        let m = self.system.matrix();
        let addr = m.addressing();
        let (l, u) = (addr.lower_addr(), addr.upper_addr());
        let (lower, upper) = (m.lower(), m.upper());
        let mut acc = b_prime[row];
        for &face in addr.neighbour_faces(row) {
            acc -= lower[face] * psi[l[face]];
        }
        for &face in addr.owner_faces(row) {
            acc -= upper[face] * psi[u[face]];
        }
        psi[row] = acc / m.diag()[row];
    }
}

impl Smoother for GaussSeidel<'_> {
    fn name(&self) -> &'static str {
        if self.sweep == Sweep::SYMMETRIC {
            "symGaussSeidel"
        } else {
            "GaussSeidel"
        }
    }

    fn smooth(&self, psi: &mut [f64], source: &[f64], n_sweeps: usize) -> Result<()> {
        let n = self.system.size();
        check_lengths(n, psi, source)?;
        let mut b_prime = self.b_prime.lock();
        for _ in 0..n_sweeps {
            if self.sweep.contains(Sweep::FORWARD) {
                self.refresh(psi, source, &mut b_prime)?;
                for row in 0..n {
                    self.relax_row(row, psi, &b_prime);
                }
            }
            if self.sweep.contains(Sweep::BACKWARD) {
                self.refresh(psi, source, &mut b_prime)?;
                for row in (0..n).rev() {
                    self.relax_row(row, psi, &b_prime);
                }
            }
        }
        Ok(())
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Smoother + 'a>> {
    Ok(Box::new(GaussSeidel::new(system, comm, Sweep::FORWARD)?))
}

pub fn build_symmetric<'a>(
    system: &'a LduSystem,
    comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Smoother + 'a>> {
    Ok(Box::new(GaussSeidel::new(system, comm, Sweep::SYMMETRIC)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduMatrix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_forward_sweep_by_hand() {
        // [2 -1; -1 2] psi = [1, 1], from zero
        let m = LduMatrix::from_faces(vec![2.0; 2], vec![0], vec![1], vec![-1.0], None).unwrap();
        let sys = LduSystem::serial(m);
        let comm = Communicator::serial();
        let gs = GaussSeidel::new(&sys, &comm, Sweep::FORWARD).unwrap();
        let mut psi = [0.0; 2];
        gs.smooth(&mut psi, &[1.0, 1.0], 1).unwrap();
        assert_abs_diff_eq!(psi[0], 0.5);
        assert_abs_diff_eq!(psi[1], 0.75);
        gs.smooth(&mut psi, &[1.0, 1.0], 60).unwrap();
        assert_abs_diff_eq!(psi[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(psi[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn backward_sweep_starts_at_the_last_row() {
        let m = LduMatrix::from_faces(vec![2.0; 2], vec![0], vec![1], vec![-1.0], None).unwrap();
        let sys = LduSystem::serial(m);
        let comm = Communicator::serial();
        let gs = GaussSeidel::new(&sys, &comm, Sweep::BACKWARD).unwrap();
        let mut psi = [0.0; 2];
        gs.smooth(&mut psi, &[1.0, 1.0], 1).unwrap();
        assert_eq!(psi, [0.75, 0.5]);
        assert_eq!(gs.name(), "GaussSeidel");
    }
}

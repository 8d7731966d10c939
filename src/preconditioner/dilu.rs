//! Diagonal incomplete LU.
//!
//! Only the diagonal of the factorisation is modified; the off-diagonal
//! factors are the matrix coefficients themselves:
//! `M = (D* + L) D*⁻¹ (D* + U)` with
//! `D*[u] = D[u] − Σ lower·upper / D*[l]` over the faces below `u`.

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::{LduAddressing, LduSystem};
use crate::parallel::Communicator;
use crate::preconditioner::{Capability, Preconditioner, check_lengths};

/// Reciprocal of the modified diagonal. Faces are visited row by row of the
/// upper triangle, so `D*[l]` is final before it is used.
pub(crate) fn reciprocal_d(
    addr: &LduAddressing,
    diag: &[f64],
    upper: &[f64],
    lower: &[f64],
) -> Result<Vec<f64>> {
    let (l, u) = (addr.lower_addr(), addr.upper_addr());
    let mut r_d = diag.to_vec();
    for &face in addr.owner_order() {
        let pivot = r_d[l[face]];
        if pivot == 0.0 {
            return Err(LduError::ZeroPivot(l[face]));
        }
        r_d[u[face]] -= upper[face] * lower[face] / pivot;
    }
    for (row, d) in r_d.iter_mut().enumerate() {
        if *d == 0.0 {
            return Err(LduError::ZeroPivot(row));
        }
        *d = 1.0 / *d;
    }
    Ok(r_d)
}

/// z = M⁻¹ r by one forward and one backward substitution.
pub(crate) fn substitute(
    addr: &LduAddressing,
    r_d: &[f64],
    upper: &[f64],
    lower: &[f64],
    r: &[f64],
    z: &mut [f64],
) {
    let (l, u) = (addr.lower_addr(), addr.upper_addr());
    for ((zi, &di), &ri) in z.iter_mut().zip(r_d).zip(r) {
        *zi = di * ri;
    }
    let order = addr.owner_order();
    for &face in order {
        z[u[face]] -= r_d[u[face]] * lower[face] * z[l[face]];
    }
    for &face in order.iter().rev() {
        z[l[face]] -= r_d[l[face]] * upper[face] * z[u[face]];
    }
}

pub struct Dilu<'a> {
    system: &'a LduSystem,
    r_d: Vec<f64>,
}

impl<'a> Dilu<'a> {
    pub fn new(system: &'a LduSystem) -> Result<Self> {
        let m = system.matrix();
        let r_d = reciprocal_d(m.addressing(), m.diag(), m.upper(), m.lower())?;
        Ok(Self { system, r_d })
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    _comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(Box::new(Dilu::new(system)?))
}

impl Preconditioner for Dilu<'_> {
    fn name(&self) -> &'static str {
        "DILU"
    }
    fn capability(&self) -> Capability {
        Capability::BOTH
    }
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()> {
        check_lengths(self.r_d.len(), r, z)?;
        let m = self.system.matrix();
        substitute(m.addressing(), &self.r_d, m.upper(), m.lower(), r, z);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduMatrix;
    use approx::assert_abs_diff_eq;

    /// For a tridiagonal matrix DILU is the exact LU factorisation.
    #[test]
    fn exact_on_tridiagonal() {
        let m = LduMatrix::from_faces(
            vec![4.0, 5.0, 6.0],
            vec![0, 1],
            vec![1, 2],
            vec![-1.0, -2.0],
            Some(vec![-0.5, -1.5]),
        )
        .unwrap();
        let sys = LduSystem::serial(m.clone());
        let pc = Dilu::new(&sys).unwrap();
        let x = [1.0, -2.0, 0.5];
        let mut b = [0.0; 3];
        m.amul_local(&x, &mut b);
        let mut z = [0.0; 3];
        pc.apply(&b, &mut z).unwrap();
        for (zi, xi) in z.iter().zip(&x) {
            assert_abs_diff_eq!(*zi, *xi, epsilon = 1e-12);
        }
    }
}

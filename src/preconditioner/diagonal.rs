// Diagonal (Jacobi) preconditioner

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::{Capability, Preconditioner, check_lengths};
use crate::utils::field_ops;

/// M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner {
    inv_diag: Vec<f64>,
}

impl DiagonalPreconditioner {
    pub fn new(system: &LduSystem) -> Result<Self> {
        let diag = system.matrix().diag();
        if let Some(row) = diag.iter().position(|&d| d == 0.0) {
            return Err(LduError::ZeroPivot(row));
        }
        Ok(Self { inv_diag: diag.iter().map(|d| 1.0 / d).collect() })
    }

    pub fn inv_diag(&self) -> &[f64] {
        &self.inv_diag
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    _comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(Box::new(DiagonalPreconditioner::new(system)?))
}

impl Preconditioner for DiagonalPreconditioner {
    fn name(&self) -> &'static str {
        "diagonal"
    }
    fn capability(&self) -> Capability {
        Capability::BOTH
    }
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()> {
        check_lengths(self.inv_diag.len(), r, z)?;
        field_ops::mul(&self.inv_diag, r, z);
        Ok(())
    }
}

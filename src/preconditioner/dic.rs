//! Diagonal incomplete Cholesky, the symmetric counterpart of DILU.

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::dilu::{reciprocal_d, substitute};
use crate::preconditioner::{Capability, Preconditioner, check_lengths};

pub struct Dic<'a> {
    system: &'a LduSystem,
    r_d: Vec<f64>,
}

impl<'a> Dic<'a> {
    pub fn new(system: &'a LduSystem) -> Result<Self> {
        let m = system.matrix();
        if !m.is_symmetric() {
            return Err(LduError::InvalidConfig(
                "DIC needs symmetric matrix storage, use DILU".into(),
            ));
        }
        let r_d = reciprocal_d(m.addressing(), m.diag(), m.upper(), m.upper())?;
        Ok(Self { system, r_d })
    }

    pub fn reciprocal_diagonal(&self) -> &[f64] {
        &self.r_d
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    _comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(Box::new(Dic::new(system)?))
}

impl Preconditioner for Dic<'_> {
    fn name(&self) -> &'static str {
        "DIC"
    }
    fn capability(&self) -> Capability {
        Capability::SYMMETRIC
    }
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()> {
        check_lengths(self.r_d.len(), r, z)?;
        let m = self.system.matrix();
        substitute(m.addressing(), &self.r_d, m.upper(), m.upper(), r, z);
        Ok(())
    }
}

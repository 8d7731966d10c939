//! Gauss-Seidel smoothing used as a preconditioner: `z` is the result of
//! `nSweeps` sweeps on `A z = r` starting from zero. Symmetric matrices get
//! a symmetric (forward then backward) sweep so the operator stays
//! symmetric for PCG.

use crate::config::SolverControls;
use crate::error::Result;
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::{Capability, Preconditioner, check_lengths};
use crate::smoother::{GaussSeidel, Smoother, Sweep};

pub struct GaussSeidelPreconditioner<'a> {
    smoother: GaussSeidel<'a>,
    n: usize,
    n_sweeps: usize,
}

impl<'a> GaussSeidelPreconditioner<'a> {
    pub fn new(system: &'a LduSystem, comm: &'a Communicator, n_sweeps: usize) -> Result<Self> {
        let sweep = if system.is_symmetric() { Sweep::SYMMETRIC } else { Sweep::FORWARD };
        Ok(Self {
            smoother: GaussSeidel::new(system, comm, sweep)?,
            n: system.size(),
            n_sweeps: n_sweeps.max(1),
        })
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    comm: &'a Communicator,
    controls: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(Box::new(GaussSeidelPreconditioner::new(system, comm, controls.n_sweeps)?))
}

impl Preconditioner for GaussSeidelPreconditioner<'_> {
    fn name(&self) -> &'static str {
        "GaussSeidel"
    }
    fn capability(&self) -> Capability {
        Capability::BOTH
    }
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()> {
        check_lengths(self.n, r, z)?;
        z.fill(0.0);
        self.smoother.smooth(z, r, self.n_sweeps)
    }
}

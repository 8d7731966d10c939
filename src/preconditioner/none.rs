use crate::config::SolverControls;
use crate::error::Result;
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::{Capability, Preconditioner, check_lengths};

/// Identity: z = r.
#[derive(Debug, Clone)]
pub struct NoPreconditioner {
    n: usize,
}

impl NoPreconditioner {
    pub fn new(system: &LduSystem) -> Self {
        Self { n: system.size() }
    }
}

pub fn build<'a>(
    system: &'a LduSystem,
    _comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>> {
    Ok(Box::new(NoPreconditioner::new(system)))
}

impl Preconditioner for NoPreconditioner {
    fn name(&self) -> &'static str {
        "none"
    }
    fn capability(&self) -> Capability {
        Capability::BOTH
    }
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()> {
        check_lengths(self.n, r, z)?;
        z.copy_from_slice(r);
        Ok(())
    }
}

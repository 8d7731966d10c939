//! Smoothers built on the diagonal incomplete factorisations:
//! `psi += M⁻¹ (b − A psi)` per sweep.

use parking_lot::Mutex;

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::{CommsType, Communicator};
use crate::preconditioner::dilu::{reciprocal_d, substitute};
use crate::smoother::{Smoother, check_lengths};
use crate::utils::field_ops;

pub struct FactorisedSmoother<'a> {
    name: &'static str,
    system: &'a LduSystem,
    comm: &'a Communicator,
    mode: CommsType,
    r_d: Vec<f64>,
    // residual and correction
    scratch: Mutex<(Vec<f64>, Vec<f64>)>,
}

impl<'a> FactorisedSmoother<'a> {
    /// DIC smoothing; the matrix must use symmetric storage.
    pub fn dic(system: &'a LduSystem, comm: &'a Communicator) -> Result<Self> {
        if !system.is_symmetric() {
            return Err(LduError::InvalidConfig(
                "DIC smoother needs symmetric matrix storage, use DILU".into(),
            ));
        }
        Self::new("DIC", system, comm)
    }

    pub fn dilu(system: &'a LduSystem, comm: &'a Communicator) -> Result<Self> {
        Self::new("DILU", system, comm)
    }

    fn new(name: &'static str, system: &'a LduSystem, comm: &'a Communicator) -> Result<Self> {
        let m = system.matrix();
        let r_d = reciprocal_d(m.addressing(), m.diag(), m.upper(), m.lower())?;
        let n = system.size();
        Ok(Self {
            name,
            system,
            comm,
            mode: comm.config().comms_type,
            r_d,
            scratch: Mutex::new((vec![0.0; n], vec![0.0; n])),
        })
    }
}

impl Smoother for FactorisedSmoother<'_> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn smooth(&self, psi: &mut [f64], source: &[f64], n_sweeps: usize) -> Result<()> {
        check_lengths(self.system.size(), psi, source)?;
        let m = self.system.matrix();
        let mut guard = self.scratch.lock();
        let (r, z) = &mut *guard;
        for _ in 0..n_sweeps {
            self.system.residual(psi, source, r, self.comm, self.mode)?;
            substitute(m.addressing(), &self.r_d, m.upper(), m.lower(), r, z);
            field_ops::axpy(1.0, z, psi);
        }
        Ok(())
    }
}

pub fn build_dic<'a>(
    system: &'a LduSystem,
    comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Smoother + 'a>> {
    Ok(Box::new(FactorisedSmoother::dic(system, comm)?))
}

pub fn build_dilu<'a>(
    system: &'a LduSystem,
    comm: &'a Communicator,
    _controls: &SolverControls,
) -> Result<Box<dyn Smoother + 'a>> {
    Ok(Box::new(FactorisedSmoother::dilu(system, comm)?))
}

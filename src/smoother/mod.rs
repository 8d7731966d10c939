//! Smoothers: cheap stationary iterations on `A psi = b`.
//!
//! A smoother improves `psi` in place. It is used directly by the
//! smooth solver and, wrapped, as a preconditioner. Sweeps that need
//! neighbour values refresh the interface couplings through a halo round,
//! so every process must smooth in lockstep.

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::Communicator;

pub mod gauss_seidel;
pub mod incomplete;

pub use gauss_seidel::{GaussSeidel, Sweep};
pub use incomplete::FactorisedSmoother;

pub trait Smoother {
    fn name(&self) -> &'static str;
    /// Apply `n_sweeps` sweeps to `psi`.
    fn smooth(&self, psi: &mut [f64], source: &[f64], n_sweeps: usize) -> Result<()>;
}

/// Builds a smoother for one system.
pub type SmootherCtor = for<'a> fn(
    &'a LduSystem,
    &'a Communicator,
    &SolverControls,
) -> Result<Box<dyn Smoother + 'a>>;

pub(crate) fn check_lengths(n: usize, psi: &[f64], source: &[f64]) -> Result<()> {
    if psi.len() != n || source.len() != n {
        return Err(LduError::shape(format!(
            "smoother of size {n} given psi of length {} and source of length {}",
            psi.len(),
            source.len()
        )));
    }
    Ok(())
}

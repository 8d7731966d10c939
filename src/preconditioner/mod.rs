//! Preconditioners for the Krylov solvers.
//!
//! A preconditioner approximates `A⁻¹` for one system. It is built once per
//! solve from the system (and the communicator, when its action needs halo
//! data) and applied once or twice per iteration. `apply` only reads the
//! factorisation, so applying twice to the same residual gives the same
//! result.

use bitflags::bitflags;

use crate::config::SolverControls;
use crate::error::Result;
use crate::matrix::LduSystem;
use crate::parallel::Communicator;

bitflags! {
    /// Matrix storage a preconditioner, smoother or solver can work with.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Capability: u32 {
        const SYMMETRIC  = 0b01;
        const ASYMMETRIC = 0b10;
        const BOTH       = Self::SYMMETRIC.bits() | Self::ASYMMETRIC.bits();
    }
}

impl Capability {
    /// The capability a system needs.
    pub fn of(system: &LduSystem) -> Self {
        if system.is_symmetric() {
            Capability::SYMMETRIC
        } else {
            Capability::ASYMMETRIC
        }
    }
}

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner {
    fn name(&self) -> &'static str;
    fn capability(&self) -> Capability;
    /// z = M⁻¹ r
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<()>;
}

/// Builds a preconditioner for one system.
pub type PreconditionerCtor = for<'a> fn(
    &'a LduSystem,
    &'a Communicator,
    &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>>;

pub mod diagonal;
pub mod dic;
pub mod dilu;
pub mod gauss_seidel;
pub mod none;

pub use diagonal::DiagonalPreconditioner;
pub use dic::Dic;
pub use dilu::Dilu;
pub use gauss_seidel::GaussSeidelPreconditioner;
pub use none::NoPreconditioner;

pub(crate) fn check_lengths(n: usize, r: &[f64], z: &[f64]) -> Result<()> {
    if r.len() != n || z.len() != n {
        return Err(crate::error::LduError::shape(format!(
            "preconditioner of size {n} applied to lengths {} and {}",
            r.len(),
            z.len()
        )));
    }
    Ok(())
}

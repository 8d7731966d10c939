//! The iterative solver family.
//!
//! Every solver works on one [`LduSystem`] through one [`Communicator`]: a
//! product means a halo round, an inner product a global reduction, so all
//! processes iterate in lockstep and take identical decisions. A solve
//! never fails because it did not converge; the outcome is reported in the
//! returned [`SolverPerformance`].

use crate::config::SolverControls;
use crate::context::Registry;
use crate::error::Result;
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::Preconditioner;
use crate::smoother::Smoother;

pub mod base;
pub mod diagonal;
pub mod gmres;
pub mod pbicgstab;
pub mod pcg;
pub mod performance;
pub mod smooth_solver;
pub mod state;

pub use base::SolverBase;
pub use diagonal::DiagonalSolver;
pub use gmres::Gmres;
pub use pbicgstab::PBiCGStab;
pub use pcg::Pcg;
pub use performance::SolverPerformance;
pub use smooth_solver::SmoothSolver;
pub use state::{SolveState, TerminalState};

/// Common interface of the solvers.
pub trait LduSolver {
    fn name(&self) -> &'static str;
    /// Solve `A psi = source` in place, starting from the given `psi`.
    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance>;
}

/// What a solver constructor gets to work with.
#[derive(Clone, Copy)]
pub struct SolveContext<'a> {
    pub field_name: &'a str,
    pub system: &'a LduSystem,
    pub comm: &'a Communicator,
    pub controls: &'a SolverControls,
    pub registry: &'a Registry,
}

impl<'a> SolveContext<'a> {
    pub fn base(&self) -> SolverBase<'a> {
        SolverBase::new(self.field_name, self.system, self.comm, self.controls.clone())
    }

    /// The preconditioner named in the controls.
    pub fn preconditioner(&self) -> Result<Box<dyn Preconditioner + 'a>> {
        self.registry
            .preconditioner(&self.controls.preconditioner, self.system, self.comm, self.controls)
    }

    /// The smoother named in the controls.
    pub fn smoother(&self) -> Result<Box<dyn Smoother + 'a>> {
        self.registry.smoother(&self.controls.smoother, self.system, self.comm, self.controls)
    }
}

/// Builds a solver from its context.
pub type SolverCtor = for<'a> fn(SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>>;

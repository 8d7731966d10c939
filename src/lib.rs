//! ldusolve: distributed iterative solvers for sparse systems in LDU form
//!
//! A finite-volume discretisation produces one sparse system per field and
//! process: a matrix stored by faces ([`LduMatrix`]) plus the couplings to
//! cells held elsewhere ([`LduInterface`]). This crate solves such systems
//! with preconditioned Krylov methods and smoothers while every matrix
//! product exchanges interface values with the neighbouring processes and
//! every inner product is reduced over all of them.
//!
//! The pieces, bottom up:
//! - [`parallel`]: transports, processor topology, the communication
//!   schedule, collectives and the halo exchange
//! - [`matrix`]: addressing, coefficients and interfaces
//! - [`preconditioner`] and [`smoother`]: approximations of `A⁻¹`
//! - [`solver`]: PCG, PBiCGStab, GMRES, the smooth solver and the diagonal solver
//! - [`context`]: the [`Registry`] turning [`SolverControls`] keys into algorithms
//!
//! # Example
//! ```no_run
//! # use ldusolve::{Communicator, LduMatrix, LduSystem, Registry, SolverControls};
//! # fn main() -> ldusolve::Result<()> {
//! // three cells in a row, faces (0, 1) and (1, 2)
//! let matrix = LduMatrix::from_faces(vec![4.0; 3], vec![0, 1], vec![1, 2], vec![-1.0; 2], None)?;
//! let system = LduSystem::serial(matrix);
//! # let mut psi = vec![0.0; 3];
//! # let source = vec![1.0; 3];
//! let registry = Registry::with_defaults();
//! let comm = Communicator::serial();
//! let controls = SolverControls::new("PCG", "DIC").with_tolerance(1e-8);
//! let perf = registry.solve("p", &system, &comm, &controls, &mut psi, &source)?;
//! assert!(perf.converged());
//! # Ok(())
//! # }
//! ```

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod smoother;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::{CommsConfig, SolverControls};
pub use context::Registry;
pub use error::{LduError, Result};
pub use matrix::{InterfaceKind, LduAddressing, LduInterface, LduMatrix, LduSystem};
pub use parallel::{CommsType, Communicator, LocalUniverse, ProcessorTopology};
pub use preconditioner::{Capability, Preconditioner};
pub use smoother::Smoother;
pub use solver::{LduSolver, SolverPerformance, TerminalState};

//! Configuration records consumed by the solver and communication layers.

pub mod options;
pub use options::{CommsConfig, SolverControls};

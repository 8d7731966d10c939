//! Algorithm selection.
//!
//! The [`Registry`] maps the keys of [`SolverControls`](crate::config::SolverControls)
//! to constructors and builds the solver, preconditioner or smoother a
//! solve asks for.

pub mod registry;
pub use registry::Registry;

pub mod convergence;
pub mod decompose;
pub mod field_ops;

pub use convergence::{Convergence, Verdict};
pub use decompose::{DecomposedSystem, assemble, decompose, topology_of};

//! Core traits and their implementations for the dense reference types.

pub mod traits;
pub mod wrappers;

pub use traits::{Indexing, MatTransVec, MatVec};

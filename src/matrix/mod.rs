//! Sparse systems in lower-diagonal-upper form.

pub mod addressing;
pub mod interface;
pub mod ldu;
pub mod system;

pub use addressing::LduAddressing;
pub use interface::{InterfaceKind, LduInterface};
pub use ldu::LduMatrix;
pub use system::LduSystem;

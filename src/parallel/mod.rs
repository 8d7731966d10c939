//! Processes, messages and collectives.
//!
//! A [`Transport`] moves tagged `f64` payloads between ranks. On top of it a
//! [`Communicator`] knows the [`ProcessorTopology`] of the run, the
//! pre-computed [`CommSchedule`] of halo partners and the reduction trees,
//! and offers the collectives the solvers need. [`HaloExchange`] drives the
//! per-product exchange of interface values in one of the three
//! [`CommsType`] disciplines.

use serde::{Deserialize, Serialize};

pub mod communicator;
pub mod halo;
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi_transport;
pub mod reduce;
pub mod request;
pub mod schedule;
pub mod tag;
pub mod topology;
pub mod transport;

pub use communicator::Communicator;
pub use halo::{HaloBuffers, HaloExchange, PendingHalo};
pub use local::{LocalTransport, LocalUniverse};
#[cfg(feature = "mpi")]
pub use mpi_transport::MpiTransport;
pub use reduce::Reducible;
pub use request::Request;
pub use schedule::CommSchedule;
pub use tag::{MessageKind, Tag};
pub use topology::{CommsStruct, ProcessorTopology};
pub use transport::{SerialTransport, Transport};

/// How point-to-point halo traffic is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommsType {
    /// One send/receive pair per interface, lower rank sends first.
    Blocking,
    /// Follow the pre-computed communication schedule.
    Scheduled,
    /// Post everything, then drain the receives.
    NonBlocking,
}

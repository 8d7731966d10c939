//! MPI-based message transport.
//!
//! Wraps the MPI world communicator and exposes the point-to-point
//! primitives the communicator needs. Only available with the `mpi`
//! feature.
//!
//! Sends are MPI buffered sends into a buffer attached at start-up, so a
//! send returns as soon as the payload is copied, whatever its size. The
//! buffer has to hold every message of one exchange round that has not been
//! received yet; a single message that cannot fit is refused up front.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use ldusolve::parallel::{MpiTransport, Transport};
//! let transport = MpiTransport::new().unwrap();
//! println!("Rank: {} / {}", transport.rank(), transport.size());
//! # }
//! ```

use crate::error::{LduError, Result};
use crate::parallel::tag::Tag;
use crate::parallel::transport::Transport;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Send buffer attached by [`MpiTransport::new`].
pub const DEFAULT_BUFFER_SIZE: usize = 64 << 20;

/// Room reserved per message for MPI's own bookkeeping.
const MESSAGE_OVERHEAD: usize = 1024;

pub struct MpiTransport {
    /// The MPI world communicator (all processes in the job).
    world: SimpleCommunicator,
    /// Keeps MPI initialised, and the send buffer attached, for the
    /// lifetime of the transport.
    universe: Universe,
    sent: AtomicUsize,
}

impl MpiTransport {
    /// Initializes MPI and wraps the world communicator.
    pub fn new() -> Result<Self> {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Like `new`, attaching a send buffer of `bytes` bytes.
    pub fn with_buffer_size(bytes: usize) -> Result<Self> {
        let mut universe = mpi::initialize()
            .ok_or_else(|| LduError::comm("MPI has already been initialised"))?;
        universe.set_buffer_size(bytes);
        let world = universe.world();
        log::debug!("attached a {bytes}-byte MPI send buffer on rank {}", world.rank());
        Ok(Self { world, universe, sent: AtomicUsize::new(0) })
    }

    pub fn buffer_size(&self) -> usize {
        self.universe.buffer_size()
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }
    fn size(&self) -> usize {
        self.world.size() as usize
    }

    /// Buffered send: returns once MPI has copied the payload.
    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<()> {
        if dest >= self.size() {
            return Err(LduError::comm(format!("no rank {dest} in a run of {}", self.size())));
        }
        let bytes = std::mem::size_of_val(&payload[..]) + MESSAGE_OVERHEAD;
        if bytes > self.buffer_size() {
            return Err(LduError::comm(format!(
                "a {bytes}-byte message to rank {dest} does not fit the {}-byte send buffer",
                self.buffer_size()
            )));
        }
        self.world
            .process_at_rank(dest as i32)
            .buffered_send_with_tag(&payload[..], tag.encode() as i32);
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn recv(&self, source: usize, tag: Tag) -> Result<Vec<f64>> {
        if source >= self.size() {
            return Err(LduError::comm(format!("no rank {source} in a run of {}", self.size())));
        }
        let (payload, _status) = self
            .world
            .process_at_rank(source as i32)
            .receive_vec_with_tag::<f64>(tag.encode() as i32);
        Ok(payload)
    }

    fn probe(&self, source: usize, tag: Tag) -> Result<bool> {
        Ok(self
            .world
            .process_at_rank(source as i32)
            .immediate_probe_with_tag(tag.encode() as i32)
            .is_some())
    }

    fn messages_sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // MPI can be initialised once per process, so everything runs in one
    // test on a singleton world.
    #[test]
    fn large_messages_do_not_wait_for_the_receiver() {
        let t = MpiTransport::with_buffer_size(4 << 20).unwrap();
        let me = t.rank();
        let big: Vec<f64> = (0..100_000).map(|i| i as f64).collect();
        t.send(me, Tag::halo(1), big.clone()).unwrap();
        t.send(me, Tag::halo(2), vec![7.0]).unwrap();
        assert_eq!(t.recv(me, Tag::halo(2)).unwrap(), vec![7.0]);
        assert_eq!(t.recv(me, Tag::halo(1)).unwrap(), big);
        assert_eq!(t.messages_sent(), 2);

        let too_big = vec![0.0; 1 << 20];
        assert!(matches!(
            t.send(me, Tag::halo(3), too_big),
            Err(LduError::CommunicationFailure(_))
        ));
        assert_eq!(t.messages_sent(), 2);
    }
}

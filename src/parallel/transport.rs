//! The message-passing runtime underneath the communicator.
//!
//! Only point-to-point primitives are required. Sends are buffered: they
//! return once the runtime owns the payload and never wait for the
//! receiver. Receives block until a message with the requested source and
//! tag arrives; messages from one source with one tag arrive in the order
//! they were sent.

use crate::error::{LduError, Result};
use crate::parallel::tag::Tag;

pub trait Transport {
    /// Rank of this process in the runtime.
    fn rank(&self) -> usize;
    /// Number of processes in the runtime.
    fn size(&self) -> usize;
    /// Buffered send of `payload` to `dest`.
    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<()>;
    /// Block until a message from `source` carrying `tag` arrives.
    fn recv(&self, source: usize, tag: Tag) -> Result<Vec<f64>>;
    /// Whether a matching message can be received without blocking.
    fn probe(&self, source: usize, tag: Tag) -> Result<bool>;
    /// Number of payload messages sent so far.
    fn messages_sent(&self) -> usize;
}

/// The single-process runtime: there is nobody to talk to.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn send(&self, dest: usize, _tag: Tag, _payload: Vec<f64>) -> Result<()> {
        Err(LduError::comm(format!("serial run cannot send to rank {dest}")))
    }
    fn recv(&self, source: usize, _tag: Tag) -> Result<Vec<f64>> {
        Err(LduError::comm(format!("serial run cannot receive from rank {source}")))
    }
    fn probe(&self, _source: usize, _tag: Tag) -> Result<bool> {
        Ok(false)
    }
    fn messages_sent(&self) -> usize {
        0
    }
}

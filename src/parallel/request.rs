//! Handles for point-to-point transfers that complete later.

use crate::error::Result;
use crate::parallel::CommsType;
use crate::parallel::communicator::Communicator;
use crate::parallel::tag::Tag;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    /// A send the runtime has taken ownership of.
    Sent,
    /// A receive still in flight.
    Pending,
    /// A receive whose payload has arrived.
    Received(Vec<f64>),
}

/// One posted send or receive.
///
/// `wait` consumes the request, so a transfer is completed at most once.
/// Dropping a pending receive leaves its message queued in the runtime.
#[derive(Debug)]
pub struct Request<'c> {
    comm: &'c Communicator,
    mode: CommsType,
    tag: Tag,
    source: usize,
    dest: usize,
    state: RequestState,
}

impl<'c> Request<'c> {
    /// Post a send of `payload` to `dest`.
    pub fn send(
        comm: &'c Communicator,
        mode: CommsType,
        dest: usize,
        tag: Tag,
        payload: Vec<f64>,
    ) -> Result<Self> {
        comm.send(dest, tag, payload)?;
        Ok(Self { comm, mode, tag, source: comm.rank(), dest, state: RequestState::Sent })
    }

    /// Register a receive from `source`; nothing blocks until `wait`.
    pub fn recv(comm: &'c Communicator, mode: CommsType, source: usize, tag: Tag) -> Self {
        Self { comm, mode, tag, source, dest: comm.rank(), state: RequestState::Pending }
    }

    pub fn mode(&self) -> CommsType {
        self.mode
    }
    pub fn tag(&self) -> Tag {
        self.tag
    }
    pub fn source(&self) -> usize {
        self.source
    }
    pub fn dest(&self) -> usize {
        self.dest
    }
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Poll without blocking; `true` once `wait` would return immediately.
    pub fn test(&mut self) -> Result<bool> {
        if self.state == RequestState::Pending && self.comm.probe(self.source, self.tag)? {
            let payload = self.comm.recv(self.source, self.tag)?;
            self.state = RequestState::Received(payload);
        }
        Ok(self.state != RequestState::Pending)
    }

    /// Block until complete. Receives yield their payload, sends `None`.
    pub fn wait(self) -> Result<Option<Vec<f64>>> {
        match self.state {
            RequestState::Sent => Ok(None),
            RequestState::Received(payload) => Ok(Some(payload)),
            RequestState::Pending => self.comm.recv(self.source, self.tag).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommsConfig;
    use crate::parallel::local::LocalUniverse;

    #[test]
    fn test_then_wait() {
        let got = LocalUniverse::run(2, |t| {
            let comm = Communicator::uncoupled(t, CommsConfig::default()).unwrap();
            let mode = CommsType::NonBlocking;
            if comm.rank() == 0 {
                let s = Request::send(&comm, mode, 1, Tag::halo(3), vec![1.0, 2.0]).unwrap();
                assert!(s.wait().unwrap().is_none());
                comm.barrier().unwrap();
                Vec::new()
            } else {
                let mut r = Request::recv(&comm, mode, 0, Tag::halo(3));
                assert_eq!(r.dest(), 1);
                comm.barrier().unwrap();
                // the payload was sent before the barrier released us
                assert!(r.test().unwrap());
                assert!(r.test().unwrap());
                r.wait().unwrap().unwrap()
            }
        });
        assert_eq!(got[1], vec![1.0, 2.0]);
    }
}

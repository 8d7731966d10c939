//! In-process message-passing runtime.
//!
//! Every process is a thread owning one `LocalTransport`: an inbox channel
//! plus a sender into every other inbox. Messages that arrive while a
//! receive waits for a different source or tag are parked and matched
//! later, so per-(source, tag) ordering is first-in first-out like a real
//! runtime.
//!
//! # Example
//! ```
//! use ldusolve::parallel::{LocalUniverse, Transport};
//! let ranks = LocalUniverse::run(3, |t| t.rank());
//! assert_eq!(ranks, vec![0, 1, 2]);
//! ```

use crate::error::{LduError, Result};
use crate::parallel::tag::Tag;
use crate::parallel::transport::Transport;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Envelope {
    source: usize,
    tag: Tag,
    payload: Vec<f64>,
}

pub struct LocalTransport {
    rank: usize,
    size: usize,
    inbox: Receiver<Envelope>,
    outboxes: Vec<Option<Sender<Envelope>>>,
    parked: Mutex<VecDeque<Envelope>>,
    sent: AtomicUsize,
    timeout: Option<Duration>,
}

impl LocalTransport {
    fn take_parked(&self, parked: &mut VecDeque<Envelope>, source: usize, tag: Tag) -> Option<Vec<f64>> {
        let pos = parked.iter().position(|e| e.source == source && e.tag == tag)?;
        parked.remove(pos).map(|e| e.payload)
    }

    fn next_envelope(&self) -> Result<Envelope> {
        match self.timeout {
            Some(timeout) => self.inbox.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    LduError::comm(format!("rank {} timed out after {:?}", self.rank, timeout))
                }
                RecvTimeoutError::Disconnected => {
                    LduError::comm(format!("rank {}: all peers disconnected", self.rank))
                }
            }),
            None => self
                .inbox
                .recv()
                .map_err(|_| LduError::comm(format!("rank {}: all peers disconnected", self.rank))),
        }
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<()> {
        let outbox = self
            .outboxes
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| LduError::comm(format!("rank {} cannot send to rank {dest}", self.rank)))?;
        log::trace!("rank {} -> {dest}: {:?} ({} values)", self.rank, tag, payload.len());
        outbox
            .send(Envelope { source: self.rank, tag, payload })
            .map_err(|_| LduError::comm(format!("rank {dest} has left the run")))?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn recv(&self, source: usize, tag: Tag) -> Result<Vec<f64>> {
        if source >= self.size || source == self.rank {
            return Err(LduError::comm(format!("rank {} cannot receive from rank {source}", self.rank)));
        }
        let mut parked = self.parked.lock();
        if let Some(payload) = self.take_parked(&mut parked, source, tag) {
            return Ok(payload);
        }
        loop {
            let envelope = self.next_envelope()?;
            if envelope.source == source && envelope.tag == tag {
                return Ok(envelope.payload);
            }
            parked.push_back(envelope);
        }
    }

    fn probe(&self, source: usize, tag: Tag) -> Result<bool> {
        let mut parked = self.parked.lock();
        loop {
            match self.inbox.try_recv() {
                Ok(envelope) => parked.push_back(envelope),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(parked.iter().any(|e| e.source == source && e.tag == tag))
    }

    fn messages_sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

/// Factory for a group of connected `LocalTransport`s.
pub struct LocalUniverse;

impl LocalUniverse {
    /// Transports for `size` processes, indexed by rank.
    pub fn new(size: usize) -> Vec<LocalTransport> {
        Self::build(size, None)
    }

    /// Like `new`, but a receive waiting longer than `timeout` fails with
    /// `CommunicationFailure` instead of hanging.
    pub fn with_timeout(size: usize, timeout: Duration) -> Vec<LocalTransport> {
        Self::build(size, Some(timeout))
    }

    fn build(size: usize, timeout: Option<Duration>) -> Vec<LocalTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel::unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalTransport {
                rank,
                size,
                inbox,
                outboxes: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, s)| (dest != rank).then(|| s.clone()))
                    .collect(),
                parked: Mutex::new(VecDeque::new()),
                sent: AtomicUsize::new(0),
                timeout,
            })
            .collect()
    }

    /// Run `f` once per process on scoped threads; results in rank order.
    /// A panic on any process is re-raised on the caller.
    pub fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(LocalTransport) -> R + Sync,
        R: Send,
    {
        Self::run_transports(Self::new(size), f)
    }

    pub fn run_transports<F, R>(transports: Vec<LocalTransport>, f: F) -> Vec<R>
    where
        F: Fn(LocalTransport) -> R + Sync,
        R: Send,
    {
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = transports
                .into_iter()
                .map(|t| scope.spawn(move || f(t)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_tags_are_parked() {
        let got = LocalUniverse::run(2, |t| {
            if t.rank() == 0 {
                t.send(1, Tag::halo(1), vec![1.0]).unwrap();
                t.send(1, Tag::halo(2), vec![2.0]).unwrap();
                t.send(1, Tag::halo(1), vec![3.0]).unwrap();
                vec![]
            } else {
                let b = t.recv(0, Tag::halo(2)).unwrap();
                let a1 = t.recv(0, Tag::halo(1)).unwrap();
                let a2 = t.recv(0, Tag::halo(1)).unwrap();
                vec![b[0], a1[0], a2[0]]
            }
        });
        assert_eq!(got[1], vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn counts_messages_and_rejects_self_send() {
        let mut ts = LocalUniverse::new(2);
        let t1 = ts.pop().unwrap();
        let t0 = ts.pop().unwrap();
        assert!(t0.send(0, Tag::reduce(), vec![]).is_err());
        t0.send(1, Tag::reduce(), vec![4.0]).unwrap();
        assert_eq!(t0.messages_sent(), 1);
        assert!(t1.probe(0, Tag::reduce()).unwrap());
        assert!(!t1.probe(0, Tag::broadcast()).unwrap());
        assert_eq!(t1.recv(0, Tag::reduce()).unwrap(), vec![4.0]);
    }

    #[test]
    fn receive_times_out() {
        let mut ts = LocalUniverse::with_timeout(2, Duration::from_millis(20));
        let t1 = ts.pop().unwrap();
        let err = t1.recv(0, Tag::reduce()).unwrap_err();
        assert!(matches!(err, LduError::CommunicationFailure(_)));
    }

    #[test]
    fn departed_peer_is_reported() {
        let mut ts = LocalUniverse::new(2);
        let t1 = ts.pop().unwrap();
        drop(ts);
        assert!(t1.recv(0, Tag::reduce()).is_err());
        assert!(t1.send(0, Tag::reduce(), vec![1.0]).is_err());
    }
}

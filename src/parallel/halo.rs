//! Exchange of interface values around a matrix product.
//!
//! A round has two halves. [`HaloExchange::initiate`] packs the local values
//! each interface contributes and, depending on the [`CommsType`], posts the
//! transfers; it never waits. [`PendingHalo::complete`] finishes the round
//! and hands back one neighbour buffer per interface. The exchange is
//! borrowed mutably for the lifetime of the pending round, so a second round
//! cannot start before the first one completes.

use crate::error::{LduError, Result};
use crate::matrix::interface::{InterfaceKind, LduInterface};
use crate::parallel::CommsType;
use crate::parallel::communicator::Communicator;
use crate::parallel::request::Request;
use crate::parallel::tag::Tag;
use std::collections::HashSet;

pub struct HaloExchange<'c> {
    comm: &'c Communicator,
    rounds: usize,
}

enum Slot<'h> {
    /// Neighbour values already known (cyclic interfaces).
    Ready(Vec<f64>),
    /// Blocking and scheduled transfers happen in `complete`.
    Deferred { neighbour: usize, tag: u32, payload: Vec<f64> },
    /// Non-blocking receive posted in `initiate`.
    Posted(Request<'h>),
}

/// A started round; must be completed to obtain the neighbour values.
#[must_use = "a halo round does nothing useful until it is completed"]
pub struct PendingHalo<'h> {
    comm: &'h Communicator,
    mode: CommsType,
    slots: Vec<Slot<'h>>,
    expected: Vec<usize>,
}

/// Neighbour values, one buffer per interface in interface order.
#[derive(Debug, Clone, PartialEq)]
pub struct HaloBuffers {
    values: Vec<Vec<f64>>,
}

impl<'c> HaloExchange<'c> {
    pub fn new(comm: &'c Communicator) -> Self {
        Self { comm, rounds: 0 }
    }

    /// Rounds started so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn initiate(
        &mut self,
        x: &[f64],
        interfaces: &[LduInterface],
        mode: CommsType,
    ) -> Result<PendingHalo<'_>> {
        let comm: &Communicator = self.comm;
        let me = comm.rank();
        let mut seen = HashSet::new();
        for (i, interface) in interfaces.iter().enumerate() {
            if let InterfaceKind::Processor { neighbour, tag } = *interface.kind() {
                if neighbour == me || comm.peers().binary_search(&neighbour).is_err() {
                    return Err(LduError::comm(format!(
                        "interface {i} couples rank {me} to rank {neighbour}, which is not one of its peers"
                    )));
                }
                if !seen.insert((neighbour, tag)) {
                    return Err(LduError::comm(format!(
                        "interface {i} reuses tag {tag} towards rank {neighbour}"
                    )));
                }
            }
            if let Some(&cell) = interface.face_cells().iter().find(|&&c| c >= x.len()) {
                return Err(LduError::shape(format!(
                    "interface {i} reads cell {cell} of a vector of length {}",
                    x.len()
                )));
            }
        }

        let mut slots = Vec::with_capacity(interfaces.len());
        for interface in interfaces {
            let slot = match interface.kind() {
                InterfaceKind::Cyclic { neighbour_cells } => {
                    Slot::Ready(neighbour_cells.iter().map(|&c| x[c]).collect())
                }
                &InterfaceKind::Processor { neighbour, tag } => match mode {
                    CommsType::NonBlocking => {
                        Request::send(comm, mode, neighbour, Tag::halo(tag), interface.pack(x))?;
                        Slot::Posted(Request::recv(comm, mode, neighbour, Tag::halo(tag)))
                    }
                    CommsType::Blocking | CommsType::Scheduled => Slot::Deferred {
                        neighbour,
                        tag,
                        payload: interface.pack(x),
                    },
                },
            };
            slots.push(slot);
        }
        self.rounds += 1;
        log::trace!(
            "rank {me}: halo round {} over {} interfaces ({mode:?})",
            self.rounds,
            interfaces.len()
        );
        Ok(PendingHalo {
            comm,
            mode,
            slots,
            expected: interfaces.iter().map(LduInterface::len).collect(),
        })
    }
}

impl<'h> PendingHalo<'h> {
    pub fn mode(&self) -> CommsType {
        self.mode
    }

    /// Finish the round, blocking on outstanding receives.
    pub fn complete(self) -> Result<HaloBuffers> {
        let PendingHalo { comm, mode, slots, expected } = self;
        let me = comm.rank();
        let mut values: Vec<Option<Vec<f64>>> = vec![None; slots.len()];
        // deferred transfers as (neighbour, tag, interface, payload)
        let mut deferred = Vec::new();

        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Slot::Ready(v) => values[i] = Some(v),
                Slot::Posted(request) => values[i] = request.wait()?,
                Slot::Deferred { neighbour, tag, payload } => {
                    deferred.push((neighbour, tag, i, payload))
                }
            }
        }
        deferred.sort_by_key(|&(neighbour, tag, i, _)| (neighbour, tag, i));

        match mode {
            CommsType::Blocking | CommsType::NonBlocking => {
                for (neighbour, tag, i, payload) in deferred {
                    let tag = Tag::halo(tag);
                    if me < neighbour {
                        comm.send(neighbour, tag, payload)?;
                        values[i] = Some(comm.recv(neighbour, tag)?);
                    } else {
                        values[i] = Some(comm.recv(neighbour, tag)?);
                        comm.send(neighbour, tag, payload)?;
                    }
                }
            }
            CommsType::Scheduled => {
                let topology = comm.topology();
                for &peer in comm.schedule().proc_schedule(comm.my_index()) {
                    let peer_rank = topology.rank_of(peer);
                    let batch: Vec<_> = deferred
                        .iter()
                        .filter(|(neighbour, ..)| *neighbour == peer_rank)
                        .collect();
                    if batch.is_empty() {
                        continue;
                    }
                    let send_first = comm.my_index() < peer;
                    if send_first {
                        for (_, tag, _, payload) in &batch {
                            comm.send(peer_rank, Tag::halo(*tag), payload.clone())?;
                        }
                    }
                    for (_, tag, i, _) in &batch {
                        values[*i] = Some(comm.recv(peer_rank, Tag::halo(*tag))?);
                    }
                    if !send_first {
                        for (_, tag, _, payload) in &batch {
                            comm.send(peer_rank, Tag::halo(*tag), payload.clone())?;
                        }
                    }
                }
            }
        }

        let mut buffers = Vec::with_capacity(values.len());
        for (i, (value, len)) in values.into_iter().zip(expected).enumerate() {
            let value = value.ok_or_else(|| {
                LduError::comm(format!("rank {me}: interface {i} received nothing"))
            })?;
            if value.len() != len {
                return Err(LduError::comm(format!(
                    "rank {me}: interface {i} expects {len} values, neighbour sent {}",
                    value.len()
                )));
            }
            buffers.push(value);
        }
        Ok(HaloBuffers { values: buffers })
    }
}

impl HaloBuffers {
    /// Neighbour values of interface `i`.
    pub fn get(&self, i: usize) -> &[f64] {
        &self.values[i]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add every interface's coupling to `y`, in interface order.
    pub fn add_contributions(&self, interfaces: &[LduInterface], y: &mut [f64]) {
        for (interface, values) in interfaces.iter().zip(&self.values) {
            interface.add_contribution(values, y);
        }
    }
}

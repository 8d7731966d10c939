//! Collectives over a processor topology.
//!
//! A `Communicator` owns the transport of this process and the immutable
//! description of the run. Collectives work on participant indices and map
//! to transport ranks only at the send/receive boundary. Every participant
//! must call the same collectives in the same order.

use crate::config::CommsConfig;
use crate::error::{LduError, Result};
use crate::parallel::reduce::{
    Reducible, and_op, max_op, min_op, pack_list, sum_op, unpack_list, vec_sum_op,
};
use crate::parallel::schedule::CommSchedule;
use crate::parallel::tag::Tag;
use crate::parallel::topology::{CommsStruct, ProcessorTopology};
use crate::parallel::transport::{SerialTransport, Transport};

pub struct Communicator {
    transport: Box<dyn Transport>,
    topology: ProcessorTopology,
    schedule: CommSchedule,
    config: CommsConfig,
    my_index: usize,
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank())
            .field("n_procs", &self.n_procs())
            .field("config", &self.config)
            .finish()
    }
}

impl Communicator {
    pub fn new<T: Transport + 'static>(
        transport: T,
        topology: ProcessorTopology,
        config: CommsConfig,
    ) -> Result<Self> {
        let rank = transport.rank();
        let size = transport.size();
        if let Some(&r) = topology.ranks().iter().find(|&&r| r >= size) {
            return Err(LduError::comm(format!(
                "topology names rank {r} but the runtime has {size} processes"
            )));
        }
        let my_index = topology.index_of(rank).ok_or_else(|| {
            LduError::comm(format!("rank {rank} does not take part in this topology"))
        })?;
        let schedule = CommSchedule::new(topology.n_procs(), &topology.edges())?;
        Ok(Self {
            transport: Box::new(transport),
            topology,
            schedule,
            config,
            my_index,
        })
    }

    /// Every rank of the runtime takes part, nobody is coupled.
    pub fn uncoupled<T: Transport + 'static>(transport: T, config: CommsConfig) -> Result<Self> {
        let topology = ProcessorTopology::uncoupled(transport.size())?;
        Self::new(transport, topology, config)
    }

    /// One process, no messages.
    pub fn serial() -> Self {
        let topology = ProcessorTopology::single();
        Self {
            transport: Box::new(SerialTransport),
            schedule: CommSchedule::empty(1),
            topology,
            config: CommsConfig::default(),
            my_index: 0,
        }
    }

    pub fn rank(&self) -> usize {
        self.transport.rank()
    }
    /// Position of this process in the participant list.
    pub fn my_index(&self) -> usize {
        self.my_index
    }
    pub fn n_procs(&self) -> usize {
        self.topology.n_procs()
    }
    pub fn is_master(&self) -> bool {
        self.my_index == 0
    }
    pub fn is_serial(&self) -> bool {
        self.n_procs() == 1
    }
    /// Ascending ranks this process exchanges halo data with.
    pub fn peers(&self) -> &[usize] {
        self.topology.peers_of(self.my_index)
    }
    pub fn topology(&self) -> &ProcessorTopology {
        &self.topology
    }
    pub fn schedule(&self) -> &CommSchedule {
        &self.schedule
    }
    pub fn config(&self) -> &CommsConfig {
        &self.config
    }
    pub fn messages_sent(&self) -> usize {
        self.transport.messages_sent()
    }

    pub(crate) fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<()> {
        self.transport.send(dest, tag, payload)
    }
    pub(crate) fn recv(&self, source: usize, tag: Tag) -> Result<Vec<f64>> {
        self.transport.recv(source, tag)
    }
    pub(crate) fn probe(&self, source: usize, tag: Tag) -> Result<bool> {
        self.transport.probe(source, tag)
    }

    fn send_to(&self, index: usize, tag: Tag, payload: Vec<f64>) -> Result<()> {
        self.transport.send(self.topology.rank_of(index), tag, payload)
    }
    fn recv_from(&self, index: usize, tag: Tag) -> Result<Vec<f64>> {
        self.transport.recv(self.topology.rank_of(index), tag)
    }

    /// Combine up `structs` to the master, then hand the master's result
    /// back down the same structure.
    fn reduce_over<T, F>(&self, structs: &[CommsStruct], value: T, op: F) -> Result<T>
    where
        T: Reducible,
        F: Fn(T, T) -> T,
    {
        let me = &structs[self.my_index];
        let mut acc = value;
        for &child in me.below() {
            let wire = self.recv_from(child, Tag::reduce())?;
            acc = op(acc, T::from_wire(&wire)?);
        }
        if let Some(parent) = me.above() {
            self.send_to(parent, Tag::reduce(), acc.to_wire())?;
            acc = T::from_wire(&self.recv_from(parent, Tag::broadcast())?)?;
        }
        if !me.below().is_empty() {
            let wire = acc.to_wire();
            for &child in me.below() {
                self.send_to(child, Tag::broadcast(), wire.clone())?;
            }
        }
        Ok(acc)
    }

    /// Binomial-tree reduction; every process gets the identical value.
    pub fn tree_reduce<T, F>(&self, value: T, op: F) -> Result<T>
    where
        T: Reducible,
        F: Fn(T, T) -> T,
    {
        self.reduce_over(self.topology.tree_communication(), value, op)
    }

    /// Flat reduction through the master, combined in participant order.
    pub fn linear_reduce<T, F>(&self, value: T, op: F) -> Result<T>
    where
        T: Reducible,
        F: Fn(T, T) -> T,
    {
        self.reduce_over(self.topology.linear_communication(), value, op)
    }

    pub fn reduce<T, F>(&self, value: T, op: F) -> Result<T>
    where
        T: Reducible,
        F: Fn(T, T) -> T,
    {
        if self.is_serial() {
            return Ok(value);
        }
        if self.n_procs() < self.config.n_procs_simple_sum {
            self.linear_reduce(value, op)
        } else {
            self.tree_reduce(value, op)
        }
    }

    pub fn sum(&self, value: f64) -> Result<f64> {
        self.reduce(value, sum_op)
    }

    pub fn max(&self, value: f64) -> Result<f64> {
        self.reduce(value, max_op)
    }

    pub fn min(&self, value: f64) -> Result<f64> {
        self.reduce(value, min_op)
    }

    /// Global sum of magnitudes of the local field.
    pub fn sum_mag(&self, field: &[f64]) -> Result<f64> {
        let local: f64 = field.iter().map(|v| v.abs()).sum();
        self.sum(local)
    }

    /// Global inner product of two local fields.
    pub fn sum_prod(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        if a.len() != b.len() {
            return Err(LduError::shape(format!(
                "inner product of lengths {} and {}",
                a.len(),
                b.len()
            )));
        }
        let local: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        self.sum(local)
    }

    /// Global mean of a distributed field; zero when the field is empty
    /// everywhere.
    pub fn average(&self, field: &[f64]) -> Result<f64> {
        let local: f64 = field.iter().sum();
        let both = self.reduce(vec![local, field.len() as f64], vec_sum_op)?;
        match both.as_slice() {
            [sum, count] if *count > 0.0 => Ok(sum / count),
            _ => {
                log::warn!("average of an empty field, returning zero");
                Ok(0.0)
            }
        }
    }

    pub fn all_true(&self, value: bool) -> Result<bool> {
        self.reduce(value, and_op)
    }

    pub fn barrier(&self) -> Result<()> {
        self.all_true(true).map(|_| ())
    }

    /// Master's `value` is delivered to everyone down the tree.
    pub fn broadcast<T: Reducible>(&self, value: T) -> Result<T> {
        let me = &self.topology.tree_communication()[self.my_index];
        let value = match me.above() {
            Some(parent) => T::from_wire(&self.recv_from(parent, Tag::broadcast())?)?,
            None => value,
        };
        if !me.below().is_empty() {
            let wire = value.to_wire();
            for &child in me.below() {
                self.send_to(child, Tag::broadcast(), wire.clone())?;
            }
        }
        Ok(value)
    }

    /// Collect one vector per participant on the master, in participant
    /// order. Other processes get `None`.
    pub fn gather_list(&self, value: Vec<f64>) -> Result<Option<Vec<Vec<f64>>>> {
        if !self.is_master() {
            self.send_to(0, Tag::gather(), value)?;
            return Ok(None);
        }
        let mut list = Vec::with_capacity(self.n_procs());
        list.push(value);
        for index in 1..self.n_procs() {
            list.push(self.recv_from(index, Tag::gather())?);
        }
        Ok(Some(list))
    }

    /// Every process gets every participant's vector.
    pub fn all_gather_list(&self, value: Vec<f64>) -> Result<Vec<Vec<f64>>> {
        let packed = match self.gather_list(value)? {
            Some(list) => pack_list(&list),
            None => Vec::new(),
        };
        unpack_list(&self.broadcast(packed)?)
    }

    /// The master hands entry `i` of `list` to participant `i`; the list is
    /// ignored elsewhere.
    pub fn scatter_list(&self, list: Option<Vec<Vec<f64>>>) -> Result<Vec<f64>> {
        if !self.is_master() {
            return self.recv_from(0, Tag::scatter());
        }
        let list = list.ok_or_else(|| LduError::comm("master has nothing to scatter"))?;
        if list.len() != self.n_procs() {
            return Err(LduError::shape(format!(
                "scatter of {} entries over {} processes",
                list.len(),
                self.n_procs()
            )));
        }
        let mut list = list.into_iter();
        let mine = list.next().unwrap_or_default();
        for (index, payload) in list.enumerate() {
            self.send_to(index + 1, Tag::scatter(), payload)?;
        }
        Ok(mine)
    }

    /// All-to-all: `send[i]` goes to participant `i`, the result holds what
    /// participant `i` sent here. Sizes travel first, payloads follow in
    /// chunks of at most `max_comms_size` values when that is positive.
    pub fn exchange(&self, send: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = self.n_procs();
        if send.len() != n {
            return Err(LduError::shape(format!(
                "exchange of {} entries over {} processes",
                send.len(),
                n
            )));
        }
        let chunk = match self.config.max_comms_size {
            0 => usize::MAX,
            c => c,
        };
        for (index, payload) in send.iter().enumerate() {
            if index == self.my_index {
                continue;
            }
            self.send_to(index, Tag::exchange(0), vec![payload.len() as f64])?;
            for piece in payload.chunks(chunk) {
                self.send_to(index, Tag::exchange(1), piece.to_vec())?;
            }
        }
        let mut received = Vec::with_capacity(n);
        for index in 0..n {
            if index == self.my_index {
                received.push(send[index].clone());
                continue;
            }
            let len = usize::from_wire(&self.recv_from(index, Tag::exchange(0))?)?;
            let mut payload = Vec::with_capacity(len);
            while payload.len() < len {
                payload.extend(self.recv_from(index, Tag::exchange(1))?);
            }
            if payload.len() != len {
                return Err(LduError::comm(format!(
                    "expected {len} values from participant {index}, got {}",
                    payload.len()
                )));
            }
            received.push(payload);
        }
        Ok(received)
    }
}

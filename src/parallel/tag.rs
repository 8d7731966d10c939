//! Message-type tags.
//!
//! Concurrent exchanges between the same pair of processes are told apart
//! by the kind of message and, for halo traffic, the interface tag both
//! sides agreed on. A tag encodes into one non-negative `u32` so it can be
//! handed to a message-passing runtime unchanged.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Halo = 1,
    Reduce = 2,
    Broadcast = 3,
    Gather = 4,
    Scatter = 5,
    Exchange = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: MessageKind,
    pub id: u32,
}

const ID_BITS: u32 = 24;
const ID_MASK: u32 = (1 << ID_BITS) - 1;

impl Tag {
    pub fn new(kind: MessageKind, id: u32) -> Self {
        Self { kind, id: id & ID_MASK }
    }
    pub fn halo(id: u32) -> Self {
        Self::new(MessageKind::Halo, id)
    }
    pub fn reduce() -> Self {
        Self::new(MessageKind::Reduce, 0)
    }
    pub fn broadcast() -> Self {
        Self::new(MessageKind::Broadcast, 0)
    }
    pub fn gather() -> Self {
        Self::new(MessageKind::Gather, 0)
    }
    pub fn scatter() -> Self {
        Self::new(MessageKind::Scatter, 0)
    }
    pub fn exchange(id: u32) -> Self {
        Self::new(MessageKind::Exchange, id)
    }

    pub fn encode(self) -> u32 {
        ((self.kind as u32) << ID_BITS) | self.id
    }
}

//! Entity identity

use std::fmt;

/// A handle to an entity in a [`Diagram`](super::Diagram).
///
/// Holds a slot index and a generation counter so that handles to destroyed
/// entities are detected after the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl EntityId {
    pub(crate) fn new(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Raw slot index (diagnostics only)
    pub fn index(self) -> u32 {
        self.idx
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}@gen{})", self.idx, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

//! Append-only node arena.
//!
//! Nodes are allocated by splits and root promotion and addressed by stable
//! `NodeId` indices. A slot is never moved or freed individually; the arena
//! drops as a whole with the tree.

use crate::latch::NodeRef;
use crate::node::Node;
use arbor_common::NodeId;
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only store of latched node slots.
pub(crate) struct NodeArena<V> {
    slots: RwLock<Vec<NodeRef<V>>>,
}

impl<V> NodeArena<V> {
    /// Creates an arena with room for `capacity_hint` slots before the
    /// backing vector grows.
    pub(crate) fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            slots: RwLock::new(Vec::with_capacity(capacity_hint)),
        }
    }

    /// Allocates a slot for `node` and returns its stable address.
    pub(crate) fn allocate(&self, node: Node<V>) -> NodeId {
        let mut slots = self.slots.write();
        let id = NodeId::from_u32(slots.len() as u32);
        slots.push(Arc::new(RwLock::new(node)));
        id
    }

    /// Returns the slot for `id`.
    ///
    /// Panics if `id` was not produced by this arena.
    pub(crate) fn node(&self, id: NodeId) -> NodeRef<V> {
        let slots = self.slots.read();
        Arc::clone(&slots[id.index()])
    }

    /// Number of allocated nodes.
    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }
}

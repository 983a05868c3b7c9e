//! Stable node addresses.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node slot in the node arena.
///
/// Ids are assigned sequentially at allocation and never reused; a node
/// keeps its id for the lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Invalid node ID.
    pub const INVALID: NodeId = NodeId(u32::MAX);

    /// Returns true if this is a valid node ID.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Returns the id as a raw u32.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Creates a NodeId from a raw u32.
    pub fn from_u32(value: u32) -> Self {
        NodeId(value)
    }

    /// Returns the id as an arena index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

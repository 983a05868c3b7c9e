//! Configuration structures for Arbor.

use crate::error::{ArborError, Result};
use serde::{Deserialize, Serialize};

/// Minimum supported tree order.
pub const MIN_ORDER: usize = 2;

/// Configuration for a B-tree index instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Tree order `t`; each node holds at most `2t - 1` keys.
    pub order: usize,
    /// Number of node slots to pre-allocate in the arena.
    pub node_capacity_hint: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: 32,
            node_capacity_hint: 1024,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration with the given order and default sizing.
    pub fn with_order(order: usize) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// Maximum number of keys a node can hold (`2 * order - 1`).
    pub fn capacity(&self) -> usize {
        2 * self.order - 1
    }

    /// Split midpoint index for a full node (`capacity / 2`).
    pub fn midpoint(&self) -> usize {
        self.capacity() / 2
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER {
            return Err(ArborError::InvalidOrder { order: self.order });
        }
        Ok(())
    }
}

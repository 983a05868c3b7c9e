//! In-memory concurrent B-tree index keyed by `i64`.
//!
//! The tree maps signed 64-bit keys to opaque caller-owned value handles and
//! supports point insertion, point lookup, and a structural pretty-printer
//! used for debugging and property testing.
//!
//! ## Structure
//!
//! ```text
//!                  +-------------------+
//!                  |   BTreeIndex<V>   |
//!                  |  root: AtomicU32  |
//!                  +---------+---------+
//!                            |
//!                  +---------v---------+
//!                  |     NodeArena     |  append-only, stable NodeIds
//!                  | [Arc<RwLock<Node>>]
//!                  +---------+---------+
//!                            |
//!            +---------------+---------------+
//!            |                               |
//!   Internal: keys + children        Leaf: keys + values
//!   (children.len() == nkeys + 1)    (parallel arrays)
//! ```
//!
//! Nodes hold at most `2 * order - 1` keys. A full node splits at the
//! midpoint on the next insert routed through it; the promoted separator
//! travels up the spine, growing a new root when the old root itself splits.
//!
//! ## Locking
//!
//! Every node carries its own reader/writer latch. Descents use
//! lock-coupling: the child's latch is acquired before the parent's is
//! released.
//!
//! - Read paths (search, print, validation) couple in shared mode and hold
//!   at most the current root-to-node path.
//! - Inserts descend in exclusive mode and release all ancestor latches as
//!   soon as the just-latched child is *safe* (below capacity, so no split
//!   can propagate above it). An unsafe path leaves a retained chain from
//!   the nearest safe ancestor down to the leaf; split propagation mutates
//!   only nodes in that chain and the chain is released leaf-to-root once
//!   the spine is consistent.
//!
//! Latches are always acquired parent-before-child, so the protocol is
//! deadlock-free. Root promotions are published through an atomic root
//! cell; descents re-check the cell after latching the root and restart if
//! it moved.

mod arena;
mod latch;
mod node;
mod printer;
mod tree;

pub use tree::BTreeIndex;

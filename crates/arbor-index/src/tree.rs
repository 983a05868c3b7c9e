//! Concurrent B-tree index over `i64` keys.
//!
//! Operations descend from an atomic root cell with lock-coupling (see the
//! crate docs). Insert retains a chain of exclusive latches from the nearest
//! safe ancestor down to the target leaf; split propagation walks that chain
//! iteratively and never acquires a latch above it.

use crate::arena::NodeArena;
use crate::latch::{acquire_exclusive, acquire_shared, ExclusiveGuard, SharedGuard};
use crate::node::Node;
use arbor_common::{ArborError, IndexConfig, NodeId, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// In-memory concurrent B-tree mapping `i64` keys to caller-owned value
/// handles of type `V`.
///
/// The tree is never structurally empty: creation allocates an empty leaf
/// root. Many readers and writers may operate concurrently as long as they
/// touch disjoint parts of the tree; see the crate docs for the latching
/// protocol. Dropping the tree frees every node; teardown must not race
/// with other operations, which ownership already guarantees.
pub struct BTreeIndex<V> {
    /// Node storage; addresses are stable for the life of the tree.
    arena: NodeArena<V>,
    /// Arena address of the current root.
    root: AtomicU32,
    /// Tree order `t`.
    order: usize,
    /// Maximum keys per node (`2t - 1`).
    capacity: usize,
    /// Split midpoint (`capacity / 2`).
    midpoint: usize,
}

impl<V> BTreeIndex<V> {
    /// Creates a tree of the given order with an empty leaf root.
    ///
    /// Returns `InvalidOrder` for orders below 2.
    pub fn new(order: usize) -> Result<Self> {
        Self::with_config(IndexConfig::with_order(order))
    }

    /// Creates a tree from a full configuration.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity();
        let arena = NodeArena::with_capacity(config.node_capacity_hint);
        let root = arena.allocate(Node::new_leaf(capacity, None));
        Ok(Self {
            arena,
            root: AtomicU32::new(root.as_u32()),
            order: config.order,
            capacity,
            midpoint: config.midpoint(),
        })
    }

    /// Tree order `t`.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of allocated nodes, for diagnostics.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub(crate) fn arena(&self) -> &NodeArena<V> {
        &self.arena
    }

    #[inline]
    fn root_id(&self) -> NodeId {
        NodeId::from_u32(self.root.load(Ordering::Acquire))
    }

    /// Latches the current root in shared mode.
    ///
    /// A root promotion may complete while the latch is awaited, so the
    /// loaded id is re-checked after acquisition and the acquisition
    /// restarts if the root moved. Roots are never reallocated, which makes
    /// the check ABA-free.
    pub(crate) fn latch_root_shared(&self) -> (NodeId, SharedGuard<V>) {
        loop {
            let id = self.root_id();
            let guard = acquire_shared(&self.arena.node(id));
            if self.root_id() == id {
                return (id, guard);
            }
        }
    }

    /// Latches the current root in exclusive mode, with the same re-check
    /// as [`latch_root_shared`](Self::latch_root_shared).
    fn latch_root_exclusive(&self) -> (NodeId, ExclusiveGuard<V>) {
        loop {
            let id = self.root_id();
            let guard = acquire_exclusive(&self.arena.node(id));
            if self.root_id() == id {
                return (id, guard);
            }
        }
    }

    /// Inserts a key and value handle.
    ///
    /// Descends exclusively with lock-coupling, releasing all ancestor
    /// latches whenever the just-latched child is safe (`nkeys < capacity`).
    /// Returns `DuplicateKey` (tree untouched) if the key is present.
    pub fn insert(&self, key: i64, value: V) -> Result<()> {
        let (mut current_id, mut current) = self.latch_root_exclusive();
        // Retained ancestors, root-to-parent order. Every entry except
        // possibly the first is at capacity.
        let mut chain: Vec<(NodeId, ExclusiveGuard<V>)> = Vec::new();

        while !current.is_leaf() {
            let child_id = current.child_for(key);
            let child = acquire_exclusive(&self.arena.node(child_id));
            if child.is_safe(self.capacity) {
                // No split can propagate above this child; every retained
                // ancestor unlatches before the descent dives.
                chain.clear();
                drop(current);
            } else {
                chain.push((current_id, current));
            }
            current_id = child_id;
            current = child;
        }

        if current.leaf_search(key).is_some() {
            return Err(ArborError::DuplicateKey);
        }

        if current.is_safe(self.capacity) {
            current.leaf_insert(key, value);
            return Ok(());
        }

        // Full leaf: split, then place the key on the side that keeps the
        // separator invariant (left iff key < promoted separator).
        let (separator, upper_keys, upper_values) = current.split_leaf(self.midpoint);
        let mut sibling = Node::leaf_from_split(current.parent(), upper_keys, upper_values);
        if key < separator {
            current.leaf_insert(key, value);
        } else {
            sibling.leaf_insert(key, value);
        }
        let sibling_id = self.arena.allocate(sibling);
        trace!(leaf = %current_id, sibling = %sibling_id, separator, "leaf split");

        // Latches stay held until the whole spine is consistent, then drop
        // leaf-to-root as `finished` unwinds.
        let mut finished: Vec<ExclusiveGuard<V>> = Vec::new();
        finished.push(current);

        let mut carry = Some((separator, current_id, sibling_id));
        while let Some((separator, left_id, right_id)) = carry.take() {
            let Some((parent_id, mut parent)) = chain.pop() else {
                // `left_id` was the root: grow a level.
                self.grow_root(separator, left_id, right_id, &mut finished);
                break;
            };

            if parent.is_safe(self.capacity) {
                // The nearest safe ancestor absorbs the separator.
                let pos = position_in(&parent, parent_id, left_id);
                parent.insert_child_after(pos, separator, right_id);
                finished.push(parent);
                break;
            }

            // Parent at capacity: split it first, then place the pair on
            // the side selected by the promoted key.
            let (key_up, upper_keys, upper_children) = parent.split_internal(self.midpoint);
            let mut moved = upper_children.clone();
            let mut sibling = Node::internal_from_split(parent.parent(), upper_keys, upper_children);

            if separator > key_up {
                let pos = position_in(&sibling, parent_id, left_id);
                sibling.insert_child_after(pos, separator, right_id);
                moved.push(right_id);
            } else {
                let pos = position_in(&parent, parent_id, left_id);
                parent.insert_child_after(pos, separator, right_id);
            }

            let sibling_id = self.arena.allocate(sibling);
            trace!(node = %parent_id, sibling = %sibling_id, key_up, "internal split");
            self.relink_moved(&moved, sibling_id, left_id, &mut finished);

            finished.push(parent);
            carry = Some((key_up, parent_id, sibling_id));
        }

        debug_assert!(chain.is_empty());
        Ok(())
    }

    /// Grows a new root above the two halves of a just-split old root and
    /// publishes it. The old root's latch is still held (last in
    /// `finished`), so no descent can observe the half-linked state.
    fn grow_root(
        &self,
        separator: i64,
        left_id: NodeId,
        right_id: NodeId,
        finished: &mut Vec<ExclusiveGuard<V>>,
    ) {
        let root_id = self
            .arena
            .allocate(Node::new_root(self.capacity, separator, left_id, right_id));
        let Some(left_guard) = finished.last_mut() else {
            panic!("root split without a retained latch");
        };
        left_guard.set_parent(Some(root_id));
        acquire_exclusive(&self.arena.node(right_id)).set_parent(Some(root_id));
        self.root.store(root_id.as_u32(), Ordering::Release);
        debug!(old_root = %left_id, new_root = %root_id, separator, "root grown");
    }

    /// Rewrites the parent link of every node moved into a new sibling.
    ///
    /// The chain node one level below (`held`) may be among the moved
    /// children; its latch is already ours (most recently retained in
    /// `finished`). Every other moved child is latched briefly for the
    /// one-field update, in parent-before-child order, so no cycle forms.
    fn relink_moved(
        &self,
        moved: &[NodeId],
        new_parent: NodeId,
        held: NodeId,
        finished: &mut Vec<ExclusiveGuard<V>>,
    ) {
        for &child_id in moved {
            if child_id == held {
                let Some(guard) = finished.last_mut() else {
                    panic!("retained chain empty during relink");
                };
                guard.set_parent(Some(new_parent));
            } else {
                acquire_exclusive(&self.arena.node(child_id)).set_parent(Some(new_parent));
            }
        }
    }

    /// True if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        let (_, guard) = self.latch_root_shared();
        guard.is_leaf() && guard.nkeys() == 0
    }

    /// Number of keys stored. Walks every leaf under shared latches;
    /// intended for tests and diagnostics rather than hot paths.
    pub fn len(&self) -> usize {
        let (_, root_guard) = self.latch_root_shared();
        let mut count = 0;
        let mut stack: Vec<(SharedGuard<V>, usize)> = vec![(root_guard, 0)];

        while let Some((guard, next)) = stack.last_mut() {
            if guard.is_leaf() {
                count += guard.nkeys();
                stack.pop();
                continue;
            }
            if *next == guard.children().len() {
                stack.pop();
                continue;
            }
            let child_id = guard.child_at(*next);
            *next += 1;
            let child = acquire_shared(&self.arena.node(child_id));
            stack.push((child, 0));
        }

        count
    }

    /// Walks the whole tree under shared latches and verifies structural
    /// invariants: uniform leaf depth, child counts, strictly increasing
    /// keys, separator bounds, minimum occupancy, parent back-links, and
    /// key uniqueness.
    pub fn check_invariants(&self) -> Result<()> {
        struct Frame<V> {
            id: NodeId,
            guard: SharedGuard<V>,
            next: usize,
            /// Exclusive lower bound inherited from ancestor separators.
            low: Option<i64>,
            /// Inclusive upper bound inherited from ancestor separators.
            high: Option<i64>,
            depth: usize,
        }

        let min_keys = self.order - 1;
        let (root_id, root_guard) = self.latch_root_shared();
        if root_guard.parent().is_some() {
            return Err(corrupt(format!("root {root_id} has a parent link")));
        }

        let mut seen: HashSet<i64> = HashSet::new();
        let mut leaf_depth: Option<usize> = None;
        let mut stack = vec![Frame {
            id: root_id,
            guard: root_guard,
            next: 0,
            low: None,
            high: None,
            depth: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next == 0 {
                let keys = frame.guard.keys();
                if !keys.windows(2).all(|pair| pair[0] < pair[1]) {
                    return Err(corrupt(format!(
                        "keys not strictly increasing in {}",
                        frame.id
                    )));
                }
                for &key in keys {
                    if frame.low.is_some_and(|low| key <= low)
                        || frame.high.is_some_and(|high| key > high)
                    {
                        return Err(corrupt(format!("key {key} out of bounds in {}", frame.id)));
                    }
                }
                if keys.len() > self.capacity {
                    return Err(corrupt(format!("{} overfull: {} keys", frame.id, keys.len())));
                }
                if frame.depth > 0 && keys.len() < min_keys {
                    return Err(corrupt(format!(
                        "{} underfull: {} keys",
                        frame.id,
                        keys.len()
                    )));
                }

                if frame.guard.is_leaf() {
                    match leaf_depth {
                        None => leaf_depth = Some(frame.depth),
                        Some(expected) if expected != frame.depth => {
                            return Err(corrupt(format!(
                                "leaf {} at depth {} (expected {expected})",
                                frame.id, frame.depth
                            )));
                        }
                        Some(_) => {}
                    }
                    for &key in keys {
                        if !seen.insert(key) {
                            return Err(corrupt(format!("key {key} appears twice")));
                        }
                    }
                } else {
                    if frame.guard.children().len() != keys.len() + 1 {
                        return Err(corrupt(format!(
                            "{}: {} keys but {} children",
                            frame.id,
                            keys.len(),
                            frame.guard.children().len()
                        )));
                    }
                    if keys.is_empty() {
                        return Err(corrupt(format!("internal {} has no keys", frame.id)));
                    }
                }
            }

            if frame.guard.is_leaf() || frame.next == frame.guard.children().len() {
                stack.pop();
                continue;
            }

            let index = frame.next;
            frame.next += 1;
            let child_id = frame.guard.child_at(index);
            let child_low = if index == 0 {
                frame.low
            } else {
                Some(frame.guard.keys()[index - 1])
            };
            let child_high = if index < frame.guard.nkeys() {
                Some(frame.guard.keys()[index])
            } else {
                frame.high
            };
            let parent_id = frame.id;
            let depth = frame.depth + 1;

            let child_guard = acquire_shared(&self.arena.node(child_id));
            if child_guard.parent() != Some(parent_id) {
                return Err(corrupt(format!(
                    "{child_id} parent link does not point to {parent_id}"
                )));
            }
            stack.push(Frame {
                id: child_id,
                guard: child_guard,
                next: 0,
                low: child_low,
                high: child_high,
                depth,
            });
        }

        Ok(())
    }
}

impl<V: Clone> BTreeIndex<V> {
    /// Point lookup: descends in shared mode with lock-coupling and returns
    /// a clone of the stored handle, if any.
    pub fn search(&self, key: i64) -> Option<V> {
        let (_, mut current) = self.latch_root_shared();
        while !current.is_leaf() {
            let child = acquire_shared(&self.arena.node(current.child_for(key)));
            // The old guard drops only now, after the child latch is held.
            current = child;
        }
        current
            .leaf_search(key)
            .map(|index| current.leaf_value(index).clone())
    }

    /// Status-form lookup: `KeyNotFound` instead of `None`.
    pub fn lookup(&self, key: i64) -> Result<V> {
        self.search(key).ok_or(ArborError::KeyNotFound)
    }
}

/// Position of `child` under `node`; a missing link is a broken tree and
/// fatal.
fn position_in<V>(node: &Node<V>, node_id: NodeId, child: NodeId) -> usize {
    match node.position_of_child(child) {
        Some(pos) => pos,
        None => panic!("child {child} not linked under {node_id}"),
    }
}

fn corrupt(message: String) -> ArborError {
    ArborError::TreeCorrupted(message)
}

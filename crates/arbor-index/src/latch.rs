//! Per-node reader/writer latches.
//!
//! Each node slot is an `Arc<RwLock<Node>>`. Guards are the arc-owning
//! flavor so a descent can carry them in its retained chain without
//! borrowing the arena.

use crate::node::Node;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};
use std::sync::Arc;

/// Shared handle to a latched node slot.
pub(crate) type NodeRef<V> = Arc<RwLock<Node<V>>>;

/// Guard for shared access; admits any number of concurrent holders.
pub(crate) type SharedGuard<V> = ArcRwLockReadGuard<RawRwLock, Node<V>>;

/// Guard for exclusive access; excludes readers and other writers.
pub(crate) type ExclusiveGuard<V> = ArcRwLockWriteGuard<RawRwLock, Node<V>>;

/// Acquires the node's latch in shared mode, blocking until admitted.
pub(crate) fn acquire_shared<V>(node: &NodeRef<V>) -> SharedGuard<V> {
    node.read_arc()
}

/// Acquires the node's latch in exclusive mode, blocking until admitted.
pub(crate) fn acquire_exclusive<V>(node: &NodeRef<V>) -> ExclusiveGuard<V> {
    node.write_arc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn leaf_ref() -> NodeRef<u64> {
        Arc::new(RwLock::new(Node::new_leaf(3, None)))
    }

    #[test]
    fn test_shared_admits_many() {
        let node = leaf_ref();
        let a = acquire_shared(&node);
        let b = acquire_shared(&node);
        assert_eq!(a.nkeys(), 0);
        assert_eq!(b.nkeys(), 0);
    }

    #[test]
    fn test_exclusive_excludes_shared() {
        let node = leaf_ref();
        let guard = acquire_exclusive(&node);
        assert!(node.try_read().is_none());
        drop(guard);
        assert!(node.try_read().is_some());
    }

    #[test]
    fn test_exclusive_waits_for_readers() {
        let node = leaf_ref();
        let released = Arc::new(AtomicBool::new(false));

        let reader = acquire_shared(&node);
        let writer = {
            let node = Arc::clone(&node);
            let released = Arc::clone(&released);
            std::thread::spawn(move || {
                let mut guard = acquire_exclusive(&node);
                // The reader must have released before we got here.
                assert!(released.load(Ordering::SeqCst));
                guard.leaf_insert(1, 10);
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        released.store(true, Ordering::SeqCst);
        drop(reader);

        writer.join().unwrap();
        assert_eq!(acquire_shared(&node).nkeys(), 1);
    }
}

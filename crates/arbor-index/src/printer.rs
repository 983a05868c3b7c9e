//! S-expression pretty-printer.
//!
//! Serializes the tree structure for debugging and property testing. A leaf
//! prints as `(k1 k2 ... kn)`; an internal node interleaves children and
//! separators as `(c0 k1 c1 ... kn cn)`, single spaces between adjacent
//! tokens. The empty tree prints as `()`.
//!
//! The traversal is iterative over an explicit frame stack. Each frame owns
//! the shared latch of its node, so the printer holds the current
//! root-to-node path in shared mode for the duration of that node's subtree
//! visit: writers in disjoint subtrees proceed, writers on the printed path
//! wait.

use crate::latch::{acquire_shared, SharedGuard};
use crate::tree::BTreeIndex;

struct Frame<V> {
    guard: SharedGuard<V>,
    /// Index of the next child to visit.
    next: usize,
}

/// Emits the node's opening token (and, for a leaf, its whole key run) and
/// returns its traversal frame.
fn open_frame<V>(guard: SharedGuard<V>, out: &mut String) -> Frame<V> {
    out.push('(');
    if guard.is_leaf() {
        let mut separator = "";
        for key in guard.keys() {
            out.push_str(separator);
            out.push_str(&key.to_string());
            separator = " ";
        }
    }
    Frame { guard, next: 0 }
}

impl<V> BTreeIndex<V> {
    /// Serializes the tree as an S-expression.
    pub fn print(&self) -> String {
        let mut out = String::new();
        let (_, root_guard) = self.latch_root_shared();
        let mut stack = vec![open_frame(root_guard, &mut out)];

        while let Some(frame) = stack.last_mut() {
            if frame.guard.is_leaf() || frame.next > frame.guard.nkeys() {
                out.push(')');
                stack.pop();
                continue;
            }

            if frame.next > 0 {
                // Separator between the previous child and the next one.
                out.push(' ');
                out.push_str(&frame.guard.keys()[frame.next - 1].to_string());
                out.push(' ');
            }

            let child_id = frame.guard.child_at(frame.next);
            frame.next += 1;
            let child_guard = acquire_shared(&self.arena().node(child_id));
            let child_frame = open_frame(child_guard, &mut out);
            stack.push(child_frame);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_prints_unit() {
        let tree: BTreeIndex<u64> = BTreeIndex::new(2).unwrap();
        assert_eq!(tree.print(), "()");
    }

    #[test]
    fn test_single_leaf() {
        let tree: BTreeIndex<u64> = BTreeIndex::new(2).unwrap();
        tree.insert(7, 0).unwrap();
        assert_eq!(tree.print(), "(7)");
        tree.insert(3, 0).unwrap();
        assert_eq!(tree.print(), "(3 7)");
    }

    #[test]
    fn test_internal_interleaves_children_and_keys() {
        let tree: BTreeIndex<u64> = BTreeIndex::new(2).unwrap();
        for key in 0..6 {
            tree.insert(key, 0).unwrap();
        }
        assert_eq!(tree.print(), "((0 1) 1 (2 3) 3 (4 5))");
    }

    #[test]
    fn test_two_level_nesting() {
        let tree: BTreeIndex<u64> = BTreeIndex::new(2).unwrap();
        for key in 0..10 {
            tree.insert(key, 0).unwrap();
        }
        assert_eq!(
            tree.print(),
            "(((0 1) 1 (2 3)) 3 ((4 5) 5 (6 7) 7 (8 9)))"
        );
    }

    #[test]
    fn test_negative_keys_format() {
        let tree: BTreeIndex<u64> = BTreeIndex::new(2).unwrap();
        for key in [-5, -1, 4] {
            tree.insert(key, 0).unwrap();
        }
        assert_eq!(tree.print(), "(-5 -1 4)");
    }
}

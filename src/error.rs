use thiserror::Error;

use crate::NodeHandle;

/// A structural fault found by [`AvlTree::check_invariants`](crate::AvlTree::check_invariants).
///
/// None of these can be produced through the public API; seeing one means the tree's internal
/// bookkeeping is corrupt and the tree should not be used further.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("root {root:?} has parent link {parent:?}")]
    RootHasParent {
        root: NodeHandle,
        parent: NodeHandle,
    },

    #[error("link to released node {0:?}")]
    Dangling(NodeHandle),

    #[error("child {child:?} of {node:?} links back to {found:?}")]
    ParentMismatch {
        node: NodeHandle,
        child: NodeHandle,
        found: Option<NodeHandle>,
    },

    #[error("node {node:?} stores height {stored}, expected {expected}")]
    Height {
        node: NodeHandle,
        stored: u32,
        expected: u32,
    },

    #[error("node {node:?} stores count {stored}, expected {expected}")]
    Count {
        node: NodeHandle,
        stored: usize,
        expected: usize,
    },

    #[error("node {node:?} has balance factor {factor}")]
    Unbalanced { node: NodeHandle, factor: i32 },

    #[error("key of node {node:?} is out of order")]
    OutOfOrder { node: NodeHandle },

    #[error("tree holds {len} nodes but its root counts {count}")]
    Len { len: usize, count: usize },
}

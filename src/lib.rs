//! An AVL tree with parent links and per-node subtree counts.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`; a missing child has height 0 and a leaf has
//   height 1.
// - The count of a node `x`, `c(x)`, is the number of nodes in the subtree rooted at `x`.
// - The balance factor of `x` is `h(right(x)) - h(left(x))`.
//
// The invariants of the tree, which hold between public calls:
// 1. `h(x) = 1 + max(h(left(x)), h(right(x)))`.
// 2. `c(x) = 1 + c(left(x)) + c(right(x))`.
// 3. Every balance factor is -1, 0 or 1.
// 4. The in-order key sequence is non-decreasing. New keys equal to an existing key descend to
//    its right, but rotations may later move equal keys to either side.
// 5. Every child links back to its parent, and the root has no parent.
//
// Corollary of (3): a node without a right child has at most one child, and that child is a leaf.

use core::{borrow::Borrow, cmp::Ordering, fmt, mem, ops::Not};
use std::collections::VecDeque;

use tracing::{debug, trace};

mod arena;
mod debug;
mod error;
mod iter;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

use arena::Arena;

pub use arena::NodeHandle;
pub use error::InvariantError;
pub use iter::{BreadthFirst, Iter};

/// A self-balancing binary search tree.
///
/// Equal keys are permitted and each insertion creates a distinct node. Every node is addressed by
/// a [`NodeHandle`], which stays valid until that node is removed, regardless of how the tree is
/// restructured in the meantime.
pub struct AvlTree<T> {
    root: Link,
    nodes: Arena<T>,
}

pub(crate) struct Node<T> {
    pub(crate) key: T,
    pub(crate) links: Links,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Links {
    parent: Link,
    children: [Link; 2],
    height: u32,
    count: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

type Link = Option<NodeHandle>;

/// A read-only view of a node in an [`AvlTree`].
pub struct NodeRef<'tree, T> {
    tree: &'tree AvlTree<T>,
    handle: NodeHandle,
    node: &'tree Node<T>,
}

impl<'tree, T> NodeRef<'tree, T> {
    /// Returns the handle of this node.
    #[inline]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Returns the key stored in this node.
    #[inline]
    pub fn key(&self) -> &'tree T {
        &self.node.key
    }

    /// Returns the height of the subtree rooted at this node. Leaves have height 1.
    #[inline]
    pub fn height(&self) -> u32 {
        self.node.links.height
    }

    /// Returns the number of nodes in the subtree rooted at this node, including itself.
    #[inline]
    pub fn count(&self) -> usize {
        self.node.links.count
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.node.links.parent()
    }

    #[inline]
    pub fn left(&self) -> Option<NodeHandle> {
        self.node.links.left()
    }

    #[inline]
    pub fn right(&self) -> Option<NodeHandle> {
        self.node.links.right()
    }

    /// Returns `h(right) - h(left)`, which is always -1, 0 or 1 between mutations.
    #[inline]
    pub fn balance_factor(&self) -> i32 {
        self.tree.balance_factor(self.handle)
    }

    /// Returns `true` if this node is the root of its tree.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("handle", &self.handle)
            .field("key", self.key())
            .field("height", &self.height())
            .field("count", &self.count())
            .finish()
    }
}

impl<T> AvlTree<T> {
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree {
            root: None,
            nodes: Arena::new(),
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        let empty = self.len() == 0;
        debug_assert_eq!(empty, self.root.is_none());
        empty
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the root node, or `None` if the tree is empty.
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Returns a read-only view of the node behind `handle`.
    ///
    /// Returns `None` if the node has been removed.
    pub fn node(&self, handle: NodeHandle) -> Option<NodeRef<'_, T>> {
        self.nodes
            .get(handle)
            .map(|node| NodeRef {
                tree: self,
                handle,
                node,
            })
    }

    /// Returns the key of the node behind `handle`.
    pub fn key(&self, handle: NodeHandle) -> Option<&T> {
        self.nodes.get(handle).map(|node| &node.key)
    }

    /// Returns `true` if `handle` refers to a node that is still in the tree.
    pub fn contains_node(&self, handle: NodeHandle) -> bool {
        self.nodes.contains(handle)
    }

    /// Returns the node holding the minimum key.
    ///
    /// If several nodes hold the minimum key, this is the first of them in order.
    pub fn min(&self) -> Option<NodeHandle> {
        self.root.map(|root| self.min_in_subtree(root).0)
    }

    /// Returns the node holding the maximum key.
    ///
    /// If several nodes hold the maximum key, this is the last of them in order.
    pub fn max(&self) -> Option<NodeHandle> {
        self.root.map(|root| self.max_in_subtree(root))
    }

    /// Returns the node that follows `node` in order.
    pub fn successor(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node)?;
        self.next_in(node, Dir::Right)
    }

    /// Returns the node that precedes `node` in order.
    pub fn predecessor(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node)?;
        self.next_in(node, Dir::Left)
    }

    /// Returns the node at in-order position `index`, counting from zero.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn select(&self, mut index: usize) -> Option<NodeHandle> {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            let links = self.links(cur);
            let left_count = self.count(links.left());

            match index.cmp(&left_count) {
                Ordering::Less => opt_cur = links.left(),
                Ordering::Equal => return Some(cur),
                Ordering::Greater => {
                    index -= left_count + 1;
                    opt_cur = links.right();
                }
            }
        }

        None
    }

    /// Returns the in-order position of `node`, counting from zero.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn position(&self, node: NodeHandle) -> Option<usize> {
        let mut position = self.count(self.nodes.get(node)?.links.left());
        let mut cur = node;

        // Every ancestor reached from its right subtree precedes `cur`, along with its left subtree.
        while let Some(parent) = self.links(cur).parent() {
            if self.which_child(parent, cur) == Dir::Right {
                position += self.count(self.links(parent).left()) + 1;
            }

            cur = parent;
        }

        Some(position)
    }

    /// Removes the node behind `node` from the tree.
    ///
    /// Returns `false`, leaving the tree untouched, if the node has already been removed. Handles to
    /// every other node remain valid.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove_at(&mut self, node: NodeHandle) -> bool {
        self.take(node).is_some()
    }

    /// Removes the node behind `node` from the tree and returns its key.
    ///
    /// Returns `None` if the node has already been removed.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn take(&mut self, node: NodeHandle) -> Option<T> {
        // There are two cases:
        //
        // 1. `node` has no right child.
        //
        //    By (3), its left child is missing or a leaf. The left child takes `node`'s place and
        //    every ancestor is rebalanced.
        //
        // 2. `node` has a right child.
        //
        //    `node`'s successor (the least node in its right subtree, which has no left child) is
        //    detached and its right child elevated to replace it. After rebalancing from the
        //    successor's old parent, the successor assumes `node`'s place, links, height and count.
        //    The successor keeps its own key, so handles to it stay valid.
        let links = self.nodes.get(node)?.links;

        match links.right() {
            None => {
                trace!(?node, "removing node with no right subtree");

                self.replace_child_or_set_root(links.parent(), node, links.left());
                self.maybe_set_parent(links.left(), links.parent());

                // A root without a right child is replaced by its sole leaf, which needs no
                // rebalancing.
                self.rebalance_from(links.parent());
            }

            Some(right) => {
                let (successor, successor_parent) = self.min_in_subtree(right);
                let successor_right = self.links(successor).right();

                // If the successor is `node`'s right child it is detached from `node` itself.
                let detached_from = successor_parent.unwrap_or(node);

                trace!(?node, ?successor, "removing node via successor");

                self.replace_child(detached_from, successor, successor_right);
                self.maybe_set_parent(successor_right, Some(detached_from));

                // The successor is out of the tree here, so rebalancing never touches it.
                self.rebalance_from(Some(detached_from));

                // Rotations above may have moved `node`, so read its links afresh.
                let current = self.links(node);

                self.replace_child_or_set_root(current.parent(), node, Some(successor));
                self.maybe_set_parent(current.left(), Some(successor));
                self.maybe_set_parent(current.right(), Some(successor));
                *self.links_mut(successor) = current;
            }
        }

        self.nodes.free(node).map(|removed| removed.key)
    }

    /// Removes and returns the minimum key of the tree.
    pub fn pop_first(&mut self) -> Option<T> {
        let first = self.min()?;
        self.take(first)
    }

    /// Removes and returns the maximum key of the tree.
    pub fn pop_last(&mut self) -> Option<T> {
        let last = self.max()?;
        self.take(last)
    }

    /// Clears the tree, removing all elements.
    ///
    /// Every outstanding handle becomes stale.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing tree");

        let mut queue = VecDeque::new();
        queue.extend(self.root.take());

        // Release every reachable node exactly once, in level order.
        while let Some(cur) = queue.pop_front() {
            let Some(node) = self.nodes.free(cur) else {
                unreachable!("tree link {cur:?} points at a released node");
            };

            queue.extend(node.links.left());
            queue.extend(node.links.right());
        }

        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    fn links(&self, node: NodeHandle) -> Links {
        self.nodes[node].links
    }

    #[inline]
    fn links_mut(&mut self, node: NodeHandle) -> &mut Links {
        &mut self.nodes[node].links
    }

    #[inline]
    fn height(&self, link: Link) -> u32 {
        link.map_or(0, |node| self.links(node).height)
    }

    #[inline]
    fn count(&self, link: Link) -> usize {
        link.map_or(0, |node| self.links(node).count)
    }

    #[inline]
    fn balance_factor(&self, node: NodeHandle) -> i32 {
        let links = self.links(node);
        self.height(links.right()) as i32 - self.height(links.left()) as i32
    }

    // Recomputes the height and count of `node` from its children.
    fn update(&mut self, node: NodeHandle) {
        let links = self.links(node);
        let height = 1 + self.height(links.left()).max(self.height(links.right()));
        let count = 1 + self.count(links.left()) + self.count(links.right());

        let links = self.links_mut(node);
        links.height = height;
        links.count = count;
    }

    // Refreshes the metadata of `node`, then restores its balance factor with one single or double
    // rotation if it has reached ±2.
    fn balance(&mut self, node: NodeHandle) {
        self.update(node);

        match self.balance_factor(node) {
            2 => {
                let right = self.child(node, Dir::Right);
                if self.balance_factor(right) < 0 {
                    self.rotate(right, Dir::Right);
                }

                self.rotate(node, Dir::Left);
            }

            -2 => {
                let left = self.child(node, Dir::Left);
                if self.balance_factor(left) > 0 {
                    self.rotate(left, Dir::Left);
                }

                self.rotate(node, Dir::Right);
            }

            _ => (),
        }
    }

    // Balances every node from `opt_node` up to the root.
    fn rebalance_from(&mut self, mut opt_node: Link) {
        while let Some(node) = opt_node {
            // Read the parent first: a rotation at `node` moves it below its former child, and
            // that child's metadata is refreshed by the rotation itself.
            opt_node = self.links(node).parent();
            self.balance(node);
        }
    }

    // Returns the `dir` child of a node that must have one.
    #[track_caller]
    fn child(&self, node: NodeHandle, dir: Dir) -> NodeHandle {
        match self.links(node).child(dir) {
            Some(child) => child,
            None => unreachable!("node {node:?} is heavy on a missing side ({dir:?})"),
        }
    }

    // Rotates `node` down in direction `dir`, raising its `!dir` child into its place.
    fn rotate(&mut self, node: NodeHandle, dir: Dir) {
        let up = self.child(node, !dir);
        self.rotate_at(node, up);
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // The heights and counts of `down`, `up` and the parent of both are recomputed.
    fn rotate_at(&mut self, down: NodeHandle, up: NodeHandle) {
        // - `down` becomes the `dir` child of `up`.
        // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
        let dir = if self.links(down).right() == Some(up) {
            Dir::Left
        } else {
            Dir::Right
        };

        trace!(?down, ?up, ?dir, "rotate");

        let across = self.links(up).child(dir);
        self.links_mut(down).set_child(!dir, across);
        self.maybe_set_parent(across, Some(down));

        self.links_mut(up).set_child(dir, Some(down));
        let parent = self.links_mut(down).set_parent(Some(up));
        self.links_mut(up).set_parent(parent);

        self.replace_child_or_set_root(parent, down, Some(up));

        self.update(down);
        self.update(up);
        if let Some(parent) = parent {
            self.update(parent);
        }
    }

    #[inline]
    fn maybe_set_parent(&mut self, opt_node: Link, parent: Link) {
        let Some(node) = opt_node else {
            return;
        };

        self.links_mut(node).set_parent(parent);
    }

    #[inline]
    fn replace_child_or_set_root(&mut self, parent: Link, old_child: NodeHandle, new_child: Link) {
        match parent {
            Some(parent) => self.replace_child(parent, old_child, new_child),
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    fn replace_child(&mut self, parent: NodeHandle, old_child: NodeHandle, new_child: Link) {
        let dir = self.which_child(parent, old_child);
        self.links_mut(parent).set_child(dir, new_child);
    }

    #[track_caller]
    fn which_child(&self, parent: NodeHandle, child: NodeHandle) -> Dir {
        let links = self.links(parent);

        if links.left() == Some(child) {
            Dir::Left
        } else {
            debug_assert_eq!(
                links.right(),
                Some(child),
                "`child` must be a child of `parent`"
            );
            Dir::Right
        }
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    fn min_in_subtree(&self, root: NodeHandle) -> (NodeHandle, Link) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = self.links(cur).left() {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    fn max_in_subtree(&self, root: NodeHandle) -> NodeHandle {
        let mut cur = root;

        while let Some(right) = self.links(cur).right() {
            cur = right;
        }

        cur
    }

    // Returns the in-order neighbor of `node` on the `dir` side.
    pub(crate) fn next_in(&self, node: NodeHandle, dir: Dir) -> Link {
        if let Some(child) = self.links(node).child(dir) {
            // Descend to the extreme of the `dir` subtree, toward `!dir`.
            let mut cur = child;
            while let Some(next) = self.links(cur).child(!dir) {
                cur = next;
            }

            return Some(cur);
        }

        // Climb until arriving from the `!dir` side.
        let mut cur = node;
        while let Some(parent) = self.links(cur).parent() {
            if self.which_child(parent, cur) == !dir {
                return Some(parent);
            }

            cur = parent;
        }

        None
    }
}

impl<T: Ord> AvlTree<T> {
    /// Inserts `key` into the tree, returning the handle of its new node.
    ///
    /// Keys equal to an existing key are not rejected; the new node is placed after them in order.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: T) -> NodeHandle {
        let Some(root) = self.root else {
            // Tree is empty. The new node becomes the root.
            let node = self.nodes.alloc(Node::new(key, None));
            self.root = Some(node);
            return node;
        };

        let mut parent = root;

        // Descend the tree, looking for an empty child slot.
        let dir = loop {
            let dir = if key < self.nodes[parent].key {
                Dir::Left
            } else {
                Dir::Right
            };

            match self.links(parent).child(dir) {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let node = self.nodes.alloc(Node::new(key, Some(parent)));
        self.links_mut(parent).set_child(dir, Some(node));

        self.rebalance_from(Some(parent));

        node
    }

    /// Returns the first node holding `key` found on the search path from the root.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeHandle>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;
            let links = self.links(cur);

            match key.cmp(self.nodes[cur].key.borrow()) {
                Ordering::Less => opt_cur = links.left(),
                Ordering::Equal => return Some(cur),
                Ordering::Greater => opt_cur = links.right(),
            }
        }
    }

    /// Returns `true` if the tree holds at least one node with `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Removes one node holding `key`, the same one [`find`](Self::find) would return.
    ///
    /// Returns `false` if no node holds `key`.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            Some(node) => self.remove_at(node),
            None => false,
        }
    }

    /// Checks every structural invariant of the tree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let Some(root) = self.root else {
            return match self.len() {
                0 => Ok(()),
                len => Err(InvariantError::Len { len, count: 0 }),
            };
        };

        let root_links = self.nodes.get(root).ok_or(InvariantError::Dangling(root))?.links;
        if let Some(parent) = root_links.parent() {
            return Err(InvariantError::RootHasParent { root, parent });
        }

        let (_, count) = self.check_invariants_at(root, None, None)?;
        if count != self.len() {
            return Err(InvariantError::Len {
                len: self.len(),
                count,
            });
        }

        Ok(())
    }

    /// Panics if any structural invariant of the tree is violated.
    #[track_caller]
    pub fn assert_invariants(&self) {
        if let Err(error) = self.check_invariants() {
            panic!("tree invariant violated: {error}");
        }
    }

    // Checks the subtree at `node`, whose keys must lie within `lower..=upper`, and returns its
    // actual height and count.
    fn check_invariants_at(
        &self,
        node: NodeHandle,
        lower: Option<&T>,
        upper: Option<&T>,
    ) -> Result<(u32, usize), InvariantError> {
        let Node { key, links } = self.nodes.get(node).ok_or(InvariantError::Dangling(node))?;

        if lower.is_some_and(|lower| key < lower) || upper.is_some_and(|upper| key > upper) {
            return Err(InvariantError::OutOfOrder { node });
        }

        let mut heights = [0; 2];
        let mut count = 1;

        for dir in [Dir::Left, Dir::Right] {
            let Some(child) = links.child(dir) else {
                continue;
            };

            // Ensure child's parent link points to this node.
            let found = self
                .nodes
                .get(child)
                .ok_or(InvariantError::Dangling(child))?
                .links
                .parent();
            if found != Some(node) {
                return Err(InvariantError::ParentMismatch { node, child, found });
            }

            let (child_height, child_count) = match dir {
                Dir::Left => self.check_invariants_at(child, lower, Some(key))?,
                Dir::Right => self.check_invariants_at(child, Some(key), upper)?,
            };

            heights[dir as usize] = child_height;
            count += child_count;
        }

        let height = 1 + heights[0].max(heights[1]);
        if links.height != height {
            return Err(InvariantError::Height {
                node,
                stored: links.height,
                expected: height,
            });
        }

        if links.count != count {
            return Err(InvariantError::Count {
                node,
                stored: links.count,
                expected: count,
            });
        }

        let factor = heights[1] as i32 - heights[0] as i32;
        if !(-1..=1).contains(&factor) {
            return Err(InvariantError::Unbalanced { node, factor });
        }

        Ok((height, count))
    }
}

impl<T> Default for AvlTree<T> {
    fn default() -> Self {
        AvlTree::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for AvlTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|node| node.key())).finish()
    }
}

impl<T: Ord> FromIterator<T> for AvlTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord> Extend<T> for AvlTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T> Node<T> {
    pub(crate) fn new(key: T, parent: Link) -> Node<T> {
        Node {
            key,
            links: Links::new(parent),
        }
    }
}

impl Links {
    #[must_use]
    const fn new(parent: Link) -> Self {
        Self {
            parent,
            children: [None; 2],
            height: 1,
            count: 1,
        }
    }

    #[inline]
    fn parent(&self) -> Link {
        self.parent
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link {
        self.children[dir as usize]
    }

    #[inline]
    fn left(&self) -> Link {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link) -> Link {
        mem::replace(&mut self.parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link) -> Link {
        mem::replace(&mut self.children[dir as usize], child)
    }
}

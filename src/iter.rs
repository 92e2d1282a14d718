use std::collections::VecDeque;

use crate::{AvlTree, Dir, Link, NodeHandle, NodeRef};

impl<T> AvlTree<T> {
    /// Returns an iterator over the nodes of the tree in key order.
    ///
    /// Nodes with equal keys are yielded in their order within the tree.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns an iterator over the nodes of the tree in level order.
    ///
    /// The root comes first, followed by each level from left to right.
    pub fn breadth_first(&self) -> BreadthFirst<'_, T> {
        BreadthFirst::new(self)
    }

    /// Returns the handles of every node of the tree in level order.
    pub fn breadth_first_nodes(&self) -> Vec<NodeHandle> {
        self.breadth_first().map(|node| node.handle()).collect()
    }
}

/// An in-order iterator over an [`AvlTree`], created by [`AvlTree::iter`].
pub struct Iter<'tree, T> {
    tree: &'tree AvlTree<T>,

    front: Link,
    back: Link,

    len: usize,
}

impl<'tree, T> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        Iter {
            tree,

            front: tree.min(),
            back: tree.max(),
            len: tree.len(),
        }
    }

    // Yields the node at `cur` and moves `cur` to its neighbor on the `dir` side.
    fn step(&mut self, dir: Dir) -> Option<NodeRef<'tree, T>> {
        if self.len == 0 {
            return None;
        }

        let cur = match dir {
            Dir::Right => &mut self.front,
            Dir::Left => &mut self.back,
        };

        let node = (*cur)?;
        *cur = self.tree.next_in(node, dir);
        self.len -= 1;

        self.tree.node(node)
    }
}

impl<'tree, T> Iterator for Iter<'tree, T> {
    type Item = NodeRef<'tree, T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step(Dir::Right)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.step(Dir::Left)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'tree, T> IntoIterator for &'tree AvlTree<T> {
    type Item = NodeRef<'tree, T>;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A level-order iterator over an [`AvlTree`], created by [`AvlTree::breadth_first`].
pub struct BreadthFirst<'tree, T> {
    tree: &'tree AvlTree<T>,
    queue: VecDeque<NodeHandle>,
}

impl<'tree, T> BreadthFirst<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        BreadthFirst {
            tree,
            queue: tree.root.into_iter().collect(),
        }
    }
}

impl<'tree, T> Iterator for BreadthFirst<'tree, T> {
    type Item = NodeRef<'tree, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.node(self.queue.pop_front()?)?;

        self.queue.extend(node.left());
        self.queue.extend(node.right());

        Some(node)
    }
}

use core::fmt;

use crate::Node;

/// A stable reference to a node of an [`AvlTree`](crate::AvlTree).
///
/// Handles survive rotations and the removal of other nodes. Once the node itself is removed, or
/// the tree is cleared, the handle goes stale and every lookup through it reports `None`.
///
/// A handle is only meaningful to the tree that issued it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

impl NodeHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Slot storage for tree nodes.
///
/// Freed slots are recycled through a free list with their generation bumped, so a recycled slot
/// never answers to a handle issued for its previous occupant.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Arena<T> {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn alloc(&mut self, node: Node<T>) -> NodeHandle {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.node.is_none());
            slot.node = Some(node);

            return NodeHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("node arena exhausted");
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });

        NodeHandle {
            index,
            generation: 0,
        }
    }

    /// Releases the node behind `handle`, returning it if the handle was live.
    pub(crate) fn free(&mut self, handle: NodeHandle) -> Option<Node<T>> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }

        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;

        Some(node)
    }

    #[inline]
    pub(crate) fn get(&self, handle: NodeHandle) -> Option<&Node<T>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    #[inline]
    pub(crate) fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }
}

impl<T> core::ops::Index<NodeHandle> for Arena<T> {
    type Output = Node<T>;

    #[track_caller]
    fn index(&self, handle: NodeHandle) -> &Node<T> {
        match self.get(handle) {
            Some(node) => node,
            None => panic!("tree link {handle:?} points at a released node"),
        }
    }
}

impl<T> core::ops::IndexMut<NodeHandle> for Arena<T> {
    #[track_caller]
    fn index_mut(&mut self, handle: NodeHandle) -> &mut Node<T> {
        match self.get_mut(handle) {
            Some(node) => node,
            None => panic!("tree link {handle:?} points at a released node"),
        }
    }
}

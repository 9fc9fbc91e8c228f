//! Generation-checked node arena.
//!
//! Parent links and child lists are handles into this arena, so the tree has a
//! single owner and no reference cycles. Freed slots bump their generation;
//! handles minted before the free no longer resolve.

use crate::model::node::Node;

/// Opaque, copyable reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Storage for every realized node of one tree.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Stores a detached node and returns its handle.
    pub fn insert(&mut self, node: Node) -> NodeHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Appends `node` to `parent`'s children and links its back-reference.
    ///
    /// Returns `None` without storing anything when `parent` is stale.
    pub fn add_child(&mut self, parent: NodeHandle, mut node: Node) -> Option<NodeHandle> {
        if !self.contains(parent) {
            return None;
        }
        node.parent = Some(parent);
        let child = self.insert(node);
        self.get_mut(parent)?.children.push(child);
        Some(child)
    }

    /// Position of `handle` within its parent's children.
    ///
    /// `None` for the root, for stale handles, and for nodes missing from
    /// their parent's sequence.
    pub fn row_of(&self, handle: NodeHandle) -> Option<usize> {
        let parent = self.get(self.get(handle)?.parent?)?;
        parent.children.iter().position(|child| *child == handle)
    }

    /// Drops every descendant of `handle` and marks it unfetched.
    ///
    /// Returns the number of nodes released.
    pub fn clear_children(&mut self, handle: NodeHandle) -> usize {
        let Some(node) = self.get_mut(handle) else {
            return 0;
        };
        node.is_fetched = false;
        let mut pending = std::mem::take(&mut node.children);

        let mut released = 0;
        while let Some(child) = pending.pop() {
            if let Some(node) = self.release(child) {
                pending.extend(node.children);
                released += 1;
            }
        }
        released
    }

    fn release(&mut self, handle: NodeHandle) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(node)
    }
}

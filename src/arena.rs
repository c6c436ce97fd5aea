//! Linear slot arena for quadtree nodes.
//!
//! Tree nodes all share one lifetime: a single call to the force kernel. The
//! arena exploits that by handing out pre-allocated slots with a cursor
//! increment and releasing the whole tree with a cursor rewind. Nodes refer to
//! each other through [`NodeId`] indices instead of machine pointers, which
//! halves the child-link footprint on 64-bit targets and keeps nodes
//! contiguous in insertion order.

use crate::errors::SimError;
use crate::quadtree::TreeNode;

/// Handle to a node slot inside a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel for an absent child slot.
    pub const NIL: NodeId = NodeId(u32::MAX);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        NodeId(index as u32)
    }

    /// Returns true for the absent-child sentinel.
    #[inline]
    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bump arena of tree nodes.
///
/// A fixed block of `capacity` slots plus a `used` cursor. [`reset`] is O(1)
/// and does not touch memory: the builder fully initialises every slot it
/// allocates before the slot is ever read. Overrunning the capacity surfaces
/// [`SimError::ArenaExhausted`] rather than silently truncating the tree.
///
/// [`reset`]: NodeArena::reset
///
/// # Examples
///
/// ```
/// use galaxy_sim::arena::NodeArena;
/// use galaxy_sim::quadtree::{Bounds, TreeNode};
///
/// let mut arena = NodeArena::with_capacity(8);
/// let bounds = Bounds { x_min: 0.0, x_max: 1.0, y_min: 0.0, y_max: 1.0 };
/// let id = arena.alloc(TreeNode::leaf(bounds, 0, 1.0, 0.5, 0.5)).unwrap();
/// assert_eq!(arena.used(), 1);
/// assert_eq!(arena.node(id).mass, 1.0);
///
/// arena.reset();
/// assert_eq!(arena.used(), 0);
/// ```
pub struct NodeArena {
    nodes: Vec<TreeNode>,
    used: usize,
}

impl NodeArena {
    /// Creates an arena with `capacity` node slots. The driver sizes this as
    /// a small multiple of the particle count; 10 slots per particle covers
    /// non-pathological distributions.
    pub fn with_capacity(capacity: usize) -> Self {
        NodeArena {
            nodes: vec![TreeNode::unused(); capacity],
            used: 0,
        }
    }

    /// Releases every node at once by rewinding the cursor.
    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Claims the next slot and initialises it with `node`.
    #[inline]
    pub fn alloc(&mut self, node: TreeNode) -> Result<NodeId, SimError> {
        if self.used == self.nodes.len() {
            return Err(SimError::ArenaExhausted {
                capacity: self.nodes.len(),
            });
        }
        let id = NodeId::new(self.used);
        self.nodes[self.used] = node;
        self.used += 1;
        Ok(id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// Number of slots currently handed out.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }
}

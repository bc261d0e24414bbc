use super::LEAF_NODE_LEVEL;
use crate::LeafGrid;
use std::fmt;

/// Location of a node within the table of its level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(super) struct NodeIdx(pub(super) u32);

impl NodeIdx {
    /// Every level keeps its blank square at index 0.
    pub(super) const BLANK: Self = NodeIdx(0);
}

/// Canonical handle of a square of `2^level x 2^level` cells.
///
/// Handles are issued by a [`Universe`](super::Universe) and are only
/// meaningful there. Within one universe two handles are equal if and only if
/// their squares have equal contents, so comparing squares of any size is a
/// comparison of two integers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Macrocell {
    level: u32,
    idx: NodeIdx,
}

impl Macrocell {
    pub(super) fn new(level: u32, idx: NodeIdx) -> Self {
        debug_assert!(level >= LEAF_NODE_LEVEL);
        Self { level, idx }
    }

    pub(super) fn idx(self) -> NodeIdx {
        self.idx
    }

    /// Depth in the quadtree: the square spans `2^level` cells per side.
    pub fn level(self) -> u32 {
        self.level
    }

    /// True for 16x16 squares, which are made of four [`LeafGrid`]s.
    pub fn is_leaf(self) -> bool {
        self.level == LEAF_NODE_LEVEL
    }

    /// True for squares made of four smaller macrocells.
    pub fn is_node(self) -> bool {
        self.level > LEAF_NODE_LEVEL
    }

    /// True if all cells are dead.
    pub fn is_blank(self) -> bool {
        self.idx == NodeIdx::BLANK
    }
}

impl fmt::Debug for Macrocell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Macrocell(2^{} #{})", self.level, self.idx.0)
    }
}

/// Quadrants of a macrocell, `[nw, ne, sw, se]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    /// Quadrants of a 16x16 square.
    Leaf([LeafGrid; 4]),
    /// Quadrants of a larger square, one level below it.
    Branch([Macrocell; 4]),
}

/// A record that can be deduplicated by a layer of the memory manager.
pub(super) trait Canonical {
    type Key: Copy + Eq;

    fn key(&self) -> Self::Key;

    /// Fast yet effective hash function for indexing the hashtable chains.
    fn hash(key: &Self::Key) -> usize;

    /// A fresh record with nothing cached.
    fn from_key(key: Self::Key) -> Self;

    /// The record of the blank square, stored at index 0.
    fn blank() -> Self;
}

/// Distinct multipliers per quadrant, so that permutations of the same
/// quadrants land in different chains.
fn combine([nw, ne, sw, se]: [u32; 4]) -> usize {
    let h = 0u32
        .wrapping_add(nw.wrapping_mul(5))
        .wrapping_add(ne.wrapping_mul(17))
        .wrapping_add(sw.wrapping_mul(257))
        .wrapping_add(se.wrapping_mul(65537));
    h.wrapping_add(h.rotate_right(11)) as usize
}

/// A 16x16 square.
#[derive(Clone, Debug, Default)]
pub(super) struct LeafNode {
    pub(super) grids: [LeafGrid; 4],
    /// centered 8x8, one generation ahead
    pub(super) step: Option<LeafGrid>,
    /// centered 8x8, four generations ahead
    pub(super) future: Option<LeafGrid>,
}

impl Canonical for LeafNode {
    type Key = [LeafGrid; 4];

    fn key(&self) -> Self::Key {
        self.grids
    }

    fn hash(key: &Self::Key) -> usize {
        combine(key.map(|g| (g.bits() ^ (g.bits() >> 32)) as u32))
    }

    fn from_key(grids: Self::Key) -> Self {
        Self {
            grids,
            ..Default::default()
        }
    }

    fn blank() -> Self {
        Self {
            grids: [LeafGrid::EMPTY; 4],
            step: Some(LeafGrid::EMPTY),
            future: Some(LeafGrid::EMPTY),
        }
    }
}

/// A square of level 5 or more; its parts live one level below.
#[derive(Clone, Debug, Default)]
pub(super) struct BranchNode {
    pub(super) parts: [NodeIdx; 4],
    /// centered half, one generation ahead
    pub(super) step: Option<NodeIdx>,
    /// centered half, `2^(level - 2)` generations ahead
    pub(super) future: Option<NodeIdx>,
}

impl Canonical for BranchNode {
    type Key = [NodeIdx; 4];

    fn key(&self) -> Self::Key {
        self.parts
    }

    fn hash(key: &Self::Key) -> usize {
        combine(key.map(|idx| idx.0))
    }

    fn from_key(parts: Self::Key) -> Self {
        Self {
            parts,
            ..Default::default()
        }
    }

    fn blank() -> Self {
        Self {
            parts: [NodeIdx::BLANK; 4],
            step: Some(NodeIdx::BLANK),
            future: Some(NodeIdx::BLANK),
        }
    }
}

use super::{BranchNode, Canonical, LeafNode, NodeIdx, LEAF_NODE_LEVEL};

/// Growable hashtable with linked list chains, one per quadtree level.
///
/// - Records are stored contiguously and never move to another index,
///   so a [`NodeIdx`] stays valid for the lifetime of the layer
/// - Index 0 is reserved for the blank square and doubles as the chain terminator
/// - The chain table doubles when the load factor exceeds 1.0
///
/// # Panics
///
/// Panics on running out of indexes (when the number of records exceeds
/// the maximum value of NodeIdx).
pub(super) struct Layer<N> {
    chains: Vec<NodeIdx>,
    storage: Vec<Slot<N>>,
}

struct Slot<N> {
    node: N,
    /// next record in the chain
    next: NodeIdx,
}

impl<N: Canonical> Layer<N> {
    const INITIAL_CAPACITY_LOG2: u32 = 4;

    fn new() -> Self {
        Self {
            chains: vec![NodeIdx::BLANK; 1 << Self::INITIAL_CAPACITY_LOG2],
            storage: vec![Slot {
                node: N::blank(),
                next: NodeIdx::BLANK,
            }],
        }
    }

    fn get(&self, idx: NodeIdx) -> &N {
        &self.storage[idx.0 as usize].node
    }

    fn get_mut(&mut self, idx: NodeIdx) -> &mut N {
        &mut self.storage[idx.0 as usize].node
    }

    /// Find a record with the given key; if it is not present, it is created.
    /// Returns its index.
    fn find_or_create(&mut self, key: N::Key) -> NodeIdx {
        if key == self.storage[0].node.key() {
            return NodeIdx::BLANK;
        }

        let i = N::hash(&key) & (self.chains.len() - 1);
        let mut curr = self.chains[i];
        // search for the record in the linked list
        while curr != NodeIdx::BLANK {
            let slot = &self.storage[curr.0 as usize];
            if slot.node.key() == key {
                return curr;
            }
            curr = slot.next;
        }

        let idx = NodeIdx(
            self.storage
                .len()
                .try_into()
                .expect("Ran out of u32 indices"),
        );
        self.storage.push(Slot {
            node: N::from_key(key),
            next: self.chains[i],
        });
        self.chains[i] = idx;
        if self.storage.len() > self.chains.len() {
            self.rehash();
        }
        idx
    }

    fn rehash(&mut self) {
        let new_size = self.chains.len() * 2;
        let mut new_chains = vec![NodeIdx::BLANK; new_size];
        for &chain in &self.chains {
            let mut curr = chain;
            while curr != NodeIdx::BLANK {
                let slot = &mut self.storage[curr.0 as usize];
                let next = slot.next;
                let index = N::hash(&slot.node.key()) & (new_size - 1);
                slot.next = new_chains[index];
                new_chains[index] = curr;
                curr = next;
            }
        }
        self.chains = new_chains;
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn bytes_total(&self) -> usize {
        self.storage.capacity() * std::mem::size_of::<Slot<N>>()
            + self.chains.capacity() * std::mem::size_of::<NodeIdx>()
    }
}

/// Stores the nodes of the quadtree, level by level.
///
/// Nothing is ever removed: every node lives as long as the manager.
pub(super) struct MemoryManager {
    leaves: Layer<LeafNode>,
    /// `branches[i]` holds the nodes of level `LEAF_NODE_LEVEL + 1 + i`
    branches: Vec<Layer<BranchNode>>,
}

impl MemoryManager {
    pub(super) fn new() -> Self {
        Self {
            leaves: Layer::new(),
            branches: vec![],
        }
    }

    fn branch_layer(level: u32) -> usize {
        assert!(level > LEAF_NODE_LEVEL, "level {level} has no branch nodes");
        (level - LEAF_NODE_LEVEL - 1) as usize
    }

    /// Makes sure the table of `level` exists.
    pub(super) fn reserve_level(&mut self, level: u32) {
        let i = Self::branch_layer(level);
        while self.branches.len() <= i {
            self.branches.push(Layer::new());
        }
    }

    pub(super) fn leaf(&self, idx: NodeIdx) -> &LeafNode {
        self.leaves.get(idx)
    }

    pub(super) fn leaf_mut(&mut self, idx: NodeIdx) -> &mut LeafNode {
        self.leaves.get_mut(idx)
    }

    pub(super) fn branch(&self, level: u32, idx: NodeIdx) -> &BranchNode {
        self.branches[Self::branch_layer(level)].get(idx)
    }

    pub(super) fn branch_mut(&mut self, level: u32, idx: NodeIdx) -> &mut BranchNode {
        self.branches[Self::branch_layer(level)].get_mut(idx)
    }

    /// Find a 16x16 node with the given quadrants.
    /// If the node is not found, it is created.
    pub(super) fn find_or_create_leaf(&mut self, grids: [crate::LeafGrid; 4]) -> NodeIdx {
        self.leaves.find_or_create(grids)
    }

    /// Find a node of `level` with the given parts (all of `level - 1`).
    /// If the node is not found, it is created.
    pub(super) fn find_or_create_branch(&mut self, level: u32, parts: [NodeIdx; 4]) -> NodeIdx {
        self.reserve_level(level);
        self.branches[Self::branch_layer(level)].find_or_create(parts)
    }

    /// Number of stored nodes per level, starting from `LEAF_NODE_LEVEL`.
    pub(super) fn lens(&self) -> Vec<usize> {
        std::iter::once(self.leaves.len())
            .chain(self.branches.iter().map(Layer::len))
            .collect()
    }

    pub(super) fn bytes_total(&self) -> usize {
        self.leaves.bytes_total() + self.branches.iter().map(Layer::bytes_total).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeafGrid;

    #[test]
    fn test_find_or_create_is_idempotent() {
        let mut mem = MemoryManager::new();
        let g = LeafGrid::from_bits(0xff00);
        let a = mem.find_or_create_leaf([g, LeafGrid::EMPTY, LeafGrid::EMPTY, g]);
        let b = mem.find_or_create_leaf([g, LeafGrid::EMPTY, LeafGrid::EMPTY, g]);
        assert_eq!(a, b);
        assert_ne!(a, NodeIdx::BLANK);
        assert_eq!(mem.lens(), vec![2]);

        let c = mem.find_or_create_leaf([LeafGrid::EMPTY, g, LeafGrid::EMPTY, g]);
        assert_ne!(a, c);
        assert_eq!(mem.lens(), vec![3]);
    }

    #[test]
    fn test_blank_is_reserved() {
        let mut mem = MemoryManager::new();
        assert_eq!(mem.find_or_create_leaf([LeafGrid::EMPTY; 4]), NodeIdx::BLANK);
        let level = LEAF_NODE_LEVEL + 3;
        assert_eq!(
            mem.find_or_create_branch(level, [NodeIdx::BLANK; 4]),
            NodeIdx::BLANK
        );
        assert_eq!(mem.branch(level, NodeIdx::BLANK).future, Some(NodeIdx::BLANK));
        assert_eq!(mem.lens(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_survives_rehashing() {
        let mut mem = MemoryManager::new();
        let level = LEAF_NODE_LEVEL + 1;
        let key = |i: u32| [NodeIdx(i), NodeIdx(0), NodeIdx(i / 2), NodeIdx(7)];
        let created: Vec<NodeIdx> = (1..5000u32)
            .map(|i| mem.find_or_create_branch(level, key(i)))
            .collect();
        for (i, &idx) in (1..5000u32).zip(created.iter()) {
            let again = mem.find_or_create_branch(level, key(i));
            assert_eq!(again, idx);
            assert_eq!(mem.branch(level, idx).parts[0], NodeIdx(i));
        }
        assert_eq!(mem.lens()[1], 5000);
    }
}

//! Gosper's recursive evolution of canonical squares.
//!
//! A square of level `n` determines the centered square of level `n - 1` for
//! up to `2^(n - 2)` generations. Results are memoized per canonical node, so a
//! subpattern that appears many times (in space or in time) is evolved once.

use super::{Macrocell, Universe, LEAF_NODE_LEVEL};
use crate::leaf::square_advance;
use crate::LeafGrid;

/// Indices of the 2x2 blocks of a 3x3 arrangement, row by row.
const OVERLAPPING: [[usize; 4]; 4] = [[0, 1, 3, 4], [1, 2, 4, 5], [3, 4, 6, 7], [4, 5, 7, 8]];

/// Rearranges the quadrants of the quadrants into a 4x4 array, row by row.
fn arrange<T: Copy>(quadrants: [[T; 4]; 4]) -> [[T; 4]; 4] {
    std::array::from_fn(|i| {
        std::array::from_fn(|j| quadrants[i / 2 * 2 + j / 2][i % 2 * 2 + j % 2])
    })
}

impl Universe {
    /// Centered 8x8 region of a 16x16 square four generations ahead.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not a leaf node.
    pub fn leaf_future(&mut self, m: Macrocell) -> LeafGrid {
        assert!(m.is_leaf(), "leaf_future is defined for 16x16 squares, got {m:?}");
        self.leaf_advance(m, 2)
    }

    /// Centered 8x8 region of a 16x16 square one generation ahead.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not a leaf node.
    pub fn leaf_step(&mut self, m: Macrocell) -> LeafGrid {
        assert!(m.is_leaf(), "leaf_step is defined for 16x16 squares, got {m:?}");
        self.leaf_advance(m, 0)
    }

    /// Centered half of `m`, `2^(level - 2)` generations ahead.
    ///
    /// # Panics
    ///
    /// Panics if `m` is a leaf node (use [`Universe::leaf_future`]).
    pub fn future(&mut self, m: Macrocell) -> Macrocell {
        assert!(m.is_node(), "future of a leaf node is a leaf grid, got {m:?}");
        self.advance(m, m.level() - 2)
    }

    /// Centered half of `m`, one generation ahead.
    ///
    /// # Panics
    ///
    /// Panics if `m` is a leaf node (use [`Universe::leaf_step`]).
    pub fn step(&mut self, m: Macrocell) -> Macrocell {
        assert!(m.is_node(), "step of a leaf node is a leaf grid, got {m:?}");
        self.advance(m, 0)
    }

    /// Centered half of `m`, `2^generations_log2` generations ahead.
    ///
    /// # Panics
    ///
    /// Panics if `m` is a leaf node or `generations_log2 > m.level() - 2`.
    pub fn advance(&mut self, m: Macrocell, generations_log2: u32) -> Macrocell {
        assert!(m.is_node(), "{m:?} has no centered macrocell");
        let level = m.level();
        assert!(
            generations_log2 + 2 <= level,
            "{m:?} determines at most 2^{} generations, requested 2^{}",
            level - 2,
            generations_log2
        );
        if m.is_blank() {
            return self.blank(level - 1);
        }

        let both_stages = generations_log2 + 2 == level;
        let n = self.mem.branch(level, m.idx());
        let cached = if both_stages {
            n.future.map(|idx| Macrocell::new(level - 1, idx))
        } else if generations_log2 == 0 {
            n.step.map(|idx| Macrocell::new(level - 1, idx))
        } else {
            self.jumps.get(&(m, generations_log2)).copied()
        };
        if let Some(result) = cached {
            return result;
        }

        let result = if level == LEAF_NODE_LEVEL + 1 {
            self.advance_leaf_parent(m, generations_log2, both_stages)
        } else {
            self.advance_branch(m, generations_log2, both_stages)
        };

        let n = self.mem.branch_mut(level, m.idx());
        if both_stages {
            n.future = Some(result.idx());
        } else if generations_log2 == 0 {
            n.step = Some(result.idx());
        } else {
            self.jumps.insert((m, generations_log2), result);
        }
        result
    }

    /// `generations_log2` must not exceed 2; 1 is not cached.
    fn leaf_advance(&mut self, m: Macrocell, generations_log2: u32) -> LeafGrid {
        let n = self.mem.leaf(m.idx());
        let cached = match generations_log2 {
            0 => n.step,
            2 => n.future,
            _ => None,
        };
        if let Some(grid) = cached {
            return grid;
        }

        let grid = square_advance(n.grids, generations_log2);
        let n = self.mem.leaf_mut(m.idx());
        match generations_log2 {
            0 => n.step = Some(grid),
            2 => n.future = Some(grid),
            _ => {}
        }
        grid
    }

    /// `m` is a 32x32 square: its grandchildren are leaf grids.
    fn advance_leaf_parent(
        &mut self,
        m: Macrocell,
        generations_log2: u32,
        both_stages: bool,
    ) -> Macrocell {
        let g = arrange(self.children(m).map(|c| self.grids(c)));

        // First stage: nine 8x8 grids, offset by 8 cells from each other
        let t: [LeafGrid; 9] = std::array::from_fn(|r| {
            let (i, j) = (r / 3, r % 3);
            let region = [g[i][j], g[i][j + 1], g[i + 1][j], g[i + 1][j + 1]];
            if both_stages {
                let [nw, ne, sw, se] = region;
                let leaf = self.leaf(nw, ne, sw, se);
                self.leaf_advance(leaf, generations_log2 - 1)
            } else {
                LeafGrid::center(region[0], region[1], region[2], region[3])
            }
        });

        // Second stage
        let k = if both_stages { generations_log2 - 1 } else { generations_log2 };
        let [nw, ne, sw, se] = OVERLAPPING.map(|[a, b, c, d]| {
            let leaf = self.leaf(t[a], t[b], t[c], t[d]);
            self.leaf_advance(leaf, k)
        });
        self.leaf(nw, ne, sw, se)
    }

    /// `m` is at least 64x64: its grandchildren are macrocells.
    fn advance_branch(
        &mut self,
        m: Macrocell,
        generations_log2: u32,
        both_stages: bool,
    ) -> Macrocell {
        let g = arrange(self.children(m).map(|c| self.children(c)));

        // First stage
        let t: [Macrocell; 9] = std::array::from_fn(|r| {
            let (i, j) = (r / 3, r % 3);
            let region = [g[i][j], g[i][j + 1], g[i + 1][j], g[i + 1][j + 1]];
            if both_stages {
                let [nw, ne, sw, se] = region;
                let node = self.node(nw, ne, sw, se);
                self.advance(node, generations_log2 - 1)
            } else {
                self.center_of(region)
            }
        });

        // Second stage
        let k = if both_stages { generations_log2 - 1 } else { generations_log2 };
        let [nw, ne, sw, se] = OVERLAPPING.map(|[a, b, c, d]| {
            let node = self.node(t[a], t[b], t[c], t[d]);
            self.advance(node, k)
        });
        self.node(nw, ne, sw, se)
    }
}

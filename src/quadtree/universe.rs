use super::{Macrocell, MemoryManager, Node, NodeIdx, LEAF_NODE_LEVEL, LEAF_SIZE_LOG2};
use crate::{LeafGrid, Pattern};
use ahash::AHashMap as HashMap;
use anyhow::{anyhow, Result};
use num_bigint::BigInt;

/// Owner of a canonical quadtree.
///
/// Every [`Macrocell`] is issued by a universe and stays valid for as long as
/// the universe lives: nodes are never evicted. Squares are built bottom-up
/// with [`Universe::leaf`] and [`Universe::node`], and equal squares always get
/// equal handles.
///
/// Evolution lives in the `gosper` module: [`Universe::future`],
/// [`Universe::step`] and [`Universe::advance`].
pub struct Universe {
    pub(super) mem: MemoryManager,
    /// results of [`Universe::advance`] that are neither a step nor a future
    pub(super) jumps: HashMap<(Macrocell, u32), Macrocell>,
}

impl Universe {
    pub fn new() -> Self {
        Self {
            mem: MemoryManager::new(),
            jumps: HashMap::new(),
        }
    }

    /// Canonical 16x16 square made of four 8x8 grids.
    pub fn leaf(&mut self, nw: LeafGrid, ne: LeafGrid, sw: LeafGrid, se: LeafGrid) -> Macrocell {
        let idx = self.mem.find_or_create_leaf([nw, ne, sw, se]);
        Macrocell::new(LEAF_NODE_LEVEL, idx)
    }

    /// Canonical square made of four macrocells of the same level.
    ///
    /// # Panics
    ///
    /// Panics if the levels of the parts differ.
    pub fn node(
        &mut self,
        nw: Macrocell,
        ne: Macrocell,
        sw: Macrocell,
        se: Macrocell,
    ) -> Macrocell {
        let level = nw.level();
        assert!(
            [ne, sw, se].iter().all(|m| m.level() == level),
            "parts of a node must share a level: {nw:?} {ne:?} {sw:?} {se:?}"
        );
        let idx = self
            .mem
            .find_or_create_branch(level + 1, [nw.idx(), ne.idx(), sw.idx(), se.idx()]);
        Macrocell::new(level + 1, idx)
    }

    /// Inverse of [`Universe::expand`].
    pub fn find_or_create(&mut self, node: Node) -> Macrocell {
        match node {
            Node::Leaf([nw, ne, sw, se]) => self.leaf(nw, ne, sw, se),
            Node::Branch([nw, ne, sw, se]) => self.node(nw, ne, sw, se),
        }
    }

    /// The all-dead square of `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is below the leaf node level (4).
    pub fn blank(&mut self, level: u32) -> Macrocell {
        assert!(
            level >= LEAF_NODE_LEVEL,
            "squares smaller than 2^{LEAF_NODE_LEVEL} are leaf grids"
        );
        if level > LEAF_NODE_LEVEL {
            self.mem.reserve_level(level);
        }
        Macrocell::new(level, NodeIdx::BLANK)
    }

    /// Quadrants of a macrocell.
    pub fn expand(&self, m: Macrocell) -> Node {
        if m.is_leaf() {
            Node::Leaf(self.grids(m))
        } else {
            Node::Branch(self.children(m))
        }
    }

    /// Quadrants of a 16x16 square.
    pub(crate) fn grids(&self, m: Macrocell) -> [LeafGrid; 4] {
        assert!(m.is_leaf(), "{m:?} is not a leaf node");
        self.mem.leaf(m.idx()).grids
    }

    /// Quadrants of a square of level 5 or more.
    pub(crate) fn children(&self, m: Macrocell) -> [Macrocell; 4] {
        assert!(m.is_node(), "{m:?} has no child macrocells");
        self.mem
            .branch(m.level(), m.idx())
            .parts
            .map(|idx| Macrocell::new(m.level() - 1, idx))
    }

    /// The square centered on the common corner of four adjacent squares;
    /// it has the same level as the parts.
    pub(crate) fn center_of(&mut self, [nw, ne, sw, se]: [Macrocell; 4]) -> Macrocell {
        if nw.is_leaf() {
            let [nw, ne, sw, se] = [nw, ne, sw, se].map(|m| self.grids(m));
            self.leaf(nw[3], ne[2], sw[1], se[0])
        } else {
            let [nw, ne, sw, se] = [nw, ne, sw, se].map(|m| self.children(m));
            self.node(nw[3], ne[2], sw[1], se[0])
        }
    }

    /// State of the cell `(x, y)` relative to the north-west corner of `m`.
    ///
    /// Only the north-west `2^64 x 2^64` part of a larger square is addressable.
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside of the square.
    pub fn alive(&self, m: Macrocell, x: u64, y: u64) -> bool {
        if m.level() < u64::BITS {
            let side = 1u64 << m.level();
            assert!(x < side && y < side, "cell ({x}, {y}) is outside of {m:?}");
        }
        let (mut m, mut x, mut y) = (m, x, y);
        while m.is_node() {
            if m.is_blank() {
                return false;
            }
            let half_log2 = m.level() - 1;
            let (east, south) = if half_log2 < u64::BITS {
                (x >> half_log2 != 0, y >> half_log2 != 0)
            } else {
                (false, false)
            };
            m = self.children(m)[(south as usize) << 1 | east as usize];
            if east {
                x -= 1 << half_log2;
            }
            if south {
                y -= 1 << half_log2;
            }
        }
        let half = 1 << LEAF_SIZE_LOG2;
        let grid = self.grids(m)[((y >= half) as usize) << 1 | (x >= half) as usize];
        grid.alive((x % half) as usize, (y % half) as usize)
    }

    /// Number of alive cells.
    pub fn population(&self, m: Macrocell) -> BigInt {
        fn inner(
            universe: &Universe,
            m: Macrocell,
            cache: &mut HashMap<Macrocell, BigInt>,
        ) -> BigInt {
            if m.is_blank() {
                return BigInt::ZERO;
            }
            if let Some(cached) = cache.get(&m) {
                return cached.clone();
            }
            let result = match universe.expand(m) {
                Node::Leaf(grids) => {
                    BigInt::from(grids.iter().map(|g| g.population()).sum::<u32>())
                }
                Node::Branch(parts) => parts.iter().map(|&p| inner(universe, p, cache)).sum(),
            };
            cache.insert(m, result.clone());
            result
        }

        inner(self, m, &mut HashMap::new())
    }

    /// Builds the macrocell of a pattern.
    ///
    /// An 8x8 pattern is placed in the north-west quadrant of a 16x16 square.
    pub fn from_pattern(&mut self, pattern: &Pattern) -> Macrocell {
        fn inner(
            universe: &mut Universe,
            pattern: &Pattern,
            gx: usize,
            gy: usize,
            level: u32,
        ) -> Macrocell {
            if level == LEAF_NODE_LEVEL {
                return universe.leaf(
                    pattern.leaf(gx, gy),
                    pattern.leaf(gx + 1, gy),
                    pattern.leaf(gx, gy + 1),
                    pattern.leaf(gx + 1, gy + 1),
                );
            }
            // half of the side, in grids
            let h = 1 << (level - 1 - LEAF_SIZE_LOG2);
            let nw = inner(universe, pattern, gx, gy, level - 1);
            let ne = inner(universe, pattern, gx + h, gy, level - 1);
            let sw = inner(universe, pattern, gx, gy + h, level - 1);
            let se = inner(universe, pattern, gx + h, gy + h, level - 1);
            universe.node(nw, ne, sw, se)
        }

        let size_log2 = pattern.get_size_log2();
        if size_log2 == LEAF_SIZE_LOG2 {
            let e = LeafGrid::EMPTY;
            return self.leaf(pattern.leaf(0, 0), e, e, e);
        }
        inner(self, pattern, 0, 0, size_log2)
    }

    /// Dense copy of a macrocell.
    ///
    /// # Errors
    ///
    /// Returns an error if the square is larger than the largest [`Pattern`].
    pub fn to_pattern(&self, m: Macrocell) -> Result<Pattern> {
        fn inner(universe: &Universe, m: Macrocell, gx: usize, gy: usize, pattern: &mut Pattern) {
            if m.is_blank() {
                return;
            }
            match universe.expand(m) {
                Node::Leaf([nw, ne, sw, se]) => {
                    pattern.set_leaf(gx, gy, nw);
                    pattern.set_leaf(gx + 1, gy, ne);
                    pattern.set_leaf(gx, gy + 1, sw);
                    pattern.set_leaf(gx + 1, gy + 1, se);
                }
                Node::Branch([nw, ne, sw, se]) => {
                    let h = 1 << (m.level() - 1 - LEAF_SIZE_LOG2);
                    inner(universe, nw, gx, gy, pattern);
                    inner(universe, ne, gx + h, gy, pattern);
                    inner(universe, sw, gx, gy + h, pattern);
                    inner(universe, se, gx + h, gy + h, pattern);
                }
            }
        }

        let mut pattern = Pattern::new(m.level())
            .map_err(|e| anyhow!("Cannot convert {:?} to a pattern: {}", m, e))?;
        inner(self, m, 0, 0, &mut pattern);
        Ok(pattern)
    }

    /// Copies the square `m` into `dst`, returning its handle there.
    ///
    /// Only the nodes reachable from `m` are copied; cached futures are not.
    pub fn transplant(&self, m: Macrocell, dst: &mut Universe) -> Macrocell {
        fn inner(
            src: &Universe,
            m: Macrocell,
            dst: &mut Universe,
            cache: &mut HashMap<Macrocell, Macrocell>,
        ) -> Macrocell {
            if m.is_blank() {
                return dst.blank(m.level());
            }
            if let Some(&cached) = cache.get(&m) {
                return cached;
            }
            let result = match src.expand(m) {
                Node::Leaf([nw, ne, sw, se]) => dst.leaf(nw, ne, sw, se),
                Node::Branch(parts) => {
                    let [nw, ne, sw, se] = parts.map(|p| inner(src, p, dst, cache));
                    dst.node(nw, ne, sw, se)
                }
            };
            cache.insert(m, result);
            result
        }

        inner(self, m, dst, &mut HashMap::new())
    }

    /// Number of stored nodes, blank squares included.
    pub fn len(&self) -> usize {
        self.mem.lens().iter().sum()
    }

    /// Number of stored nodes per level, starting from the leaf node level.
    pub fn lens(&self) -> Vec<usize> {
        self.mem.lens()
    }

    /// Approximate heap usage in bytes.
    pub fn bytes_total(&self) -> usize {
        self.mem.bytes_total()
            + self.jumps.capacity() * std::mem::size_of::<((Macrocell, u32), Macrocell)>()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

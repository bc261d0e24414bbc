use super::{Macrocell, Node, Universe, LEAF_NODE_LEVEL};
use crate::{GoLEngine, LeafGrid, Pattern, Topology};
use anyhow::{anyhow, Result};
use num_bigint::{BigInt, Sign};

/// Implementation of [HashLife algorithm](https://conwaylife.com/wiki/HashLife)
/// on top of a canonical [`Universe`].
///
/// The field is a single root macrocell. Before an update the root is wrapped
/// in frames until its centered half, which is what [`Universe::advance`]
/// returns, is as large as the field and far enough from the bounds:
/// - [`Topology::Unbounded`] frames are blank, and blank frames are trimmed
///   after the update, so the field follows the pattern as it grows or moves;
/// - [`Topology::Torus`] frames are copies of the field, so the result is the
///   next state of the periodic plane, and the field never moves.
///
/// World coordinates of the field are tracked with [`BigInt`]s.
pub struct HashLifeEngine {
    universe: Universe,
    root: Macrocell,
    topology: Topology,
    /// world coordinates of the north-west corner of the root
    origin: [BigInt; 2],
    generation: BigInt,
}

/// Parts of the four quadrants of a square twice as large as `[nw, ne, sw, se]`,
/// with the original square in its center.
fn frame_parts<T: Copy>([nw, ne, sw, se]: [T; 4], blank: T, topology: Topology) -> [[T; 4]; 4] {
    match topology {
        // the field rolled by half of its side, four times
        Topology::Torus => [[se, sw, ne, nw]; 4],
        Topology::Unbounded => {
            let b = blank;
            [
                [b, b, b, nw],
                [b, b, ne, b],
                [b, sw, b, b],
                [se, b, b, b],
            ]
        }
    }
}

impl HashLifeEngine {
    /// Add a frame around the field: if `self.topology` is Unbounded, frame is blank,
    /// and if `self.topology` is Torus, frame mirrors the field.
    /// The field becomes two times bigger.
    fn with_frame(&mut self, m: Macrocell) -> Macrocell {
        let topology = self.topology;
        let [nw, ne, sw, se] = match self.universe.expand(m) {
            Node::Leaf(grids) => frame_parts(grids, LeafGrid::EMPTY, topology)
                .map(|[nw, ne, sw, se]| self.universe.leaf(nw, ne, sw, se)),
            Node::Branch(parts) => {
                let blank = self.universe.blank(m.level() - 1);
                frame_parts(parts, blank, topology)
                    .map(|[nw, ne, sw, se]| self.universe.node(nw, ne, sw, se))
            }
        };
        self.universe.node(nw, ne, sw, se)
    }

    /// Remove a frame around the field, making it two times smaller.
    fn without_frame(&mut self, m: Macrocell) -> Macrocell {
        let parts = self.universe.children(m);
        self.universe.center_of(parts)
    }

    /// True if everything outside of the centered half of the root is blank.
    fn has_blank_frame(&self) -> bool {
        if self.root.level() <= LEAF_NODE_LEVEL + 1 {
            return false;
        }
        let [nw, ne, sw, se] = self
            .universe
            .children(self.root)
            .map(|c| self.universe.children(c));
        [
            nw[0], nw[1], nw[2], ne[0], ne[1], ne[3], sw[0], sw[2], sw[3], se[1], se[2], se[3],
        ]
        .iter()
        .all(|m| m.is_blank())
    }

    fn add_frame(&mut self) {
        let half = BigInt::from(1) << (self.root.level() - 1);
        for coord in self.origin.iter_mut() {
            *coord -= &half;
        }
        self.root = self.with_frame(self.root);
    }

    fn pop_frame(&mut self) {
        let quarter = BigInt::from(1) << (self.root.level() - 2);
        for coord in self.origin.iter_mut() {
            *coord += &quarter;
        }
        self.root = self.without_frame(self.root);
    }

    /// State of the cell at world coordinates `(x, y)`; the pattern is loaded
    /// with its north-west corner at `(0, 0)`.
    ///
    /// With [`Topology::Torus`] only one period of the plane is addressable.
    pub fn get_cell(&self, x: &BigInt, y: &BigInt) -> bool {
        let mut x = x - &self.origin[0];
        let mut y = y - &self.origin[1];
        let side = BigInt::from(1) << self.root.level();
        if x.sign() == Sign::Minus || y.sign() == Sign::Minus || x >= side || y >= side {
            return false;
        }

        let mut m = self.root;
        while m.level() > u64::BITS {
            let half = BigInt::from(1) << (m.level() - 1);
            let (east, south) = (x >= half, y >= half);
            if east {
                x -= &half;
            }
            if south {
                y -= &half;
            }
            m = self.universe.children(m)[(south as usize) << 1 | east as usize];
        }
        match (u64::try_from(&x), u64::try_from(&y)) {
            (Ok(x), Ok(y)) => self.universe.alive(m, x, y),
            _ => false,
        }
    }

    /// Number of alive cells in the field.
    pub fn population(&self) -> BigInt {
        self.universe.population(self.root)
    }

    /// Number of generations simulated since the pattern was loaded.
    pub fn generation(&self) -> &BigInt {
        &self.generation
    }

    /// World coordinates of the north-west corner of the field.
    pub fn origin(&self) -> &[BigInt; 2] {
        &self.origin
    }

    pub fn root(&self) -> Macrocell {
        self.root
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }
}

impl GoLEngine for HashLifeEngine {
    fn new() -> Self {
        let mut universe = Universe::new();
        Self {
            root: universe.blank(LEAF_NODE_LEVEL),
            universe,
            topology: Topology::Unbounded,
            origin: [BigInt::ZERO, BigInt::ZERO],
            generation: BigInt::ZERO,
        }
    }

    fn load_pattern(&mut self, pattern: &Pattern, topology: Topology) -> Result<()> {
        if topology == Topology::Torus && pattern.get_size_log2() < LEAF_NODE_LEVEL {
            return Err(anyhow!(
                "Pattern is too small for a torus: 2^{} < 2^{}",
                pattern.get_size_log2(),
                LEAF_NODE_LEVEL
            ));
        }
        // rebuilding the universe is fast
        self.universe = Universe::new();
        self.root = self.universe.from_pattern(pattern);
        self.topology = topology;
        self.origin = [BigInt::ZERO, BigInt::ZERO];
        self.generation = BigInt::ZERO;
        Ok(())
    }

    fn current_state(&self) -> Result<Pattern> {
        self.universe.to_pattern(self.root)
    }

    fn update(&mut self, generations_log2: u32) -> Result<[BigInt; 2]> {
        let level = self.root.level();
        let frames_cnt = match self.topology {
            Topology::Torus => generations_log2
                .checked_add(2)
                .map(|target| target.max(level + 1) - level),
            // one more frame to keep the light cone of the pattern inside
            Topology::Unbounded => generations_log2
                .checked_add(3)
                .map(|target| target.max(level + 2) - level),
        }
        .ok_or_else(|| anyhow!("Generation count 2^{} is too large", generations_log2))?;

        let old_origin = self.origin.clone();
        for _ in 0..frames_cnt {
            self.add_frame();
        }

        let quarter = BigInt::from(1) << (self.root.level() - 2);
        self.root = self.universe.advance(self.root, generations_log2);
        for coord in self.origin.iter_mut() {
            *coord += &quarter;
        }

        match self.topology {
            Topology::Torus => {
                for _ in 0..frames_cnt - 1 {
                    self.pop_frame();
                }
            }
            Topology::Unbounded => {
                while self.has_blank_frame() {
                    self.pop_frame();
                }
            }
        }
        self.generation += BigInt::from(1) << generations_log2;

        let [x0, y0] = old_origin;
        Ok([x0 - &self.origin[0], y0 - &self.origin[1]])
    }

    /// Rebuilds the universe from the nodes of the current state, dropping
    /// everything else including memoized futures.
    fn run_gc(&mut self) {
        let mut fresh = Universe::new();
        self.root = self.universe.transplant(self.root, &mut fresh);
        self.universe = fresh;
    }

    fn bytes_total(&self) -> usize {
        self.universe.bytes_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Range;
    const SEED: u64 = 42;

    fn glider() -> Pattern {
        Pattern::from_rows(".o.\n..o\nooo").unwrap()
    }

    fn cells(engine: &HashLifeEngine, xs: Range<i64>, ys: Range<i64>) -> Vec<(i64, i64)> {
        let mut alive = vec![];
        for y in ys {
            for x in xs.clone() {
                if engine.get_cell(&x.into(), &y.into()) {
                    alive.push((x, y));
                }
            }
        }
        alive
    }

    #[test]
    fn test_pattern_roundtrip() {
        for size_log2 in 4..10 {
            let original = Pattern::random(size_log2, Some(SEED)).unwrap();
            for topology in [Topology::Torus, Topology::Unbounded] {
                let mut engine = HashLifeEngine::new();
                engine.load_pattern(&original, topology).unwrap();
                assert_eq!(
                    engine.current_state().unwrap(),
                    original,
                    "Pattern roundtrip failed for size 2^{}",
                    size_log2
                );
            }
        }
    }

    #[test]
    fn test_load_pattern_sets_topology() {
        let mut engine = HashLifeEngine::new();
        assert!(engine.load_pattern(&glider(), Topology::Torus).is_err());
        assert_eq!(engine.topology(), Topology::Unbounded);
        assert!(engine.load_pattern(&glider(), Topology::Unbounded).is_ok());
        assert_eq!(engine.topology(), Topology::Unbounded);
        let pattern = Pattern::random(4, Some(SEED)).unwrap();
        engine.load_pattern(&pattern, Topology::Torus).unwrap();
        assert_eq!(engine.topology(), Topology::Torus);
    }

    #[test]
    fn test_glider_unbounded() {
        let mut engine = HashLifeEngine::new();
        engine.load_pattern(&glider(), Topology::Unbounded).unwrap();
        let start = cells(&engine, -4..8, -4..8);
        assert_eq!(start, vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);

        engine.update(2).unwrap();
        assert_eq!(engine.generation(), &BigInt::from(4));
        let moved: Vec<_> = start.iter().map(|&(x, y)| (x + 1, y + 1)).collect();
        assert_eq!(cells(&engine, -4..8, -4..8), moved);

        engine.update(10).unwrap();
        assert_eq!(engine.generation(), &BigInt::from(1028));
        let moved: Vec<_> = start.iter().map(|&(x, y)| (x + 257, y + 257)).collect();
        assert_eq!(cells(&engine, 250..270, 250..270), moved);
        assert_eq!(engine.population(), BigInt::from(5));
        // blank frames are trimmed
        assert!(engine.root().level() < 12);
    }

    #[test]
    fn test_update_offsets_follow_the_field() {
        let block = Pattern::from_rows("oo\noo").unwrap();
        let mut engine = HashLifeEngine::new();
        engine.load_pattern(&block, Topology::Unbounded).unwrap();
        for generations_log2 in [0, 3, 7] {
            let before = engine.current_state().unwrap();
            let [dx, dy] = engine.update(generations_log2).unwrap();
            let after = engine.current_state().unwrap();
            let (dx, dy) = (i64::try_from(&dx).unwrap(), i64::try_from(&dy).unwrap());
            for y in 0..before.side_len() {
                for x in 0..before.side_len() {
                    if before.get(x, y) {
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        assert!(after.get(nx as usize, ny as usize));
                    }
                }
            }
            assert_eq!(after.population(), 4);
        }
        assert!(engine.get_cell(&0.into(), &1.into()));
        assert!(!engine.get_cell(&2.into(), &0.into()));
    }

    #[test]
    fn test_torus_keeps_the_field() {
        let pattern = Pattern::random(6, Some(SEED)).unwrap();
        let mut engine = HashLifeEngine::new();
        engine.load_pattern(&pattern, Topology::Torus).unwrap();
        for generations_log2 in 0..10 {
            let offset = engine.update(generations_log2).unwrap();
            assert_eq!(offset, [BigInt::ZERO, BigInt::ZERO]);
            assert_eq!(engine.root().level(), 6);
            assert_eq!(engine.origin(), &[BigInt::ZERO, BigInt::ZERO]);
        }
    }

    #[test]
    fn test_torus_glider_wraps_around() {
        // a glider crosses a 16x16 torus in 64 generations
        let mut pattern = Pattern::new(4).unwrap();
        let glider = glider();
        for y in 0..3 {
            for x in 0..3 {
                pattern.set(x + 5, y + 5, glider.get(x, y));
            }
        }
        let mut engine = HashLifeEngine::new();
        engine.load_pattern(&pattern, Topology::Torus).unwrap();
        engine.update(6).unwrap();
        assert_eq!(engine.current_state().unwrap(), pattern);
        engine.update(5).unwrap();
        assert_ne!(engine.current_state().unwrap(), pattern);
        engine.update(5).unwrap();
        assert_eq!(engine.current_state().unwrap(), pattern);
    }

    #[test]
    fn test_gc_keeps_state() {
        let pattern = Pattern::random(7, Some(SEED)).unwrap();
        let mut engine = HashLifeEngine::new();
        engine.load_pattern(&pattern, Topology::Torus).unwrap();
        engine.update(4).unwrap();
        let state = engine.current_state().unwrap();
        let len = engine.universe().len();
        engine.run_gc();
        assert_eq!(engine.current_state().unwrap(), state);
        assert!(engine.universe().len() < len);
    }
}

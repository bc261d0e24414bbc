use crate::leaf::{apply_rule, horizontal_sums};
use crate::{GoLEngine, Pattern, Topology};
use anyhow::{anyhow, Result};
use num_bigint::BigInt;

/// A flat engine for Conway's Game of Life that updates 64 cells per word
/// operation. Its performance is pattern-oblivious, which makes it a reference
/// for the quadtree engines.
///
/// # Limitations
///
/// - Only supports torus topology (wrapping boundaries)
/// - Requires patterns with `size_log2` of at least 7 (128×128 cells)
///
/// # Example
///
/// ```rust
/// use gosper_life::{GoLEngine, Pattern, SIMDEngine, Topology};
///
/// let pattern = Pattern::random(7, Some(42)).unwrap();
/// let mut engine = SIMDEngine::new();
/// engine.load_pattern(&pattern, Topology::Torus).unwrap();
///
/// // Run for 2^4 = 16 generations
/// engine.update(4).unwrap();
/// let result = engine.current_state().unwrap();
/// assert_eq!(result.get_size_log2(), 7);
/// ```
pub struct SIMDEngine {
    /// Rows of packed cells, in the layout of [`Pattern`]
    data: Vec<u64>,
    /// Horizontal sums of every word, reused between generations
    sums: Vec<(u64, u64)>,
    size_log2: u32,
}

impl SIMDEngine {
    const MIN_SIZE_LOG2: u32 = 7;
    const CELLS_IN_CHUNK: usize = 64;

    fn side_len(&self) -> usize {
        1 << self.size_log2
    }

    fn update_inner(&mut self) {
        let (n, w) = (self.side_len(), self.side_len() / Self::CELLS_IN_CHUNK);
        let shift = Self::CELLS_IN_CHUNK - 1;

        for (row, sums) in self.data.chunks_exact(w).zip(self.sums.chunks_exact_mut(w)) {
            for x in 0..w {
                // neighbouring words on the torus
                let (prev, next) = (row[(x + w - 1) % w], row[(x + 1) % w]);
                let cells = row[x];
                let west = (cells << 1) | (prev >> shift);
                let east = (cells >> 1) | (next << shift);
                sums[x] = horizontal_sums(west, cells, east);
            }
        }

        for y in 0..n {
            let (north, south) = ((y + n - 1) % n, (y + 1) % n);
            for x in 0..w {
                let i = y * w + x;
                self.data[i] = apply_rule(
                    self.data[i],
                    self.sums[north * w + x],
                    self.sums[i],
                    self.sums[south * w + x],
                );
            }
        }
    }
}

impl GoLEngine for SIMDEngine {
    fn new() -> Self {
        let n = 1 << Self::MIN_SIZE_LOG2;
        let words = n * n / Self::CELLS_IN_CHUNK;
        Self {
            data: vec![0; words],
            sums: vec![(0, 0); words],
            size_log2: Self::MIN_SIZE_LOG2,
        }
    }

    fn load_pattern(&mut self, pattern: &Pattern, topology: Topology) -> Result<()> {
        if topology != Topology::Torus {
            return Err(anyhow!("Only torus topology is supported by SIMDEngine"));
        }
        if pattern.get_size_log2() < Self::MIN_SIZE_LOG2 {
            return Err(anyhow!("Pattern is too small for SIMDEngine"));
        }

        self.data = pattern.words().to_vec();
        self.sums = vec![(0, 0); self.data.len()];
        self.size_log2 = pattern.get_size_log2();
        Ok(())
    }

    fn current_state(&self) -> Result<Pattern> {
        Pattern::from_words(self.size_log2, self.data.clone())
    }

    fn update(&mut self, generations_log2: u32) -> Result<[BigInt; 2]> {
        if generations_log2 >= 64 {
            return Err(anyhow!(
                "Generation count 2^{} is insanely large for SIMDEngine",
                generations_log2
            ));
        }
        for _ in 0..1u64 << generations_log2 {
            self.update_inner();
        }
        Ok([BigInt::ZERO, BigInt::ZERO])
    }

    fn bytes_total(&self) -> usize {
        self.data.capacity() * size_of::<u64>() + self.sums.capacity() * size_of::<(u64, u64)>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const SEED: u64 = 42;

    #[test]
    fn test_pattern_roundtrip() {
        for size_log2 in 7..10 {
            let original = Pattern::random(size_log2, Some(SEED)).unwrap();
            let mut engine = SIMDEngine::new();
            engine.load_pattern(&original, Topology::Torus).unwrap();
            let converted = engine.current_state().unwrap();

            assert_eq!(
                original, converted,
                "Pattern roundtrip failed for size 2^{}",
                size_log2
            );
        }
    }

    #[test]
    fn test_rejects_unsupported_input() {
        let mut engine = SIMDEngine::new();
        let small = Pattern::random(6, Some(SEED)).unwrap();
        assert!(engine.load_pattern(&small, Topology::Torus).is_err());
        let pattern = Pattern::random(7, Some(SEED)).unwrap();
        assert!(engine.load_pattern(&pattern, Topology::Unbounded).is_err());
        assert!(engine.update(64).is_err());
    }

    #[test]
    fn test_blinker_on_the_seam() {
        // a vertical blinker crossing the north-south seam of the torus
        let mut pattern = Pattern::new(7).unwrap();
        for y in [127, 0, 1] {
            pattern.set(64, y, true);
        }
        let mut engine = SIMDEngine::new();
        engine.load_pattern(&pattern, Topology::Torus).unwrap();
        engine.update(0).unwrap();
        let state = engine.current_state().unwrap();
        assert_eq!(state.population(), 3);
        assert!(state.get(63, 0) && state.get(64, 0) && state.get(65, 0));
        engine.update(0).unwrap();
        assert_eq!(engine.current_state().unwrap(), pattern);
    }
}

use crate::LeafGrid;
use anyhow::{anyhow, Result};
use rand::{Rng, SeedableRng};

/// A type for measuring the side length of a square as a power of two.
type SizeLog2 = u32;

/// Smallest supported pattern: a single 8x8 leaf.
pub const MIN_PATTERN_SIZE_LOG2: SizeLog2 = 3;
/// Largest pattern that is stored densely (2^28 cells, 32 MiB).
pub const MAX_PATTERN_SIZE_LOG2: SizeLog2 = 14;

/// A dense square bitmap of cells, used to load patterns into engines and
/// to inspect their state.
///
/// # Overview
///
/// Rows are stored top to bottom; each row takes `max(1, side / 64)` words and
/// cell `(x, y)` is bit `x % 64` of word `y * stride + x / 64`. Because every
/// 8-cell chunk of a row is a byte, an 8x8 block of the bitmap converts to a
/// [`LeafGrid`] with plain shifts.
///
/// # Limitations
///
/// *   **Power-of-2 Sizes:** side lengths from `2^3` to `2^14`.
/// *   **Two-State Only:** cells are either dead or alive.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    size_log2: SizeLog2,
    /// words per row
    stride: usize,
    data: Vec<u64>,
}

impl Pattern {
    /// Creates a blank pattern of side `2^size_log2`.
    ///
    /// # Errors
    ///
    /// Returns an error if `size_log2` is outside of
    /// `MIN_PATTERN_SIZE_LOG2..=MAX_PATTERN_SIZE_LOG2`.
    pub fn new(size_log2: SizeLog2) -> Result<Self> {
        if !(MIN_PATTERN_SIZE_LOG2..=MAX_PATTERN_SIZE_LOG2).contains(&size_log2) {
            return Err(anyhow!(
                "size_log2 {} is not in range {}..={}",
                size_log2,
                MIN_PATTERN_SIZE_LOG2,
                MAX_PATTERN_SIZE_LOG2
            ));
        }
        let n = 1usize << size_log2;
        let stride = n.div_ceil(64);
        Ok(Self {
            size_log2,
            stride,
            data: vec![0; stride * n],
        })
    }

    /// Creates a pattern where every cell is alive with probability 1/2.
    ///
    /// With `seed` set the result is reproducible; otherwise the generator is
    /// seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Same as [`Pattern::new`].
    pub fn random(size_log2: SizeLog2, seed: Option<u64>) -> Result<Self> {
        let mut pattern = Self::new(size_log2)?;
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_os_rng()
        };
        let n = pattern.side_len();
        for word in pattern.data.iter_mut() {
            *word = rng.random::<u64>();
            if n < 64 {
                // clear the bits beyond the end of the row
                *word &= (1u64 << n) - 1;
            }
        }
        Ok(pattern)
    }

    /// Parses rows of cells, top row first: `0`, `.` or `b` is dead and `1`,
    /// `o`, `O` or `*` is alive. Rows are separated by `/` or line breaks.
    ///
    /// The pattern is placed in the north-west corner of the smallest square
    /// (at least 8x8) that fits it.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown characters or if the pattern is too large.
    pub fn from_rows(text: &str) -> Result<Self> {
        let rows = parse_rows(text)?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let side = width.max(rows.len()).max(1).next_power_of_two();
        let mut pattern = Self::new(side.ilog2().max(MIN_PATTERN_SIZE_LOG2))?;
        for (y, row) in rows.iter().enumerate() {
            for (x, &alive) in row.iter().enumerate() {
                pattern.set(x, y, alive);
            }
        }
        Ok(pattern)
    }

    /// Returns the log base 2 of the pattern's side length.
    pub fn get_size_log2(&self) -> SizeLog2 {
        self.size_log2
    }

    pub fn side_len(&self) -> usize {
        1 << self.size_log2
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        assert!(x < self.side_len() && y < self.side_len());
        (self.data[y * self.stride + x / 64] >> (x % 64)) & 1 != 0
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        assert!(x < self.side_len() && y < self.side_len());
        let word = &mut self.data[y * self.stride + x / 64];
        let bit = 1u64 << (x % 64);
        if alive {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// Counts the alive cells.
    pub fn population(&self) -> u64 {
        self.data.iter().map(|w| w.count_ones() as u64).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&w| w == 0)
    }

    /// Returns the 8x8 block whose north-west cell is `(8 * gx, 8 * gy)`.
    pub(crate) fn leaf(&self, gx: usize, gy: usize) -> LeafGrid {
        let (x, y) = (gx * 8, gy * 8);
        let mut bits = 0u64;
        for row in 0..8 {
            let word = self.data[(y + row) * self.stride + x / 64];
            bits |= ((word >> (x % 64)) & 0xff) << (row * 8);
        }
        LeafGrid::from_bits(bits)
    }

    /// Overwrites the 8x8 block whose north-west cell is `(8 * gx, 8 * gy)`.
    pub(crate) fn set_leaf(&mut self, gx: usize, gy: usize, leaf: LeafGrid) {
        let (x, y) = (gx * 8, gy * 8);
        let bits = leaf.bits();
        for row in 0..8 {
            let word = &mut self.data[(y + row) * self.stride + x / 64];
            *word &= !(0xff << (x % 64));
            *word |= ((bits >> (row * 8)) & 0xff) << (x % 64);
        }
    }

    /// Packed rows, `max(1, side / 64)` words each.
    pub(crate) fn words(&self) -> &[u64] {
        &self.data
    }

    /// Inverse of [`Pattern::words`]; `data` must hold exactly `side * stride` words.
    pub(crate) fn from_words(size_log2: SizeLog2, data: Vec<u64>) -> Result<Self> {
        let mut pattern = Self::new(size_log2)?;
        if data.len() != pattern.data.len() {
            return Err(anyhow!(
                "Expected {} words for a 2^{} pattern, got {}",
                pattern.data.len(),
                size_log2,
                data.len()
            ));
        }
        pattern.data = data;
        Ok(pattern)
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("size_log2", &self.size_log2)
            .field("population", &self.population())
            .finish()
    }
}

/// Splits text into rows of cells; see [`Pattern::from_rows`] for the syntax.
pub(crate) fn parse_rows(text: &str) -> Result<Vec<Vec<bool>>> {
    text.split(['/', '\n'])
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .map(|row| {
            row.chars()
                .map(|c| match c {
                    '0' | '.' | 'b' => Ok(false),
                    '1' | 'o' | 'O' | '*' => Ok(true),
                    _ => Err(anyhow!("Unexpected character {:?} in row {:?}", c, row)),
                })
                .collect::<Result<Vec<bool>>>()
        })
        .collect()
}

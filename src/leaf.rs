//! 8x8 cell squares stored in a single register.
//!
//! Bit `y * 8 + x` of a [`LeafGrid`] is the cell `(x, y)`, so every byte is a row
//! and the least significant bit of a row is its western cell. The generation
//! rule is evaluated for all 64 cells at once with parallel adders, in the spirit
//! of "Life in a register".

use crate::pattern::parse_rows;
use anyhow::{anyhow, Result};
use std::{fmt, str::FromStr};

/// Cells whose next generation is known from the grid alone.
const CENTER_6X6: u64 = 0x007e_7e7e_7e7e_7e00;
/// Cells whose state two generations ahead is known from the grid alone.
const CENTER_4X4: u64 = 0x0000_3c3c_3c3c_0000;
const WEST_HALF: u64 = 0x0f0f_0f0f_0f0f_0f0f;
const EAST_HALF: u64 = 0xf0f0_f0f0_f0f0_f0f0;
/// The westmost cell of every row.
const COLUMN_0: u64 = 0x0101_0101_0101_0101;

/// An 8x8 square of cells packed into a `u64`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LeafGrid(u64);

#[inline]
fn half_adder(a: u64, b: u64) -> (u64, u64) {
    (a ^ b, a & b)
}

#[inline]
fn full_adder(a: u64, b: u64, c: u64) -> (u64, u64) {
    (a ^ b ^ c, (a & b) | (b & c) | (a & c))
}

/// Sums of `{west, self, east}` for 64 cells at once, as bit planes `(ones, twos)`.
#[inline]
pub(crate) fn horizontal_sums(west: u64, cells: u64, east: u64) -> (u64, u64) {
    full_adder(west, cells, east)
}

/// B3/S23 for 64 cells at once, given the horizontal sums of the rows to the
/// north, of the cells' own row and of the rows to the south.
///
/// Every cell counts its neighbourhood including itself. The count is kept
/// modulo 8 in three bit planes: 8 and 9 alias 0 and 1, which are dead
/// outcomes either way.
#[inline]
pub(crate) fn apply_rule(
    cells: u64,
    north: (u64, u64),
    row: (u64, u64),
    south: (u64, u64),
) -> u64 {
    let (sum1, carry2) = full_adder(north.0, row.0, south.0);
    let (sum2b, carry4a) = full_adder(north.1, row.1, south.1);
    let (sum2, carry4b) = half_adder(carry2, sum2b);
    let sum4 = carry4a ^ carry4b;

    let three = sum1 & sum2 & !sum4;
    let four = !sum1 & !sum2 & sum4;
    three | (cells & four)
}

impl LeafGrid {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Builds a grid from cells indexed as `cells[y][x]`.
    pub fn from_cells(cells: [[bool; 8]; 8]) -> Self {
        let mut grid = Self::EMPTY;
        for (y, row) in cells.iter().enumerate() {
            for (x, &alive) in row.iter().enumerate() {
                grid.set(x, y, alive);
            }
        }
        grid
    }

    pub fn alive(self, x: usize, y: usize) -> bool {
        assert!(x < 8 && y < 8, "cell ({x}, {y}) is outside of an 8x8 grid");
        (self.0 >> (y * 8 + x)) & 1 != 0
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        assert!(x < 8 && y < 8, "cell ({x}, {y}) is outside of an 8x8 grid");
        let bit = 1u64 << (y * 8 + x);
        if alive {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn population(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the next generation of the centered 6x6 region; the outer ring is dead.
    pub fn next(self) -> Self {
        let cells = self.0;
        let (mid1, mid2) = horizontal_sums(cells << 1, cells, cells >> 1);
        let north = (mid1 << 8, mid2 << 8);
        let south = (mid1 >> 8, mid2 >> 8);
        Self(apply_rule(cells, north, (mid1, mid2), south) & CENTER_6X6)
    }

    /// Applies [`LeafGrid::next`] `generations` times.
    pub fn advance(self, generations: usize) -> Self {
        (0..generations).fold(self, |grid, _| grid.next())
    }

    /// Returns the centered 4x4 region two generations ahead.
    pub fn result(self) -> Self {
        Self(self.next().next().0 & CENTER_4X4)
    }

    /// Moves every cell `dx` columns east and `dy` rows south.
    /// Cells pushed over the border are lost.
    pub fn shift(self, dx: i32, dy: i32) -> Self {
        if dx.unsigned_abs() >= 8 || dy.unsigned_abs() >= 8 {
            return Self::EMPTY;
        }
        let mut bits = self.0;
        if dx > 0 {
            let keep = (0xffu64 >> dx) * COLUMN_0;
            bits = (bits & keep) << dx;
        } else if dx < 0 {
            let keep = ((0xffu64 << -dx) & 0xff) * COLUMN_0;
            bits = (bits & keep) >> -dx;
        }
        if dy > 0 {
            bits <<= 8 * dy;
        } else if dy < 0 {
            bits >>= 8 * -dy;
        }
        Self(bits)
    }

    pub(crate) fn center_4x4(self) -> Self {
        Self(self.0 & CENTER_4X4)
    }

    /// The square straddling the border of two horizontally adjacent grids.
    pub(crate) fn horizontal_center(west: Self, east: Self) -> Self {
        Self(((west.0 >> 4) & WEST_HALF) | ((east.0 << 4) & EAST_HALF))
    }

    /// The square straddling the border of two vertically adjacent grids.
    pub(crate) fn vertical_center(north: Self, south: Self) -> Self {
        Self((north.0 >> 32) | (south.0 << 32))
    }

    /// The square around the common corner of four grids.
    pub(crate) fn center(nw: Self, ne: Self, sw: Self, se: Self) -> Self {
        Self::vertical_center(
            Self::horizontal_center(nw, ne),
            Self::horizontal_center(sw, se),
        )
    }

    /// Joins four centered 4x4 regions into one grid.
    pub(crate) fn compose(nw: Self, ne: Self, sw: Self, se: Self) -> Self {
        debug_assert!([nw, ne, sw, se].iter().all(|q| q.0 & !CENTER_4X4 == 0));
        Self((nw.0 >> 18) | (ne.0 >> 14) | (sw.0 << 14) | (se.0 << 18))
    }
}

/// The nine overlapping 8x8 regions of a 16x16 square, row by row at offsets 0, 4 and 8.
fn nine_regions([nw, ne, sw, se]: [LeafGrid; 4]) -> [LeafGrid; 9] {
    [
        nw,
        LeafGrid::horizontal_center(nw, ne),
        ne,
        LeafGrid::vertical_center(nw, sw),
        LeafGrid::center(nw, ne, sw, se),
        LeafGrid::vertical_center(ne, se),
        sw,
        LeafGrid::horizontal_center(sw, se),
        se,
    ]
}

/// Joins a 3x3 arrangement of centered 4x4 regions into four overlapping grids.
fn four_overlapping(arr: &[LeafGrid; 9]) -> [LeafGrid; 4] {
    [
        LeafGrid::compose(arr[0], arr[1], arr[3], arr[4]),
        LeafGrid::compose(arr[1], arr[2], arr[4], arr[5]),
        LeafGrid::compose(arr[3], arr[4], arr[6], arr[7]),
        LeafGrid::compose(arr[4], arr[5], arr[7], arr[8]),
    ]
}

/// Centered 8x8 region of a 16x16 square four generations ahead.
pub(crate) fn square_future(quadrants: [LeafGrid; 4]) -> LeafGrid {
    let halfway = nine_regions(quadrants).map(LeafGrid::result);
    let [nw, ne, sw, se] = four_overlapping(&halfway).map(LeafGrid::result);
    LeafGrid::compose(nw, ne, sw, se)
}

/// Centered 8x8 region of a 16x16 square `2^generations_log2` generations ahead.
///
/// `generations_log2` must not exceed 2.
pub(crate) fn square_advance(quadrants: [LeafGrid; 4], generations_log2: u32) -> LeafGrid {
    let rule: fn(LeafGrid) -> LeafGrid = match generations_log2 {
        0 => |g| g.next().center_4x4(),
        1 => LeafGrid::result,
        2 => return square_future(quadrants),
        _ => panic!("a 16x16 square can be advanced by at most 4 generations"),
    };
    let centers = nine_regions(quadrants).map(LeafGrid::center_4x4);
    let [nw, ne, sw, se] = four_overlapping(&centers).map(rule);
    LeafGrid::compose(nw, ne, sw, se)
}

impl FromStr for LeafGrid {
    type Err = anyhow::Error;

    /// Parses 8 rows of 8 cells (`0`/`.` dead, `1`/`o`/`*` alive), top row first,
    /// separated by `/` or line breaks.
    fn from_str(s: &str) -> Result<Self> {
        let rows = parse_rows(s)?;
        if rows.len() != 8 || rows.iter().any(|row| row.len() != 8) {
            return Err(anyhow!("Leaf grid must have exactly 8 rows of 8 cells"));
        }
        let mut grid = Self::EMPTY;
        for (y, row) in rows.iter().enumerate() {
            for (x, &alive) in row.iter().enumerate() {
                grid.set(x, y, alive);
            }
        }
        Ok(grid)
    }
}

impl fmt::Display for LeafGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..8 {
            if y != 0 {
                write!(f, "/")?;
            }
            for x in 0..8 {
                write!(f, "{}", if self.alive(x, y) { '1' } else { '0' })?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LeafGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LeafGrid({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLINKER: &str = "00000000/00000000/00000000/00111000/00000000/00000000/00000000/00000000";
    const TOAD: &str = "00000000/00000000/00000000/00011100/00111000/00000000/00000000/00000000";
    const GLIDER: &str = "00000000/00000000/00001000/00000100/00011100/00000000/00000000/00000000";

    fn grid(s: &str) -> LeafGrid {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(LeafGrid::EMPTY.advance(10), LeafGrid::EMPTY);
    }

    #[test]
    fn test_blinker() {
        let blinker = grid(BLINKER);
        assert_ne!(blinker.next(), blinker);
        assert_eq!(blinker.advance(2), blinker);
        assert_eq!(blinker.next(), blinker.advance(3));
        assert!(blinker.next().alive(3, 2));
        assert!(blinker.next().alive(3, 4));
    }

    #[test]
    fn test_toad() {
        let toad = grid(TOAD);
        assert_ne!(toad.next(), toad);
        assert_eq!(toad.advance(2), toad);
        assert_eq!(toad.next(), toad.advance(3));
    }

    #[test]
    fn test_glider() {
        let glider = grid(GLIDER);
        assert_eq!(glider.advance(4), glider.shift(1, 1));
    }

    #[test]
    fn test_block_is_still() {
        let block = grid("00000000/00000000/00000000/00011000/00011000/00000000/00000000/00000000");
        assert_eq!(block.next(), block);
        assert_eq!(block.result(), block);
    }

    #[test]
    fn test_outer_ring_is_dropped() {
        let full = LeafGrid::from_bits(!0);
        // interior cells have 9 in their neighbourhood and die, the ring is unknown
        assert_eq!(full.next(), LeafGrid::EMPTY);
        let corner = grid("11000000/11000000/00000000/00000000/00000000/00000000/00000000/00000000");
        assert_eq!(corner.next().bits(), corner.bits() & CENTER_6X6);
    }

    #[test]
    fn test_shift_drops_cells_at_the_border() {
        let mut g = LeafGrid::EMPTY;
        g.set(7, 0, true);
        g.set(0, 7, true);
        assert_eq!(g.shift(1, 0).population(), 1);
        assert!(g.shift(1, 0).alive(1, 7));
        assert_eq!(g.shift(-1, -1), LeafGrid::EMPTY);
        assert_eq!(g.shift(0, 1).population(), 1);
        assert!(g.shift(0, 1).alive(7, 1));
        assert_eq!(g.shift(8, 0), LeafGrid::EMPTY);
        assert_eq!(g.shift(-1, 0).population(), 1);
    }

    #[test]
    fn test_region_helpers() {
        let mut west = LeafGrid::EMPTY;
        west.set(7, 0, true);
        let mut east = LeafGrid::EMPTY;
        east.set(0, 0, true);
        let h = LeafGrid::horizontal_center(west, east);
        assert!(h.alive(3, 0) && h.alive(4, 0));
        assert_eq!(h.population(), 2);

        let mut south = LeafGrid::EMPTY;
        south.set(2, 0, true);
        let v = LeafGrid::vertical_center(LeafGrid::EMPTY, south);
        assert!(v.alive(2, 4));

        let mut q = LeafGrid::EMPTY;
        q.set(2, 2, true);
        let composed = LeafGrid::compose(q, q, q, q);
        assert!(composed.alive(0, 0) && composed.alive(4, 0));
        assert!(composed.alive(0, 4) && composed.alive(4, 4));
        assert_eq!(composed.population(), 4);
    }

    #[test]
    fn test_square_future_of_blinker_in_the_middle() {
        // a blinker across the centre of a 16x16 square, period 2
        let mut quadrants = [LeafGrid::EMPTY; 4];
        quadrants[0].set(7, 7, true);
        quadrants[1].set(0, 7, true);
        quadrants[1].set(1, 7, true);
        let future = square_future(quadrants);
        // 4 generations later: same horizontal phase, at centre coordinates (3..=5, 3)
        assert_eq!(future.population(), 3);
        assert!(future.alive(3, 3) && future.alive(4, 3) && future.alive(5, 3));

        let step = square_advance(quadrants, 0);
        assert!(step.alive(4, 2) && step.alive(4, 3) && step.alive(4, 4));
        assert_eq!(square_advance(quadrants, 1), future);
    }

    #[test]
    fn test_parse_and_display() {
        let glider = grid(GLIDER);
        assert_eq!(glider.to_string(), GLIDER);
        assert_eq!(glider.population(), 5);
        assert!("0101".parse::<LeafGrid>().is_err());
        assert!("0000000x/0/0/0/0/0/0/0".parse::<LeafGrid>().is_err());
    }
}

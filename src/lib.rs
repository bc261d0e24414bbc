#![warn(clippy::all)]

mod leaf;
mod pattern;
mod quadtree;
mod simd;
mod topology;
mod traits;

pub use leaf::LeafGrid;
pub use num_bigint::BigInt;
pub use pattern::{Pattern, MAX_PATTERN_SIZE_LOG2, MIN_PATTERN_SIZE_LOG2};
pub use topology::Topology;
pub use traits::GoLEngine;

pub use quadtree::{HashLifeEngine, Macrocell, Node, Universe, LEAF_NODE_LEVEL};
pub use simd::SIMDEngine;

pub type DefaultEngine = HashLifeEngine;

pub const VERSION: &str = "0.1.0";

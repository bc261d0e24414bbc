mod gosper;
mod hashlife;
mod memory;
mod node;
mod universe;

const LEAF_SIZE: u64 = 8;
const LEAF_SIZE_LOG2: u32 = LEAF_SIZE.ilog2();
/// Level of the smallest macrocell: a 16x16 square made of four leaf grids.
pub const LEAF_NODE_LEVEL: u32 = LEAF_SIZE_LOG2 + 1;

use memory::MemoryManager;
use node::{BranchNode, Canonical, LeafNode, NodeIdx};

pub use hashlife::HashLifeEngine;
pub use node::{Macrocell, Node};
pub use universe::Universe;

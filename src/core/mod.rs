//! Fundamental types: coordinates, directions, node-mask bits.

mod coords;
mod directions;
pub mod node_mask;

pub use coords::{BlockCoord, SquareCoord, WorldPos, SQUARE_SIZE};
pub use directions::{vertex_offset, PathDir, CANONICAL_DIRS};

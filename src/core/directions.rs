//! Block-graph directions and the canonical half-edge layout.
//!
//! Each block stores traversal costs for only four of its eight edges
//! (LEFT, LEFT_UP, UP, RIGHT_UP). The opposite four are read from the
//! neighboring block's stored edge, halving the vertex table.

use super::coords::BlockCoord;

/// Number of stored (canonical) edge directions per block.
pub const CANONICAL_DIRS: usize = 4;

/// The eight search directions, in the fixed expansion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PathDir {
    Left = 0,
    LeftUp = 1,
    Up = 2,
    RightUp = 3,
    Right = 4,
    RightDown = 5,
    Down = 6,
    LeftDown = 7,
}

impl PathDir {
    /// All eight directions in expansion order.
    pub const ALL: [PathDir; 8] = [
        PathDir::Left,
        PathDir::LeftUp,
        PathDir::Up,
        PathDir::RightUp,
        PathDir::Right,
        PathDir::RightDown,
        PathDir::Down,
        PathDir::LeftDown,
    ];

    /// The four canonical directions whose edges are stored per block.
    pub const CANONICAL: [PathDir; CANONICAL_DIRS] = [
        PathDir::Left,
        PathDir::LeftUp,
        PathDir::Up,
        PathDir::RightUp,
    ];

    /// Block-coordinate delta of this direction. Up is toward lower z.
    #[inline]
    pub fn vector(self) -> BlockCoord {
        match self {
            PathDir::Left => BlockCoord::new(-1, 0),
            PathDir::LeftUp => BlockCoord::new(-1, -1),
            PathDir::Up => BlockCoord::new(0, -1),
            PathDir::RightUp => BlockCoord::new(1, -1),
            PathDir::Right => BlockCoord::new(1, 0),
            PathDir::RightDown => BlockCoord::new(1, 1),
            PathDir::Down => BlockCoord::new(0, 1),
            PathDir::LeftDown => BlockCoord::new(-1, 1),
        }
    }

    /// Cardinal direction-in flags stored in the node mask. Diagonals OR
    /// the two component cardinals.
    #[inline]
    pub fn to_opt_bits(self) -> u8 {
        use super::node_mask::{DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP};
        match self {
            PathDir::Left => DIR_LEFT,
            PathDir::LeftUp => DIR_LEFT | DIR_UP,
            PathDir::Up => DIR_UP,
            PathDir::RightUp => DIR_RIGHT | DIR_UP,
            PathDir::Right => DIR_RIGHT,
            PathDir::RightDown => DIR_RIGHT | DIR_DOWN,
            PathDir::Down => DIR_DOWN,
            PathDir::LeftDown => DIR_LEFT | DIR_DOWN,
        }
    }
}

/// Signed offset of the vertex slot for `dir` relative to `parent_idx * 4`
/// in the flat cost table of a grid `nx` blocks wide.
///
/// Canonical directions address the parent's own slots; the other four
/// address the canonical slot of the neighbor the edge leads to (the
/// graph is undirected on these axes).
#[inline]
pub fn vertex_offset(dir: PathDir, nx: u32) -> isize {
    let nx = nx as isize;
    let v = CANONICAL_DIRS as isize;
    match dir {
        PathDir::Left => 0,
        PathDir::LeftUp => 1,
        PathDir::Up => 2,
        PathDir::RightUp => 3,
        // neighbor (+1, 0), its LEFT edge
        PathDir::Right => v,
        // neighbor (+1, +1), its LEFT_UP edge
        PathDir::RightDown => v * (nx + 1) + 1,
        // neighbor (0, +1), its UP edge
        PathDir::Down => v * nx + 2,
        // neighbor (-1, +1), its RIGHT_UP edge
        PathDir::LeftDown => v * (nx - 1) + 3,
    }
}

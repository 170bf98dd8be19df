//! Coordinate types for the block grid and the fine square grid.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// World units per fine-grid square edge.
pub const SQUARE_SIZE: i32 = 8;

/// Block coordinates (coarse grid cell indices)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockCoord {
    /// X coordinate (column index)
    pub x: i32,
    /// Z coordinate (row index)
    pub z: i32,
}

impl BlockCoord {
    /// Create a new block coordinate
    #[inline]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Linear index into a row-major block table of width `nx`
    #[inline]
    pub fn to_idx(self, nx: u32) -> usize {
        self.z as usize * nx as usize + self.x as usize
    }

    /// Inverse of [`to_idx`](Self::to_idx)
    #[inline]
    pub fn from_idx(idx: usize, nx: u32) -> Self {
        Self {
            x: (idx % nx as usize) as i32,
            z: (idx / nx as usize) as i32,
        }
    }
}

impl Add for BlockCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        BlockCoord::new(self.x + other.x, self.z + other.z)
    }
}

impl Sub for BlockCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        BlockCoord::new(self.x - other.x, self.z - other.z)
    }
}

/// Fine-grid square coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SquareCoord {
    /// X coordinate in squares
    pub x: i32,
    /// Z coordinate in squares
    pub z: i32,
}

impl SquareCoord {
    /// Create a new square coordinate
    #[inline]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The block containing this square, for block edge length `block_size`
    #[inline]
    pub fn to_block(self, block_size: u32) -> BlockCoord {
        BlockCoord::new(self.x / block_size as i32, self.z / block_size as i32)
    }

    /// Squared Euclidean distance to another square
    #[inline]
    pub fn distance_sq(self, other: SquareCoord) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        dx * dx + dz * dz
    }
}

/// World-space position (game units, f32)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPos {
    /// Create a new world position
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// World position of a square's lower corner at the given height
    #[inline]
    pub fn from_square(square: SquareCoord, height: f32) -> Self {
        Self {
            x: (square.x * SQUARE_SIZE) as f32,
            y: height,
            z: (square.z * SQUARE_SIZE) as f32,
        }
    }
}

//! Map data access and the movement-class registry view.
//!
//! The estimator never owns terrain; it queries it through [`MapData`].
//! Implementations must be cheap per call (these run in the inner loops of
//! precompute) and safe to share across worker threads.

use crate::core::SquareCoord;
use crc32fast::Hasher;

/// Static map queries the estimator depends on.
pub trait MapData: Send + Sync {
    /// Map width in fine-grid squares.
    fn width(&self) -> u32;

    /// Map depth in fine-grid squares.
    fn depth(&self) -> u32;

    /// Terrain speed modifier for a movement class at a square.
    /// Zero means the square is impassable for that class.
    fn speed_mod(&self, move_def: &MoveDef, square: SquareCoord) -> f32;

    /// Whether a structure blocks the square for a movement class.
    fn blocked(&self, move_def: &MoveDef, square: SquareCoord) -> bool;

    /// Ground height at a square, for world-space waypoints.
    fn ground_height(&self, square: SquareCoord) -> f32;

    /// Identity of the terrain dataset, folded into the cache hash.
    fn checksum(&self) -> u32;
}

/// One movement class.
#[derive(Clone, Debug)]
pub struct MoveDef {
    /// Dense index used for vertex-cost and offset addressing.
    pub path_type: usize,
    /// Number of unit definitions referencing this class. Classes with a
    /// zero count are skipped by precompute and update.
    pub ref_count: u32,
    pub name: String,
}

impl MoveDef {
    pub fn new(path_type: usize, ref_count: u32, name: impl Into<String>) -> Self {
        Self {
            path_type,
            ref_count,
            name: name.into(),
        }
    }

    /// Whether any unit uses this class.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.ref_count > 0
    }
}

/// The set of movement classes, ordered by `path_type`.
#[derive(Clone, Debug)]
pub struct MoveDefSet {
    defs: Vec<MoveDef>,
    checksum: u32,
}

impl MoveDefSet {
    /// Build the registry view. `defs[i].path_type` must equal `i`.
    pub fn new(defs: Vec<MoveDef>) -> Self {
        debug_assert!(defs.iter().enumerate().all(|(i, d)| d.path_type == i));

        let mut hasher = Hasher::new();
        for def in &defs {
            hasher.update(def.name.as_bytes());
            hasher.update(&(def.path_type as u32).to_le_bytes());
        }
        let checksum = hasher.finalize();

        Self { defs, checksum }
    }

    /// Number of movement classes, active or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Look up a class by its dense index.
    #[inline]
    pub fn by_path_type(&self, path_type: usize) -> &MoveDef {
        &self.defs[path_type]
    }

    /// All classes in `path_type` order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MoveDef> {
        self.defs.iter()
    }

    /// Classes with a non-zero reference count, in `path_type` order.
    #[inline]
    pub fn iter_active(&self) -> impl Iterator<Item = &MoveDef> {
        self.defs.iter().filter(|d| d.is_active())
    }

    /// Identity of the class set, folded into the cache hash.
    #[inline]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }
}

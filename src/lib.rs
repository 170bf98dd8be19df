//! # Marga: Hierarchical Path Estimation for Tile Maps
//!
//! A block-graph path estimator for real-time strategy scale maps.
//! Searching a whole fine-grid map with an exact pathfinder is too
//! expensive for long-distance queries, so Marga precomputes a coarse
//! graph (one representative square per `B x B` block per movement
//! class, plus the tile-pathfinder cost of every block-to-block edge)
//! and answers queries with A* over a few hundred nodes. The fine
//! pathfinder later refines the returned block chain.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use marga::{EngineContext, EstimatorConfig, PathEstimator, RadiusGoalDef};
//!
//! // `map` implements MapData, `pf` implements TilePathFinder
//! let ctx = EngineContext::new(map, move_defs)
//!     .with_blob_store(Box::new(FileBlobStore::new("cache")));
//! let mut estimator = PathEstimator::new(
//!     pf, 16, "pe", "mymap", ctx, EstimatorConfig::default());
//!
//! let goal = RadiusGoalDef::new(goal_square, 8.0);
//! let result = estimator.do_search(&move_def, &goal, start_square, None, true);
//! let path = estimator.finish_search(&move_def);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: coordinates, directions, the canonical half-edge layout
//! - [`map`]: terrain queries and the movement-class registry view
//! - [`pathfinder`]: the fine-pathfinder seam and goal definitions
//! - [`estimator`]: the tables, the precompute pipeline, the incremental
//!   update engine, and the block A*
//! - [`cache`]: TTL memoization of search results
//! - [`io`]: blob persistence keyed by the dataset hash
//! - [`overlay`], [`progress`]: injected runtime collaborators
//!
//! ## Determinism
//!
//! Precomputed tables feed synced multiplayer state, so every cost must
//! come out bit-identical on every host. All arithmetic here is plain
//! IEEE-754 `f32`, worker scheduling never influences results, and the
//! persisted blob carries a CRC-32 anchor ([`PathEstimator::path_checksum`])
//! that hosts compare at load time.

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod estimator;
pub mod io;
pub mod map;
pub mod overlay;
pub mod path;
pub mod pathfinder;
pub mod progress;

pub use crate::core::{BlockCoord, PathDir, SquareCoord, WorldPos, SQUARE_SIZE};

pub use cache::{CacheItem, PathCache};
pub use config::EstimatorConfig;
pub use error::{MargaError, Result};
pub use estimator::{
    EngineContext, PathEstimator, MAX_SEARCHED_BLOCKS, PATHCOST_INFINITY, PATH_ESTIMATOR_VERSION,
    SQUARES_TO_UPDATE,
};
pub use io::{BlobStore, FileBlobStore, NullBlobStore};
pub use map::{MapData, MoveDef, MoveDefSet};
pub use overlay::{ExtraCostMap, FlowMap, NoExtraCost, NoFlow};
pub use path::{BlockPath, SearchResult};
pub use pathfinder::{
    PathFinderDef, RadiusGoalDef, RectConstraint, TilePath, TilePathFinder, MAX_SEARCHED_NODES_PF,
};
pub use progress::{NullProgress, PrecomputePhase, ProgressPacket, ProgressSink};

//! The hierarchical path estimator.
//!
//! Precomputes a sparse block graph over the fine tile map (one node per
//! `B x B` block, four stored edges per node) and answers long-distance
//! path queries with A* over that graph. Edge costs come from the fine
//! tile pathfinder, are persisted between runs keyed by a dataset hash,
//! and are repaired incrementally when the terrain changes.

mod block_states;
mod kernels;
mod precompute;
mod search;
mod update;

pub use block_states::{BlockStates, VertexCosts, PATHCOST_INFINITY};
pub use search::MAX_SEARCHED_BLOCKS;
pub use update::SQUARES_TO_UPDATE;

use std::collections::BinaryHeap;
use std::collections::VecDeque;
use std::sync::Arc;

use log::{info, warn};

use crate::cache::{CacheItem, PathCache, DEFAULT_LIFETIME};
use crate::config::EstimatorConfig;
use crate::core::BlockCoord;
use crate::io::{cache_file, BlobStore, NullBlobStore};
use crate::map::{MapData, MoveDefSet};
use crate::overlay::{ExtraCostMap, FlowMap, NoExtraCost, NoFlow};
use crate::path::{BlockPath, SearchResult};
use crate::pathfinder::TilePathFinder;
use crate::progress::{NullProgress, ProgressSink};

/// Bumped whenever the precomputed data layout or semantics change, so
/// stale disk caches miss on the dataset hash.
pub const PATH_ESTIMATOR_VERSION: u32 = 4;

/// Everything the host engine lends to the estimator. Only map data and
/// the movement-class registry are mandatory; the rest defaults to
/// do-nothing implementations.
pub struct EngineContext {
    pub map: Arc<dyn MapData>,
    pub move_defs: MoveDefSet,
    pub blob_store: Box<dyn BlobStore>,
    pub progress: Box<dyn ProgressSink>,
    pub flow: Box<dyn FlowMap>,
    pub extra_costs: Box<dyn ExtraCostMap>,
}

impl EngineContext {
    pub fn new(map: Arc<dyn MapData>, move_defs: MoveDefSet) -> Self {
        Self {
            map,
            move_defs,
            blob_store: Box::new(NullBlobStore),
            progress: Box::new(NullProgress),
            flow: Box::new(NoFlow),
            extra_costs: Box::new(NoExtraCost),
        }
    }

    pub fn with_blob_store(mut self, store: Box<dyn BlobStore>) -> Self {
        self.blob_store = store;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_flow(mut self, flow: Box<dyn FlowMap>) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_extra_costs(mut self, extra: Box<dyn ExtraCostMap>) -> Self {
        self.extra_costs = extra;
        self
    }
}

/// Block-graph path estimator over a fine tile map.
pub struct PathEstimator<P: TilePathFinder> {
    // collaborators
    map: Arc<dyn MapData>,
    move_defs: MoveDefSet,
    pf: P,
    config: EstimatorConfig,
    blob_store: Box<dyn BlobStore>,
    progress: Box<dyn ProgressSink>,
    flow: Box<dyn FlowMap>,
    extra_costs: Box<dyn ExtraCostMap>,

    // identity
    cache_name: String,
    map_name: String,
    path_checksum: u32,

    // tables
    states: BlockStates,
    vertex_costs: VertexCosts,

    // update engine
    updated_blocks: VecDeque<BlockCoord>,
    block_update_penalty: i32,
    blocks_to_update: usize,

    // result caches, [unsynced, synced]
    caches: [PathCache; 2],

    // search state
    open_blocks: BinaryHeap<search::OpenBlock>,
    node_buffer: Vec<search::PathNode>,
    dirty_blocks: Vec<usize>,
    start_block_idx: usize,
    goal_block_idx: usize,
    goal_heuristic: f32,
    tested_blocks: usize,
}

impl<P: TilePathFinder> PathEstimator<P> {
    /// Build an estimator with `block_size`-square blocks. Loads the
    /// precomputed tables from the blob store when a blob matching the
    /// dataset hash exists, otherwise runs the full precompute pipeline
    /// and stores the result.
    pub fn new(
        pf: P,
        block_size: u32,
        cache_name: impl Into<String>,
        map_name: impl Into<String>,
        ctx: EngineContext,
        config: EstimatorConfig,
    ) -> Self {
        let nx = (ctx.map.width() / block_size).max(1);
        let nz = (ctx.map.depth() / block_size).max(1);
        let num_blocks = nx as usize * nz as usize;
        let num_classes = ctx.move_defs.len();

        let mut estimator = Self {
            map: ctx.map,
            move_defs: ctx.move_defs,
            pf,
            config,
            blob_store: ctx.blob_store,
            progress: ctx.progress,
            flow: ctx.flow,
            extra_costs: ctx.extra_costs,
            cache_name: cache_name.into(),
            map_name: map_name.into(),
            path_checksum: 0,
            states: BlockStates::new(nx, nz, block_size, num_classes),
            vertex_costs: VertexCosts::new(num_blocks, num_classes),
            updated_blocks: VecDeque::new(),
            block_update_penalty: 0,
            blocks_to_update: SQUARES_TO_UPDATE / (block_size * block_size) as usize + 1,
            caches: [
                PathCache::new(DEFAULT_LIFETIME),
                PathCache::new(DEFAULT_LIFETIME),
            ],
            open_blocks: BinaryHeap::new(),
            node_buffer: Vec::new(),
            dirty_blocks: Vec::new(),
            start_block_idx: 0,
            goal_block_idx: 0,
            goal_heuristic: 0.0,
            tested_blocks: 0,
        };

        estimator.init();
        estimator
    }

    /// Load the cost tables from disk, or compute and store them.
    fn init(&mut self) {
        let hash = self.hash();
        info!(
            "[PathEstimator] block_size={} hash={}",
            self.block_size(),
            hash
        );

        if self.read_tables(hash) {
            return;
        }

        precompute::precompute(
            &*self.map,
            &self.move_defs,
            &mut self.states,
            &mut self.vertex_costs,
            &mut self.pf,
            &self.config,
            &*self.progress,
        );

        self.progress.load_message("PathCosts: writing", true);
        self.write_tables(hash);
        self.progress.load_message("PathCosts: written", true);
    }

    /// Name of this estimator's blob in the store. The decimal hash in
    /// the name makes stale caches miss without being opened.
    fn blob_name(&self, hash: u32) -> String {
        format!("{}{}.{}", self.map_name, hash, self.cache_name)
    }

    fn read_tables(&mut self, hash: u32) -> bool {
        let Some(bytes) = self.blob_store.read(&self.blob_name(hash)) else {
            return false;
        };

        self.progress.load_message(
            &format!("Reading estimate path costs [{}]", self.block_size()),
            false,
        );

        if !cache_file::decode(
            &bytes,
            hash,
            self.states.offsets_raw_mut(),
            self.vertex_costs.raw_mut(),
        ) {
            warn!("[PathEstimator] corrupt path cost blob, recomputing");
            return false;
        }

        self.path_checksum = cache_file::blob_checksum(&bytes);
        true
    }

    fn write_tables(&mut self, hash: u32) {
        let blob = cache_file::encode(hash, self.states.offsets_raw(), self.vertex_costs.raw());
        let name = self.blob_name(hash);

        if let Err(e) = self.blob_store.write(&name, &blob) {
            // stay usable in memory; the next run recomputes
            warn!("[PathEstimator] failed to store path costs: {e}");
            return;
        }

        // checksum what the store actually holds
        match self.blob_store.read(&name) {
            Some(bytes) => self.path_checksum = cache_file::blob_checksum(&bytes),
            None => warn!("[PathEstimator] stored blob not readable back"),
        }
    }

    /// Identity of (map, class set, block size, estimator version).
    pub fn hash(&self) -> u32 {
        self.map
            .checksum()
            .wrapping_add(self.move_defs.checksum())
            .wrapping_add(self.block_size())
            .wrapping_add(PATH_ESTIMATOR_VERSION)
    }

    /// CRC-32 of the persisted blob; zero when nothing was persisted.
    #[inline]
    pub fn path_checksum(&self) -> u32 {
        self.path_checksum
    }

    /// Memoized result for a query, if still cached.
    pub fn get_cache(
        &mut self,
        start_block: BlockCoord,
        goal_block: BlockCoord,
        goal_radius: f32,
        path_type: usize,
        synced: bool,
    ) -> Option<&CacheItem> {
        self.caches[synced as usize].get(start_block, goal_block, goal_radius, path_type)
    }

    /// Memoize a search outcome for later identical queries.
    #[allow(clippy::too_many_arguments)]
    pub fn add_cache(
        &mut self,
        path: BlockPath,
        result: SearchResult,
        start_block: BlockCoord,
        goal_block: BlockCoord,
        goal_radius: f32,
        path_type: usize,
        synced: bool,
    ) {
        self.caches[synced as usize].add(path, result, start_block, goal_block, goal_radius, path_type);
    }

    /// Block edge length in squares.
    #[inline]
    pub fn block_size(&self) -> u32 {
        self.states.block_size()
    }

    /// Block grid dimensions.
    #[inline]
    pub fn num_blocks(&self) -> (u32, u32) {
        (self.states.nx(), self.states.nz())
    }

    /// Obsolete blocks still queued for recomputation.
    #[inline]
    pub fn pending_updates(&self) -> usize {
        self.updated_blocks.len()
    }

    /// Accumulated update-throttle penalty.
    #[inline]
    pub fn block_update_penalty(&self) -> i32 {
        self.block_update_penalty
    }

    /// Block the most recent search ended at: the goal block after an
    /// `Ok`, otherwise the closest approach found.
    #[inline]
    pub fn goal_block_pos(&self) -> BlockCoord {
        BlockCoord::from_idx(self.goal_block_idx, self.states.nx())
    }

    #[inline]
    pub fn states(&self) -> &BlockStates {
        &self.states
    }

    #[inline]
    pub fn vertex_costs(&self) -> &VertexCosts {
        &self.vertex_costs
    }
}

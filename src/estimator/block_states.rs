//! Dense per-block state and the vertex-cost table.
//!
//! Both tables are allocated once at construction and written in place by
//! precompute, update, and search; there is no allocation on the query
//! path. Fields live in separate arrays (the same SoA layout the rest of
//! the engine uses for grids).

use crate::core::{node_mask, BlockCoord, SquareCoord, CANONICAL_DIRS};

/// Cost of an unusable edge.
pub const PATHCOST_INFINITY: f32 = f32::INFINITY;

/// Per-block node state: offsets, lifecycle mask, and search scratch.
pub struct BlockStates {
    nx: u32,
    nz: u32,
    block_size: u32,
    num_classes: usize,

    /// Representative square per (block, class); flat `block * M + class`.
    node_offsets: Vec<SquareCoord>,
    /// Lifecycle and search flags, see [`node_mask`].
    node_mask: Vec<u8>,
    /// A* scratch.
    f_cost: Vec<f32>,
    g_cost: Vec<f32>,
    /// Predecessor block for path reconstruction.
    parent_pos: Vec<BlockCoord>,

    /// Largest f and g cost any search has produced, for diagnostics.
    max_f_cost: f32,
    max_g_cost: f32,
}

impl BlockStates {
    pub fn new(nx: u32, nz: u32, block_size: u32, num_classes: usize) -> Self {
        let size = nx as usize * nz as usize;
        let half = (block_size / 2) as i32;

        // untouched entries (inactive classes, fully blocked blocks) must
        // still be deterministic, so seed every offset with the center
        let mut node_offsets = Vec::with_capacity(size * num_classes);
        for idx in 0..size {
            let pos = BlockCoord::from_idx(idx, nx);
            let center = SquareCoord::new(
                pos.x * block_size as i32 + half,
                pos.z * block_size as i32 + half,
            );
            node_offsets.extend(std::iter::repeat(center).take(num_classes));
        }

        Self {
            nx,
            nz,
            block_size,
            num_classes,
            node_offsets,
            node_mask: vec![0; size],
            f_cost: vec![0.0; size],
            g_cost: vec![0.0; size],
            parent_pos: vec![BlockCoord::default(); size],
            max_f_cost: 0.0,
            max_g_cost: 0.0,
        }
    }

    /// Total number of blocks.
    #[inline]
    pub fn size(&self) -> usize {
        self.nx as usize * self.nz as usize
    }

    #[inline]
    pub fn nx(&self) -> u32 {
        self.nx
    }

    #[inline]
    pub fn nz(&self) -> u32 {
        self.nz
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Whether a block coordinate lies on the grid.
    #[inline]
    pub fn contains(&self, pos: BlockCoord) -> bool {
        (pos.x as u32) < self.nx && (pos.z as u32) < self.nz
    }

    // === Offsets ===

    #[inline]
    pub fn node_offset(&self, block_idx: usize, path_type: usize) -> SquareCoord {
        self.node_offsets[block_idx * self.num_classes + path_type]
    }

    #[inline]
    pub fn set_node_offset(&mut self, block_idx: usize, path_type: usize, square: SquareCoord) {
        self.node_offsets[block_idx * self.num_classes + path_type] = square;
    }

    /// The whole offset table, block-major and class-minor, as persisted.
    #[inline]
    pub fn offsets_raw(&self) -> &[SquareCoord] {
        &self.node_offsets
    }

    #[inline]
    pub fn offsets_raw_mut(&mut self) -> &mut [SquareCoord] {
        &mut self.node_offsets
    }

    // === Node mask ===

    #[inline]
    pub fn mask(&self, block_idx: usize) -> u8 {
        self.node_mask[block_idx]
    }

    #[inline]
    pub fn set_mask_bits(&mut self, block_idx: usize, bits: u8) {
        self.node_mask[block_idx] |= bits;
    }

    #[inline]
    pub fn clear_mask_bits(&mut self, block_idx: usize, bits: u8) {
        self.node_mask[block_idx] &= !bits;
    }

    // === Search scratch ===

    #[inline]
    pub fn f_cost(&self, block_idx: usize) -> f32 {
        self.f_cost[block_idx]
    }

    #[inline]
    pub fn g_cost(&self, block_idx: usize) -> f32 {
        self.g_cost[block_idx]
    }

    #[inline]
    pub fn set_costs(&mut self, block_idx: usize, f: f32, g: f32) {
        self.f_cost[block_idx] = f;
        self.g_cost[block_idx] = g;
        self.max_f_cost = self.max_f_cost.max(f);
        self.max_g_cost = self.max_g_cost.max(g);
    }

    #[inline]
    pub fn parent_pos(&self, block_idx: usize) -> BlockCoord {
        self.parent_pos[block_idx]
    }

    #[inline]
    pub fn set_parent_pos(&mut self, block_idx: usize, pos: BlockCoord) {
        self.parent_pos[block_idx] = pos;
    }

    /// Return one block to its pristine between-searches state. The
    /// OBSOLETE bit is not search scratch and survives.
    #[inline]
    pub fn clear_search_scratch(&mut self, block_idx: usize) {
        self.node_mask[block_idx] &= !node_mask::SEARCH_SCRATCH;
        self.f_cost[block_idx] = 0.0;
        self.g_cost[block_idx] = 0.0;
        self.parent_pos[block_idx] = BlockCoord::default();
    }

    /// (max f, max g) seen across all searches.
    #[inline]
    pub fn max_costs(&self) -> (f32, f32) {
        (self.max_f_cost, self.max_g_cost)
    }
}

/// Flat edge-cost table: `class * blocks * 4 + block * 4 + canonical_dir`.
pub struct VertexCosts {
    costs: Vec<f32>,
    num_blocks: usize,
}

impl VertexCosts {
    pub fn new(num_blocks: usize, num_classes: usize) -> Self {
        Self {
            costs: vec![PATHCOST_INFINITY; num_classes * num_blocks * CANONICAL_DIRS],
            num_blocks,
        }
    }

    /// Flat index of a block's own canonical slot.
    #[inline]
    pub fn index(&self, path_type: usize, block_idx: usize, canonical_dir: usize) -> usize {
        path_type * self.num_blocks * CANONICAL_DIRS + block_idx * CANONICAL_DIRS + canonical_dir
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f32 {
        self.costs[idx]
    }

    #[inline]
    pub fn set(&mut self, idx: usize, cost: f32) {
        self.costs[idx] = cost;
    }

    #[inline]
    pub fn raw(&self) -> &[f32] {
        &self.costs
    }

    #[inline]
    pub fn raw_mut(&mut self) -> &mut [f32] {
        &mut self.costs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node_mask::{BLOCKED, CLOSED, OBSOLETE, OPEN};

    #[test]
    fn offsets_default_to_block_centers() {
        let states = BlockStates::new(3, 2, 16, 2);
        assert_eq!(states.node_offset(0, 0), SquareCoord::new(8, 8));
        assert_eq!(states.node_offset(0, 1), SquareCoord::new(8, 8));
        // block (2, 1) -> idx 5
        assert_eq!(states.node_offset(5, 0), SquareCoord::new(40, 24));
    }

    #[test]
    fn scratch_reset_preserves_obsolete() {
        let mut states = BlockStates::new(2, 2, 16, 1);
        states.set_mask_bits(1, OPEN | CLOSED | BLOCKED | OBSOLETE);
        states.set_costs(1, 10.0, 4.0);
        states.set_parent_pos(1, BlockCoord::new(1, 1));

        states.clear_search_scratch(1);

        assert_eq!(states.mask(1), OBSOLETE);
        assert_eq!(states.f_cost(1), 0.0);
        assert_eq!(states.g_cost(1), 0.0);
        assert_eq!(states.parent_pos(1), BlockCoord::default());
        assert_eq!(states.max_costs().0, 10.0);
    }

    #[test]
    fn vertex_costs_start_unusable() {
        let costs = VertexCosts::new(4, 2);
        assert_eq!(costs.len(), 2 * 4 * 4);
        assert!(costs.get(costs.index(1, 3, 2)).is_infinite());
    }
}

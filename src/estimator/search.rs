//! A* over the block graph.
//!
//! Nodes live in a bump-allocated arena; the open heap holds arena
//! indices ordered by f-cost with insertion order breaking ties. Every
//! block whose scratch state is touched goes on the dirty roster so a
//! finished search cleans up in O(touched) regardless of map size.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{error, trace};

use super::PathEstimator;
use crate::core::{
    node_mask, vertex_offset, BlockCoord, PathDir, SquareCoord, WorldPos, CANONICAL_DIRS,
};
use crate::map::MoveDef;
use crate::path::{BlockPath, SearchResult};
use crate::pathfinder::{PathFinderDef, TilePathFinder};

/// Hard cap on nodes a single block search may allocate.
pub const MAX_SEARCHED_BLOCKS: usize = 65536;

/// An expanded block in the node arena.
#[derive(Clone, Copy, Debug)]
pub(super) struct PathNode {
    pub f_cost: f32,
    pub g_cost: f32,
    pub pos: BlockCoord,
    pub block_idx: usize,
}

/// Heap handle into the node arena. Lower f-cost pops first; equal costs
/// pop in arena (insertion) order.
#[derive(Clone, Copy, Debug)]
pub(super) struct OpenBlock {
    f_cost: f32,
    node: u32,
}

impl PartialEq for OpenBlock {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for OpenBlock {}

impl Ord for OpenBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for BinaryHeap's max-heap semantics
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: TilePathFinder> PathEstimator<P> {
    /// Search the block graph from `start` toward the goal described by
    /// `def`. The result path is picked up with
    /// [`finish_search`](Self::finish_search); scratch state stays dirty
    /// until then.
    pub fn do_search(
        &mut self,
        move_def: &MoveDef,
        def: &dyn PathFinderDef,
        start: SquareCoord,
        owner: Option<u32>,
        synced: bool,
    ) -> SearchResult {
        self.reset_search();

        let start_block = start.to_block(self.block_size());
        let start_idx = start_block.to_idx(self.states.nx());

        self.start_block_idx = start_idx;
        self.goal_block_idx = start_idx;
        self.goal_heuristic = def.heuristic(self.states.node_offset(start_idx, move_def.path_type));

        trace!(
            "[BlockSearch] start=({},{}) type={} synced={} owner={:?}",
            start_block.x,
            start_block.z,
            move_def.path_type,
            synced,
            owner
        );

        self.states.set_costs(start_idx, 0.0, 0.0);
        self.states.set_mask_bits(start_idx, node_mask::OPEN);
        self.states.set_parent_pos(start_idx, start_block);
        self.dirty_blocks.push(start_idx);
        self.push_open(PathNode {
            f_cost: 0.0,
            g_cost: 0.0,
            pos: start_block,
            block_idx: start_idx,
        });

        let goal_sq_offset = def.goal_square_offset(self.block_size());
        let max_open = MAX_SEARCHED_BLOCKS - PathDir::ALL.len();
        let mut found_goal = false;

        while self.node_buffer.len() < max_open {
            let Some(open) = self.open_blocks.pop() else {
                break;
            };
            let node = self.node_buffer[open.node as usize];

            // the block may have gone unusable while queued
            if self.states.mask(node.block_idx) & (node_mask::BLOCKED | node_mask::CLOSED) != 0 {
                continue;
            }

            // goal test on the representative square and on this block's
            // square congruent to the goal
            let offset_sq = self.states.node_offset(node.block_idx, move_def.path_type);
            let goal_sq = SquareCoord::new(
                node.pos.x * self.block_size() as i32 + goal_sq_offset.x,
                node.pos.z * self.block_size() as i32 + goal_sq_offset.z,
            );
            if def.is_goal(offset_sq) || def.is_goal(goal_sq) {
                self.goal_block_idx = node.block_idx;
                self.goal_heuristic = 0.0;
                found_goal = true;
                break;
            }

            for dir in PathDir::ALL {
                self.test_block(move_def, def, node, dir, synced);
            }

            self.states.set_mask_bits(node.block_idx, node_mask::CLOSED);
        }

        if found_goal {
            return SearchResult::Ok;
        }

        // arena exhausted: the goal is farther than this search may look
        if self.node_buffer.len() >= max_open {
            return SearchResult::GoalOutOfRange;
        }

        // open set exhausted: walled in
        if self.open_blocks.is_empty() {
            return SearchResult::GoalOutOfRange;
        }

        error!("[BlockSearch] unhandled end of search");
        SearchResult::Error
    }

    /// Probe one neighbor of an expanded block and open it if it improves.
    fn test_block(
        &mut self,
        move_def: &MoveDef,
        def: &dyn PathFinderDef,
        parent: PathNode,
        dir: PathDir,
        synced: bool,
    ) -> bool {
        self.tested_blocks += 1;

        let block = parent.pos + dir.vector();
        if !self.states.contains(block) {
            return false;
        }
        let block_idx = block.to_idx(self.states.nx());

        if self.states.mask(block_idx) & (node_mask::BLOCKED | node_mask::CLOSED) != 0 {
            return false;
        }

        // edge cost, reading backward edges from the neighbor's slot
        let vertex_base = (move_def.path_type * self.states.size() + parent.block_idx) * CANONICAL_DIRS;
        let vertex_idx =
            (vertex_base as isize + vertex_offset(dir, self.states.nx())) as usize;
        let vertex_cost = self.vertex_costs.get(vertex_idx);
        if vertex_cost.is_infinite() {
            return false;
        }

        let square = self.states.node_offset(block_idx, move_def.path_type);

        if !def.within_constraints(square) {
            self.states.set_mask_bits(block_idx, node_mask::BLOCKED);
            self.dirty_blocks.push(block_idx);
            return false;
        }

        let flow_cost = self.flow.flow_cost(square, move_def, dir);
        let extra_cost = self.extra_costs.extra_cost(square, synced);
        let node_cost = vertex_cost + flow_cost + extra_cost;

        let g_cost = parent.g_cost + node_cost;
        let h_cost = def.heuristic(square);
        let f_cost = g_cost + h_cost;

        if self.states.mask(block_idx) & node_mask::OPEN != 0 {
            if self.states.f_cost(block_idx) <= f_cost {
                return true;
            }
            self.states.clear_mask_bits(block_idx, node_mask::CARDINALS);
        }

        // remember the closest approach for unreachable goals
        if h_cost < self.goal_heuristic {
            self.goal_block_idx = block_idx;
            self.goal_heuristic = h_cost;
        }

        self.push_open(PathNode {
            f_cost,
            g_cost,
            pos: block,
            block_idx,
        });

        self.states.set_costs(block_idx, f_cost, g_cost);
        self.states
            .set_mask_bits(block_idx, dir.to_opt_bits() | node_mask::OPEN);
        self.states.set_parent_pos(block_idx, parent.pos);
        self.dirty_blocks.push(block_idx);
        true
    }

    /// Walk the parent chain from the reached (or closest) block back to
    /// the start, emitting world-space waypoints, then recycle all search
    /// scratch. Waypoints come out goal-first; the start block emits none.
    pub fn finish_search(&mut self, move_def: &MoveDef) -> BlockPath {
        let mut path = BlockPath::default();

        let mut block_idx = self.goal_block_idx;
        while block_idx != self.start_block_idx {
            let square = self.states.node_offset(block_idx, move_def.path_type);
            path.waypoints.push(WorldPos::from_square(
                square,
                self.map.ground_height(square),
            ));

            block_idx = self
                .states
                .parent_pos(block_idx)
                .to_idx(self.states.nx());
        }

        if let Some(&front) = path.waypoints.first() {
            path.path_goal = front;
        }
        path.cost = self.states.f_cost(self.goal_block_idx) - self.goal_heuristic;

        self.reset_search();
        path
    }

    /// Blocks probed by the most recent search.
    #[inline]
    pub fn tested_blocks(&self) -> usize {
        self.tested_blocks
    }

    fn push_open(&mut self, node: PathNode) {
        let arena_idx = self.node_buffer.len() as u32;
        self.node_buffer.push(node);
        self.open_blocks.push(OpenBlock {
            f_cost: node.f_cost,
            node: arena_idx,
        });
    }

    /// Return every touched block to its between-searches state.
    fn reset_search(&mut self) {
        for block_idx in self.dirty_blocks.drain(..) {
            self.states.clear_search_scratch(block_idx);
        }
        self.open_blocks.clear();
        self.node_buffer.clear();
        self.tested_blocks = 0;
    }
}

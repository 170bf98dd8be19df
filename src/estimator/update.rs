//! Incremental recomputation of obsolete blocks.
//!
//! Terrain mutations mark whole blocks obsolete and queue them; each game
//! tick then repairs a bounded batch. The batch size adapts to the queue
//! length and is damped by a penalty account so a long queue cannot starve
//! the tick.

use rayon::prelude::*;
use std::cmp::Ordering;

use log::trace;

use super::kernels::{calculate_vertices, find_offset};
use super::PathEstimator;
use crate::core::{node_mask, BlockCoord};
use crate::pathfinder::TilePathFinder;

/// Fine-grid squares one update tick is sized for; the per-tick block
/// quota is this divided by the block area.
pub const SQUARES_TO_UPDATE: usize = 1000;

impl<P: TilePathFinder> PathEstimator<P> {
    /// Mark every block touching the square rectangle as obsolete and
    /// queue it for recomputation. Corners may be given in any order.
    ///
    /// Blocks are queued from the upper corner down: recomputing a block
    /// rewrites edges stored at its upper/left neighbors, so walking
    /// high-to-low keeps the rewrites inside the batch when neighbors are
    /// obsolete together.
    pub fn map_changed(&mut self, x1: i32, z1: i32, x2: i32, z2: i32) {
        let bs = self.block_size() as i32;
        let clamp_x = |v: i32| (v / bs).clamp(0, self.states.nx() as i32 - 1);
        let clamp_z = |v: i32| (v / bs).clamp(0, self.states.nz() as i32 - 1);

        let (lower_x, upper_x) = (clamp_x(x1.min(x2)), clamp_x(x1.max(x2)));
        let (lower_z, upper_z) = (clamp_z(z1.min(z2)), clamp_z(z1.max(z2)));

        for z in (lower_z..=upper_z).rev() {
            for x in (lower_x..=upper_x).rev() {
                let pos = BlockCoord::new(x, z);
                let idx = pos.to_idx(self.states.nx());
                if self.states.mask(idx) & node_mask::OBSOLETE != 0 {
                    continue;
                }

                self.updated_blocks.push_back(pos);
                self.states.set_mask_bits(idx, node_mask::OBSOLETE);
            }
        }
    }

    /// One tick of incremental recompute: age the result caches, then
    /// repair a budgeted batch of queued blocks.
    pub fn update(&mut self) {
        self.caches[0].update();
        self.caches[1].update();

        let num_classes = self.move_defs.len().max(1);
        let consume = self.consume_budget(num_classes);
        if consume == 0 {
            return;
        }

        // drain the queue head; entries whose OBSOLETE bit was already
        // cleared are stale duplicates and just fall out
        let mut tasks: Vec<(BlockCoord, usize)> = Vec::with_capacity(consume);
        while let Some(&pos) = self.updated_blocks.front() {
            let idx = pos.to_idx(self.states.nx());
            if self.states.mask(idx) & node_mask::OBSOLETE == 0 {
                self.updated_blocks.pop_front();
                continue;
            }

            if tasks.len() >= consume {
                break;
            }

            for move_def in self.move_defs.iter_active() {
                tasks.push((pos, move_def.path_type));
            }
            self.updated_blocks.pop_front();
        }

        trace!(
            "[Update] {} tasks, {} blocks still queued",
            tasks.len(),
            self.updated_blocks.len()
        );

        // offset pass: pure reads against map data, disjoint writes after
        let map = &*self.map;
        let move_defs = &self.move_defs;
        let block_size = self.states.block_size();
        let nx = self.states.nx();
        let offsets: Vec<_> = tasks
            .par_iter()
            .map(|&(pos, path_type)| {
                let move_def = move_defs.by_path_type(path_type);
                (
                    pos.to_idx(nx),
                    path_type,
                    find_offset(map, move_def, pos, block_size),
                )
            })
            .collect();
        for (block_idx, path_type, square) in offsets {
            self.states.set_node_offset(block_idx, path_type, square);
        }

        // vertex pass: sequential, the runtime pathfinder is not reentrant
        for n in 0..tasks.len() {
            let (pos, path_type) = tasks[n];
            let block_idx = pos.to_idx(self.states.nx());
            let move_def = self.move_defs.by_path_type(path_type);

            let costs =
                calculate_vertices(&*self.map, &mut self.pf, move_def, &self.states, pos);
            for (dir, cost) in costs.into_iter().enumerate() {
                let idx = self.vertex_costs.index(path_type, block_idx, dir);
                self.vertex_costs.set(idx, cost);
            }

            // tasks for one block arrive in ascending path_type order, so a
            // non-increasing successor means the block is finished
            let block_done = match tasks.get(n + 1) {
                Some(&(_, next_type)) => next_type <= path_type,
                None => true,
            };
            if block_done {
                self.states.clear_mask_bits(block_idx, node_mask::OBSOLETE);
            }
        }
    }

    /// Size this tick's batch in class-tasks and book the penalty.
    fn consume_budget(&mut self, num_classes: usize) -> usize {
        let scale = if self.block_size() >= 16 { 1.0 } else { 0.6 };
        let desired = (self.updated_blocks.len() * num_classes) as f32
            * scale
            * self.config.pf_update_rate;
        let desired = desired as i32;

        let min_blocks = (self.blocks_to_update / 2).max(4) as i32;
        let max_blocks = ((self.blocks_to_update * 2) as i32).max(min_blocks);
        let mut budget = desired.clamp(min_blocks, max_blocks);

        self.block_update_penalty = 0.max(self.block_update_penalty - budget);
        if self.block_update_penalty > 0 {
            budget = 0.max(budget - self.block_update_penalty);
        }

        // an idle tick only decays the penalty
        if self.updated_blocks.is_empty() {
            return 0;
        }

        // round up to whole blocks: every consumed block gets all classes
        let consume = match budget.cmp(&0) {
            Ordering::Greater => {
                (budget as f32 / num_classes as f32).ceil() as i32 * num_classes as i32
            }
            _ => 0,
        };
        self.block_update_penalty += consume;

        consume as usize
    }
}

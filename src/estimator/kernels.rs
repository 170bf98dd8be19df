//! The two per-block computation kernels shared by the precompute
//! pipeline and the incremental update engine.

use super::block_states::{BlockStates, PATHCOST_INFINITY};
use crate::core::{BlockCoord, PathDir, SquareCoord, SQUARE_SIZE};
use crate::map::{MapData, MoveDef};
use crate::pathfinder::{RectConstraint, TilePathFinder, MAX_SEARCHED_NODES_PF};

/// Find the square a movement class should use to represent a block.
///
/// Scans the block for accessible squares and scores each by distance to
/// the block center plus a speed penalty; the cheapest wins. A fully
/// inaccessible block keeps its geometric center.
///
/// Pure with respect to shared state, so callers may run it in parallel
/// for disjoint (block, class) pairs.
pub fn find_offset(
    map: &dyn MapData,
    move_def: &MoveDef,
    block: BlockCoord,
    block_size: u32,
) -> SquareCoord {
    let bs = block_size as i32;
    let lower_x = block.x * bs;
    let lower_z = block.z * bs;
    let block_area = (bs * bs / SQUARE_SIZE) as f32;

    let mut best_x = bs >> 1;
    let mut best_z = bs >> 1;
    let mut best_cost = f32::MAX;

    for z in 0..bs {
        for x in 0..bs {
            let square = SquareCoord::new(lower_x + x, lower_z + z);
            let speed_mod = map.speed_mod(move_def, square);
            if speed_mod == 0.0 || map.blocked(move_def, square) {
                continue;
            }

            let dx = x as f32 - (bs - 1) as f32 / 2.0;
            let dz = z as f32 - (bs - 1) as f32 / 2.0;
            let cost = (dx * dx + dz * dz) + block_area / (0.001 + speed_mod);

            if cost < best_cost {
                best_cost = cost;
                best_x = x;
                best_z = z;
            }
        }
    }

    SquareCoord::new(lower_x + best_x, lower_z + best_z)
}

/// Measure the traversal cost of the edge `parent -> parent + dir`.
///
/// The tile pathfinder runs between the two representative squares inside
/// a constraint spanning exactly the union of the two blocks. Every
/// failure mode (off the grid, blocked endpoint, no path) collapses to an
/// unusable edge.
pub fn calculate_vertex<P: TilePathFinder>(
    map: &dyn MapData,
    pf: &mut P,
    move_def: &MoveDef,
    states: &BlockStates,
    parent: BlockCoord,
    dir: PathDir,
) -> f32 {
    let child = parent + dir.vector();
    if !states.contains(child) {
        return PATHCOST_INFINITY;
    }

    let parent_idx = parent.to_idx(states.nx());
    let child_idx = child.to_idx(states.nx());
    let start = states.node_offset(parent_idx, move_def.path_type);
    let goal = states.node_offset(child_idx, move_def.path_type);

    // blocked endpoints would let the estimator and the fine pathfinder
    // disagree about reachability
    if map.blocked(move_def, start) || map.blocked(move_def, goal) {
        return PATHCOST_INFINITY;
    }

    let constraint = RectConstraint::spanning_blocks(start, goal, states.block_size());
    match pf.search(move_def, &constraint, start, goal, MAX_SEARCHED_NODES_PF / 4) {
        Some(path) => path.cost,
        None => PATHCOST_INFINITY,
    }
}

/// The four canonical edge costs of a block, in storage order.
pub fn calculate_vertices<P: TilePathFinder>(
    map: &dyn MapData,
    pf: &mut P,
    move_def: &MoveDef,
    states: &BlockStates,
    parent: BlockCoord,
) -> [f32; 4] {
    PathDir::CANONICAL.map(|dir| calculate_vertex(map, pf, move_def, states, parent, dir))
}

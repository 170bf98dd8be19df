//! Initial fill of the offset and vertex-cost tables.
//!
//! Two phases over every block: find representative squares, then measure
//! the four canonical edges of each block. Measuring an edge reads the
//! offsets of the block and of its neighbor, so phase A must be globally
//! complete before any phase B work starts; each phase is a fork-join
//! scope and the merge between them is the barrier.
//!
//! Workers pull block indices from a shared countdown and stay private:
//! results are collected per worker and merged on the caller thread, and
//! every worker drives its own tile-pathfinder instance (the pathfinder is
//! not reentrant). Worker count is bounded by the configured memory
//! budget for those instances.

use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

use log::info;

use super::block_states::{BlockStates, VertexCosts};
use super::kernels::{calculate_vertices, find_offset};
use crate::config::EstimatorConfig;
use crate::core::{BlockCoord, SquareCoord};
use crate::map::{MapData, MoveDef, MoveDefSet};
use crate::pathfinder::TilePathFinder;
use crate::progress::{PrecomputePhase, ProgressPacket, ProgressSink};

/// How often thread 0 reports: every `total / PROGRESS_STEPS` blocks.
const PROGRESS_STEPS: usize = 16;

pub fn precompute<P: TilePathFinder>(
    map: &dyn MapData,
    move_defs: &MoveDefSet,
    states: &mut BlockStates,
    vertex_costs: &mut VertexCosts,
    pf: &mut P,
    config: &EstimatorConfig,
    progress: &dyn ProgressSink,
) {
    let threads = config.thread_count().max(1);

    // every extra worker costs one private pathfinder; keep the total
    // footprint inside the configured budget
    let footprint = std::mem::size_of::<P>() + pf.mem_footprint();
    let max_extra = (config.max_mem_bytes() / footprint.max(1)).saturating_sub(1);
    let num_extra = max_extra.min(threads - 1);
    let workers = num_extra + 1;
    let req_mb = footprint * workers / (1024 * 1024);

    info!(
        "[Precompute] block_size={} workers={} footprint={}MB",
        states.block_size(),
        workers,
        req_mb
    );
    progress.load_message(
        &format!(
            "PathCosts: creating {} cache with {} pathfinder {} ({} MB)",
            states.block_size(),
            workers,
            if workers > 1 { "threads" } else { "thread" },
            req_mb
        ),
        false,
    );

    let active: Vec<&MoveDef> = move_defs.iter_active().collect();
    let total = states.size();
    let block_size = states.block_size();
    let nx = states.nx();

    // === Phase A: representative squares ===

    let remaining = AtomicI64::new(total as i64);
    let offsets: Vec<Vec<(usize, usize, SquareCoord)>> = thread::scope(|scope| {
        let active = &active;
        let remaining = &remaining;
        let handles: Vec<_> = (1..=num_extra)
            .map(|i| {
                thread::Builder::new()
                    .name(format!("pathhelper{i}"))
                    .spawn_scoped(scope, move || {
                        offset_worker(map, active, remaining, total, nx, block_size, None)
                    })
                    .expect("failed to spawn offset worker")
            })
            .collect();

        let mut per_worker = vec![offset_worker(
            map,
            active,
            remaining,
            total,
            nx,
            block_size,
            Some(progress),
        )];
        for handle in handles {
            per_worker.push(handle.join().expect("offset worker panicked"));
        }
        per_worker
    });

    for (block_idx, path_type, square) in offsets.into_iter().flatten() {
        states.set_node_offset(block_idx, path_type, square);
    }

    // === Phase B: canonical edge costs ===

    let mut extra_pfs: Vec<P> = (0..num_extra).map(|_| pf.fresh()).collect();
    let remaining = AtomicI64::new(total as i64);
    let states_ref = &*states;

    let costs: Vec<Vec<(usize, usize, [f32; 4])>> = thread::scope(|scope| {
        let active = &active;
        let remaining = &remaining;
        let handles: Vec<_> = extra_pfs
            .iter_mut()
            .enumerate()
            .map(|(i, worker_pf)| {
                thread::Builder::new()
                    .name(format!("pathhelper{}", i + 1))
                    .spawn_scoped(scope, move || {
                        vertex_worker(map, active, states_ref, remaining, total, worker_pf, None)
                    })
                    .expect("failed to spawn vertex worker")
            })
            .collect();

        let mut per_worker = vec![vertex_worker(
            map,
            active,
            states_ref,
            remaining,
            total,
            pf,
            Some(progress),
        )];
        for handle in handles {
            per_worker.push(handle.join().expect("vertex worker panicked"));
        }
        per_worker
    });

    for (path_type, block_idx, block_costs) in costs.into_iter().flatten() {
        for (dir, cost) in block_costs.into_iter().enumerate() {
            let idx = vertex_costs.index(path_type, block_idx, dir);
            vertex_costs.set(idx, cost);
        }
    }
}

/// Claim the next block off the countdown; the fetched ticket `i` maps to
/// block `total - 1 - i` so all workers walk the same global sequence.
#[inline]
fn next_block(remaining: &AtomicI64, total: usize) -> Option<usize> {
    let i = remaining.fetch_sub(1, Ordering::SeqCst) - 1;
    if i < 0 {
        None
    } else {
        Some(total - 1 - i as usize)
    }
}

fn offset_worker(
    map: &dyn MapData,
    active: &[&MoveDef],
    remaining: &AtomicI64,
    total: usize,
    nx: u32,
    block_size: u32,
    progress: Option<&dyn ProgressSink>,
) -> Vec<(usize, usize, SquareCoord)> {
    let mut out = Vec::new();
    let mut next_msg_idx = 0usize;

    while let Some(block_idx) = next_block(remaining, total) {
        if let Some(sink) = progress {
            if block_idx >= next_msg_idx {
                next_msg_idx = block_idx + total / PROGRESS_STEPS;
                sink.cpu_usage(ProgressPacket {
                    phase: PrecomputePhase::Offsets,
                    block_size,
                    block_idx,
                });
            }
        }

        let block = BlockCoord::from_idx(block_idx, nx);
        for &move_def in active {
            out.push((
                block_idx,
                move_def.path_type,
                find_offset(map, move_def, block, block_size),
            ));
        }
    }

    out
}

fn vertex_worker<P: TilePathFinder>(
    map: &dyn MapData,
    active: &[&MoveDef],
    states: &BlockStates,
    remaining: &AtomicI64,
    total: usize,
    pf: &mut P,
    progress: Option<&dyn ProgressSink>,
) -> Vec<(usize, usize, [f32; 4])> {
    let mut out = Vec::new();
    let mut next_msg_idx = 0usize;

    while let Some(block_idx) = next_block(remaining, total) {
        if let Some(sink) = progress {
            if block_idx >= next_msg_idx {
                next_msg_idx = block_idx + total / PROGRESS_STEPS;
                sink.cpu_usage(ProgressPacket {
                    phase: PrecomputePhase::Vertices,
                    block_size: states.block_size(),
                    block_idx,
                });
                sink.load_message(
                    &format!("PathCosts: precached {} of {} blocks", block_idx, total),
                    block_idx != 0,
                );
            }
        }

        let block = BlockCoord::from_idx(block_idx, states.nx());
        for &move_def in active {
            out.push((
                move_def.path_type,
                block_idx,
                calculate_vertices(map, pf, move_def, states, block),
            ));
        }
    }

    out
}

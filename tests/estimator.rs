//! End-to-end scenarios against the in-memory map fixture.

mod common;

use std::sync::{Arc, Mutex};

use common::{single_class, GridMap, GridPathFinder};
use marga::core::node_mask;
use marga::{
    BlockCoord, EngineContext, EstimatorConfig, FileBlobStore, MoveDef, PathEstimator,
    ProgressPacket, ProgressSink, RadiusGoalDef, SearchResult, SquareCoord,
};

fn build(
    map: Arc<GridMap>,
    block_size: u32,
    config: EstimatorConfig,
    ctx: impl FnOnce(EngineContext) -> EngineContext,
) -> PathEstimator<GridPathFinder> {
    let pf = GridPathFinder::new(Arc::clone(&map));
    let context = ctx(EngineContext::new(map, single_class()));
    PathEstimator::new(pf, block_size, "pe", "testmap", context, config)
}

fn tank() -> MoveDef {
    MoveDef::new(0, 1, "tank")
}

// === Seed scenarios ===

#[test]
fn empty_search_start_is_goal() {
    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(map, 16, EstimatorConfig::default(), |c| c);

    let def = RadiusGoalDef::new(SquareCoord::new(0, 0), 0.0);
    let result = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    assert_eq!(result, SearchResult::Ok);

    let path = est.finish_search(&tank());
    assert!(path.is_empty());
    assert_eq!(path.cost, 0.0);
}

#[test]
fn diagonal_goal_is_reachable() {
    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(map, 16, EstimatorConfig::default(), |c| c);

    let def = RadiusGoalDef::new(SquareCoord::new(56, 56), 0.0);
    let result = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    assert_eq!(result, SearchResult::Ok);
    assert_eq!(est.goal_block_pos(), BlockCoord::new(3, 3));

    let path = est.finish_search(&tank());
    // blocks (3,3), (2,2), (1,1); the start block emits no waypoint
    assert_eq!(path.waypoints.len(), 3);
    assert!(path.cost > 0.0);
    assert_eq!(path.path_goal, path.waypoints[0]);
}

#[test]
fn wall_yields_nearest_reachable_block() {
    let map = Arc::new(GridMap::open(64, 64));
    // block column bx=2 becomes impassable before precompute
    map.block_rect(32, 0, 47, 63);
    let mut est = build(map, 16, EstimatorConfig::default(), |c| c);

    let def = RadiusGoalDef::new(SquareCoord::new(56, 8), 0.0);
    let result = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    assert_eq!(result, SearchResult::GoalOutOfRange);
    assert_eq!(est.goal_block_pos(), BlockCoord::new(1, 0));

    let path = est.finish_search(&tank());
    assert_eq!(path.waypoints.len(), 1);
}

#[test]
fn map_changed_queues_blocks_and_update_clears_them() {
    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| c);

    est.map_changed(32, 0, 47, 63);
    assert_eq!(est.pending_updates(), 4);
    let (nx, _) = est.num_blocks();
    for z in 0..4 {
        let idx = BlockCoord::new(2, z).to_idx(nx);
        assert_ne!(est.states().mask(idx) & node_mask::OBSOLETE, 0);
    }

    // re-marking the same rectangle must not duplicate queue entries
    est.map_changed(32, 0, 47, 63);
    assert_eq!(est.pending_updates(), 4);

    est.update();
    assert_eq!(est.pending_updates(), 0);
    for z in 0..4 {
        let idx = BlockCoord::new(2, z).to_idx(nx);
        assert_eq!(est.states().mask(idx) & node_mask::OBSOLETE, 0);
    }
}

#[test]
fn long_queue_is_throttled_to_the_minimum_budget() {
    let map = Arc::new(GridMap::open(128, 128));
    let config = EstimatorConfig {
        pf_update_rate: 0.0001,
        ..Default::default()
    };
    let mut est = build(map, 4, config, |c| c);

    est.map_changed(0, 0, 127, 127);
    assert_eq!(est.pending_updates(), 1024);
    assert_eq!(est.block_update_penalty(), 0);

    est.update();
    // BLOCKS_TO_UPDATE = 1000/16 + 1 = 63, so the floor is 31 blocks
    assert_eq!(est.pending_updates(), 1024 - 31);
    assert!(est.block_update_penalty() > 0);
}

#[derive(Default)]
struct RecordingProgress {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingProgress {
    fn load_message(&self, msg: &str, _replace: bool) {
        self.messages.lock().unwrap().push(msg.to_owned());
    }

    fn cpu_usage(&self, _packet: ProgressPacket) {}
}

struct SharedProgress(Arc<RecordingProgress>);

impl ProgressSink for SharedProgress {
    fn load_message(&self, msg: &str, replace: bool) {
        self.0.load_message(msg, replace);
    }

    fn cpu_usage(&self, packet: ProgressPacket) {
        self.0.cpu_usage(packet);
    }
}

#[test]
fn persisted_tables_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let map = Arc::new(GridMap::open(64, 64));
    map.block_rect(20, 20, 27, 43);

    let first = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| {
        c.with_blob_store(Box::new(FileBlobStore::new(dir.path())))
    });
    assert_ne!(first.path_checksum(), 0);
    let offsets = first.states().offsets_raw().to_vec();
    let costs = first.vertex_costs().raw().to_vec();
    let checksum = first.path_checksum();
    drop(first);

    let progress = Arc::new(RecordingProgress::default());
    let second = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| {
        c.with_blob_store(Box::new(FileBlobStore::new(dir.path())))
            .with_progress(Box::new(SharedProgress(Arc::clone(&progress))))
    });

    let messages = progress.messages.lock().unwrap();
    assert!(
        messages.iter().any(|m| m.starts_with("Reading")),
        "expected a cache load, got {messages:?}"
    );
    assert_eq!(second.states().offsets_raw(), &offsets[..]);
    assert_eq!(second.vertex_costs().raw(), &costs[..]);
    assert_eq!(second.path_checksum(), checksum);
}

// === Invariants and properties ===

#[test]
fn finite_edges_have_unblocked_endpoints() {
    use marga::{MapData, PathDir};

    let map = Arc::new(GridMap::open(64, 64));
    map.block_rect(32, 0, 47, 63);
    let est = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| c);

    let (nx, nz) = est.num_blocks();
    let md = tank();
    for idx in 0..(nx * nz) as usize {
        let pos = BlockCoord::from_idx(idx, nx);
        for (dir_slot, dir) in PathDir::CANONICAL.into_iter().enumerate() {
            let cost = est.vertex_costs().get(est.vertex_costs().index(0, idx, dir_slot));
            if cost.is_infinite() {
                continue;
            }

            let neighbor = pos + dir.vector();
            let neighbor_idx = neighbor.to_idx(nx);
            let start = est.states().node_offset(idx, 0);
            let goal = est.states().node_offset(neighbor_idx, 0);
            assert!(!map.blocked(&md, start), "blocked start at {pos:?} {dir:?}");
            assert!(!map.blocked(&md, goal), "blocked goal at {pos:?} {dir:?}");
        }
    }
}

#[test]
fn offsets_stay_inside_their_block() {
    let map = Arc::new(GridMap::open(64, 64));
    map.block_rect(32, 0, 47, 63);
    let est = build(map, 16, EstimatorConfig::default(), |c| c);

    let (nx, nz) = est.num_blocks();
    for idx in 0..(nx * nz) as usize {
        let pos = BlockCoord::from_idx(idx, nx);
        let offset = est.states().node_offset(idx, 0);
        assert!(offset.x >= pos.x * 16 && offset.x < (pos.x + 1) * 16);
        assert!(offset.z >= pos.z * 16 && offset.z < (pos.z + 1) * 16);
    }
}

#[test]
fn search_scratch_is_recycled() {
    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(map, 16, EstimatorConfig::default(), |c| c);

    let def = RadiusGoalDef::new(SquareCoord::new(56, 56), 0.0);
    let first = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    let first_path = est.finish_search(&tank());

    let (nx, nz) = est.num_blocks();
    for idx in 0..(nx * nz) as usize {
        assert_eq!(est.states().mask(idx) & node_mask::SEARCH_SCRATCH, 0);
        assert_eq!(est.states().f_cost(idx), 0.0);
        assert_eq!(est.states().g_cost(idx), 0.0);
    }

    // identical query must reproduce the identical answer
    let second = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    let second_path = est.finish_search(&tank());
    assert_eq!(first, second);
    assert_eq!(first_path.cost, second_path.cost);
    assert_eq!(first_path.waypoints.len(), second_path.waypoints.len());
}

#[test]
fn precompute_is_deterministic() {
    let map = Arc::new(GridMap::open(64, 64));
    map.block_rect(8, 8, 23, 55);
    map.set_speed_rect(48, 0, 63, 63, 0.5);

    let a = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| c);
    let b = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| c);

    assert_eq!(a.states().offsets_raw(), b.states().offsets_raw());
    assert_eq!(a.vertex_costs().raw(), b.vertex_costs().raw());
    assert_eq!(a.hash(), b.hash());
}

#[test]
fn update_drains_the_queue_monotonically() {
    let map = Arc::new(GridMap::open(128, 128));
    let config = EstimatorConfig {
        pf_update_rate: 0.0001,
        ..Default::default()
    };
    let mut est = build(map, 4, config, |c| c);

    est.map_changed(0, 0, 127, 127);
    let mut pending = est.pending_updates();
    while pending > 0 {
        est.update();
        let now = est.pending_updates();
        assert!(now < pending, "queue stalled at {now}");
        pending = now;
    }
}

#[test]
fn update_repairs_stale_edges() {
    use marga::PATHCOST_INFINITY;

    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(Arc::clone(&map), 16, EstimatorConfig::default(), |c| c);

    let (nx, _) = est.num_blocks();
    // edge (2,1) -> (1,1) starts out usable
    let idx = BlockCoord::new(2, 1).to_idx(nx);
    let left_slot = est.vertex_costs().index(0, idx, 0);
    assert!(est.vertex_costs().get(left_slot).is_finite());

    map.block_rect(32, 0, 47, 63);
    est.map_changed(32, 0, 47, 63);
    est.update();

    assert_eq!(est.vertex_costs().get(left_slot), PATHCOST_INFINITY);
    assert_eq!(est.pending_updates(), 0);
}

#[test]
fn result_caches_are_context_separated() {
    let map = Arc::new(GridMap::open(64, 64));
    let mut est = build(map, 16, EstimatorConfig::default(), |c| c);

    let start = BlockCoord::new(0, 0);
    let goal = BlockCoord::new(3, 3);
    assert!(est.get_cache(start, goal, 8.0, 0, true).is_none());

    let def = RadiusGoalDef::new(SquareCoord::new(56, 56), 8.0);
    let result = est.do_search(&tank(), &def, SquareCoord::new(0, 0), None, true);
    let path = est.finish_search(&tank());
    est.add_cache(path, result, start, goal, 8.0, 0, true);

    let hit = est.get_cache(start, goal, 8.0, 0, true).unwrap();
    assert_eq!(hit.result, SearchResult::Ok);

    // the unsynced cache must not see synced entries
    assert!(est.get_cache(start, goal, 8.0, 0, false).is_none());
}

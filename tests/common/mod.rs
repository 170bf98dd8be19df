//! Shared fixtures: an in-memory tile map and a reference tile pathfinder.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use marga::{
    MapData, MoveDef, MoveDefSet, RectConstraint, SquareCoord, TilePath, TilePathFinder,
    SQUARE_SIZE,
};

/// Uniform-speed tile map with mutable structural blocking.
pub struct GridMap {
    width: u32,
    depth: u32,
    checksum: u32,
    cells: RwLock<Cells>,
}

struct Cells {
    speed: Vec<f32>,
    blocked: Vec<bool>,
}

impl GridMap {
    /// Open map, speed 1.0 everywhere.
    pub fn open(width: u32, depth: u32) -> Self {
        let size = (width * depth) as usize;
        Self {
            width,
            depth,
            checksum: 0xC0FF_EE00 ^ (width.wrapping_mul(31)) ^ depth,
            cells: RwLock::new(Cells {
                speed: vec![1.0; size],
                blocked: vec![false; size],
            }),
        }
    }

    #[inline]
    fn idx(&self, square: SquareCoord) -> Option<usize> {
        if (square.x as u32) < self.width && (square.z as u32) < self.depth {
            Some(square.z as usize * self.width as usize + square.x as usize)
        } else {
            None
        }
    }

    /// Structurally block every square in the inclusive rectangle.
    pub fn block_rect(&self, x1: i32, z1: i32, x2: i32, z2: i32) {
        let mut cells = self.cells.write().unwrap();
        for z in z1..=z2 {
            for x in x1..=x2 {
                if let Some(i) = self.idx(SquareCoord::new(x, z)) {
                    cells.blocked[i] = true;
                }
            }
        }
    }

    /// Set the terrain speed modifier in the inclusive rectangle.
    pub fn set_speed_rect(&self, x1: i32, z1: i32, x2: i32, z2: i32, speed: f32) {
        let mut cells = self.cells.write().unwrap();
        for z in z1..=z2 {
            for x in x1..=x2 {
                if let Some(i) = self.idx(SquareCoord::new(x, z)) {
                    cells.speed[i] = speed;
                }
            }
        }
    }
}

impl MapData for GridMap {
    fn width(&self) -> u32 {
        self.width
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn speed_mod(&self, _move_def: &MoveDef, square: SquareCoord) -> f32 {
        match self.idx(square) {
            Some(i) => self.cells.read().unwrap().speed[i],
            None => 0.0,
        }
    }

    fn blocked(&self, _move_def: &MoveDef, square: SquareCoord) -> bool {
        match self.idx(square) {
            Some(i) => self.cells.read().unwrap().blocked[i],
            None => true,
        }
    }

    fn ground_height(&self, _square: SquareCoord) -> f32 {
        0.0
    }

    fn checksum(&self) -> u32 {
        self.checksum
    }
}

/// Plain octile A* over the fine grid; the reference tile pathfinder.
pub struct GridPathFinder {
    map: Arc<GridMap>,
}

impl GridPathFinder {
    pub fn new(map: Arc<GridMap>) -> Self {
        Self { map }
    }

    fn passable(&self, move_def: &MoveDef, square: SquareCoord) -> bool {
        self.map.speed_mod(move_def, square) > 0.0 && !self.map.blocked(move_def, square)
    }
}

#[derive(Clone, Copy)]
struct Node {
    square: SquareCoord,
    g_cost: f32,
    f_cost: f32,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.square == other.square
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(from: SquareCoord, to: SquareCoord) -> f32 {
    from.distance_sq(to).sqrt() * SQUARE_SIZE as f32
}

impl TilePathFinder for GridPathFinder {
    fn mem_footprint(&self) -> usize {
        64 * 1024
    }

    fn fresh(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
        }
    }

    fn search(
        &mut self,
        move_def: &MoveDef,
        constraint: &RectConstraint,
        start: SquareCoord,
        goal: SquareCoord,
        max_nodes: usize,
    ) -> Option<TilePath> {
        if !self.passable(move_def, start) || !self.passable(move_def, goal) {
            return None;
        }

        let mut open = BinaryHeap::new();
        let mut g_scores: HashMap<SquareCoord, f32> = HashMap::new();
        let mut came_from: HashMap<SquareCoord, SquareCoord> = HashMap::new();
        let mut closed: HashSet<SquareCoord> = HashSet::new();

        g_scores.insert(start, 0.0);
        open.push(Node {
            square: start,
            g_cost: 0.0,
            f_cost: heuristic(start, goal),
        });

        let mut expanded = 0;
        while let Some(current) = open.pop() {
            expanded += 1;
            if expanded > max_nodes {
                return None;
            }

            if current.square == goal {
                let mut squares = vec![goal];
                let mut walk = goal;
                while let Some(&prev) = came_from.get(&walk) {
                    squares.push(prev);
                    walk = prev;
                }
                squares.reverse();
                return Some(TilePath {
                    squares,
                    cost: current.g_cost,
                });
            }

            if !closed.insert(current.square) {
                continue;
            }

            for dz in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dz == 0 {
                        continue;
                    }
                    let next =
                        SquareCoord::new(current.square.x + dx, current.square.z + dz);
                    if !constraint.contains(next)
                        || closed.contains(&next)
                        || !self.passable(move_def, next)
                    {
                        continue;
                    }

                    let step = if dx != 0 && dz != 0 {
                        std::f32::consts::SQRT_2
                    } else {
                        1.0
                    };
                    let speed = self.map.speed_mod(move_def, next);
                    let tentative = current.g_cost + step * SQUARE_SIZE as f32 / speed;

                    let known = g_scores.get(&next).copied().unwrap_or(f32::INFINITY);
                    if tentative < known {
                        g_scores.insert(next, tentative);
                        came_from.insert(next, current.square);
                        open.push(Node {
                            square: next,
                            g_cost: tentative,
                            f_cost: tentative + heuristic(next, goal),
                        });
                    }
                }
            }
        }

        None
    }
}

/// One active "tank" movement class.
pub fn single_class() -> MoveDefSet {
    MoveDefSet::new(vec![MoveDef::new(0, 1, "tank")])
}

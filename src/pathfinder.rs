//! The fine-grid pathfinder seam and goal definitions.
//!
//! The tile-level pathfinder is a collaborator, not part of this crate: the
//! estimator drives it through [`TilePathFinder`] when measuring inter-block
//! edges. It carries per-search mutable scratch and is therefore modeled as
//! a value: one instance per worker thread, never shared.

use crate::core::{SquareCoord, SQUARE_SIZE};
use crate::map::MoveDef;

/// Node budget of the tile pathfinder per full search.
pub const MAX_SEARCHED_NODES_PF: usize = 65536;

/// Rectangular search constraint, inclusive on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RectConstraint {
    pub min: SquareCoord,
    pub max: SquareCoord,
}

impl RectConstraint {
    /// Constraint spanning exactly the union of two blocks.
    pub fn spanning_blocks(a: SquareCoord, b: SquareCoord, block_size: u32) -> Self {
        let bs = block_size as i32;
        let (ax, az) = (a.x / bs * bs, a.z / bs * bs);
        let (bx, bz) = (b.x / bs * bs, b.z / bs * bs);
        Self {
            min: SquareCoord::new(ax.min(bx), az.min(bz)),
            max: SquareCoord::new(ax.max(bx) + bs - 1, az.max(bz) + bs - 1),
        }
    }

    #[inline]
    pub fn contains(&self, square: SquareCoord) -> bool {
        square.x >= self.min.x
            && square.x <= self.max.x
            && square.z >= self.min.z
            && square.z <= self.max.z
    }
}

/// A path produced by the tile pathfinder.
#[derive(Clone, Debug, Default)]
pub struct TilePath {
    /// Squares from start to goal.
    pub squares: Vec<SquareCoord>,
    /// Total traversal cost in world units.
    pub cost: f32,
}

/// Black-box fine-grid pathfinder.
pub trait TilePathFinder: Send {
    /// Approximate heap footprint of one instance, in bytes. Bounds how
    /// many extra worker instances precompute may allocate.
    fn mem_footprint(&self) -> usize;

    /// An independent instance with its own scratch, over the same map.
    fn fresh(&self) -> Self
    where
        Self: Sized;

    /// Search for a path from `start` to `goal`, restricted to
    /// `constraint`, expanding at most `max_nodes` squares.
    /// `None` means no path was found within the budget.
    fn search(
        &mut self,
        move_def: &MoveDef,
        constraint: &RectConstraint,
        start: SquareCoord,
        goal: SquareCoord,
        max_nodes: usize,
    ) -> Option<TilePath>;
}

/// Goal and constraint abstraction for a block-graph search.
///
/// Heuristic values are in the same cost units the tile pathfinder reports
/// (world-distance based).
pub trait PathFinderDef {
    /// Whether a square satisfies the goal condition.
    fn is_goal(&self, square: SquareCoord) -> bool;

    /// Whether the search may pass through a square.
    fn within_constraints(&self, square: SquareCoord) -> bool;

    /// Estimated remaining cost from a square to the goal.
    fn heuristic(&self, square: SquareCoord) -> f32;

    /// The goal's intra-block offset: applied to any block's origin this
    /// yields the square of that block congruent to the goal square.
    fn goal_square_offset(&self, block_size: u32) -> SquareCoord;
}

/// Circular goal area with an optional rectangular constraint.
#[derive(Clone, Debug)]
pub struct RadiusGoalDef {
    pub goal: SquareCoord,
    /// Goal radius in squares.
    pub radius: f32,
    pub constraint: Option<RectConstraint>,
}

impl RadiusGoalDef {
    pub fn new(goal: SquareCoord, radius: f32) -> Self {
        Self {
            goal,
            radius,
            constraint: None,
        }
    }

    pub fn with_constraint(goal: SquareCoord, radius: f32, constraint: RectConstraint) -> Self {
        Self {
            goal,
            radius,
            constraint: Some(constraint),
        }
    }
}

impl PathFinderDef for RadiusGoalDef {
    #[inline]
    fn is_goal(&self, square: SquareCoord) -> bool {
        square.distance_sq(self.goal) <= self.radius * self.radius
    }

    #[inline]
    fn within_constraints(&self, square: SquareCoord) -> bool {
        match &self.constraint {
            Some(rect) => rect.contains(square),
            None => true,
        }
    }

    #[inline]
    fn heuristic(&self, square: SquareCoord) -> f32 {
        square.distance_sq(self.goal).sqrt() * SQUARE_SIZE as f32
    }

    #[inline]
    fn goal_square_offset(&self, block_size: u32) -> SquareCoord {
        let bs = block_size as i32;
        SquareCoord::new(self.goal.x % bs, self.goal.z % bs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_spans_both_blocks() {
        let rect = RectConstraint::spanning_blocks(
            SquareCoord::new(7, 7),
            SquareCoord::new(23, 7),
            16,
        );
        assert_eq!(rect.min, SquareCoord::new(0, 0));
        assert_eq!(rect.max, SquareCoord::new(31, 15));
        assert!(rect.contains(SquareCoord::new(31, 0)));
        assert!(!rect.contains(SquareCoord::new(32, 0)));
    }

    #[test]
    fn radius_goal() {
        let def = RadiusGoalDef::new(SquareCoord::new(10, 10), 2.0);
        assert!(def.is_goal(SquareCoord::new(10, 10)));
        assert!(def.is_goal(SquareCoord::new(12, 10)));
        assert!(!def.is_goal(SquareCoord::new(13, 10)));
        assert_eq!(def.goal_square_offset(8), SquareCoord::new(2, 2));
    }
}

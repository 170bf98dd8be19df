//! Runtime cost overlays consulted during block search.
//!
//! Flow costs (crowding along a direction) and extra costs (scripted
//! penalties) live outside the estimator; both default to zero.

use crate::core::{PathDir, SquareCoord};
use crate::map::MoveDef;

/// Directional congestion cost sampled at max resolution.
pub trait FlowMap {
    fn flow_cost(&self, square: SquareCoord, move_def: &MoveDef, dir: PathDir) -> f32;
}

/// Scripted per-square cost overlay; separate synced and unsynced layers.
pub trait ExtraCostMap {
    fn extra_cost(&self, square: SquareCoord, synced: bool) -> f32;
}

/// No congestion.
pub struct NoFlow;

impl FlowMap for NoFlow {
    #[inline]
    fn flow_cost(&self, _square: SquareCoord, _move_def: &MoveDef, _dir: PathDir) -> f32 {
        0.0
    }
}

/// No overlay.
pub struct NoExtraCost;

impl ExtraCostMap for NoExtraCost {
    #[inline]
    fn extra_cost(&self, _square: SquareCoord, _synced: bool) -> f32 {
        0.0
    }
}

//! Collision queries against terrain and the tile spatial index
//!
//! Terrain tests sample the eight perimeter points of an item's box. Entity
//! tests look at the 3x3 tiles around the candidate position and return the
//! first resident item that overlaps it, newest first.

use glam::IVec2;

use super::map::{EntityRef, ItemFlags, MapGrid, TileItem};
use super::state::SimulationState;
use crate::consts::*;
use crate::{pixel_to_tile, to_pixels};

/// True if a box centered on a fixed-point position touches solid terrain
pub fn check_wall(map: &MapGrid, fixed: IVec2, w: i32, h: i32) -> bool {
    let p = to_pixels(fixed);
    [
        IVec2::new(-w, -h),
        IVec2::new(-w, 0),
        IVec2::new(-w, h),
        IVec2::new(0, h),
        IVec2::new(w, h),
        IVec2::new(w, 0),
        IVec2::new(w, -h),
        IVec2::new(0, -h),
    ]
    .into_iter()
    .any(|o| map.is_wall_pixel(p + o))
}

/// Overlap test for `mover` placed at `at` (pixels) against `other`.
///
/// A pair that already overlaps may still separate: the test only reports a
/// collision if the move does not increase the distance on both axes.
pub fn items_collide(mover: &TileItem, other: &TileItem, at: IVec2) -> bool {
    let d = (at - other.pos).abs();
    let r = IVec2::new(mover.w + other.w, mover.h + other.h);
    if d.x < r.x && d.y < r.y {
        let od = (mover.pos - other.pos).abs();
        d.x <= od.x || d.y <= od.y
    } else {
        false
    }
}

/// First item matching `mask` that `mover` would overlap at `at` (pixels).
///
/// `me` is skipped. Positions on the outermost tile ring never collide.
pub fn check_item_collision(
    state: &SimulationState,
    me: Option<EntityRef>,
    mover: &TileItem,
    at: IVec2,
    mask: ItemFlags,
) -> Option<EntityRef> {
    let t = pixel_to_tile(at);
    if t.x <= 0 || t.y <= 0 || t.x >= MAP_WIDTH - 1 || t.y >= MAP_HEIGHT - 1 {
        return None;
    }
    for dy in -1..=1 {
        for dx in -1..=1 {
            for other in state.map.things_at(t + IVec2::new(dx, dy)) {
                if Some(other) == me {
                    continue;
                }
                let Some(item) = state.item_of(other) else {
                    continue;
                };
                if item.flags.intersects(mask) && items_collide(mover, item, at) {
                    return Some(other);
                }
            }
        }
    }
    None
}

/// Walkable for `mover` at a fixed-point position: no terrain and no impassable item
pub fn position_ok(state: &SimulationState, me: EntityRef, mover: &TileItem, fixed: IVec2) -> bool {
    !check_wall(&state.map, fixed, mover.w, mover.h)
        && check_item_collision(state, Some(me), mover, to_pixels(fixed), ItemFlags::IMPASSABLE)
            .is_none()
}

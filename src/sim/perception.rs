//! What the players can see
//!
//! Each living player views a rectangle of tiles around itself. Non-player
//! actors inside any such rectangle are flagged visible and woken, and the
//! tiles count as explored.

use glam::IVec2;

use super::actors::ActorFlags;
use super::state::SimulationState;
use crate::consts::*;

/// Tile rectangles (inclusive corners) currently in view
fn view_rects(state: &SimulationState) -> Vec<(IVec2, IVec2)> {
    let half = IVec2::new(VIEW_HALF_WIDTH, VIEW_HALF_HEIGHT);
    state
        .living_players()
        .map(|(_, p)| {
            let t = p.tile();
            (t - half, t + half)
        })
        .collect()
}

#[inline]
fn in_rect(t: IVec2, (min, max): (IVec2, IVec2)) -> bool {
    t.cmpge(min).all() && t.cmple(max).all()
}

/// Refresh visibility flags and explored tiles
pub fn update_perception(state: &mut SimulationState) {
    let rects = view_rects(state);
    if rects.is_empty() {
        return;
    }

    for &(min, max) in &rects {
        let min = min.max(IVec2::ZERO);
        let max = max.min(IVec2::new(MAP_WIDTH - 1, MAP_HEIGHT - 1));
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                state.map.mark_seen(IVec2::new(x, y));
            }
        }
    }

    for actor in state.actors.values_mut() {
        if actor.is_player() || !actor.is_alive() {
            continue;
        }
        let t = actor.tile();
        if rects.iter().any(|r| in_rect(t, *r)) {
            actor.flags |= ActorFlags::VISIBLE;
            actor.flags.remove(ActorFlags::SLEEPING);
        }
    }
}

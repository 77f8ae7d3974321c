//! Draw interface
//!
//! The simulation never produces pixels. A renderer receives one [`Sprite`]
//! per visible thing and decides how it looks.

use glam::IVec2;

use crate::consts::*;
use crate::sim::map::{EntityRef, TilePic};
use crate::sim::{AnimState, Direction, GunKind, MobKind, SimulationState};
use crate::sim::objects::ObjectKind;
use crate::tile_center;

/// What a sprite depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    Tile(TilePic),
    Actor {
        direction: Direction,
        anim: AnimState,
        gun: GunKind,
        /// Death animation frame, zero while alive
        dead: i32,
    },
    Mob(MobKind),
    Object { kind: ObjectKind, wrecked: bool },
}

/// One draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    pub kind: SpriteKind,
    /// Pixel position of the sprite's anchor
    pub pos: IVec2,
    /// Height above the ground
    pub z: i32,
    pub frame: i32,
}

/// Draw callback implemented by the shell
pub trait Renderer {
    fn draw(&mut self, sprite: &Sprite);
}

/// Collects sprites, for tests and headless tools
impl Renderer for Vec<Sprite> {
    fn draw(&mut self, sprite: &Sprite) {
        self.push(*sprite);
    }
}

fn entity_sprite(state: &SimulationState, who: EntityRef) -> Option<Sprite> {
    match who {
        EntityRef::Actor(id) => state.actors.get(id).map(|a| Sprite {
            kind: SpriteKind::Actor {
                direction: a.direction,
                anim: a.anim,
                gun: a.gun,
                dead: a.dead,
            },
            pos: a.pixel_pos(),
            z: 0,
            frame: a.state_counter,
        }),
        EntityRef::Mob(id) => state.mobs.get(id).map(|m| Sprite {
            kind: SpriteKind::Mob(m.kind),
            pos: m.pixel_pos(),
            z: m.z,
            frame: m.frame,
        }),
        EntityRef::Object(id) => state.objects.get(id).map(|o| Sprite {
            kind: SpriteKind::Object {
                kind: o.kind,
                wrecked: o.wrecked,
            },
            pos: o.item.pos,
            z: 0,
            frame: 0,
        }),
    }
}

/// Draw a tile window (inclusive corners), rows top to bottom. Each tile is
/// drawn before the entities resident in it, newest entity first.
pub fn draw_region(state: &SimulationState, renderer: &mut impl Renderer, min: IVec2, max: IVec2) {
    let min = min.max(IVec2::ZERO);
    let max = max.min(IVec2::new(MAP_WIDTH - 1, MAP_HEIGHT - 1));
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            let t = IVec2::new(x, y);
            if let Some(tile) = state.map.tile(t) {
                renderer.draw(&Sprite {
                    kind: SpriteKind::Tile(tile.pic),
                    pos: tile_center(t),
                    z: 0,
                    frame: 0,
                });
            }
            for who in state.map.things_at(t) {
                if let Some(sprite) = entity_sprite(state, who) {
                    renderer.draw(&sprite);
                }
            }
        }
    }
}

/// Draw what player `slot` can see
pub fn draw_player_view(state: &SimulationState, renderer: &mut impl Renderer, slot: usize) {
    let Some(player) = state.player(slot) else {
        return;
    };
    let half = IVec2::new(VIEW_HALF_WIDTH, VIEW_HALF_HEIGHT);
    let t = player.tile();
    draw_region(state, renderer, t - half, t + half);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{CharacterArchetype, MissionConfig};
    use crate::settings::GameOptions;
    use crate::sim::{actors, mobs};
    use crate::to_fixed;

    fn arena() -> SimulationState {
        SimulationState::new(MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT), GameOptions::default(), 31)
    }

    #[test]
    fn test_region_rows_top_to_bottom() {
        let state = arena();
        let mut sprites = Vec::new();
        draw_region(&state, &mut sprites, IVec2::new(3, 3), IVec2::new(5, 4));
        assert_eq!(sprites.len(), 6);
        let ys: Vec<i32> = sprites.iter().map(|s| s.pos.y).collect();
        assert!(ys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sprites[0].pos, tile_center(IVec2::new(3, 3)));
    }

    #[test]
    fn test_entities_follow_their_tile() {
        let mut state = arena();
        let tile = IVec2::new(10, 10);
        let id = actors::add_actor(&mut state, CharacterArchetype::default());
        assert!(actors::place_actor(&mut state, id, to_fixed(tile_center(tile))));
        let mob = mobs::MobileObject::new(
            MobKind::Spark,
            to_fixed(tile_center(tile)),
            crate::sim::ActorFlags::empty(),
        );
        mobs::spawn(&mut state, mob);

        let mut sprites = Vec::new();
        draw_region(&state, &mut sprites, tile, tile);
        assert_eq!(sprites.len(), 3);
        assert!(matches!(sprites[0].kind, SpriteKind::Tile(_)));
        assert!(matches!(sprites[1].kind, SpriteKind::Mob(MobKind::Spark)));
        assert!(matches!(sprites[2].kind, SpriteKind::Actor { dead: 0, .. }));
    }

    #[test]
    fn test_no_view_without_player() {
        let state = arena();
        let mut sprites = Vec::new();
        draw_player_view(&state, &mut sprites, 0);
        assert!(sprites.is_empty());
    }
}

//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::actors;
use super::ai;
use super::geometry::Command;
use super::mobs;
use super::perception;
use super::state::SimulationState;
use super::triggers;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// One command per player slot; empty slots ignore theirs
    pub commands: [Command; MAX_PLAYERS],
}

impl TickInput {
    /// Input for player one only
    pub fn single(cmd: Command) -> Self {
        let mut input = Self::default();
        input.commands[0] = cmd;
        input
    }

    fn paused(&self) -> bool {
        self.commands.iter().any(|c| c.pause)
    }
}

/// Player slide on Alt plus a direction, a normal command otherwise
fn command_player(state: &mut SimulationState, slot: usize, cmd: Command) {
    let Some(id) = state.players[slot] else {
        return;
    };
    if cmd.alt && cmd.has_direction() {
        actors::slide_actor(state, id, cmd);
    } else {
        actors::command_actor(state, id, cmd);
    }
}

/// Advance the simulation by one fixed timestep.
///
/// Every AI decision is made before any command is applied; actors update
/// before mobile objects, which update and reap before watches are polled.
/// A tick carrying a pause request does nothing.
pub fn tick(state: &mut SimulationState, input: &TickInput) {
    if input.paused() {
        return;
    }

    let ai_commands = ai::command_bad_guys(state);
    for (slot, cmd) in input.commands.iter().enumerate() {
        command_player(state, slot, *cmd);
    }
    actors::apply_commands(state, &ai_commands);

    actors::update_all_actors(state, 1);
    mobs::update_mobile_objects(state);
    triggers::update_watches(state);
    perception::update_perception(state);

    // Decay screen shake
    state.screen_shake = (state.screen_shake - 1).max(0);
    state.time_ticks += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{CharacterArchetype, MissionConfig};
    use crate::settings::{Difficulty, GameOptions};
    use crate::sim::actors::ActorFlags;
    use crate::sim::geometry::Direction;
    use crate::sim::mobs::MobKind;
    use crate::sim::weapons::GunKind;
    use crate::{tile_center, to_fixed};
    use glam::IVec2;

    fn arena(seed: u64) -> SimulationState {
        SimulationState::new(
            MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT),
            GameOptions::with_difficulty(Difficulty::Normal),
            seed,
        )
    }

    fn place_player(state: &mut SimulationState, tile: IVec2) -> crate::sim::registry::ActorId {
        let id = actors::add_actor(state, CharacterArchetype::default());
        assert!(actors::place_actor(state, id, to_fixed(tile_center(tile))));
        let p = state.actors.get_mut(id).expect("player");
        p.flags = ActorFlags::PLAYER1;
        state.players[0] = Some(id);
        id
    }

    #[test]
    fn test_tick_counts_time() {
        let mut state = arena(1);
        tick(&mut state, &TickInput::default());
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 2);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = arena(2);
        let input = TickInput::single(Command {
            pause: true,
            ..Command::NONE
        });
        tick(&mut state, &input);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_player_walks() {
        let mut state = arena(3);
        let id = place_player(&mut state, IVec2::new(20, 20));
        let before = state.actors.get(id).expect("player").pos;
        for _ in 0..4 {
            tick(&mut state, &TickInput::single(Direction::Right.to_command()));
        }
        let p = state.actors.get(id).expect("player");
        assert_eq!(p.pos.x - before.x, 4 * p.character.speed);
        assert_eq!(p.direction, Direction::Right);
    }

    #[test]
    fn test_alt_direction_slides() {
        let mut state = arena(4);
        let id = place_player(&mut state, IVec2::new(20, 20));
        let slide = Command {
            alt: true,
            ..Direction::Left.to_command()
        };
        tick(&mut state, &TickInput::single(slide));
        assert_eq!(state.actors.get(id).expect("player").slide, IVec2::new(-5 * FIXED_ONE, 0));
        let before = state.actors.get(id).expect("player").pos;
        tick(&mut state, &TickInput::default());
        assert!(state.actors.get(id).expect("player").pos.x < before.x);
    }

    #[test]
    fn test_player_shot_flies_and_expires() {
        let mut state = arena(5);
        place_player(&mut state, IVec2::new(20, 20));
        tick(&mut state, &TickInput::single(Command::toward(Direction::Right, true)));
        assert!(
            state
                .mobs
                .values()
                .any(|m| m.gun == Some(GunKind::MachineGun) && m.flags.contains(ActorFlags::PLAYER1))
        );
        for _ in 0..200 {
            tick(&mut state, &TickInput::default());
        }
        assert!(state.mobs.values().all(|m| !matches!(m.kind, MobKind::Bullet { .. })));
    }

    #[test]
    fn test_enemy_seen_then_shoots() {
        let mut state = arena(6);
        let player = place_player(&mut state, IVec2::new(10, 10));
        state.actors.get_mut(player).expect("player").health = 100;
        let enemy = actors::add_actor(
            &mut state,
            CharacterArchetype {
                probability_to_shoot: 100,
                probability_to_track: 0,
                probability_to_move: 0,
                ..CharacterArchetype::default()
            },
        );
        assert!(actors::place_actor(&mut state, enemy, to_fixed(tile_center(IVec2::new(12, 10)))));
        state.actors.get_mut(enemy).expect("enemy").direction = Direction::Left;

        // First tick: asleep, then spotted by perception
        tick(&mut state, &TickInput::default());
        let e = state.actors.get(enemy).expect("enemy");
        assert!(e.flags.contains(ActorFlags::VISIBLE));
        assert!(!e.flags.contains(ActorFlags::SLEEPING));

        // Second tick: decides to fire and the shot exists
        tick(&mut state, &TickInput::default());
        assert!(state.actors.get(enemy).expect("enemy").gun_lock > 0);
        assert!(
            state
                .mobs
                .values()
                .any(|m| m.gun == Some(GunKind::MachineGun) && !m.flags.contains(ActorFlags::PLAYER1))
        );
    }

    #[test]
    fn test_shake_decays() {
        let mut state = arena(7);
        state.shake(3);
        for _ in 0..3 {
            tick(&mut state, &TickInput::default());
        }
        assert_eq!(state.screen_shake, 0);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = || {
            let mut config = MissionConfig::demo();
            config.seed = 99;
            let mut state = SimulationState::new(config, GameOptions::default(), 99);
            state.spawn_player(0, 0);
            state.populate();
            for i in 0..300 {
                let dir = Direction::from_index(i / 40);
                tick(&mut state, &TickInput::single(Command::toward(dir, i % 3 == 0)));
            }
            serde_json::to_string(&state.results()).expect("results serialize")
        };
        assert_eq!(run(), run());
    }
}

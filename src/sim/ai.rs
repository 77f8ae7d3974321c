//! Computer-controlled characters
//!
//! Every tick [`command_bad_guys`] decides one command for each non-player
//! actor and tops the enemy population back up. Decisions are returned
//! instead of applied so that every actor decides against the same world.

use glam::IVec2;

use super::actors::{self, Actor, ActorFlags};
use super::collision::position_ok;
use super::geometry::{Command, Direction};
use super::map::EntityRef;
use super::mapgen;
use super::registry::ActorId;
use super::state::SimulationState;
use crate::consts::*;
use crate::mission::ObjectiveKind;
use crate::settings::GameOptions;
use crate::to_fixed;

/// Mission-wide AI bookkeeping
#[derive(Debug, Clone, Default)]
pub struct AiState {
    /// Enemies spawned so far; later spawns are more likely to start awake
    pub enemies_spawned: i32,
    /// Set once any good guy or victim has been seen
    pub good_guys_present: bool,
}

/// Probe distance for walkability checks
const STEP: i32 = 1024;
/// Followers stop inside this Chebyshev distance of a player
const FOLLOW_CLOSE: i32 = 32 << FIXED_SHIFT;
/// New enemies never appear closer than this to a player
const SPAWN_DISTANCE: i32 = 150 << FIXED_SHIFT;
/// Turns before a detour gives up
const MAX_TURNS: i32 = 4;
/// Gun lock forced on an actor no player can see
const UNSEEN_GUN_LOCK: i32 = 40;
const PLACE_ATTEMPTS: usize = 10_000;

#[inline]
fn distance(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}

fn nearest(from: IVec2, candidates: impl Iterator<Item = IVec2>) -> Option<IVec2> {
    candidates.min_by_key(|p| distance(from, *p))
}

fn nearest_player(state: &SimulationState, from: IVec2) -> Option<IVec2> {
    nearest(from, state.living_players().map(|(_, a)| a.pos))
}

fn is_hostile(a: &Actor) -> bool {
    a.is_alive()
        && !a.flags.intersects(
            ActorFlags::FRIENDLY | ActorFlags::PRISONER | ActorFlags::VICTIM | ActorFlags::PENALTY,
        )
}

/// What an actor hunts: enemies hunt players, good guys hunt enemies
fn hunt_target(state: &SimulationState, actor: &Actor) -> Option<IVec2> {
    if actor.flags.intersects(ActorFlags::FRIENDLY) {
        nearest(actor.pos, state.actors.values().filter(|a| is_hostile(a)).map(|a| a.pos))
    } else {
        nearest_player(state, actor.pos)
    }
}

/// Greedy eight-way chase: an axis is used only while its offset is more
/// than half the other one
pub fn chase(from: IVec2, to: IVec2, runs_away: bool) -> Command {
    let d = (to - from).abs();
    let mut cmd = Command::NONE;
    if 2 * d.x > d.y {
        cmd.right = from.x < to.x;
        cmd.left = from.x > to.x;
    }
    if 2 * d.y > d.x {
        cmd.down = from.y < to.y;
        cmd.up = from.y > to.y;
    }
    if runs_away { cmd.invert() } else { cmd }
}

fn hunt(state: &SimulationState, id: ActorId) -> Command {
    let Some(actor) = state.actors.get(id) else {
        return Command::NONE;
    };
    let target = hunt_target(state, actor).unwrap_or(actor.pos);
    chase(actor.pos, target, actor.flags.contains(ActorFlags::RUNS_AWAY))
}

/// Walk toward the nearest player, leaving a tile of slack on each axis
fn follow(from: IVec2, to: IVec2) -> Command {
    let slack = to_fixed(IVec2::new(TILE_WIDTH, TILE_HEIGHT));
    Command {
        right: from.x < to.x - slack.x,
        left: from.x > to.x + slack.x,
        down: from.y < to.y - slack.y,
        up: from.y > to.y + slack.y,
        ..Command::NONE
    }
}

/// Whether `dir` from `pos` points at `target`, judged by quadrant
pub fn facing(pos: IVec2, dir: Direction, target: IVec2) -> bool {
    let (above, below) = (pos.y > target.y, pos.y < target.y);
    let (right_of, left_of) = (pos.x > target.x, pos.x < target.x);
    match dir {
        Direction::Up => above,
        Direction::UpLeft => above && right_of,
        Direction::Left => right_of,
        Direction::DownLeft => below && right_of,
        Direction::Down => below,
        Direction::DownRight => below && left_of,
        Direction::Right => left_of,
        Direction::UpRight => above && left_of,
    }
}

fn facing_player(state: &SimulationState, actor: &Actor) -> bool {
    state
        .living_players()
        .any(|(_, p)| facing(actor.pos, actor.direction, p.pos))
}

/// Whether a step of [`STEP`] in `dir` is open. Diagonals also accept either
/// of their axis components.
fn direction_ok(state: &SimulationState, id: ActorId, dir: Direction) -> bool {
    let Some(actor) = state.actors.get(id) else {
        return false;
    };
    let me = EntityRef::Actor(id);
    let ok = |o: IVec2| position_ok(state, me, &actor.item, actor.pos + o);
    let o = dir.offset() * STEP;
    if dir.is_diagonal() {
        ok(o) || ok(IVec2::new(o.x, 0)) || ok(IVec2::new(0, o.y))
    } else {
        ok(o)
    }
}

fn will_fire(state: &SimulationState, actor: &Actor, roll: i32) -> bool {
    if !actor.flags.contains(ActorFlags::VISIBLE)
        || actor.gun_lock > 0
        || roll >= actor.character.probability_to_shoot
    {
        return false;
    }
    actor.flags.contains(ActorFlags::GOOD_GUY) || state.ai.good_guys_present || facing_player(state, actor)
}

/// Start following a wall after `blocked` turned out closed. The turn side
/// goes clockwise when that neighbor is open.
fn detour(state: &mut SimulationState, id: ActorId, blocked: Direction) {
    let clockwise = direction_ok(state, id, blocked.turn(1));
    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    actor.flags |= ActorFlags::DETOURING;
    actor.flags.set(ActorFlags::TRYRIGHT, clockwise);
    actor.ai.turns = 1;
    actor.direction = blocked.turn(if clockwise { 1 } else { -1 });
}

/// One step of wall following
fn bright_walk(state: &mut SimulationState, id: ActorId, roll: i32) -> Command {
    let Some(actor) = state.actors.get(id) else {
        return Command::NONE;
    };
    if actor.flags.contains(ActorFlags::VISIBLE) && roll < actor.character.probability_to_track {
        let cmd = hunt(state, id);
        if let Some(actor) = state.actors.get_mut(id) {
            actor.flags.remove(ActorFlags::DETOURING);
        }
        return cmd;
    }
    let dir = actor.direction;
    // Turn back toward the blocked heading when possible, further away otherwise
    let (back, away) = if actor.flags.contains(ActorFlags::TRYRIGHT) {
        (-1, 1)
    } else {
        (1, -1)
    };
    let back_open = direction_ok(state, id, dir.turn(back));
    let ahead_open = back_open || direction_ok(state, id, dir);

    let Some(actor) = state.actors.get_mut(id) else {
        return Command::NONE;
    };
    if back_open {
        actor.direction = dir.turn(back);
        actor.ai.turns -= 1;
        if actor.ai.turns == 0 {
            actor.flags.remove(ActorFlags::DETOURING);
        }
    } else if !ahead_open {
        actor.direction = dir.turn(away);
        actor.ai.turns += 1;
        if actor.ai.turns == MAX_TURNS {
            actor.flags.remove(ActorFlags::DETOURING | ActorFlags::TRYRIGHT);
            actor.ai.turns = 0;
        }
    }
    actor.direction.to_command()
}

fn any_player_firing(state: &SimulationState) -> bool {
    state.living_players().any(|(_, p)| p.last_cmd.fire)
}

/// Decide this tick's command for one awake, living actor
fn decide(state: &mut SimulationState, id: ActorId, roll: i32) -> Command {
    let Some(actor) = state.actors.get(id) else {
        return Command::NONE;
    };
    let flags = actor.flags;
    let character = actor.character.clone();
    let (pos, delay, last_cmd) = (actor.pos, actor.ai.delay, actor.last_cmd);
    let mut bypass = false;

    let cmd = if flags.contains(ActorFlags::FOLLOWER) {
        let close = state.living_players().any(|(_, p)| distance(p.pos, pos) < FOLLOW_CLOSE);
        let cmd = match nearest_player(state, pos) {
            Some(target) if !close => follow(pos, target),
            _ => Command::NONE,
        };
        set_delay(state, id, character.action_delay);
        cmd
    } else if flags.contains(ActorFlags::SNEAKY | ActorFlags::VISIBLE) && any_player_firing(state) {
        bypass = true;
        Command {
            fire: true,
            ..hunt(state, id)
        }
    } else if flags.contains(ActorFlags::DETOURING) {
        bright_walk(state, id, roll)
    } else if delay > 0 {
        set_delay(state, id, delay - 1);
        last_cmd.without_fire()
    } else {
        let cmd = if roll < character.probability_to_track {
            hunt(state, id)
        } else if roll < character.probability_to_move {
            Direction::from_index(state.dice.bits(7)).to_command()
        } else {
            Command::NONE
        };
        let interval = state.options.difficulty.decision_interval();
        set_delay(state, id, character.action_delay * interval);
        cmd
    };
    if bypass {
        return cmd;
    }

    let Some(actor) = state.actors.get(id) else {
        return Command::NONE;
    };
    if will_fire(state, actor, roll) {
        return Command::FIRE;
    }
    let (visible, detouring) = (
        actor.flags.contains(ActorFlags::VISIBLE),
        actor.flags.contains(ActorFlags::DETOURING),
    );
    if !visible {
        if let Some(actor) = state.actors.get_mut(id) {
            actor.gun_lock = UNSEEN_GUN_LOCK;
        }
    }
    if let Some(dir) = cmd.direction() {
        if !detouring && !direction_ok(state, id, dir) {
            detour(state, id, dir);
            return Command::NONE;
        }
    }
    cmd
}

fn set_delay(state: &mut SimulationState, id: ActorId, delay: i32) {
    if let Some(actor) = state.actors.get_mut(id) {
        actor.ai.delay = delay;
    }
}

/// Decide a command for every non-player actor, newest first, then spawn a
/// reinforcement if the population has fallen below its target. Prisoners,
/// sleepers and the dead get an empty command.
pub fn command_bad_guys(state: &mut SimulationState) -> Vec<(ActorId, Command)> {
    let roll_limit = state.options.difficulty.roll_limit();
    let mut commands = Vec::new();
    let mut population = 0;

    for id in state.actors.ids() {
        let Some(actor) = state.actors.get(id) else {
            continue;
        };
        let flags = actor.flags;
        if flags.intersects(ActorFlags::PLAYERS) {
            continue;
        }
        if flags.contains(ActorFlags::PRISONER) {
            commands.push((id, Command::NONE));
            continue;
        }
        if flags.intersects(ActorFlags::VICTIM | ActorFlags::GOOD_GUY) {
            state.ai.good_guys_present = true;
        }
        let alive = actor.is_alive();
        if alive {
            population += 1;
        }

        let cmd = if alive && !flags.contains(ActorFlags::SLEEPING) {
            let roll = state.dice.below(roll_limit);
            decide(state, id, roll)
        } else {
            Command::NONE
        };
        if let Some(actor) = state.actors.get_mut(id) {
            actor.flags.remove(ActorFlags::VISIBLE);
        }
        commands.push((id, cmd));
    }

    if !state.config.enemies.is_empty()
        && state.config.baddie_density > 0
        && population < density_target(state)
    {
        spawn_enemy(state);
    }
    commands
}

/// Enemy population the spawner maintains
pub fn density_target(state: &SimulationState) -> i32 {
    (state.config.baddie_density * state.options.enemy_density / 100).max(1)
}

/// Add an actor from an archetype with its health scaled by the NPC option
fn add_npc(state: &mut SimulationState, archetype: usize) -> Option<ActorId> {
    let mut character = state.config.characters.get(archetype)?.clone();
    character.max_health = GameOptions::scale_health(character.max_health, state.options.npc_hp);
    Some(actors::add_actor(state, character))
}

/// Put an enemy somewhere walkable and out of every player's sight, then
/// decide whether it starts awake. Falls back to the farthest walkable spot
/// seen when no candidate is far enough.
pub fn place_baddie(state: &mut SimulationState, id: ActorId) -> bool {
    let Some(item) = state.actors.get(id).map(|a| a.item) else {
        return false;
    };
    let me = EntityRef::Actor(id);
    let mut best: Option<(i32, IVec2)> = None;
    let mut placed = false;
    for _ in 0..PLACE_ATTEMPTS {
        let pos = to_fixed(mapgen::guess_pixel_coords(state));
        if !position_ok(state, me, &item, pos) {
            continue;
        }
        let gap = state
            .living_players()
            .map(|(_, p)| distance(p.pos, pos))
            .min()
            .unwrap_or(i32::MAX);
        if gap >= SPAWN_DISTANCE {
            placed = actors::place_actor(state, id, pos);
            if placed {
                break;
            }
        }
        if best.is_none_or(|(g, _)| gap > g) {
            best = Some((gap, pos));
        }
    }
    if !placed {
        if let Some((_, pos)) = best {
            log::warn!("No spawn point far from players; using the farthest found");
            placed = actors::place_actor(state, id, pos);
        }
    }
    if !placed {
        log::warn!("Could not place actor {id:?}");
        actors::remove_actor(state, id);
        return false;
    }

    let wake_roll = state.dice.below(100);
    let spawned = state.ai.enemies_spawned;
    if let Some(actor) = state.actors.get_mut(id) {
        if actor.flags.contains(ActorFlags::AWAKEALWAYS) {
            actor.flags.remove(ActorFlags::SLEEPING);
        } else if !actor.flags.contains(ActorFlags::SLEEPALWAYS) && wake_roll < spawned {
            actor.flags.remove(ActorFlags::SLEEPING);
        }
    }
    true
}

/// Prisoners go behind keycard doors when there are any
fn place_prisoner(state: &mut SimulationState, id: ActorId) -> bool {
    if state.layout.has_high_access() {
        for _ in 0..PLACE_ATTEMPTS {
            let px = mapgen::guess_pixel_coords(state);
            if state.layout.is_high_access(px) && actors::place_actor(state, id, to_fixed(px)) {
                return true;
            }
        }
        log::warn!("No high-access spot for the prisoner");
    }
    place_baddie(state, id)
}

/// Spawn one enemy from the mission roster
pub fn spawn_enemy(state: &mut SimulationState) -> Option<ActorId> {
    let roster = &state.config.enemies;
    if roster.is_empty() {
        return None;
    }
    let archetype = roster[state.dice.below(roster.len() as i32) as usize];
    let id = add_npc(state, archetype)?;
    let placed = place_baddie(state, id);
    state.ai.enemies_spawned += 1;
    if placed {
        log::debug!("Enemy {id:?} spawned from archetype {archetype}");
        Some(id)
    } else {
        None
    }
}

/// Place kill targets and the prisoner, then reset the spawn bookkeeping
pub fn initialize_bad_guys(state: &mut SimulationState) {
    let objectives = state.config.objectives.clone();
    let specials = state.config.specials.clone();

    if !specials.is_empty() {
        for (index, objective) in objectives.iter().enumerate() {
            if objective.kind != ObjectiveKind::Kill {
                continue;
            }
            let wanted = state.mission.objectives.get(index).map_or(0, |o| o.count);
            let mut placed = 0;
            for _ in 0..wanted {
                let archetype = specials[state.dice.below(specials.len() as i32) as usize];
                let Some(id) = add_npc(state, archetype) else {
                    continue;
                };
                if let Some(actor) = state.actors.get_mut(id) {
                    actor.item.objective = Some(index);
                }
                if place_baddie(state, id) {
                    placed += 1;
                }
            }
            state.mission.clamp_to_placed(index, placed);
        }
    }

    for (index, objective) in objectives.iter().enumerate() {
        if objective.kind != ObjectiveKind::Rescue {
            continue;
        }
        let rescued = state.prisoner.is_none() && spawn_prisoner(state, index);
        if let Some(o) = state.mission.objectives.get_mut(index) {
            let n = i32::from(rescued);
            o.count = n;
            o.required = n;
        }
    }

    state.ai.enemies_spawned = state.config.index * 4;
    state.ai.good_guys_present = false;
}

fn spawn_prisoner(state: &mut SimulationState, objective: usize) -> bool {
    let Some(archetype) = state.config.prisoner else {
        log::warn!("Rescue objective without a prisoner archetype");
        return false;
    };
    let Some(id) = add_npc(state, archetype) else {
        return false;
    };
    if let Some(actor) = state.actors.get_mut(id) {
        actor.flags |= ActorFlags::PRISONER;
        actor.item.objective = Some(objective);
    }
    if !place_prisoner(state, id) {
        return false;
    }
    state.prisoner = Some(id);
    true
}

/// Initial enemy population
pub fn create_characters(state: &mut SimulationState) {
    if state.config.enemies.is_empty() {
        return;
    }
    let target = density_target(state);
    for _ in 0..target {
        spawn_enemy(state);
    }
    log::info!("Spawned {} enemies", state.actors.len());
}

//! Characters: animation state machine, commands, movement and injury
//!
//! Every actor carries a copy of its archetype, a fixed-point position and a
//! [`TileItem`] linked into the map. Commands are applied once per tick,
//! after the AI has decided for everyone.

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::collision::{check_item_collision, check_wall};
use super::damage::{Special, damage_something};
use super::geometry::{Command, Direction};
use super::map::{EntityRef, ItemFlags, TileFlags, TileItem};
use super::objects::{self, ObjectEffects};
use super::registry::ActorId;
use super::state::SimulationState;
use super::triggers;
use super::weapons::{self, GunKind};
use crate::audio::SoundId;
use crate::consts::*;
use crate::mission::{CharacterArchetype, ObjectiveKind};
use crate::{pixel_to_tile, to_pixels};

bitflags! {
    /// Role, capability and AI bookkeeping flags of a character
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ActorFlags: u32 {
        const PLAYER1 = 1 << 0;
        const PLAYER2 = 1 << 1;
        /// Attack ignores friendly-fire rules
        const HURTALWAYS = 1 << 2;
        const DETOURING = 1 << 5;
        const TRYRIGHT = 1 << 6;
        const SLEEPING = 1 << 7;
        /// Seen by a player this tick
        const VISIBLE = 1 << 8;
        /// Immune to fire
        const ASBESTOS = 1 << 9;
        /// Immune to poison and confusion
        const IMMUNITY = 1 << 10;
        const SEETHROUGH = 1 << 11;
        const KEYCARD_RED = 1 << 12;
        const KEYCARD_BLUE = 1 << 13;
        const KEYCARD_GREEN = 1 << 14;
        const KEYCARD_YELLOW = 1 << 15;
        const RUNS_AWAY = 1 << 16;
        /// Fights for the players
        const GOOD_GUY = 1 << 17;
        /// Stays put until a player touches it
        const PRISONER = 1 << 18;
        const INVULNERABLE = 1 << 19;
        /// Tags along behind the nearest player
        const FOLLOWER = 1 << 20;
        /// Shooting it costs points
        const PENALTY = 1 << 21;
        /// Can be hurt by everyone
        const VICTIM = 1 << 22;
        /// Shoots back whenever a player fires
        const SNEAKY = 1 << 23;
        const SLEEPALWAYS = 1 << 24;
        const AWAKEALWAYS = 1 << 25;
    }
}

impl ActorFlags {
    pub const PLAYERS: ActorFlags = ActorFlags::PLAYER1.union(ActorFlags::PLAYER2);
    pub const FRIENDLY: ActorFlags = ActorFlags::PLAYERS.union(ActorFlags::GOOD_GUY);
    pub const KEYCARDS: ActorFlags = ActorFlags::KEYCARD_RED
        .union(ActorFlags::KEYCARD_BLUE)
        .union(ActorFlags::KEYCARD_GREEN)
        .union(ActorFlags::KEYCARD_YELLOW);

    /// Flag of a local player slot
    pub fn player(slot: usize) -> ActorFlags {
        if slot == 0 {
            ActorFlags::PLAYER1
        } else {
            ActorFlags::PLAYER2
        }
    }
}

/// Animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimState {
    #[default]
    Idle,
    IdleLeft,
    IdleRight,
    Walking1,
    Walking2,
    Walking3,
    Walking4,
    Shooting,
    Recoil,
}

impl AnimState {
    pub const ALL: [AnimState; 9] = [
        AnimState::Idle,
        AnimState::IdleLeft,
        AnimState::IdleRight,
        AnimState::Walking1,
        AnimState::Walking2,
        AnimState::Walking3,
        AnimState::Walking4,
        AnimState::Shooting,
        AnimState::Recoil,
    ];

    /// State entered when this one's timer runs out
    pub fn next(self) -> AnimState {
        match self {
            AnimState::Idle | AnimState::IdleLeft | AnimState::IdleRight => AnimState::Idle,
            AnimState::Walking1 => AnimState::Walking2,
            AnimState::Walking2 => AnimState::Walking3,
            AnimState::Walking3 => AnimState::Walking4,
            AnimState::Walking4 => AnimState::Walking1,
            AnimState::Shooting => AnimState::Recoil,
            AnimState::Recoil => AnimState::Idle,
        }
    }

    /// Ticks spent in this state; recoil lasts as long as the gun lock instead
    pub fn duration(self) -> i32 {
        match self {
            AnimState::Idle => 90,
            AnimState::IdleLeft | AnimState::IdleRight => 60,
            _ => 8,
        }
    }

    pub fn is_idle(self) -> bool {
        matches!(self, AnimState::Idle | AnimState::IdleLeft | AnimState::IdleRight)
    }

    pub fn is_walking(self) -> bool {
        matches!(
            self,
            AnimState::Walking1 | AnimState::Walking2 | AnimState::Walking3 | AnimState::Walking4
        )
    }
}

/// Independent status countdowns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub flamed: i32,
    pub poisoned: i32,
    pub petrified: i32,
    pub confused: i32,
}

/// Decision bookkeeping for AI-driven actors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AiMemory {
    /// Ticks left before the next fresh decision
    pub delay: i32,
    /// Detour turn counter
    pub turns: i32,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub character: CharacterArchetype,
    /// Fixed-point position
    pub pos: IVec2,
    /// Slide impulse, decays every command
    pub slide: IVec2,
    pub direction: Direction,
    pub anim: AnimState,
    pub state_counter: i32,
    /// Death animation frame, counts up once health is gone
    pub dead: i32,
    pub health: i32,
    pub gun: GunKind,
    pub gun_lock: i32,
    pub snd_lock: i32,
    pub status: StatusEffects,
    pub flags: ActorFlags,
    pub last_cmd: Command,
    pub ai: AiMemory,
    pub item: TileItem,
}

impl Actor {
    pub fn new(character: CharacterArchetype) -> Self {
        let anim = AnimState::Idle;
        Self {
            gun: character.gun,
            health: character.max_health,
            flags: ActorFlags::SLEEPING | character.flags,
            character,
            pos: IVec2::ZERO,
            slide: IVec2::ZERO,
            direction: Direction::Down,
            anim,
            state_counter: anim.duration(),
            dead: 0,
            gun_lock: 0,
            snd_lock: 0,
            status: StatusEffects::default(),
            last_cmd: Command::NONE,
            ai: AiMemory::default(),
            item: TileItem::new(7, 5, ItemFlags::IMPASSABLE | ItemFlags::CAN_BE_SHOT),
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn is_player(&self) -> bool {
        self.flags.intersects(ActorFlags::PLAYERS)
    }

    /// Pixel position
    pub fn pixel_pos(&self) -> IVec2 {
        to_pixels(self.pos)
    }

    pub fn tile(&self) -> IVec2 {
        pixel_to_tile(self.pixel_pos())
    }

    /// Enter an animation state and restart its timer
    pub fn set_anim(&mut self, anim: AnimState) {
        self.anim = anim;
        self.state_counter = if anim == AnimState::Recoil {
            self.gun_lock
        } else {
            anim.duration()
        };
    }
}

/// Create an actor from an archetype. It is not on the map until placed.
pub fn add_actor(state: &mut SimulationState, character: CharacterArchetype) -> ActorId {
    state.actors.insert(Actor::new(character))
}

/// Remove an actor, clearing any player or prisoner reference to it
pub fn remove_actor(state: &mut SimulationState, id: ActorId) {
    if let Some(mut actor) = state.actors.remove(id) {
        state.map.remove_item(EntityRef::Actor(id), &mut actor.item);
    }
    for slot in state.players.iter_mut() {
        if *slot == Some(id) {
            *slot = None;
        }
    }
    if state.prisoner == Some(id) {
        state.prisoner = None;
    }
}

/// Put an actor at a fixed-point position if terrain and other entities allow
/// it. Fires no triggers and picks nothing up.
pub fn place_actor(state: &mut SimulationState, id: ActorId, pos: IVec2) -> bool {
    let Some(actor) = state.actors.get(id) else {
        return false;
    };
    let item = actor.item;
    if check_wall(&state.map, pos, item.w, item.h)
        || check_item_collision(
            state,
            Some(EntityRef::Actor(id)),
            &item,
            to_pixels(pos),
            ItemFlags::IMPASSABLE,
        )
        .is_some()
    {
        return false;
    }
    commit_position(state, id, pos);
    true
}

fn commit_position(state: &mut SimulationState, id: ActorId, pos: IVec2) {
    if let Some(actor) = state.actors.get_mut(id) {
        actor.pos = pos;
        state
            .map
            .move_item(EntityRef::Actor(id), &mut actor.item, to_pixels(pos));
    }
}

/// Resolve a blocked move by trying each axis alone. Returns the adjusted
/// target, or `None` if nothing or both axes would change.
fn slide_axes(from: IVec2, mut to: IVec2, blocked: impl Fn(IVec2) -> bool) -> Option<IVec2> {
    if blocked(IVec2::new(from.x, to.y)) {
        to.y = from.y;
    }
    if blocked(IVec2::new(to.x, from.y)) {
        to.x = from.x;
    }
    let moved = to != from;
    let both = to.x != from.x && to.y != from.y;
    (moved && !both).then_some(to)
}

/// Move an actor toward a fixed-point position with axis-separated sliding
/// against walls and impassable entities. Returns false if it did not move.
pub fn move_actor(state: &mut SimulationState, id: ActorId, target: IVec2) -> bool {
    let Some(actor) = state.actors.get(id) else {
        return false;
    };
    let from = actor.pos;
    let item = actor.item;
    let (flags, gun, alive) = (actor.flags, actor.gun, actor.is_alive());
    let me = EntityRef::Actor(id);
    let mut to = target;

    if check_wall(&state.map, to, item.w, item.h) {
        match slide_axes(from, to, |p| check_wall(&state.map, p, item.w, item.h)) {
            Some(p) => to = p,
            None => return false,
        }
    }

    let blocker = check_item_collision(state, Some(me), &item, to_pixels(to), ItemFlags::IMPASSABLE);
    if let Some(target) = blocker {
        if flags.intersects(ActorFlags::PLAYERS) {
            if let EntityRef::Actor(other) = target {
                free_prisoner(state, other);
            }
        }

        if gun == GunKind::Knife && alive {
            let dangerous = match target {
                EntityRef::Object(o) => state
                    .objects
                    .get(o)
                    .is_some_and(|obj| obj.effects.intersects(ObjectEffects::DANGEROUS)),
                _ => false,
            };
            if !dangerous {
                damage_something(state, IVec2::ZERO, 2, flags, target, Special::None);
                return false;
            }
        }

        let collides = |p: IVec2| {
            check_item_collision(state, Some(me), &item, to_pixels(p), ItemFlags::IMPASSABLE)
                .is_some()
        };
        match slide_axes(from, to, collides) {
            Some(p) if !check_wall(&state.map, p, item.w, item.h) => to = p,
            _ => return false,
        }
    }

    let tile = pixel_to_tile(to_pixels(to));
    if state.map.flags_at(tile).contains(TileFlags::TRIGGER) {
        let keys = flags | (state.mission.keycards & ActorFlags::KEYCARDS);
        triggers::trigger_at(state, tile, keys);
    }

    if flags.intersects(ActorFlags::PLAYERS) {
        let taken = check_item_collision(state, Some(me), &item, to_pixels(to), ItemFlags::CAN_BE_TAKEN);
        if let Some(EntityRef::Object(obj)) = taken {
            objects::pick_up(state, id, obj);
        }
    }

    commit_position(state, id, to);
    true
}

/// A player touched a prisoner: it joins the living world and the rescue counts
fn free_prisoner(state: &mut SimulationState, id: ActorId) {
    let Some(other) = state.actors.get_mut(id) else {
        return;
    };
    if !other.flags.contains(ActorFlags::PRISONER) {
        return;
    }
    other.flags.remove(ActorFlags::PRISONER);
    let objective = other.item.objective;
    log::debug!("Prisoner freed");
    if let Some(index) = objective {
        state.mission.credit_kind(index, ObjectiveKind::Rescue);
    }
}

/// Reduce health. Side effects happen only on the tick health first drops to
/// zero or below.
pub fn injure_actor(state: &mut SimulationState, id: ActorId, injury: i32) {
    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    let was_alive = actor.is_alive();
    actor.health -= injury;
    if !was_alive || actor.is_alive() {
        return;
    }
    actor.state_counter = 0;
    let (pos, is_player, objective) = (actor.pixel_pos(), actor.is_player(), actor.item.objective);

    let scream = SoundId::SCREAMS[state.scream_index % SoundId::SCREAMS.len()];
    state.scream_index = (state.scream_index + 1) % SoundId::SCREAMS.len();
    state.play_sound(pos, scream);
    if is_player {
        state.play_sound(pos, SoundId::Hahaha);
    }
    if let Some(index) = objective {
        state.mission.credit_kind(index, ObjectiveKind::Kill);
    }
}

/// Advance timers, status effects and animation by `ticks`
pub fn update_actor_state(state: &mut SimulationState, id: ActorId, ticks: i32) {
    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    actor.gun_lock = (actor.gun_lock - ticks).max(0);
    actor.snd_lock = (actor.snd_lock - ticks).max(0);

    let mut poison_bite = false;
    if actor.is_alive() {
        let s = &mut actor.status;
        if s.flamed > 0 {
            s.flamed -= 1;
        }
        if s.poisoned > 0 {
            poison_bite = s.poisoned & 7 == 0;
            s.poisoned -= 1;
        }
        s.petrified = (s.petrified - ticks).max(0);
        s.confused = (s.confused - ticks).max(0);
    }
    if poison_bite {
        injure_actor(state, id, 1);
    }

    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    if actor.state_counter > 0 {
        actor.state_counter -= ticks;
        if actor.state_counter > 0 {
            return;
        }
        actor.state_counter = 0;
    }

    if !actor.is_alive() {
        actor.dead += 1;
        actor.state_counter = 4;
        actor.item.flags = ItemFlags::empty();
        return;
    }

    if actor.anim == AnimState::Idle && actor.status.petrified == 0 {
        let roll = state.dice.coin();
        let Some(actor) = state.actors.get_mut(id) else {
            return;
        };
        actor.set_anim(if roll {
            AnimState::IdleLeft
        } else {
            AnimState::IdleRight
        });
    } else {
        let next = actor.anim.next();
        actor.set_anim(next);
    }
}

/// Tick every actor; corpses whose death animation finished leave blood and go
pub fn update_all_actors(state: &mut SimulationState, ticks: i32) {
    for id in state.actors.ids() {
        update_actor_state(state, id, ticks);
        let finished = state
            .actors
            .get(id)
            .filter(|a| a.dead > DEATH_MAX)
            .map(Actor::pixel_pos);
        if let Some(pos) = finished {
            objects::add_blood(state, pos);
            remove_actor(state, id);
        }
    }
}

/// Apply one tick's command: slide impulse, firing, walking or idling
pub fn command_actor(state: &mut SimulationState, id: ActorId, cmd: Command) {
    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    let mut target = actor.pos;
    let mut shall_move = false;
    let mut reset_dir = false;

    if actor.slide != IVec2::ZERO {
        shall_move = true;
        reset_dir = true;
        target += actor.slide;
        actor.slide = actor.slide.map(decay_slide);
    }

    actor.last_cmd = cmd;
    let cmd = if actor.status.confused > 0 { cmd.invert() } else { cmd };
    let petrified = actor.status.petrified > 0;
    let mut shoot = false;

    if actor.is_alive() {
        if !petrified && cmd.fire {
            if !matches!(actor.anim, AnimState::Shooting | AnimState::Recoil) {
                actor.set_anim(AnimState::Shooting);
            }
            if let Some(dir) = cmd.direction() {
                actor.direction = dir;
            }
            shoot = true;
        } else if !petrified && cmd.has_direction() {
            shall_move = true;
            let speed = actor.character.speed;
            if cmd.left {
                target.x -= speed;
            } else if cmd.right {
                target.x += speed;
            }
            if cmd.up {
                target.y -= speed;
            } else if cmd.down {
                target.y += speed;
            }
            if !actor.anim.is_walking() {
                actor.set_anim(AnimState::Walking1);
            }
            if let Some(dir) = cmd.direction() {
                actor.direction = dir;
            }
        } else if !actor.anim.is_idle() {
            actor.set_anim(AnimState::Idle);
        }
    }

    if shoot {
        weapons::shoot(state, id);
    }
    if shall_move {
        move_actor(state, id, target);
    }
    if reset_dir {
        if let Some(actor) = state.actors.get_mut(id) {
            if actor.is_alive() {
                if let Some(dir) = cmd.direction() {
                    actor.direction = dir;
                }
            }
        }
    }
}

fn decay_slide(v: i32) -> i32 {
    let v = v - 32 * v.signum();
    if v.abs() < 32 { 0 } else { v }
}

/// Start a slide in the commanded direction
pub fn slide_actor(state: &mut SimulationState, id: ActorId, cmd: Command) {
    let Some(actor) = state.actors.get_mut(id) else {
        return;
    };
    if actor.status.petrified > 0 {
        return;
    }
    let cmd = if actor.status.confused > 0 { cmd.invert() } else { cmd };
    let dx = if cmd.left {
        -5 * FIXED_ONE
    } else if cmd.right {
        5 * FIXED_ONE
    } else {
        0
    };
    let dy = if cmd.up {
        -4 * FIXED_ONE
    } else if cmd.down {
        4 * FIXED_ONE
    } else {
        0
    };
    actor.slide = IVec2::new(dx, dy);
}

/// Apply a batch of decided commands in order
pub fn apply_commands(state: &mut SimulationState, commands: &[(ActorId, Command)]) {
    for (id, cmd) in commands {
        command_actor(state, *id, *cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionConfig;
    use crate::settings::GameOptions;
    use crate::sim::state::GameEvent;
    use crate::{tile_center, to_fixed};
    use proptest::prelude::*;

    fn arena() -> SimulationState {
        SimulationState::new(MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT), GameOptions::default(), 3)
    }

    fn spawn_at(state: &mut SimulationState, tile: IVec2) -> ActorId {
        let id = add_actor(state, CharacterArchetype::default());
        assert!(place_actor(state, id, to_fixed(tile_center(tile))));
        id
    }

    fn wall(state: &mut SimulationState, tile: IVec2) {
        state.map.set_tile(
            tile,
            crate::sim::map::TilePic::Wall(crate::sim::map::WallPic::Single),
            TileFlags::NO_WALK | TileFlags::NO_SEE | TileFlags::IS_WALL,
        );
    }

    fn screams(state: &SimulationState) -> usize {
        state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Sound { sound, .. } if SoundId::SCREAMS.contains(sound)))
            .count()
    }

    #[test]
    fn test_transition_cycle() {
        assert_eq!(AnimState::Walking1.next(), AnimState::Walking2);
        assert_eq!(AnimState::Walking4.next(), AnimState::Walking1);
        assert_eq!(AnimState::Shooting.next(), AnimState::Recoil);
        assert_eq!(AnimState::Recoil.next(), AnimState::Idle);
        assert_eq!(AnimState::IdleLeft.next(), AnimState::Idle);
    }

    proptest! {
        #[test]
        fn test_state_machine_closure(start in 0usize..9, steps in 0usize..64) {
            let mut s = AnimState::ALL[start];
            for _ in 0..steps {
                s = s.next();
                prop_assert!(AnimState::ALL.contains(&s));
                prop_assert!(s.duration() > 0);
            }
        }
    }

    #[test]
    fn test_move_free() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        let from = state.actors.get(id).expect("actor").pos;
        let to = from + IVec2::new(256, 256);
        assert!(move_actor(&mut state, id, to));
        assert_eq!(state.actors.get(id).expect("actor").pos, to);
    }

    #[test]
    fn test_move_slides_along_wall() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        // Wall directly east
        wall(&mut state, IVec2::new(11, 10));
        wall(&mut state, IVec2::new(11, 9));
        wall(&mut state, IVec2::new(11, 11));
        let from = state.actors.get(id).expect("actor").pos;
        let step = IVec2::new(2 * FIXED_ONE, FIXED_ONE);
        assert!(move_actor(&mut state, id, from + step));
        let pos = state.actors.get(id).expect("actor").pos;
        assert_eq!(pos.x, from.x, "blocked axis zeroed");
        assert_eq!(pos.y, from.y + FIXED_ONE, "free axis applied");
    }

    #[test]
    fn test_move_blocked_both_axes() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        for t in [IVec2::new(11, 10), IVec2::new(11, 11), IVec2::new(10, 11), IVec2::new(11, 9), IVec2::new(9, 11)] {
            wall(&mut state, t);
        }
        let from = state.actors.get(id).expect("actor").pos;
        // Tile (10,10) spans 160..176 x 120..132; center (168,126), box 7x5
        let step = IVec2::new(2 * FIXED_ONE, 2 * FIXED_ONE);
        assert!(!move_actor(&mut state, id, from + step));
        assert_eq!(state.actors.get(id).expect("actor").pos, from);
    }

    #[test]
    fn test_entities_block_with_same_slide_rule() {
        let mut state = arena();
        let a = spawn_at(&mut state, IVec2::new(10, 10));
        let b = add_actor(&mut state, CharacterArchetype::default());
        let a_pos = state.actors.get(a).expect("a").pos;
        assert!(place_actor(&mut state, b, a_pos + IVec2::new(15 * FIXED_ONE, 0)));
        state.actors.get_mut(a).expect("a").gun = GunKind::MachineGun;

        // Straight into b: blocked
        assert!(!move_actor(&mut state, a, a_pos + IVec2::new(2 * FIXED_ONE, 0)));
        // Diagonal: slides vertically
        assert!(move_actor(&mut state, a, a_pos + IVec2::new(2 * FIXED_ONE, FIXED_ONE)));
        let pos = state.actors.get(a).expect("a").pos;
        assert_eq!(pos, a_pos + IVec2::new(0, FIXED_ONE));
    }

    #[test]
    fn test_knife_bump_stabs() {
        let mut state = arena();
        let a = spawn_at(&mut state, IVec2::new(10, 10));
        let b = add_actor(&mut state, CharacterArchetype::default());
        let a_pos = state.actors.get(a).expect("a").pos;
        assert!(place_actor(&mut state, b, a_pos + IVec2::new(15 * FIXED_ONE, 0)));
        state.actors.get_mut(a).expect("a").gun = GunKind::Knife;
        state.actors.get_mut(a).expect("a").flags |= ActorFlags::PLAYER1;
        let before = state.actors.get(b).expect("b").health;
        assert!(!move_actor(&mut state, a, a_pos + IVec2::new(2 * FIXED_ONE, 0)));
        assert_eq!(state.actors.get(b).expect("b").health, before - 2);
    }

    #[test]
    fn test_idle_roll_only_when_choosing_idle_pose() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));

        state.actors.get_mut(id).expect("actor").state_counter = 10;
        let mut untouched = state.dice.clone();
        update_actor_state(&mut state, id, 1);
        assert_eq!(state.dice.below(1 << 30), untouched.below(1 << 30));

        state.actors.get_mut(id).expect("actor").health = 0;
        state.actors.get_mut(id).expect("actor").state_counter = 0;
        let mut untouched = state.dice.clone();
        update_actor_state(&mut state, id, 1);
        assert_eq!(state.dice.below(1 << 30), untouched.below(1 << 30));

        let other = spawn_at(&mut state, IVec2::new(20, 20));
        let a = state.actors.get_mut(other).expect("actor");
        a.anim = AnimState::Idle;
        a.state_counter = 0;
        let mut expected = state.dice.clone();
        let left = expected.coin();
        update_actor_state(&mut state, other, 1);
        let anim = state.actors.get(other).expect("actor").anim;
        assert_eq!(anim, if left { AnimState::IdleLeft } else { AnimState::IdleRight });
        assert_eq!(state.dice.below(1 << 30), expected.below(1 << 30));
    }

    #[test]
    fn test_death_latches() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        state.actors.get_mut(id).expect("actor").health = 1;
        injure_actor(&mut state, id, 5);
        assert_eq!(state.actors.get(id).expect("actor").health, -4);
        assert_eq!(screams(&state), 1);
        injure_actor(&mut state, id, 3);
        assert_eq!(state.actors.get(id).expect("actor").health, -7);
        assert_eq!(screams(&state), 1, "second injury must not scream again");
    }

    #[test]
    fn test_screams_round_robin() {
        let mut state = arena();
        let ids: Vec<_> = (0..5).map(|i| spawn_at(&mut state, IVec2::new(4 + 2 * i, 5))).collect();
        for id in &ids {
            injure_actor(&mut state, *id, 1000);
        }
        let sounds: Vec<SoundId> = state
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Sound { sound, .. } => Some(*sound),
                _ => None,
            })
            .collect();
        assert_eq!(
            sounds,
            vec![SoundId::Kill, SoundId::Kill2, SoundId::Kill3, SoundId::Kill4, SoundId::Kill]
        );
    }

    #[test]
    fn test_corpse_removed_after_death_animation() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        injure_actor(&mut state, id, 1000);
        let mut ticks = 0;
        while state.actors.contains(id) {
            update_all_actors(&mut state, 1);
            ticks += 1;
            assert!(ticks < 100, "corpse never removed");
        }
        assert_eq!(state.objects.len(), 1, "blood decal left behind");
        assert!(!state.map.things_at(IVec2::new(10, 10)).any(|e| e == EntityRef::Actor(id)));
    }

    #[test]
    fn test_dead_actor_is_not_shootable() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        injure_actor(&mut state, id, 1000);
        update_actor_state(&mut state, id, 1);
        assert!(state.actors.get(id).expect("corpse").item.flags.is_empty());
    }

    #[test]
    fn test_poison_bites_every_eight_ticks() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        let start = state.actors.get(id).expect("actor").health;
        state.actors.get_mut(id).expect("actor").status.poisoned = 16;
        for _ in 0..16 {
            update_actor_state(&mut state, id, 1);
        }
        let actor = state.actors.get(id).expect("actor");
        assert_eq!(actor.status.poisoned, 0);
        assert_eq!(actor.health, start - 2);
    }

    #[test]
    fn test_confused_walks_the_other_way() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        state.actors.get_mut(id).expect("actor").status.confused = 100;
        let from = state.actors.get(id).expect("actor").pos;
        command_actor(&mut state, id, Direction::Left.to_command());
        let actor = state.actors.get(id).expect("actor");
        assert!(actor.pos.x > from.x);
        assert_eq!(actor.direction, Direction::Right);
        assert_eq!(actor.last_cmd, Direction::Left.to_command());
    }

    #[test]
    fn test_petrified_ignores_commands() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        state.actors.get_mut(id).expect("actor").status.petrified = 50;
        let from = state.actors.get(id).expect("actor").pos;
        command_actor(&mut state, id, Command::toward(Direction::Right, true));
        let actor = state.actors.get(id).expect("actor");
        assert_eq!(actor.pos, from);
        assert_eq!(actor.gun_lock, 0);
        assert!(state.mobs.is_empty());
    }

    #[test]
    fn test_walk_then_idle() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        command_actor(&mut state, id, Direction::Down.to_command());
        assert_eq!(state.actors.get(id).expect("actor").anim, AnimState::Walking1);
        command_actor(&mut state, id, Command::NONE);
        assert_eq!(state.actors.get(id).expect("actor").anim, AnimState::Idle);
    }

    #[test]
    fn test_slide_decays() {
        let mut state = arena();
        let id = spawn_at(&mut state, IVec2::new(10, 10));
        slide_actor(&mut state, id, Direction::Right.to_command());
        assert_eq!(state.actors.get(id).expect("actor").slide, IVec2::new(5 * FIXED_ONE, 0));
        let from = state.actors.get(id).expect("actor").pos;
        command_actor(&mut state, id, Command::NONE);
        let actor = state.actors.get(id).expect("actor");
        assert_eq!(actor.pos.x, from.x + 5 * FIXED_ONE);
        assert_eq!(actor.slide.x, 5 * FIXED_ONE - 32);
        assert_eq!(decay_slide(40), 0);
        assert_eq!(decay_slide(-100), -68);
    }

    #[test]
    fn test_remove_clears_player_slot() {
        let mut state = arena();
        let id = state.spawn_player(0, 0).expect("player");
        assert_eq!(state.players[0], Some(id));
        remove_actor(&mut state, id);
        assert_eq!(state.players[0], None);
    }
}

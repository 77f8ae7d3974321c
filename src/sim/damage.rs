//! Damage funnel
//!
//! Every hit from a bullet, a blast, a flame or a melee bump goes through
//! [`damage_something`]. It applies status effects and knockback, enforces
//! the friendly-fire rules, scores the attacker and breaks destructible
//! objects.

use glam::IVec2;

use super::actors::{self, ActorFlags};
use super::map::EntityRef;
use super::mobs;
use super::objects::{self, ObjectEffects};
use super::registry::{ActorId, ObjectId};
use super::state::SimulationState;
use crate::to_fixed;

/// Status effect carried by an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Special {
    #[default]
    None,
    Flame,
    Poison,
    Petrify,
    Confuse,
}

pub const FLAMED_COUNT: i32 = 10;
pub const POISONED_COUNT: i32 = 8;
pub const MAX_POISONED_COUNT: i32 = 140;
pub const PETRIFIED_COUNT: i32 = 95;
pub const CONFUSED_COUNT: i32 = 700;

/// Points for breaking an objective object
pub const OBJECTIVE_SCORE: i32 = 50;
pub const QUAKE_SHAKE: i32 = 70;

/// Apply an attack to `target`. `impact` is the attack's velocity and pushes
/// the victim; `flags` are the attacker's. Returns false only when the
/// attack passed through without touching the target.
pub fn damage_something(
    state: &mut SimulationState,
    impact: IVec2,
    power: i32,
    flags: ActorFlags,
    target: EntityRef,
    special: Special,
) -> bool {
    match target {
        EntityRef::Actor(id) => damage_actor(state, id, impact, power, flags, special),
        EntityRef::Object(id) => {
            damage_object(state, id, power, flags);
            true
        }
        // Projectiles are never shootable
        EntityRef::Mob(_) => true,
    }
}

fn immune(victim: ActorFlags, special: Special) -> bool {
    match special {
        Special::Flame => victim.contains(ActorFlags::ASBESTOS),
        Special::Poison | Special::Confuse => victim.contains(ActorFlags::IMMUNITY),
        _ => false,
    }
}

/// Friendly-fire gate applied before health is touched
fn may_injure(state: &SimulationState, attacker: ActorFlags, victim: ActorFlags) -> bool {
    if attacker.contains(ActorFlags::HURTALWAYS) || victim.contains(ActorFlags::VICTIM) {
        return true;
    }
    if attacker.intersects(victim & ActorFlags::PLAYERS) {
        return false;
    }
    let friendly_attacker = attacker.intersects(ActorFlags::FRIENDLY);
    let friendly_victim = victim.intersects(ActorFlags::FRIENDLY);
    let opts = &state.options;
    if !opts.dog_fight && !opts.players_hurt && friendly_attacker && friendly_victim {
        return false;
    }
    friendly_attacker || friendly_victim
}

fn damage_actor(
    state: &mut SimulationState,
    id: ActorId,
    impact: IVec2,
    power: i32,
    flags: ActorFlags,
    special: Special,
) -> bool {
    let Some(actor) = state.actors.get_mut(id) else {
        return false;
    };
    let victim = actor.flags;
    if !flags.contains(ActorFlags::HURTALWAYS) && flags.intersects(victim & ActorFlags::PLAYERS) {
        return false;
    }
    if immune(victim, special) || !actor.is_alive() {
        return true;
    }

    let s = &mut actor.status;
    match special {
        Special::Flame => s.flamed = FLAMED_COUNT,
        Special::Poison => {
            if s.poisoned < MAX_POISONED_COUNT {
                s.poisoned += POISONED_COUNT;
            }
        }
        Special::Petrify => {
            if s.petrified == 0 {
                s.petrified = PETRIFIED_COUNT;
            }
        }
        Special::Confuse => s.confused = CONFUSED_COUNT,
        Special::None => {}
    }
    actor.slide += impact * power / 25;

    if victim.contains(ActorFlags::INVULNERABLE) || !may_injure(state, flags, victim) {
        return true;
    }

    actors::injure_actor(state, id, power);
    let died = state.actors.get(id).is_some_and(|a| !a.is_alive());
    if died {
        track_kill(state, flags, victim);
    }
    if flags.intersects(ActorFlags::FRIENDLY) && !victim.intersects(ActorFlags::FRIENDLY) {
        let points = if victim.contains(ActorFlags::PENALTY) {
            -3 * power
        } else {
            power
        };
        state.score(flags, points);
    }
    true
}

fn track_kill(state: &mut SimulationState, attacker: ActorFlags, victim: ActorFlags) {
    let Some(slot) = SimulationState::player_slot(attacker) else {
        return;
    };
    let stats = &mut state.stats[slot];
    if victim.intersects(ActorFlags::PLAYERS | ActorFlags::GOOD_GUY | ActorFlags::PENALTY) {
        stats.friendlies += 1;
    } else {
        stats.kills += 1;
    }
}

fn damage_object(state: &mut SimulationState, id: ObjectId, power: i32, flags: ActorFlags) {
    let Some(obj) = state.objects.get_mut(id) else {
        return;
    };
    if obj.structure <= 0 {
        return;
    }
    obj.structure -= power;
    if obj.structure > 0 {
        return;
    }
    let (effects, objective, pos) = (obj.effects, obj.item.objective, to_fixed(obj.item.pos));
    log::debug!("Object {id:?} destroyed");

    if let Some(index) = objective {
        if state.mission.credit(index) {
            state.score(flags, OBJECTIVE_SCORE);
        }
    }
    if effects.contains(ObjectEffects::QUAKE) {
        state.shake(QUAKE_SHAKE);
    }

    if effects.contains(ObjectEffects::EXPLOSIVE) {
        mobs::add_explosion(state, pos, flags);
    } else if effects.contains(ObjectEffects::FLAMMABLE) {
        mobs::add_fire(state, pos, flags);
    } else if effects.contains(ObjectEffects::POISONOUS) {
        mobs::add_gas(state, pos, flags, Special::Poison);
    } else if effects.contains(ObjectEffects::CONFUSING) {
        mobs::add_gas(state, pos, flags, Special::Confuse);
    } else {
        mobs::add_puff(state, pos);
    }
    objects::wreck_object(state, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::mission::{CharacterArchetype, MissionConfig, ObjectiveConfig, ObjectiveKind};
    use crate::settings::GameOptions;
    use crate::sim::map::ItemFlags;
    use crate::sim::objects::ObjectKind;
    use crate::sim::state::GameEvent;
    use crate::{tile_center, to_fixed};

    fn arena_with(options: GameOptions) -> SimulationState {
        SimulationState::new(MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT), options, 11)
    }

    fn actor_with(state: &mut SimulationState, tile: IVec2, flags: ActorFlags) -> ActorId {
        let id = actors::add_actor(state, CharacterArchetype::default());
        assert!(actors::place_actor(state, id, to_fixed(tile_center(tile))));
        let a = state.actors.get_mut(id).expect("actor");
        a.flags = flags;
        id
    }

    fn health(state: &SimulationState, id: ActorId) -> i32 {
        state.actors.get(id).expect("actor").health
    }

    #[test]
    fn test_players_cannot_hurt_each_other_by_default() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::PLAYER2);
        let hit = damage_something(
            &mut state,
            IVec2::ZERO,
            10,
            ActorFlags::PLAYER1,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert!(hit, "the shot still lands");
        assert_eq!(health(&state, victim), 40);
    }

    #[test]
    fn test_own_shots_pass_through() {
        let mut state = arena_with(GameOptions::default());
        let me = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::PLAYER1);
        let hit = damage_something(
            &mut state,
            IVec2::ZERO,
            10,
            ActorFlags::PLAYER1,
            EntityRef::Actor(me),
            Special::None,
        );
        assert!(!hit);
        assert_eq!(health(&state, me), 40);
    }

    #[test]
    fn test_hurt_always_hits_own_player() {
        let mut state = arena_with(GameOptions::default());
        let me = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::PLAYER1);
        let hit = damage_something(
            &mut state,
            IVec2::ZERO,
            5,
            ActorFlags::PLAYER1 | ActorFlags::HURTALWAYS,
            EntityRef::Actor(me),
            Special::None,
        );
        assert!(hit);
        assert_eq!(health(&state, me), 35);
    }

    #[test]
    fn test_dog_fight_allows_player_damage() {
        let options = GameOptions {
            dog_fight: true,
            ..GameOptions::default()
        };
        let mut state = arena_with(options);
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::PLAYER2);
        damage_something(
            &mut state,
            IVec2::ZERO,
            10,
            ActorFlags::PLAYER1,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(health(&state, victim), 30);
    }

    #[test]
    fn test_enemies_do_not_hurt_enemies() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::empty());
        damage_something(
            &mut state,
            IVec2::ZERO,
            10,
            ActorFlags::empty(),
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(health(&state, victim), 40);
        damage_something(
            &mut state,
            IVec2::ZERO,
            10,
            ActorFlags::HURTALWAYS,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(health(&state, victim), 30, "blasts hurt everyone");
    }

    #[test]
    fn test_kill_scores_and_counts() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::empty());
        damage_something(
            &mut state,
            IVec2::ZERO,
            25,
            ActorFlags::PLAYER1,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(state.stats[0].score, 25);
        assert_eq!(state.stats[0].kills, 0);
        damage_something(
            &mut state,
            IVec2::ZERO,
            25,
            ActorFlags::PLAYER1,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(state.stats[0].score, 50);
        assert_eq!(state.stats[0].kills, 1);
    }

    #[test]
    fn test_penalty_victim_costs_points() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::PENALTY);
        damage_something(
            &mut state,
            IVec2::ZERO,
            50,
            ActorFlags::PLAYER2,
            EntityRef::Actor(victim),
            Special::None,
        );
        assert_eq!(state.stats[1].score, -150);
        assert_eq!(state.stats[1].friendlies, 1);
    }

    #[test]
    fn test_status_applies_even_without_injury() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::INVULNERABLE);
        damage_something(
            &mut state,
            IVec2::new(256, 0),
            5,
            ActorFlags::HURTALWAYS,
            EntityRef::Actor(victim),
            Special::Confuse,
        );
        let a = state.actors.get(victim).expect("actor");
        assert_eq!(a.status.confused, CONFUSED_COUNT);
        assert_eq!(a.slide, IVec2::new(256 * 5 / 25, 0));
        assert_eq!(a.health, 40);
    }

    #[test]
    fn test_immunities() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::ASBESTOS | ActorFlags::IMMUNITY);
        for special in [Special::Flame, Special::Poison, Special::Confuse] {
            assert!(damage_something(
                &mut state,
                IVec2::ZERO,
                10,
                ActorFlags::HURTALWAYS,
                EntityRef::Actor(victim),
                special,
            ));
        }
        let a = state.actors.get(victim).expect("actor");
        assert_eq!(a.health, 40);
        assert_eq!(a.status, Default::default());
    }

    #[test]
    fn test_poison_stacks_up_to_cap() {
        let mut state = arena_with(GameOptions::default());
        let victim = actor_with(&mut state, IVec2::new(10, 10), ActorFlags::INVULNERABLE);
        for _ in 0..30 {
            damage_something(
                &mut state,
                IVec2::ZERO,
                0,
                ActorFlags::HURTALWAYS,
                EntityRef::Actor(victim),
                Special::Poison,
            );
        }
        let poisoned = state.actors.get(victim).expect("actor").status.poisoned;
        assert!(poisoned >= MAX_POISONED_COUNT && poisoned < MAX_POISONED_COUNT + POISONED_COUNT);
    }

    #[test]
    fn test_destroying_objective_object() {
        let mut config = MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT);
        config.objectives.push(ObjectiveConfig {
            kind: ObjectiveKind::Destroy,
            description: String::new(),
            required: 1,
            count: 0,
            flags: Default::default(),
            item: None,
        });
        let mut state = SimulationState::new(config, GameOptions::default(), 4);
        let obj = objects::add_object(
            &mut state,
            tile_center(IVec2::new(12, 12)),
            IVec2::new(8, 6),
            ObjectKind::Scenery { def: 0 },
            ItemFlags::CAN_BE_SHOT | ItemFlags::IMPASSABLE,
        );
        {
            let o = state.objects.get_mut(obj).expect("object");
            o.structure = 15;
            o.effects = ObjectEffects::QUAKE;
            o.item.objective = Some(0);
        }
        damage_something(&mut state, IVec2::ZERO, 10, ActorFlags::PLAYER1, EntityRef::Object(obj), Special::None);
        assert!(state.objects.contains(obj));
        assert!(state.mobs.is_empty());
        damage_something(&mut state, IVec2::ZERO, 10, ActorFlags::PLAYER1, EntityRef::Object(obj), Special::None);
        assert!(!state.objects.contains(obj));
        assert_eq!(state.mission.objectives[0].done, 1);
        assert_eq!(state.stats[0].score, OBJECTIVE_SCORE);
        assert!(state.events.contains(&GameEvent::ScreenShake(QUAKE_SHAKE)));
        assert_eq!(state.mobs.len(), 1, "a puff of smoke");
    }

    #[test]
    fn test_explosive_object_blows_up() {
        let mut state = arena_with(GameOptions::default());
        let obj = objects::add_object(
            &mut state,
            tile_center(IVec2::new(20, 20)),
            IVec2::new(4, 3),
            ObjectKind::Scenery { def: 0 },
            ItemFlags::CAN_BE_SHOT | ItemFlags::IMPASSABLE,
        );
        {
            let o = state.objects.get_mut(obj).expect("object");
            o.structure = 5;
            o.effects = ObjectEffects::EXPLOSIVE;
        }
        damage_something(&mut state, IVec2::ZERO, 10, ActorFlags::PLAYER1, EntityRef::Object(obj), Special::None);
        assert!(!state.objects.contains(obj));
        assert!(state.mobs.len() > 1);
    }
}

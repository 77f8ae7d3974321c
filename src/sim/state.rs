//! Simulation state
//!
//! One explicit struct owns every registry, the map, the RNG and the mission
//! bookkeeping. Subsystems are free functions taking `&mut SimulationState`.

use glam::IVec2;

use super::actors::{self, Actor, ActorFlags};
use super::ai::AiState;
use super::map::{EntityRef, MapGrid, TileItem};
use super::mapgen::{self, Layout};
use super::mobs::MobileObject;
use super::objects::MapObject;
use super::registry::{ActorId, MobId, ObjectId, Registry};
use super::rng::Dice;
use super::triggers::TriggerSet;
use crate::audio::SoundId;
use crate::consts::*;
use crate::mission::{Mission, MissionConfig, MissionResults, ObjectiveKind, PlayerResult, PlayerStats};
use crate::settings::GameOptions;
use crate::to_fixed;

/// Side effects for the shell, drained after each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Sound { sound: SoundId, pos: IVec2 },
    ScreenShake(i32),
}

/// Complete simulation state (deterministic for a given seed and command stream)
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub seed: u64,
    pub dice: Dice,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub config: MissionConfig,
    pub options: GameOptions,
    pub mission: Mission,
    pub map: MapGrid,
    /// Logical cell layout the map was rasterized from
    pub layout: Layout,
    pub triggers: TriggerSet,
    pub actors: Registry<ActorId, Actor>,
    pub mobs: Registry<MobId, MobileObject>,
    pub objects: Registry<ObjectId, MapObject>,
    pub players: [Option<ActorId>; MAX_PLAYERS],
    pub prisoner: Option<ActorId>,
    pub stats: [PlayerStats; MAX_PLAYERS],
    pub ai: AiState,
    /// Next death scream in the rotation
    pub scream_index: usize,
    /// Remaining screen shake ticks
    pub screen_shake: i32,
    pub events: Vec<GameEvent>,
}

impl SimulationState {
    /// Build a mission: generate the map and place its scenery and pickups.
    /// Players and enemies are added afterwards with [`Self::spawn_player`]
    /// and [`Self::populate`].
    pub fn new(config: MissionConfig, options: GameOptions, seed: u64) -> Self {
        let mission = Mission::new(&config);
        let mut state = Self {
            seed,
            dice: Dice::new(seed),
            time_ticks: 0,
            config,
            options,
            mission,
            map: MapGrid::new(),
            layout: Layout::default(),
            triggers: TriggerSet::default(),
            actors: Registry::new(),
            mobs: Registry::new(),
            objects: Registry::new(),
            players: [None; MAX_PLAYERS],
            prisoner: None,
            stats: [PlayerStats::default(); MAX_PLAYERS],
            ai: AiState::default(),
            scream_index: 0,
            screen_shake: 0,
            events: Vec::new(),
        };
        mapgen::generate(&mut state);
        log::info!(
            "Mission '{}' ready: {} objects, {} triggers",
            state.config.title,
            state.objects.len(),
            state.triggers.trigger_count()
        );
        state
    }

    /// Collision box of any entity
    pub fn item_of(&self, who: EntityRef) -> Option<&TileItem> {
        match who {
            EntityRef::Actor(id) => self.actors.get(id).map(|a| &a.item),
            EntityRef::Mob(id) => self.mobs.get(id).map(|m| &m.item),
            EntityRef::Object(id) => self.objects.get(id).map(|o| &o.item),
        }
    }

    pub fn play_sound(&mut self, pos: IVec2, sound: SoundId) {
        self.events.push(GameEvent::Sound { sound, pos });
    }

    pub fn shake(&mut self, amount: i32) {
        self.screen_shake = self.screen_shake.max(amount);
        self.events.push(GameEvent::ScreenShake(amount));
    }

    /// Take this tick's events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Player slot named by a flag set, player 1 first
    pub fn player_slot(flags: ActorFlags) -> Option<usize> {
        if flags.contains(ActorFlags::PLAYER1) {
            Some(0)
        } else if flags.contains(ActorFlags::PLAYER2) {
            Some(1)
        } else {
            None
        }
    }

    /// Credit points to the player named by `flags`
    pub fn score(&mut self, flags: ActorFlags, points: i32) {
        if let Some(slot) = Self::player_slot(flags) {
            let stats = &mut self.stats[slot];
            stats.score += points;
            stats.total_score += points;
        }
    }

    pub fn player(&self, slot: usize) -> Option<&Actor> {
        self.players.get(slot).copied().flatten().and_then(|id| self.actors.get(id))
    }

    /// Living player actors
    pub fn living_players(&self) -> impl Iterator<Item = (ActorId, &Actor)> + '_ {
        self.players
            .iter()
            .flatten()
            .filter_map(|id| self.actors.get(*id).map(|a| (*id, a)))
            .filter(|(_, a)| a.dead == 0)
    }

    /// Add a player on open corridor floor. Uses the archetype's gun unless
    /// the mission forbids it, in which case the first allowed gun is used.
    pub fn spawn_player(&mut self, slot: usize, archetype: usize) -> Option<ActorId> {
        if slot >= MAX_PLAYERS {
            return None;
        }
        let mut character = self.config.characters.get(archetype)?.clone();
        character.max_health = GameOptions::scale_health(character.max_health, self.options.player_hp);
        if !self.config.gun_available(character.gun) {
            if let Some(gun) = self.config.available_guns.first() {
                character.gun = *gun;
            }
        }
        let id = actors::add_actor(self, character);
        if let Some(actor) = self.actors.get_mut(id) {
            actor.flags = (actor.flags - ActorFlags::SLEEPING) | ActorFlags::player(slot);
        }

        const ATTEMPTS: usize = 10_000;
        for _ in 0..ATTEMPTS {
            let px = mapgen::guess_pixel_coords(self);
            if self.layout.ok_for_player(px) && actors::place_actor(self, id, to_fixed(px)) {
                self.players[slot] = Some(id);
                log::info!("Player {} spawned at {:?}", slot + 1, px);
                return Some(id);
            }
        }
        // Fall back to the first open corridor tile in scan order
        for tile in self.layout.floor_tiles() {
            let px = crate::tile_center(tile);
            if actors::place_actor(self, id, to_fixed(px)) {
                log::warn!("Player {} placed by scan fallback", slot + 1);
                self.players[slot] = Some(id);
                return Some(id);
            }
        }
        log::warn!("No room for player {}", slot + 1);
        actors::remove_actor(self, id);
        None
    }

    /// Place kill targets, the prisoner and the starting enemy population
    pub fn populate(&mut self) {
        super::ai::initialize_bad_guys(self);
        super::ai::create_characters(self);
    }

    /// Percentage of the mission area seen so far
    pub fn explored_percentage(&self) -> i32 {
        self.map.explored_percentage()
    }

    /// Summary for the scoring screens
    pub fn results(&self) -> MissionResults {
        let players = (0..MAX_PLAYERS)
            .filter(|slot| self.players[*slot].is_some() || self.stats[*slot] != PlayerStats::default())
            .map(|slot| {
                let actor = self.player(slot);
                PlayerResult {
                    slot,
                    survived: actor.is_some_and(Actor::is_alive),
                    health: actor.map_or(0, |a| a.health.max(0)),
                    stats: self.stats[slot],
                }
            })
            .collect();
        let mut objectives = self.mission.objectives.clone();
        for o in objectives.iter_mut().filter(|o| o.kind == ObjectiveKind::Investigate) {
            o.done = self.explored_percentage();
        }
        MissionResults {
            title: self.config.title.clone(),
            players,
            complete: objectives.iter().all(|o| o.is_complete()),
            objectives,
            explored_percent: self.explored_percentage(),
            ticks: self.time_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_goes_to_flagged_player() {
        let mut state =
            SimulationState::new(MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT), GameOptions::default(), 9);
        state.score(ActorFlags::PLAYER2, 15);
        state.score(ActorFlags::GOOD_GUY, 100);
        assert_eq!(state.stats[1].score, 15);
        assert_eq!(state.stats[0].score, 0);
    }

    #[test]
    fn test_spawn_player_on_open_floor() {
        let mut state =
            SimulationState::new(MissionConfig::open_arena(40, 40), GameOptions::default(), 9);
        let id = state.spawn_player(0, 0).expect("player placed");
        let actor = state.actors.get(id).expect("actor");
        assert!(actor.flags.contains(ActorFlags::PLAYER1));
        assert!(!actor.flags.contains(ActorFlags::SLEEPING));
        assert!(state.layout.ok_for_player(actor.pixel_pos()));
    }

    #[test]
    fn test_spawn_player_respects_gun_mask() {
        let mut config = MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT);
        config.available_guns = vec![crate::sim::weapons::GunKind::Shotgun];
        let mut state = SimulationState::new(config, GameOptions::default(), 9);
        let id = state.spawn_player(0, 0).expect("player placed");
        assert_eq!(
            state.actors.get(id).expect("actor").gun,
            crate::sim::weapons::GunKind::Shotgun
        );
    }

    #[test]
    fn test_results_report_survivor() {
        let mut state =
            SimulationState::new(MissionConfig::open_arena(MAP_WIDTH, MAP_HEIGHT), GameOptions::default(), 9);
        state.spawn_player(0, 0).expect("player placed");
        let results = state.results();
        assert_eq!(results.players.len(), 1);
        assert!(results.players[0].survived);
        assert_eq!(results.players[0].health, 40);
        assert!(results.complete);
    }
}

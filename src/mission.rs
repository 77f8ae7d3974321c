//! Mission configuration, objective bookkeeping and results
//!
//! A [`MissionConfig`] is read once at setup. [`Mission`] tracks objective
//! progress while the simulation runs and [`MissionResults`] is produced for
//! the summary screens afterwards.

use std::fs;
use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::actors::ActorFlags;
use crate::sim::objects::{ObjectEffects, PlacementFlags};
use crate::sim::weapons::GunKind;

/// Errors loading or validating a mission
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("failed to read mission file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed mission file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid mission: {0}")]
    Invalid(String),
}

/// Character archetype: stats, AI tendencies and default gun
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterArchetype {
    pub name: String,
    /// Movement per tick in fixed point
    pub speed: i32,
    pub gun: GunKind,
    pub max_health: i32,
    pub flags: ActorFlags,
    pub probability_to_move: i32,
    pub probability_to_track: i32,
    pub probability_to_shoot: i32,
    /// Ticks between AI decisions before the difficulty multiplier
    pub action_delay: i32,
}

impl Default for CharacterArchetype {
    fn default() -> Self {
        Self {
            name: "Grunt".into(),
            speed: 256,
            gun: GunKind::MachineGun,
            max_health: 40,
            flags: ActorFlags::empty(),
            probability_to_move: 50,
            probability_to_track: 25,
            probability_to_shoot: 2,
            action_delay: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveKind {
    Kill,
    Rescue,
    Collect,
    Destroy,
    Investigate,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectiveFlags: u8 {
        /// Not shown on the objective list
        const HIDDEN = 1 << 0;
        /// Shown on the automap
        const POSITION_KNOWN = 1 << 1;
        /// Placed behind a keycard door
        const HIGH_ACCESS = 1 << 2;
        /// Placed outside keycard areas
        const NO_ACCESS = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    pub kind: ObjectiveKind,
    #[serde(default)]
    pub description: String,
    /// Needed for completion
    pub required: i32,
    /// Spawned or placed
    pub count: i32,
    #[serde(default)]
    pub flags: ObjectiveFlags,
    /// Map object type for Destroy objectives
    #[serde(default)]
    pub item: Option<usize>,
}

/// Destructible or decorative object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObjectDef {
    pub name: String,
    /// Half extents in pixels
    pub width: i32,
    pub height: i32,
    pub structure: i32,
    pub placement: PlacementFlags,
    #[serde(default)]
    pub effects: ObjectEffects,
    #[serde(default)]
    pub has_wreck: bool,
}

/// How many of an object type to scatter, per mille of map tiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectDensity {
    pub def: usize,
    pub density: i32,
}

/// Everything the simulation needs to set up a mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub title: String,
    /// Position in the campaign; late missions start with more alert enemies
    pub index: i32,
    /// Requested map size in tiles, at most the grid size
    pub width: i32,
    pub height: i32,
    pub room_count: i32,
    pub wall_count: i32,
    pub wall_length: i32,
    pub square_count: i32,
    /// Target enemy population
    pub baddie_density: i32,
    pub characters: Vec<CharacterArchetype>,
    /// Archetype indices for random enemies
    pub enemies: Vec<usize>,
    /// Archetype indices for kill-objective targets
    pub specials: Vec<usize>,
    /// Archetype index of the rescue target
    pub prisoner: Option<usize>,
    pub objectives: Vec<ObjectiveConfig>,
    pub map_objects: Vec<MapObjectDef>,
    pub items: Vec<ObjectDensity>,
    pub available_guns: Vec<GunKind>,
    pub seed: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            index: 0,
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            room_count: 0,
            wall_count: 0,
            wall_length: 0,
            square_count: 0,
            baddie_density: 0,
            characters: vec![CharacterArchetype::default()],
            enemies: Vec::new(),
            specials: Vec::new(),
            prisoner: None,
            objectives: Vec::new(),
            map_objects: Vec::new(),
            items: Vec::new(),
            available_guns: GunKind::ALL.to_vec(),
            seed: 0,
        }
    }
}

impl MissionConfig {
    /// Empty walled arena, no rooms, enemies or objectives
    pub fn open_arena(width: i32, height: i32) -> Self {
        Self {
            title: "Arena".into(),
            width,
            height,
            ..Self::default()
        }
    }

    /// Small self-contained mission used by the native runner
    pub fn demo() -> Self {
        let player = CharacterArchetype {
            name: "Jones".into(),
            speed: 256,
            gun: GunKind::MachineGun,
            max_health: 200,
            ..CharacterArchetype::default()
        };
        let grunt = CharacterArchetype::default();
        let gunner = CharacterArchetype {
            name: "Gunner".into(),
            gun: GunKind::Shotgun,
            max_health: 60,
            probability_to_track: 40,
            probability_to_shoot: 4,
            ..CharacterArchetype::default()
        };
        let boss = CharacterArchetype {
            name: "Boss".into(),
            speed: 320,
            gun: GunKind::PowerGun,
            max_health: 200,
            flags: ActorFlags::AWAKEALWAYS,
            probability_to_track: 60,
            probability_to_shoot: 10,
            action_delay: 10,
            ..CharacterArchetype::default()
        };
        let hostage = CharacterArchetype {
            name: "Hostage".into(),
            gun: GunKind::Knife,
            max_health: 20,
            flags: ActorFlags::PENALTY,
            probability_to_move: 0,
            probability_to_track: 0,
            probability_to_shoot: 0,
            ..CharacterArchetype::default()
        };
        let barrel = MapObjectDef {
            name: "Barrel".into(),
            width: 4,
            height: 3,
            structure: 20,
            placement: PlacementFlags::IMPASSABLE
                | PlacementFlags::CAN_BE_SHOT
                | PlacementFlags::NO_WALLS,
            effects: ObjectEffects::EXPLOSIVE,
            has_wreck: false,
        };
        let crate_ = MapObjectDef {
            name: "Crate".into(),
            width: 8,
            height: 6,
            structure: 40,
            placement: PlacementFlags::IMPASSABLE
                | PlacementFlags::CAN_BE_SHOT
                | PlacementFlags::ONE_WALL_PLUS,
            effects: ObjectEffects::empty(),
            has_wreck: true,
        };
        let terminal = MapObjectDef {
            name: "Terminal".into(),
            width: 8,
            height: 5,
            structure: 60,
            placement: PlacementFlags::IMPASSABLE
                | PlacementFlags::CAN_BE_SHOT
                | PlacementFlags::ROOM_ONLY
                | PlacementFlags::ON_WALL
                | PlacementFlags::FREE_IN_FRONT,
            effects: ObjectEffects::QUAKE,
            has_wreck: true,
        };
        Self {
            title: "Demo".into(),
            index: 1,
            width: 48,
            height: 48,
            room_count: 8,
            wall_count: 12,
            wall_length: 6,
            square_count: 2,
            baddie_density: 6,
            characters: vec![player, grunt, gunner, boss, hostage],
            enemies: vec![1, 2],
            specials: vec![3],
            prisoner: Some(4),
            objectives: vec![
                ObjectiveConfig {
                    kind: ObjectiveKind::Kill,
                    description: "Eliminate the boss".into(),
                    required: 1,
                    count: 1,
                    flags: ObjectiveFlags::empty(),
                    item: None,
                },
                ObjectiveConfig {
                    kind: ObjectiveKind::Collect,
                    description: "Recover the documents".into(),
                    required: 4,
                    count: 6,
                    flags: ObjectiveFlags::empty(),
                    item: None,
                },
                ObjectiveConfig {
                    kind: ObjectiveKind::Destroy,
                    description: "Wreck the terminals".into(),
                    required: 2,
                    count: 3,
                    flags: ObjectiveFlags::HIGH_ACCESS,
                    item: Some(2),
                },
                ObjectiveConfig {
                    kind: ObjectiveKind::Rescue,
                    description: "Free the hostage".into(),
                    required: 1,
                    count: 1,
                    flags: ObjectiveFlags::empty(),
                    item: None,
                },
                ObjectiveConfig {
                    kind: ObjectiveKind::Investigate,
                    description: "Map the facility".into(),
                    required: 40,
                    count: 100,
                    flags: ObjectiveFlags::HIDDEN,
                    item: None,
                },
            ],
            map_objects: vec![barrel, crate_, terminal],
            items: vec![
                ObjectDensity { def: 0, density: 8 },
                ObjectDensity { def: 1, density: 12 },
            ],
            available_guns: GunKind::ALL.to_vec(),
            seed: 1995,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, MissionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a mission file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MissionError> {
        let json = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded mission '{}' from {}", config.title, path.as_ref().display());
        Ok(config)
    }

    /// Reject configurations the generator cannot honor at all
    pub fn validate(&self) -> Result<(), MissionError> {
        let invalid = |msg: String| Err(MissionError::Invalid(msg));
        if !(8..=MAP_WIDTH).contains(&self.width) || !(8..=MAP_HEIGHT).contains(&self.height) {
            return invalid(format!(
                "map size {}x{} outside 8..={}x{}",
                self.width, self.height, MAP_WIDTH, MAP_HEIGHT
            ));
        }
        if self.characters.is_empty() {
            return invalid("no character archetypes".into());
        }
        let n = self.characters.len();
        if let Some(bad) = self
            .enemies
            .iter()
            .chain(&self.specials)
            .chain(self.prisoner.iter())
            .find(|i| **i >= n)
        {
            return invalid(format!("archetype index {bad} out of range ({n} defined)"));
        }
        for (i, obj) in self.objectives.iter().enumerate() {
            if let Some(item) = obj.item {
                if item >= self.map_objects.len() {
                    return invalid(format!("objective {i} uses unknown object type {item}"));
                }
            }
            if obj.kind == ObjectiveKind::Destroy && obj.item.is_none() {
                return invalid(format!("destroy objective {i} has no object type"));
            }
        }
        if let Some(bad) = self.items.iter().find(|d| d.def >= self.map_objects.len()) {
            return invalid(format!("item density refers to unknown object type {}", bad.def));
        }
        Ok(())
    }

    /// Whether players may carry a gun in this mission
    pub fn gun_available(&self, gun: GunKind) -> bool {
        self.available_guns.contains(&gun)
    }
}

/// Runtime progress of one objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveState {
    pub kind: ObjectiveKind,
    pub required: i32,
    pub count: i32,
    pub done: i32,
}

impl ObjectiveState {
    pub fn is_complete(&self) -> bool {
        self.done >= self.required
    }
}

/// Mission progress while the simulation runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mission {
    pub objectives: Vec<ObjectiveState>,
    /// Keycards collected by any player
    pub keycards: ActorFlags,
}

impl Mission {
    pub fn new(config: &MissionConfig) -> Self {
        Self {
            objectives: config
                .objectives
                .iter()
                .map(|o| ObjectiveState {
                    kind: o.kind,
                    required: o.required.min(o.count).max(0),
                    count: o.count.max(0),
                    done: 0,
                })
                .collect(),
            keycards: ActorFlags::empty(),
        }
    }

    /// Credit one unit of progress. Returns false for unknown objectives.
    pub fn credit(&mut self, index: usize) -> bool {
        match self.objectives.get_mut(index) {
            Some(o) => {
                o.done += 1;
                true
            }
            None => false,
        }
    }

    /// Credit only if the objective is of the given kind
    pub fn credit_kind(&mut self, index: usize, kind: ObjectiveKind) -> bool {
        match self.objectives.get(index) {
            Some(o) if o.kind == kind => self.credit(index),
            _ => false,
        }
    }

    /// Lower the requirement when fewer items could be placed than asked for
    pub fn clamp_to_placed(&mut self, index: usize, placed: i32) {
        if let Some(o) = self.objectives.get_mut(index) {
            if placed < o.count {
                log::warn!(
                    "Objective {index}: placed {placed} of {}, requirement clamped",
                    o.count
                );
                o.count = placed;
                o.required = o.required.min(placed);
            }
        }
    }

    pub fn all_complete(&self) -> bool {
        self.objectives.iter().all(ObjectiveState::is_complete)
    }
}

/// Per-player running statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub score: i32,
    pub total_score: i32,
    pub kills: i32,
    pub friendlies: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub slot: usize,
    pub survived: bool,
    pub health: i32,
    pub stats: PlayerStats,
}

/// Summary handed to the out-of-simulation scoring screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResults {
    pub title: String,
    pub players: Vec<PlayerResult>,
    pub objectives: Vec<ObjectiveState>,
    pub explored_percent: i32,
    pub ticks: u64,
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_is_valid() {
        MissionConfig::demo().validate().expect("demo mission validates");
    }

    #[test]
    fn test_json_round_trip_preserves_config() {
        let demo = MissionConfig::demo();
        let json = serde_json::to_string(&demo).expect("serialize");
        let back = MissionConfig::from_json_str(&json).expect("parse");
        assert_eq!(back, demo);
    }

    #[test]
    fn test_validate_rejects_bad_roster() {
        let mut config = MissionConfig::open_arena(32, 32);
        config.enemies = vec![5];
        assert!(matches!(config.validate(), Err(MissionError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_map() {
        let config = MissionConfig::open_arena(MAP_WIDTH + 1, 32);
        assert!(matches!(config.validate(), Err(MissionError::Invalid(_))));
    }

    #[test]
    fn test_credit_kind_filters() {
        let mut config = MissionConfig::open_arena(32, 32);
        config.objectives.push(ObjectiveConfig {
            kind: ObjectiveKind::Kill,
            description: String::new(),
            required: 2,
            count: 2,
            flags: ObjectiveFlags::empty(),
            item: None,
        });
        let mut mission = Mission::new(&config);
        assert!(!mission.credit_kind(0, ObjectiveKind::Rescue));
        assert!(mission.credit_kind(0, ObjectiveKind::Kill));
        assert!(!mission.credit(3));
        assert_eq!(mission.objectives[0].done, 1);
        assert!(!mission.all_complete());
        mission.credit(0);
        assert!(mission.all_complete());
    }

    #[test]
    fn test_clamp_to_placed() {
        let mut config = MissionConfig::open_arena(32, 32);
        config.objectives.push(ObjectiveConfig {
            kind: ObjectiveKind::Collect,
            description: String::new(),
            required: 5,
            count: 8,
            flags: ObjectiveFlags::empty(),
            item: None,
        });
        let mut mission = Mission::new(&config);
        mission.clamp_to_placed(0, 3);
        assert_eq!(mission.objectives[0].count, 3);
        assert_eq!(mission.objectives[0].required, 3);
    }
}

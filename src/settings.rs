//! Global game options
//!
//! Persisted separately from missions as a small JSON document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or writing the options file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed options file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// AI difficulty tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    #[default]
    Normal,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "Very easy",
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "veryeasy" => Some(Difficulty::VeryEasy),
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            "veryhard" => Some(Difficulty::VeryHard),
            _ => None,
        }
    }

    /// Multiplier on an archetype's action delay between AI decisions
    pub fn decision_interval(&self) -> i32 {
        match self {
            Difficulty::VeryEasy => 4,
            Difficulty::Easy => 2,
            Difficulty::Normal | Difficulty::Hard | Difficulty::VeryHard => 1,
        }
    }

    /// Denominator of AI probability rolls
    pub fn roll_limit(&self) -> i32 {
        match self {
            Difficulty::VeryEasy => 300,
            Difficulty::Easy => 200,
            Difficulty::Normal => 100,
            Difficulty::Hard => 75,
            Difficulty::VeryHard => 50,
        }
    }
}

/// Options that scale every mission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub difficulty: Difficulty,

    // === Population ===
    /// Enemy density, percent of the mission's own density
    pub enemy_density: i32,
    /// Enemy health, percent
    pub npc_hp: i32,
    /// Player health, percent
    pub player_hp: i32,

    // === Friendly fire ===
    /// Players and good guys can hurt each other
    pub players_hurt: bool,
    /// Player versus player
    pub dog_fight: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            enemy_density: 100,
            npc_hp: 100,
            player_hp: 100,
            players_hurt: false,
            dog_fight: false,
        }
    }
}

impl GameOptions {
    /// Options with a given difficulty and everything else at defaults
    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Scale a health value by a percentage option, never below 1
    pub fn scale_health(health: i32, percent: i32) -> i32 {
        (health * percent / 100).max(1)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path.as_ref())?;
        let options = Self::from_json_str(&json)?;
        log::info!("Loaded options from {}", path.as_ref().display());
        Ok(options)
    }

    /// Save options as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Options saved");
        Ok(())
    }
}

//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (newest entity first)
//! - No rendering or platform dependencies

pub mod actors;
pub mod ai;
pub mod collision;
pub mod damage;
pub mod geometry;
pub mod map;
pub mod mapgen;
pub mod mobs;
pub mod objects;
pub mod perception;
pub mod registry;
pub mod rng;
pub mod state;
pub mod tick;
pub mod triggers;
pub mod weapons;

pub use actors::{Actor, ActorFlags, AnimState};
pub use geometry::{Command, Direction};
pub use map::{AccessTier, EntityRef, MapGrid, TileFlags};
pub use mobs::{MobKind, MobileObject};
pub use objects::MapObject;
pub use registry::{ActorId, MobId, ObjectId};
pub use state::{GameEvent, SimulationState};
pub use tick::{TickInput, tick};
pub use weapons::GunKind;

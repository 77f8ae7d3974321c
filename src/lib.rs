//! Shooter Sim - deterministic simulation core of a top-down arcade shooter
//!
//! Core modules:
//! - `sim`: Tick-driven simulation (map, actors, AI, mobile objects, triggers)
//! - `mission`: Mission configuration, objectives and results
//! - `settings`: Global game options
//! - `audio`: Sound ids and the sound sink interface
//! - `render`: Draw callback interface

pub mod audio;
pub mod mission;
pub mod render;
pub mod settings;
pub mod sim;

pub use mission::{MissionConfig, MissionResults};
pub use settings::{Difficulty, GameOptions};

use glam::IVec2;

/// Simulation constants
pub mod consts {
    /// Grid capacity in tiles
    pub const MAP_WIDTH: i32 = 64;
    pub const MAP_HEIGHT: i32 = 64;

    /// Tile size in pixels
    pub const TILE_WIDTH: i32 = 16;
    pub const TILE_HEIGHT: i32 = 12;

    /// Positions are stored as pixels shifted left by this amount
    pub const FIXED_SHIFT: i32 = 8;
    pub const FIXED_ONE: i32 = 1 << FIXED_SHIFT;

    /// Local player slots
    pub const MAX_PLAYERS: usize = 2;

    /// Height at which projectiles travel above the ground
    pub const BULLET_Z: i32 = 10;

    /// Death animation frames before an actor is removed
    pub const DEATH_MAX: i32 = 9;
    /// Blood decal variants
    pub const BLOOD_MAX: u32 = 3;
    /// Fireball animation frames
    pub const FIREBALL_MAX: i32 = 16;

    /// Player view half-extents in tiles (perception and exploration)
    pub const VIEW_HALF_WIDTH: i32 = 10;
    pub const VIEW_HALF_HEIGHT: i32 = 8;
}

/// Convert a pixel position to fixed point
#[inline]
pub fn to_fixed(pixels: IVec2) -> IVec2 {
    pixels << consts::FIXED_SHIFT
}

/// Convert a fixed-point position to pixels
#[inline]
pub fn to_pixels(fixed: IVec2) -> IVec2 {
    fixed >> consts::FIXED_SHIFT
}

/// Tile containing a pixel position
#[inline]
pub fn pixel_to_tile(pixels: IVec2) -> IVec2 {
    IVec2::new(
        pixels.x.div_euclid(consts::TILE_WIDTH),
        pixels.y.div_euclid(consts::TILE_HEIGHT),
    )
}

/// Pixel position of a tile's center
#[inline]
pub fn tile_center(tile: IVec2) -> IVec2 {
    IVec2::new(
        tile.x * consts::TILE_WIDTH + consts::TILE_WIDTH / 2,
        tile.y * consts::TILE_HEIGHT + consts::TILE_HEIGHT / 2,
    )
}

//! Tile grid and per-tile spatial index
//!
//! Every actor, mobile object and static object owns a [`TileItem`] that is
//! linked into the entity list of the tile containing its position. Collision
//! queries only look at the 3x3 tiles around a point.

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::actors::ActorFlags;
use super::registry::{ActorId, MobId, ObjectId};
use crate::consts::*;
use crate::pixel_to_tile;

bitflags! {
    /// Terrain properties of a tile
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TileFlags: u16 {
        const NO_WALK = 1 << 0;
        const NO_SEE = 1 << 1;
        const NO_SHOOT = 1 << 2;
        const IS_SHADOW = 1 << 3;
        const IS_WALL = 1 << 4;
        const OFFSET_PIC = 1 << 5;
        const TRIGGER = 1 << 7;
    }
}

bitflags! {
    /// Collision roles of a tile item
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ItemFlags: u8 {
        const IMPASSABLE = 1 << 0;
        const CAN_BE_SHOT = 1 << 1;
        const CAN_BE_TAKEN = 1 << 2;
    }
}

/// Keycard-gated room classification, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum AccessTier {
    #[default]
    None,
    Yellow,
    Green,
    Blue,
    Red,
}

impl AccessTier {
    /// Rank 0 (no access) to 4 (red)
    pub fn rank(self) -> i32 {
        self as i32
    }

    pub fn from_rank(rank: i32) -> Self {
        match rank {
            1 => AccessTier::Yellow,
            2 => AccessTier::Green,
            3 => AccessTier::Blue,
            r if r >= 4 => AccessTier::Red,
            _ => AccessTier::None,
        }
    }

    /// Keycard flag needed to pass a door of this tier
    pub fn keycard(self) -> ActorFlags {
        match self {
            AccessTier::None => ActorFlags::empty(),
            AccessTier::Yellow => ActorFlags::KEYCARD_YELLOW,
            AccessTier::Green => ActorFlags::KEYCARD_GREEN,
            AccessTier::Blue => ActorFlags::KEYCARD_BLUE,
            AccessTier::Red => ActorFlags::KEYCARD_RED,
        }
    }
}

/// Orientation of the passage through a door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorAxis {
    /// Passage runs north-south; the door sits in a horizontal wall
    Vertical,
    /// Passage runs east-west; the door sits in a vertical wall
    Horizontal,
}

/// Wall junction sprite, chosen from the four cardinal wall neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallPic {
    Single,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftT,
    RightT,
    TopT,
    BottomT,
    Vertical,
    Horizontal,
    Cross,
}

impl WallPic {
    /// Junction for wall neighbors (west, east, south, north)
    pub fn for_neighbors(w: bool, e: bool, s: bool, n: bool) -> Self {
        match (w, e, s, n) {
            (true, true, true, true) => WallPic::Cross,
            (true, true, true, false) => WallPic::TopT,
            (true, true, false, true) => WallPic::BottomT,
            (true, false, true, true) => WallPic::RightT,
            (false, true, true, true) => WallPic::LeftT,
            (false, true, true, false) => WallPic::TopLeft,
            (false, true, false, true) => WallPic::BottomLeft,
            (true, false, true, false) => WallPic::TopRight,
            (true, false, false, true) => WallPic::BottomRight,
            (true, true, false, false) => WallPic::Horizontal,
            (false, false, true, true) => WallPic::Vertical,
            (false, false, true, false) => WallPic::Top,
            (false, false, false, true) => WallPic::Bottom,
            (false, true, false, false) => WallPic::Left,
            (true, false, false, false) => WallPic::Right,
            (false, false, false, false) => WallPic::Single,
        }
    }
}

/// Floor decoration variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorPic {
    Normal,
    Shadow,
    Drainage,
    Clutter1,
    Clutter2,
}

/// Picture of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TilePic {
    #[default]
    Nothing,
    Floor(FloorPic),
    Room { shadow: bool },
    Wall(WallPic),
    Door { axis: DoorAxis, tier: AccessTier },
    DoorOpen { axis: DoorAxis },
}

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile {
    pub flags: TileFlags,
    pub pic: TilePic,
    /// Seen by a player at least once
    pub seen: bool,
}

/// Entity resident in a tile list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Actor(ActorId),
    Mob(MobId),
    Object(ObjectId),
}

/// Collision box of an entity, in pixels. `w`/`h` are half extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileItem {
    pub pos: IVec2,
    pub w: i32,
    pub h: i32,
    pub flags: ItemFlags,
    /// Mission objective this entity counts toward
    pub objective: Option<usize>,
    linked: bool,
}

impl TileItem {
    pub fn new(w: i32, h: i32, flags: ItemFlags) -> Self {
        Self {
            pos: IVec2::ZERO,
            w,
            h,
            flags,
            objective: None,
            linked: false,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn tile(&self) -> IVec2 {
        clamp_tile(pixel_to_tile(self.pos))
    }
}

#[inline]
fn clamp_tile(t: IVec2) -> IVec2 {
    t.clamp(IVec2::ZERO, IVec2::new(MAP_WIDTH - 1, MAP_HEIGHT - 1))
}

/// Fixed-capacity tile grid with per-tile entity lists
#[derive(Debug, Clone)]
pub struct MapGrid {
    tiles: Vec<Tile>,
    things: Vec<Vec<EntityRef>>,
    /// Tiles counted toward exploration (mission area)
    explore_total: i32,
    tiles_seen: i32,
}

impl Default for MapGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl MapGrid {
    pub fn new() -> Self {
        let n = (MAP_WIDTH * MAP_HEIGHT) as usize;
        Self {
            tiles: vec![Tile::default(); n],
            things: vec![Vec::new(); n],
            explore_total: MAP_WIDTH * MAP_HEIGHT,
            tiles_seen: 0,
        }
    }

    /// Clear terrain and entity lists
    pub fn reset(&mut self, explore_total: i32) {
        self.tiles.fill(Tile::default());
        self.things.iter_mut().for_each(Vec::clear);
        self.explore_total = explore_total.max(1);
        self.tiles_seen = 0;
    }

    #[inline]
    pub fn in_bounds(&self, t: IVec2) -> bool {
        t.x >= 0 && t.y >= 0 && t.x < MAP_WIDTH && t.y < MAP_HEIGHT
    }

    #[inline]
    fn index(&self, t: IVec2) -> Option<usize> {
        self.in_bounds(t).then(|| (t.y * MAP_WIDTH + t.x) as usize)
    }

    pub fn tile(&self, t: IVec2) -> Option<&Tile> {
        self.index(t).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, t: IVec2) -> Option<&mut Tile> {
        self.index(t).map(|i| &mut self.tiles[i])
    }

    /// Terrain flags; off-grid reads as solid wall
    pub fn flags_at(&self, t: IVec2) -> TileFlags {
        self.tile(t)
            .map(|tile| tile.flags)
            .unwrap_or(TileFlags::NO_WALK | TileFlags::NO_SEE | TileFlags::NO_SHOOT)
    }

    pub fn set_tile(&mut self, t: IVec2, pic: TilePic, flags: TileFlags) {
        if let Some(tile) = self.tile_mut(t) {
            tile.pic = pic;
            tile.flags = flags;
        }
    }

    /// All tiles, row-major
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Entities resident in a tile, newest first
    pub fn things_at(&self, t: IVec2) -> impl Iterator<Item = EntityRef> + '_ {
        let list: &[EntityRef] = match self.index(t) {
            Some(i) => &self.things[i],
            None => &[],
        };
        list.iter().rev().copied()
    }

    pub fn has_things(&self, t: IVec2) -> bool {
        self.index(t).is_some_and(|i| !self.things[i].is_empty())
    }

    /// Move an item to a new pixel position, relinking it only when its tile changes
    pub fn move_item(&mut self, who: EntityRef, item: &mut TileItem, pos: IVec2) {
        let old = item.tile();
        let new = clamp_tile(pixel_to_tile(pos));
        item.pos = pos;
        if item.linked && old == new {
            return;
        }
        if item.linked {
            self.detach(who, old);
        }
        if let Some(i) = self.index(new) {
            self.things[i].push(who);
        }
        item.linked = true;
    }

    /// Remove an item from the spatial index
    pub fn remove_item(&mut self, who: EntityRef, item: &mut TileItem) {
        if item.linked {
            self.detach(who, item.tile());
            item.linked = false;
        }
    }

    fn detach(&mut self, who: EntityRef, t: IVec2) {
        if let Some(i) = self.index(t) {
            let list = &mut self.things[i];
            if let Some(pos) = list.iter().position(|e| *e == who) {
                list.remove(pos);
            } else {
                debug_assert!(false, "entity {who:?} missing from tile {t}");
            }
        }
    }

    /// Solid terrain at a pixel
    #[inline]
    pub fn is_wall_pixel(&self, px: IVec2) -> bool {
        self.flags_at(pixel_to_tile(px)).contains(TileFlags::NO_WALK)
    }

    pub fn mark_seen(&mut self, t: IVec2) {
        if let Some(tile) = self.tile_mut(t) {
            if !tile.seen {
                tile.seen = true;
                self.tiles_seen += 1;
            }
        }
    }

    /// Percentage of the mission area seen by players
    pub fn explored_percentage(&self) -> i32 {
        (100 * self.tiles_seen / self.explore_total).min(100)
    }
}

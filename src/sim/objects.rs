//! Static scenery, pickups and decals

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::map::{AccessTier, EntityRef, ItemFlags, TileItem};
use super::registry::{ActorId, ObjectId};
use super::state::SimulationState;
use crate::audio::SoundId;
use crate::consts::*;

bitflags! {
    /// What a destructible does when it breaks
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectEffects: u8 {
        const EXPLOSIVE = 1 << 0;
        const FLAMMABLE = 1 << 1;
        const POISONOUS = 1 << 2;
        const CONFUSING = 1 << 3;
        const QUAKE = 1 << 4;
    }
}

impl ObjectEffects {
    /// Objects a melee bump refuses to stab
    pub const DANGEROUS: ObjectEffects = ObjectEffects::EXPLOSIVE
        .union(ObjectEffects::FLAMMABLE)
        .union(ObjectEffects::POISONOUS)
        .union(ObjectEffects::CONFUSING);
}

bitflags! {
    /// Collision roles and placement rules of a map object type
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PlacementFlags: u16 {
        const IMPASSABLE = 1 << 0;
        const CAN_BE_SHOT = 1 << 1;
        /// Must stand on a room floor
        const ROOM_ONLY = 1 << 2;
        /// Must stand outside rooms
        const NOT_IN_ROOM = 1 << 3;
        /// Tile to the south must be open floor; it is then kept free
        const FREE_IN_FRONT = 1 << 4;
        /// Exactly one blocked cardinal neighbor
        const ONE_WALL = 1 << 5;
        /// At least one blocked cardinal neighbor
        const ONE_WALL_PLUS = 1 << 6;
        /// No blocked tile among the eight neighbors
        const NO_WALLS = 1 << 7;
        /// Flush against a wall above
        const ON_WALL = 1 << 8;
    }
}

impl PlacementFlags {
    pub fn item_flags(self) -> ItemFlags {
        let mut flags = ItemFlags::empty();
        if self.contains(PlacementFlags::IMPASSABLE) {
            flags |= ItemFlags::IMPASSABLE;
        }
        if self.contains(PlacementFlags::CAN_BE_SHOT) {
            flags |= ItemFlags::CAN_BE_SHOT;
        }
        flags
    }
}

/// Things a player can walk over and take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    /// Collect-objective item, worth points
    Jewel,
    Keycard(AccessTier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Instance of a mission map object type
    Scenery { def: usize },
    Pickup(PickupKind),
    /// Left behind by a removed corpse
    Blood { variant: u32 },
}

#[derive(Debug, Clone)]
pub struct MapObject {
    pub kind: ObjectKind,
    /// Hit points; the object breaks at zero or below
    pub structure: i32,
    pub effects: ObjectEffects,
    /// Broken objects turn into this wreck instead of vanishing
    pub has_wreck: bool,
    pub wrecked: bool,
    pub item: TileItem,
}

pub const JEWEL_SCORE: i32 = 10;

/// Add an object centered at a pixel position
pub fn add_object(
    state: &mut SimulationState,
    pos: IVec2,
    size: IVec2,
    kind: ObjectKind,
    item_flags: ItemFlags,
) -> ObjectId {
    let item = TileItem::new(size.x, size.y, item_flags);
    let id = state.objects.insert(MapObject {
        kind,
        structure: 0,
        effects: ObjectEffects::empty(),
        has_wreck: false,
        wrecked: false,
        item,
    });
    if let Some(obj) = state.objects.get_mut(id) {
        state.map.move_item(EntityRef::Object(id), &mut obj.item, pos);
    }
    id
}

/// Add an instance of a mission object type
pub fn add_scenery(state: &mut SimulationState, pos: IVec2, def: usize) -> Option<ObjectId> {
    let d = state.config.map_objects.get(def)?.clone();
    let id = add_object(
        state,
        pos,
        IVec2::new(d.width, d.height),
        ObjectKind::Scenery { def },
        d.placement.item_flags(),
    );
    if let Some(obj) = state.objects.get_mut(id) {
        obj.structure = d.structure;
        obj.effects = d.effects;
        obj.has_wreck = d.has_wreck;
    }
    Some(id)
}

pub fn remove_object(state: &mut SimulationState, id: ObjectId) {
    if let Some(mut obj) = state.objects.remove(id) {
        state.map.remove_item(EntityRef::Object(id), &mut obj.item);
    }
}

/// Blood decal where a corpse was removed
pub fn add_blood(state: &mut SimulationState, pos: IVec2) -> ObjectId {
    let variant = state.dice.below(BLOOD_MAX as i32) as u32;
    add_object(
        state,
        pos,
        IVec2::ZERO,
        ObjectKind::Blood { variant },
        ItemFlags::empty(),
    )
}

/// Break an object: keep a wreck if it has one, otherwise remove it
pub fn wreck_object(state: &mut SimulationState, id: ObjectId) {
    let Some(obj) = state.objects.get_mut(id) else {
        return;
    };
    if obj.has_wreck {
        obj.wrecked = true;
        obj.structure = 0;
        obj.item.flags = ItemFlags::empty();
    } else {
        remove_object(state, id);
    }
}

/// A player walked over a takeable object
pub fn pick_up(state: &mut SimulationState, by: ActorId, id: ObjectId) {
    let Some(obj) = state.objects.get(id) else {
        return;
    };
    let (kind, objective, pos) = (obj.kind, obj.item.objective, obj.item.pos);
    let flags = match state.actors.get(by) {
        Some(a) => a.flags,
        None => return,
    };
    match kind {
        ObjectKind::Pickup(PickupKind::Jewel) => state.score(flags, JEWEL_SCORE),
        ObjectKind::Pickup(PickupKind::Keycard(tier)) => {
            state.mission.keycards |= tier.keycard();
            log::debug!("Picked up {tier:?} keycard");
        }
        _ => {}
    }
    if let Some(index) = objective {
        state.mission.credit(index);
    }
    remove_object(state, id);
    state.play_sound(pos, SoundId::Pickup);
}

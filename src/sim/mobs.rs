//! Mobile objects: projectiles, blasts, clouds and mines
//!
//! Each object is a [`MobKind`] plus shared kinematic state. Every tick each
//! object is advanced once; the ones that expire are collected and removed
//! after the pass, so nothing is freed while the registry is being walked.
//!
//! All kinds follow the same expiry rule: the tick counter is bumped first
//! and the object goes away on the update where it exceeds its range. Armed
//! mines are the exception and wait indefinitely.

use glam::IVec2;

use super::actors::ActorFlags;
use super::collision::check_item_collision;
use super::damage::{Special, damage_something};
use super::geometry::{Direction, scale_vector, vectors_for_angle};
use super::map::{EntityRef, ItemFlags, TileItem};
use super::registry::MobId;
use super::state::SimulationState;
use super::weapons::GunKind;
use crate::audio::SoundId;
use crate::consts::*;
use crate::{pixel_to_tile, to_pixels};

pub const MG_SPEED: i32 = 768;
pub const MG_RANGE: i32 = 60;
pub const MG_POWER: i32 = 10;

pub const SHOTGUN_SPEED: i32 = 640;
pub const SHOTGUN_RANGE: i32 = 50;
pub const SHOTGUN_POWER: i32 = 15;

pub const FLAME_SPEED: i32 = 384;
pub const FLAME_RANGE: i32 = 30;
pub const FLAME_POWER: i32 = 12;

pub const LASER_SPEED: i32 = 1024;
pub const LASER_RANGE: i32 = 90;
pub const LASER_POWER: i32 = 20;

pub const SNIPER_SPEED: i32 = 1024;
pub const SNIPER_RANGE: i32 = 90;
pub const SNIPER_POWER: i32 = 50;

pub const GRENADE_SPEED: i32 = 384;
pub const GRENADE_RANGE: i32 = 100;
pub const GRENADE_LIFT: i32 = 24;

pub const FIREBALL_POWER: i32 = 5;
pub const FIREBALL_RANGE: i32 = FIREBALL_MAX * 4 - 1;

pub const FRAG_POWER: i32 = 40;
pub const MOLOTOV_FLAME_POWER: i32 = 2;

/// Ticks before a dropped mine arms itself
pub const MINE_ARM_TICKS: i32 = 140;
/// Fuse of a mine once someone walks near it
pub const MINE_FUSE: i32 = 5;
pub const DYNAMITE_FUSE: i32 = 210;

pub const EXPLOSION_SHAKE: i32 = 15;

/// What a thrown bomb does when its timer runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Explosion,
    Frag,
    Gas(Special),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobKind {
    /// Straight flight; turns into a spark on impact
    Bullet { special: Special },
    /// Bullet whose heading wobbles after every tick
    BrownBullet,
    /// Impact flash
    Spark,
    /// Flamer particle
    Flame,
    /// Bouncing bomb
    Grenade(Payload),
    /// Bursts into flames on landing or on a wall
    Molotov,
    /// Burning fragment of a molotov
    MolotovFlame,
    /// Drifting poison or confusion cloud
    GasCloud(Special),
    DroppedMine,
    ActiveMine,
    /// Lit fuse; explodes when the range runs out
    TriggeredMine,
    Fireball,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobileObject {
    pub kind: MobKind,
    /// Weapon that produced it, if any
    pub gun: Option<GunKind>,
    /// Fixed-point position
    pub pos: IVec2,
    /// Height above the floor
    pub z: i32,
    pub dz: i32,
    /// Fixed-point velocity per tick
    pub vel: IVec2,
    pub count: i32,
    pub range: i32,
    pub power: i32,
    /// Attacker flags of whoever spawned it
    pub flags: ActorFlags,
    /// Animation frame seed
    pub frame: i32,
    pub item: TileItem,
}

impl MobileObject {
    pub fn new(kind: MobKind, pos: IVec2, flags: ActorFlags) -> Self {
        Self {
            kind,
            gun: None,
            pos,
            z: 0,
            dz: 0,
            vel: IVec2::ZERO,
            count: 0,
            range: 0,
            power: 0,
            flags,
            frame: 0,
            item: TileItem::new(0, 0, ItemFlags::empty()),
        }
    }

    fn sized(mut self, w: i32, h: i32) -> Self {
        self.item.w = w;
        self.item.h = h;
        self
    }

    pub fn pixel_pos(&self) -> IVec2 {
        to_pixels(self.pos)
    }
}

/// Register an object and link it into the tile index at its position
pub fn spawn(state: &mut SimulationState, mob: MobileObject) -> MobId {
    let px = mob.pixel_pos();
    let id = state.mobs.insert(mob);
    if let Some(m) = state.mobs.get_mut(id) {
        state.map.move_item(EntityRef::Mob(id), &mut m.item, px);
    }
    id
}

pub fn remove_mob(state: &mut SimulationState, id: MobId) {
    if let Some(mut mob) = state.mobs.remove(id) {
        state.map.remove_item(EntityRef::Mob(id), &mut mob.item);
    }
}

fn bullet(kind: MobKind, pos: IVec2, vel: IVec2, range: i32, power: i32, flags: ActorFlags) -> MobileObject {
    MobileObject {
        z: BULLET_Z,
        vel,
        range,
        power,
        ..MobileObject::new(kind, pos, flags)
    }
}

pub fn add_bullet(
    state: &mut SimulationState,
    pos: IVec2,
    angle: i32,
    speed: i32,
    range: i32,
    power: i32,
    flags: ActorFlags,
) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), speed);
    let kind = MobKind::Bullet {
        special: Special::None,
    };
    spawn(state, bullet(kind, pos, vel, range, power, flags))
}

pub fn add_brown_bullet(
    state: &mut SimulationState,
    pos: IVec2,
    angle: i32,
    speed: i32,
    range: i32,
    power: i32,
    flags: ActorFlags,
) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), speed);
    spawn(state, bullet(MobKind::BrownBullet, pos, vel, range, power, flags))
}

pub fn add_sniper_bullet(state: &mut SimulationState, pos: IVec2, dir: Direction, flags: ActorFlags) -> MobId {
    let vel = scale_vector(vectors_for_angle(dir.angle()), SNIPER_SPEED);
    let kind = MobKind::Bullet {
        special: Special::None,
    };
    let mut mob = bullet(kind, pos, vel, SNIPER_RANGE, SNIPER_POWER, flags);
    mob.frame = dir.index();
    spawn(state, mob)
}

pub fn add_laser_bolt(state: &mut SimulationState, pos: IVec2, dir: Direction, flags: ActorFlags) -> MobId {
    let vel = scale_vector(vectors_for_angle(dir.angle()), LASER_SPEED);
    let kind = MobKind::Bullet {
        special: Special::None,
    };
    let mut mob = bullet(kind, pos, vel, LASER_RANGE, LASER_POWER, flags).sized(2, 2);
    mob.frame = dir.index();
    spawn(state, mob)
}

pub fn add_heatseeker(
    state: &mut SimulationState,
    pos: IVec2,
    angle: i32,
    speed: i32,
    range: i32,
    power: i32,
    flags: ActorFlags,
) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), speed);
    let kind = MobKind::Bullet {
        special: Special::None,
    };
    let mut mob = bullet(kind, pos, vel, range, power, flags).sized(3, 3);
    mob.dz = speed;
    spawn(state, mob)
}

/// Projectile starting a little ahead of the muzzle
fn ahead(pos: IVec2, angle: i32) -> IVec2 {
    let v = vectors_for_angle(angle);
    pos + IVec2::new(4 * v.x, 7 * v.y)
}

pub fn add_petrifier_bullet(
    state: &mut SimulationState,
    pos: IVec2,
    angle: i32,
    speed: i32,
    range: i32,
    flags: ActorFlags,
) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), speed);
    let kind = MobKind::Bullet {
        special: Special::Petrify,
    };
    let at = pos + IVec2::new(4 * vel.x, 7 * vel.y);
    spawn(state, bullet(kind, at, vel, range, 0, flags).sized(5, 5))
}

pub fn add_flame(state: &mut SimulationState, pos: IVec2, angle: i32, range: i32, flags: ActorFlags) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), FLAME_SPEED);
    let mob = bullet(MobKind::Flame, ahead(pos, angle), vel, range, FLAME_POWER, flags).sized(5, 5);
    spawn(state, mob)
}

pub fn add_gas_cloud(
    state: &mut SimulationState,
    pos: IVec2,
    angle: i32,
    speed: i32,
    range: i32,
    flags: ActorFlags,
    special: Special,
) -> MobId {
    let vel = scale_vector(vectors_for_angle(angle), speed);
    let mob = MobileObject {
        vel,
        range,
        frame: state.dice.bits(0xff),
        ..MobileObject::new(MobKind::GasCloud(special), pos + 6 * vel, flags)
    }
    .sized(10, 10);
    spawn(state, mob)
}

/// Thrown bomb; `kind` is a grenade payload or a molotov
pub fn add_grenade(state: &mut SimulationState, pos: IVec2, angle: i32, flags: ActorFlags, kind: MobKind) -> MobId {
    let mob = MobileObject {
        vel: scale_vector(vectors_for_angle(angle), GRENADE_SPEED),
        dz: GRENADE_LIFT,
        range: GRENADE_RANGE,
        ..MobileObject::new(kind, pos, flags)
    };
    spawn(state, mob)
}

pub fn add_proximity_mine(state: &mut SimulationState, pos: IVec2, flags: ActorFlags) -> MobId {
    let mob = MobileObject {
        range: MINE_ARM_TICKS,
        ..MobileObject::new(MobKind::DroppedMine, pos, flags)
    };
    spawn(state, mob)
}

pub fn add_dynamite(state: &mut SimulationState, pos: IVec2, flags: ActorFlags) -> MobId {
    let mob = MobileObject {
        range: DYNAMITE_FUSE,
        ..MobileObject::new(MobKind::TriggeredMine, pos, flags)
    };
    spawn(state, mob)
}

fn fireball(pos: IVec2, flags: ActorFlags) -> MobileObject {
    MobileObject {
        range: FIREBALL_RANGE,
        power: FIREBALL_POWER,
        ..MobileObject::new(MobKind::Fireball, pos, flags)
    }
    .sized(7, 5)
}

/// Three staggered rings of fireballs that hurt everyone
pub fn add_explosion(state: &mut SimulationState, pos: IVec2, flags: ActorFlags) {
    let flags = flags | ActorFlags::HURTALWAYS;
    for i in 0..8 {
        let v = vectors_for_angle(i * 32);
        spawn(
            state,
            MobileObject {
                vel: v,
                ..fireball(pos + 2 * v, flags)
            },
        );
    }
    for i in 0..8 {
        let v = vectors_for_angle(i * 32 + 16);
        spawn(
            state,
            MobileObject {
                vel: v * 3 / 4,
                dz: 8,
                count: -8,
                ..fireball(pos + v, flags)
            },
        );
    }
    for i in 0..8 {
        let v = vectors_for_angle(i * 32);
        spawn(
            state,
            MobileObject {
                vel: v / 2,
                dz: 11,
                count: -16,
                ..fireball(pos, flags)
            },
        );
    }
    log::debug!("Explosion at {:?}", to_pixels(pos));
    state.shake(EXPLOSION_SHAKE);
    state.play_sound(to_pixels(pos), SoundId::Explosion);
}

/// Ring of shrapnel
pub fn add_frag(state: &mut SimulationState, pos: IVec2, flags: ActorFlags) {
    let flags = flags | ActorFlags::HURTALWAYS;
    for i in 0..16 {
        add_bullet(state, pos, i * 16, SHOTGUN_SPEED, SHOTGUN_RANGE, FRAG_POWER, flags);
    }
    state.play_sound(to_pixels(pos), SoundId::Bang);
}

/// Spray of burning fragments
pub fn add_fire(state: &mut SimulationState, pos: IVec2, flags: ActorFlags) {
    let flags = flags | ActorFlags::HURTALWAYS;
    for _ in 0..16 {
        let r = state.dice.below(32);
        let range = (FLAME_RANGE + state.dice.below(8)) * 4;
        let dz = 4 + state.dice.below(4);
        let mob = MobileObject {
            vel: IVec2::new(16 * r - 256, 12 * r - 192),
            dz,
            range,
            power: MOLOTOV_FLAME_POWER,
            frame: state.dice.bits(0xff),
            ..MobileObject::new(MobKind::MolotovFlame, pos, flags)
        }
        .sized(5, 5);
        spawn(state, mob);
    }
    state.play_sound(to_pixels(pos), SoundId::Bang);
}

/// Burst of eight drifting clouds
pub fn add_gas(state: &mut SimulationState, pos: IVec2, flags: ActorFlags, special: Special) {
    let flags = flags | ActorFlags::HURTALWAYS;
    for _ in 0..8 {
        let angle = state.dice.bits(0xff);
        let speed = state.dice.bits(0xff);
        let range = (24 + state.dice.below(8)) * 4 - 1;
        add_gas_cloud(state, pos, angle, speed, range, flags, special);
    }
    state.play_sound(to_pixels(pos), SoundId::Bang);
}

/// Harmless smoke where a plain object broke
pub fn add_puff(state: &mut SimulationState, pos: IVec2) {
    spawn(
        state,
        MobileObject {
            count: 10,
            power: 0,
            ..fireball(pos, ActorFlags::empty())
        },
    );
    state.play_sound(to_pixels(pos), SoundId::Bang);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Expire,
}

/// Bump the tick counter; true once the range is exceeded
fn expired(mob: &mut MobileObject) -> bool {
    mob.count += 1;
    mob.count > mob.range
}

fn hits_wall(state: &SimulationState, fixed: IVec2) -> bool {
    state.map.is_wall_pixel(to_pixels(fixed))
}

fn relocate(state: &mut SimulationState, id: MobId, mob: &mut MobileObject, to: IVec2) {
    mob.pos = to;
    state.map.move_item(EntityRef::Mob(id), &mut mob.item, to_pixels(to));
}

/// Damage the first shootable thing at `at`. True if it took the hit.
fn hit_item(state: &mut SimulationState, id: MobId, mob: &MobileObject, at: IVec2, special: Special) -> bool {
    let target = check_item_collision(
        state,
        Some(EntityRef::Mob(id)),
        &mob.item,
        to_pixels(at),
        ItemFlags::CAN_BE_SHOT,
    );
    match target {
        Some(t) => damage_something(state, mob.vel, mob.power, mob.flags, t, special),
        None => false,
    }
}

fn decelerate(v: IVec2) -> IVec2 {
    let toward_zero = |c: i32, step: i32| c - step * c.signum();
    IVec2::new(toward_zero(v.x, 4), toward_zero(v.y, 3))
}

fn update_bullet(state: &mut SimulationState, id: MobId, mob: &mut MobileObject, special: Special) -> Step {
    if expired(mob) {
        return Step::Expire;
    }
    let next = mob.pos + mob.vel;
    if hit_item(state, id, mob, next, special) || hits_wall(state, next) {
        mob.kind = MobKind::Spark;
        mob.count = 0;
        mob.range = 0;
    } else {
        relocate(state, id, mob, next);
    }
    Step::Continue
}

fn update_flame(state: &mut SimulationState, id: MobId, mob: &mut MobileObject) -> Step {
    if expired(mob) {
        return Step::Expire;
    }
    if mob.count & 3 == 0 {
        mob.frame = state.dice.bits(0xff);
    }
    let next = mob.pos + mob.vel;
    if hit_item(state, id, mob, next, Special::Flame) {
        // Burns out on the next tick
        mob.count = mob.range;
        relocate(state, id, mob, next);
        return Step::Continue;
    }
    if hits_wall(state, next) {
        return Step::Expire;
    }
    relocate(state, id, mob, next);
    Step::Continue
}

/// Shared drift for molotov flames and gas clouds: they slow down, hurt what
/// they touch and slide along walls without dying on them
fn update_drifter(state: &mut SimulationState, id: MobId, mob: &mut MobileObject, special: Special) -> Step {
    if expired(mob) {
        return Step::Expire;
    }
    if mob.count & 3 == 0 {
        mob.frame = state.dice.bits(0xff);
    }
    if mob.kind == MobKind::MolotovFlame {
        mob.z += mob.dz / 2;
        if mob.z <= 0 {
            mob.z = 0;
        } else {
            mob.dz -= 1;
        }
    }
    let next = mob.pos + mob.vel;
    mob.vel = decelerate(mob.vel);
    hit_item(state, id, mob, next, special);
    if !hits_wall(state, next) {
        relocate(state, id, mob, next);
    }
    Step::Continue
}

fn detonate(state: &mut SimulationState, payload: Payload, pos: IVec2, flags: ActorFlags) {
    log::debug!("{payload:?} detonated at {:?}", to_pixels(pos));
    match payload {
        Payload::Explosion => add_explosion(state, pos, flags),
        Payload::Frag => add_frag(state, pos, flags),
        Payload::Gas(special) => add_gas(state, pos, flags, special),
    }
}

fn update_grenade(state: &mut SimulationState, id: MobId, mob: &mut MobileObject, payload: Payload) -> Step {
    if expired(mob) {
        detonate(state, payload, mob.pos, mob.flags);
        return Step::Expire;
    }
    let next = mob.pos + mob.vel;
    mob.z += mob.dz;
    if mob.z <= 0 {
        mob.z = 0;
        mob.dz = -mob.dz / 2;
        mob.vel = mob.vel * 3 / 4;
    } else {
        mob.dz -= 1;
    }

    let to = if !hits_wall(state, next) {
        next
    } else if !hits_wall(state, IVec2::new(mob.pos.x, next.y)) {
        mob.vel.x = -mob.vel.x;
        IVec2::new(mob.pos.x, next.y)
    } else if !hits_wall(state, IVec2::new(next.x, mob.pos.y)) {
        mob.vel.y = -mob.vel.y;
        IVec2::new(next.x, mob.pos.y)
    } else {
        mob.vel = -mob.vel;
        return Step::Continue;
    };
    relocate(state, id, mob, to);
    Step::Continue
}

fn update_molotov(state: &mut SimulationState, id: MobId, mob: &mut MobileObject) -> Step {
    if expired(mob) {
        add_fire(state, mob.pos, mob.flags);
        return Step::Expire;
    }
    let next = mob.pos + mob.vel;
    mob.z += mob.dz;
    if mob.z <= 0 {
        add_fire(state, mob.pos, mob.flags);
        return Step::Expire;
    }
    mob.dz -= 1;
    if hits_wall(state, next) {
        add_fire(state, mob.pos, mob.flags);
        return Step::Expire;
    }
    relocate(state, id, mob, next);
    Step::Continue
}

fn update_active_mine(state: &mut SimulationState, mob: &mut MobileObject) -> Step {
    mob.count += 1;
    if mob.count & 3 != 0 {
        return Step::Continue;
    }
    let t = pixel_to_tile(mob.pixel_pos());
    if t.x <= 0 || t.y <= 0 || t.x >= MAP_WIDTH - 1 || t.y >= MAP_HEIGHT - 1 {
        return Step::Expire;
    }
    let someone_near = (-1..=1).any(|dy| {
        (-1..=1).any(|dx| {
            state
                .map
                .things_at(t + IVec2::new(dx, dy))
                .any(|e| matches!(e, EntityRef::Actor(_)))
        })
    });
    if someone_near {
        mob.kind = MobKind::TriggeredMine;
        mob.count = 0;
        mob.range = MINE_FUSE;
        state.play_sound(mob.pixel_pos(), SoundId::MineTrigger);
    }
    Step::Continue
}

fn update_fireball(state: &mut SimulationState, id: MobId, mob: &mut MobileObject) -> Step {
    mob.count += 1;
    if mob.count < 0 {
        return Step::Continue;
    }
    if mob.count > mob.range {
        return Step::Expire;
    }
    let next = mob.pos + mob.vel;
    mob.z += mob.dz;
    mob.dz -= 1;
    hit_item(state, id, mob, next, Special::None);
    if hits_wall(state, next) {
        return Step::Expire;
    }
    relocate(state, id, mob, next);
    Step::Continue
}

fn update_mob(state: &mut SimulationState, id: MobId) -> Step {
    let Some(mut mob) = state.mobs.get(id).copied() else {
        return Step::Continue;
    };
    let step = match mob.kind {
        MobKind::Bullet { special } => update_bullet(state, id, &mut mob, special),
        MobKind::BrownBullet => {
            let step = update_bullet(state, id, &mut mob, Special::None);
            if step == Step::Continue && mob.kind == MobKind::BrownBullet {
                mob.vel.x += (state.dice.below(3) - 1) * 128;
                mob.vel.y += (state.dice.below(3) - 1) * 128;
            }
            step
        }
        MobKind::Spark => {
            if expired(&mut mob) {
                Step::Expire
            } else {
                Step::Continue
            }
        }
        MobKind::Flame => update_flame(state, id, &mut mob),
        MobKind::MolotovFlame => update_drifter(state, id, &mut mob, Special::Flame),
        MobKind::GasCloud(special) => update_drifter(state, id, &mut mob, special),
        MobKind::Grenade(payload) => update_grenade(state, id, &mut mob, payload),
        MobKind::Molotov => update_molotov(state, id, &mut mob),
        // Mines share the `count > range` rule with every other timed object
        MobKind::DroppedMine => {
            if expired(&mut mob) {
                mob.kind = MobKind::ActiveMine;
                mob.count = 0;
            }
            Step::Continue
        }
        MobKind::ActiveMine => update_active_mine(state, &mut mob),
        MobKind::TriggeredMine => {
            // Detonates the tick after the fuse count passes its range
            if expired(&mut mob) {
                add_explosion(state, mob.pos, mob.flags);
                Step::Expire
            } else {
                Step::Continue
            }
        }
        MobKind::Fireball => update_fireball(state, id, &mut mob),
    };
    if let Some(slot) = state.mobs.get_mut(id) {
        *slot = mob;
    }
    step
}

/// Advance every mobile object once, then remove the expired ones.
/// Objects spawned during the pass wait until the next tick.
pub fn update_mobile_objects(state: &mut SimulationState) {
    let mut expired = Vec::new();
    for id in state.mobs.ids() {
        if update_mob(state, id) == Step::Expire {
            expired.push(id);
        }
    }
    for id in expired {
        remove_mob(state, id);
    }
}

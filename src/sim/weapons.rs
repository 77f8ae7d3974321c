//! Guns and the firing dispatch
//!
//! [`shoot`] is the only way an actor fires. It is a silent no-op while the
//! gun lock is running; otherwise it spawns the gun's projectiles at the
//! muzzle, restarts the lock, charges the ammunition cost against the
//! shooter's score and plays the gun's sound.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::actors::ActorFlags;
use super::damage::Special;
use super::geometry::Direction;
use super::mobs::{self, MobKind, Payload};
use super::registry::{ActorId, MobId};
use super::state::SimulationState;
use crate::audio::SoundId;
use crate::consts::*;
use crate::to_fixed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GunKind {
    /// Melee only; hurts by bumping into things
    Knife,
    #[default]
    MachineGun,
    Grenade,
    Flamer,
    Shotgun,
    PowerGun,
    FragGrenade,
    Molotov,
    Sniper,
    Mine,
    Dynamite,
    GasBomb,
    Petrify,
    Brown,
    ConfuseBomb,
    GasGun,
    PulseRifle,
    Heatseeker,
}

/// Rate of fire, ammunition cost and report of a gun
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GunStats {
    /// Ticks before the next shot
    pub lock: i32,
    /// Points charged per shot
    pub cost: i32,
    pub sound: SoundId,
}

/// Ticks a stream weapon stays quiet after playing its sound
pub const STREAM_SOUND_LOCK: i32 = 48;

impl GunKind {
    pub const ALL: [GunKind; 18] = [
        GunKind::Knife,
        GunKind::MachineGun,
        GunKind::Grenade,
        GunKind::Flamer,
        GunKind::Shotgun,
        GunKind::PowerGun,
        GunKind::FragGrenade,
        GunKind::Molotov,
        GunKind::Sniper,
        GunKind::Mine,
        GunKind::Dynamite,
        GunKind::GasBomb,
        GunKind::Petrify,
        GunKind::Brown,
        GunKind::ConfuseBomb,
        GunKind::GasGun,
        GunKind::PulseRifle,
        GunKind::Heatseeker,
    ];

    pub fn stats(self) -> GunStats {
        let (lock, cost, sound) = match self {
            GunKind::Knife => (0, 0, SoundId::Bang),
            GunKind::MachineGun => (6, 1, SoundId::MachineGun),
            GunKind::Grenade | GunKind::FragGrenade | GunKind::Molotov => (30, 20, SoundId::Launch),
            GunKind::Flamer | GunKind::GasGun => (6, 1, SoundId::Flamer),
            GunKind::Shotgun => (50, 5, SoundId::Shotgun),
            GunKind::PowerGun => (20, 2, SoundId::PowerGun),
            GunKind::Sniper => (100, 5, SoundId::Laser),
            GunKind::Mine => (100, 10, SoundId::Hahaha),
            GunKind::Dynamite => (100, 5, SoundId::Hahaha),
            GunKind::GasBomb | GunKind::ConfuseBomb => (30, 10, SoundId::Launch),
            GunKind::Petrify => (100, 7, SoundId::Laser),
            GunKind::Brown => (30, 7, SoundId::PowerGun),
            GunKind::PulseRifle => (4, 1, SoundId::Minigun),
            GunKind::Heatseeker => (30, 7, SoundId::Launch),
        };
        GunStats { lock, cost, sound }
    }

    /// Fires by pulling the trigger rather than by bumping
    pub fn is_ranged(self) -> bool {
        self != GunKind::Knife
    }

    /// Continuous streams play their sound at most every [`STREAM_SOUND_LOCK`] ticks
    pub fn is_stream(self) -> bool {
        matches!(self, GunKind::Flamer | GunKind::GasGun)
    }
}

/// Pixel offset from an actor's center to the muzzle, by facing. Projectiles
/// travel at [`BULLET_Z`] above the floor, so the ground point sits that
/// much lower than the drawn muzzle.
pub fn muzzle_offset(dir: Direction) -> IVec2 {
    const MUZZLE: [(i32, i32); 8] = [
        (4, -20),
        (12, -18),
        (13, -8),
        (12, -2),
        (-4, 2),
        (-12, -2),
        (-13, -8),
        (-12, -18),
    ];
    let (x, y) = MUZZLE[dir as usize];
    IVec2::new(x, y + BULLET_Z)
}

/// Small random deviation for automatic weapons
fn jitter(state: &mut SimulationState, angle: i32) -> i32 {
    (angle + state.dice.bits(7) - 4).rem_euclid(256)
}

fn fire_gun(state: &mut SimulationState, gun: GunKind, pos: IVec2, dir: Direction, flags: ActorFlags) -> Vec<MobId> {
    let muzzle = pos + to_fixed(muzzle_offset(dir));
    let angle = dir.angle();
    let grenade = |state: &mut SimulationState, kind| mobs::add_grenade(state, pos, angle, flags, kind);
    match gun {
        GunKind::Knife => Vec::new(),
        GunKind::MachineGun => {
            let a = jitter(state, angle);
            vec![mobs::add_bullet(state, muzzle, a, mobs::MG_SPEED, mobs::MG_RANGE, mobs::MG_POWER, flags)]
        }
        GunKind::PulseRifle => {
            let a = jitter(state, angle);
            vec![mobs::add_bullet(state, muzzle, a, 1280, 25, 7, flags)]
        }
        GunKind::Shotgun => (0..5)
            .map(|i| {
                let a = (angle - 16 + 8 * i).rem_euclid(256);
                mobs::add_bullet(
                    state,
                    muzzle,
                    a,
                    mobs::SHOTGUN_SPEED,
                    mobs::SHOTGUN_RANGE,
                    mobs::SHOTGUN_POWER,
                    flags,
                )
            })
            .collect(),
        GunKind::Flamer => {
            let range = mobs::FLAME_RANGE + state.dice.below(8);
            vec![mobs::add_flame(state, muzzle, angle, range, flags)]
        }
        GunKind::GasGun => {
            let range = 35 + state.dice.below(8);
            vec![mobs::add_gas_cloud(state, muzzle, angle, 384, range, flags, Special::Poison)]
        }
        GunKind::PowerGun => vec![mobs::add_laser_bolt(state, muzzle, dir, flags)],
        GunKind::Sniper => vec![mobs::add_sniper_bullet(state, muzzle, dir, flags)],
        GunKind::Brown => vec![mobs::add_brown_bullet(state, muzzle, angle, 768, 45, 15, flags)],
        GunKind::Petrify => vec![mobs::add_petrifier_bullet(state, muzzle, angle, 768, 45, flags)],
        GunKind::Heatseeker => vec![mobs::add_heatseeker(state, muzzle, angle, 512, 60, 20, flags)],
        GunKind::Grenade => vec![grenade(state, MobKind::Grenade(Payload::Explosion))],
        GunKind::FragGrenade => vec![grenade(state, MobKind::Grenade(Payload::Frag))],
        GunKind::GasBomb => vec![grenade(state, MobKind::Grenade(Payload::Gas(Special::Poison)))],
        GunKind::ConfuseBomb => vec![grenade(state, MobKind::Grenade(Payload::Gas(Special::Confuse)))],
        GunKind::Molotov => vec![grenade(state, MobKind::Molotov)],
        GunKind::Mine => vec![mobs::add_proximity_mine(state, pos, flags)],
        GunKind::Dynamite => vec![mobs::add_dynamite(state, pos, flags)],
    }
}

/// Fire the actor's gun if its lock has run out
pub fn shoot(state: &mut SimulationState, id: ActorId) {
    let Some(actor) = state.actors.get(id) else {
        return;
    };
    let gun = actor.gun;
    if actor.gun_lock > 0 || !gun.is_ranged() {
        return;
    }
    let (pos, dir, flags, at) = (actor.pos, actor.direction, actor.flags, actor.pixel_pos());

    for mob in fire_gun(state, gun, pos, dir, flags) {
        if let Some(m) = state.mobs.get_mut(mob) {
            m.gun = Some(gun);
        }
    }

    let stats = gun.stats();
    state.score(flags, -stats.cost);
    let mut play = true;
    if let Some(actor) = state.actors.get_mut(id) {
        actor.gun_lock = stats.lock;
        if gun.is_stream() {
            play = actor.snd_lock == 0;
            if play {
                actor.snd_lock = STREAM_SOUND_LOCK;
            }
        }
    }
    if play {
        state.play_sound(at, stats.sound);
    }
}

//! Sound ids and the playback interface
//!
//! The simulation only records which sound happened where. A shell drains
//! the events after each tick and forwards them to whatever [`SoundSink`]
//! it owns.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::sim::state::GameEvent;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    /// Death screams, played round-robin
    Kill,
    Kill2,
    Kill3,
    Kill4,
    /// Player death, mine drop
    Hahaha,
    Pickup,
    MachineGun,
    Minigun,
    Flamer,
    Shotgun,
    PowerGun,
    Laser,
    /// Thrown weapons and rockets
    Launch,
    /// Small blasts and wrecked objects
    Bang,
    Explosion,
    Door,
    /// Mine armed by a passer-by
    MineTrigger,
}

impl SoundId {
    pub const SCREAMS: [SoundId; 4] = [SoundId::Kill, SoundId::Kill2, SoundId::Kill3, SoundId::Kill4];
}

/// Playback interface
pub trait SoundSink {
    /// Play with explicit stereo pan (-1.0 left .. 1.0 right) and volume (0.0 .. 1.0)
    fn play(&mut self, sound: SoundId, pan: f32, volume: f32);

    /// Play at a pixel position heard from `listener`
    fn play_at(&mut self, sound: SoundId, pos: IVec2, listener: IVec2) {
        let (pan, volume) = pan_and_volume(pos, listener);
        if volume > 0.0 {
            self.play(sound, pan, volume);
        }
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SoundSink for NullSink {
    fn play(&mut self, _sound: SoundId, _pan: f32, _volume: f32) {}
}

/// Distance in pixels beyond which a sound is inaudible
pub const HEARING_RANGE: f32 = 400.0;

/// Stereo pan and attenuation for a source relative to a listener
pub fn pan_and_volume(pos: IVec2, listener: IVec2) -> (f32, f32) {
    let d = (pos - listener).as_vec2();
    let pan = (d.x / (HEARING_RANGE / 2.0)).clamp(-1.0, 1.0);
    let volume = (1.0 - d.length() / HEARING_RANGE).clamp(0.0, 1.0);
    (pan, volume)
}

/// Forward the sound events of a tick to a sink
pub fn dispatch_events(events: &[GameEvent], sink: &mut impl SoundSink, listener: IVec2) {
    for event in events {
        if let GameEvent::Sound { sound, pos } = *event {
            sink.play_at(sound, pos, listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(SoundId, f32, f32)>);

    impl SoundSink for Recorder {
        fn play(&mut self, sound: SoundId, pan: f32, volume: f32) {
            self.0.push((sound, pan, volume));
        }
    }

    #[test]
    fn test_pan_and_volume() {
        let (pan, vol) = pan_and_volume(IVec2::new(100, 0), IVec2::new(100, 0));
        assert_eq!(pan, 0.0);
        assert_eq!(vol, 1.0);

        let (pan, vol) = pan_and_volume(IVec2::new(300, 0), IVec2::new(100, 0));
        assert_eq!(pan, 1.0);
        assert!((vol - 0.5).abs() < 1e-6);

        let (_, vol) = pan_and_volume(IVec2::new(1000, 0), IVec2::ZERO);
        assert_eq!(vol, 0.0);
    }

    #[test]
    fn test_dispatch_skips_inaudible_and_shakes() {
        let events = vec![
            GameEvent::Sound {
                sound: SoundId::Bang,
                pos: IVec2::new(10, 10),
            },
            GameEvent::ScreenShake(15),
            GameEvent::Sound {
                sound: SoundId::Explosion,
                pos: IVec2::new(5000, 10),
            },
        ];
        let mut rec = Recorder::default();
        dispatch_events(&events, &mut rec, IVec2::new(10, 10));
        assert_eq!(rec.0.len(), 1);
        assert_eq!(rec.0[0].0, SoundId::Bang);
    }
}

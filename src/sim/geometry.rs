//! Directions, per-tick commands and the byte-angle vector table
//!
//! Angles are bytes: 0 points right, 64 down, 128 left, 192 up. Vectors are
//! scaled so that a unit length is 256, with the vertical component squashed
//! to 3/4 to match the tile aspect ratio.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Eight-way facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    UpRight,
    Right,
    DownRight,
    #[default]
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    #[inline]
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Direction for any integer, wrapping modulo 8
    #[inline]
    pub fn from_index(i: i32) -> Self {
        Self::ALL[i.rem_euclid(8) as usize]
    }

    /// Rotate clockwise by `steps` eighths (negative turns counter-clockwise)
    #[inline]
    pub fn turn(self, steps: i32) -> Self {
        Self::from_index(self.index() + steps)
    }

    /// Byte angle of this facing
    pub fn angle(self) -> i32 {
        const DIR_TO_ANGLE: [i32; 8] = [192, 224, 0, 32, 64, 96, 128, 160];
        DIR_TO_ANGLE[self as usize]
    }

    /// Unit tile step (-1..=1 per axis)
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::UpRight => IVec2::new(1, -1),
            Direction::Right => IVec2::new(1, 0),
            Direction::DownRight => IVec2::new(1, 1),
            Direction::Down => IVec2::new(0, 1),
            Direction::DownLeft => IVec2::new(-1, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::UpLeft => IVec2::new(-1, -1),
        }
    }

    /// Facing for a sign offset; `None` for a zero offset
    pub fn from_offset(offset: IVec2) -> Option<Self> {
        let s = offset.signum();
        Self::ALL.into_iter().find(|d| d.offset() == s)
    }

    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Movement command for this facing
    pub fn to_command(self) -> Command {
        let o = self.offset();
        Command {
            left: o.x < 0,
            right: o.x > 0,
            up: o.y < 0,
            down: o.y > 0,
            ..Command::NONE
        }
    }
}

/// Per-tick command for one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Command {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub fire: bool,
    /// Secondary button (slide when combined with a direction)
    pub alt: bool,
    pub pause: bool,
}

impl Command {
    pub const NONE: Command = Command {
        left: false,
        right: false,
        up: false,
        down: false,
        fire: false,
        alt: false,
        pause: false,
    };

    pub const FIRE: Command = Command {
        fire: true,
        ..Command::NONE
    };

    /// Movement toward a facing, optionally firing
    pub fn toward(dir: Direction, fire: bool) -> Self {
        Command {
            fire,
            ..dir.to_command()
        }
    }

    pub fn has_direction(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    pub fn is_none(&self) -> bool {
        *self == Command::NONE
    }

    /// Swap left/right and up/down, leaving buttons untouched
    pub fn invert(self) -> Self {
        Command {
            left: self.right,
            right: self.left,
            up: self.down,
            down: self.up,
            ..self
        }
    }

    /// Same movement with the fire button released
    pub fn without_fire(self) -> Self {
        Command { fire: false, ..self }
    }

    /// Facing implied by the movement bits. Left wins over right and up over
    /// down when both are held.
    pub fn direction(&self) -> Option<Direction> {
        let x = if self.left {
            -1
        } else if self.right {
            1
        } else {
            0
        };
        let y = if self.up {
            -1
        } else if self.down {
            1
        } else {
            0
        };
        Direction::from_offset(IVec2::new(x, y))
    }
}

/// Quarter sine table, 65 entries, scaled to 256
const SINUS: [i32; 65] = [
    0, 6, 12, 18, 25, 31, 37, 43, 49, 56, 62, 68, 74, 80, 86, 92, 97, 103, 109, 115, 120, 126,
    131, 136, 142, 147, 152, 157, 162, 167, 171, 176, 181, 185, 189, 193, 197, 201, 205, 209, 212,
    216, 219, 222, 225, 228, 231, 234, 236, 238, 241, 243, 244, 246, 248, 249, 251, 252, 253, 254,
    254, 255, 255, 255, 256,
];

/// Vector for a byte angle, vertical component squashed to 3/4
pub fn vectors_for_angle(angle: i32) -> IVec2 {
    let a = angle.rem_euclid(256) as usize;
    let (dx, dy) = if a <= 64 {
        (SINUS[64 - a], SINUS[a])
    } else if a <= 128 {
        (-SINUS[a - 64], SINUS[128 - a])
    } else if a <= 192 {
        (-SINUS[192 - a], -SINUS[a - 128])
    } else {
        (SINUS[a - 192], -SINUS[256 - a])
    };
    IVec2::new(dx, dy * 3 / 4)
}

/// Scale a 256-unit vector to a speed, keeping fixed-point precision
#[inline]
pub fn scale_vector(v: IVec2, speed: i32) -> IVec2 {
    v * speed / 256
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cardinal_angles() {
        assert_eq!(vectors_for_angle(0), IVec2::new(256, 0));
        assert_eq!(vectors_for_angle(64), IVec2::new(0, 192));
        assert_eq!(vectors_for_angle(128), IVec2::new(-256, 0));
        assert_eq!(vectors_for_angle(192), IVec2::new(0, -192));
        assert_eq!(vectors_for_angle(256), vectors_for_angle(0));
    }

    #[test]
    fn test_direction_angles_match_offsets() {
        for d in Direction::ALL {
            let v = vectors_for_angle(d.angle());
            assert_eq!(v.signum(), d.offset(), "{d:?}");
        }
    }

    #[test]
    fn test_command_direction() {
        let c = Command {
            left: true,
            up: true,
            ..Command::NONE
        };
        assert_eq!(c.direction(), Some(Direction::UpLeft));
        assert_eq!(Command::FIRE.direction(), None);
        let both = Command {
            left: true,
            right: true,
            ..Command::NONE
        };
        assert_eq!(both.direction(), Some(Direction::Left));
    }

    #[test]
    fn test_turn_wraps() {
        assert_eq!(Direction::Up.turn(-1), Direction::UpLeft);
        assert_eq!(Direction::UpLeft.turn(1), Direction::Up);
        assert_eq!(Direction::Right.turn(8), Direction::Right);
    }

    fn any_command() -> impl Strategy<Value = Command> {
        prop::array::uniform7(any::<bool>()).prop_map(|b| Command {
            left: b[0],
            right: b[1],
            up: b[2],
            down: b[3],
            fire: b[4],
            alt: b[5],
            pause: b[6],
        })
    }

    proptest! {
        #[test]
        fn test_invert_is_involution(cmd in any_command()) {
            prop_assert_eq!(cmd.invert().invert(), cmd);
            let inv = cmd.invert();
            prop_assert_eq!(inv.left, cmd.right);
            prop_assert_eq!(inv.up, cmd.down);
            prop_assert_eq!(inv.fire, cmd.fire);
            prop_assert_eq!(inv.alt, cmd.alt);
        }

        #[test]
        fn test_direction_round_trip(i in 0i32..8) {
            let d = Direction::from_index(i);
            prop_assert_eq!(d.to_command().direction(), Some(d));
        }

        #[test]
        fn test_angle_vectors_bounded(a in 0i32..512) {
            let v = vectors_for_angle(a);
            prop_assert!(v.x.abs() <= 256);
            prop_assert!(v.y.abs() <= 192);
        }
    }
}

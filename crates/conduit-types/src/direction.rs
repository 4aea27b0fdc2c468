//! The 6-way neighbor convention shared by every grid-facing component.
//!
//! Directions are indexed `0..6` and paired so that the opposite of any
//! direction is its index XOR 1:
//!
//! | Index | Direction | Offset       |
//! |-------|-----------|--------------|
//! | 0     | Down      | `(0, -1, 0)` |
//! | 1     | Up        | `(0, 1, 0)`  |
//! | 2     | North     | `(0, 0, -1)` |
//! | 3     | South     | `(0, 0, 1)`  |
//! | 4     | West      | `(-1, 0, 0)` |
//! | 5     | East      | `(1, 0, 0)`  |

use serde::{Deserialize, Serialize};

/// One of the six axis-aligned neighbor directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Negative Y.
    Down,
    /// Positive Y.
    Up,
    /// Negative Z.
    North,
    /// Positive Z.
    South,
    /// Negative X.
    West,
    /// Positive X.
    East,
}

impl Direction {
    /// All six directions in index order.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// Return the direction index (`0..6`).
    pub const fn index(self) -> u8 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::North => 2,
            Self::South => 3,
            Self::West => 4,
            Self::East => 5,
        }
    }

    /// Look up a direction by index. Returns `None` for indices `>= 6`.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::North),
            3 => Some(Self::South),
            4 => Some(Self::West),
            5 => Some(Self::East),
            _ => None,
        }
    }

    /// The direction pointing the other way (index XOR 1).
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Unit offset `(dx, dy, dz)` for this direction.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// Bit for this direction in a 6-bit side mask.
    pub const fn mask_bit(self) -> u8 {
        match self {
            Self::Down => 0b00_0001,
            Self::Up => 0b00_0010,
            Self::North => 0b00_0100,
            Self::South => 0b00_1000,
            Self::West => 0b01_0000,
            Self::East => 0b10_0000,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::North => "north",
            Self::South => "south",
            Self::West => "west",
            Self::East => "east",
        };
        f.write_str(name)
    }
}

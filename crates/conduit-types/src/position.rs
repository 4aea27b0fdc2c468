//! Canonical block positions and the keys derived from them.
//!
//! Every position handed to the network manager is canonicalized to a
//! `(world, x, y, z)` tuple. Two derived keys exist:
//!
//! - [`PositionKey`] -- the string `world:x,y,z`, used for traversal
//!   identity and root selection. Ordering is plain string ordering, so
//!   `"w:10,0,0" < "w:9,0,0"`.
//! - [`CableKey`] -- a structured key used by the per-cable disabled-side
//!   store, which persists it.

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// A canonical block position inside a named world.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// World (dimension) identifier.
    pub world: String,
    /// Block X coordinate.
    pub x: i32,
    /// Block Y coordinate.
    pub y: i32,
    /// Block Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position in the given world.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Return the position shifted by `(dx, dy, dz)`.
    ///
    /// Returns `None` if any coordinate would overflow.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self {
            world: self.world.clone(),
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z.checked_add(dz)?,
        })
    }

    /// Return the adjacent position in `direction`.
    pub fn neighbor(&self, direction: Direction) -> Option<Self> {
        let (dx, dy, dz) = direction.offset();
        self.offset(dx, dy, dz)
    }

    /// Derive the traversal key for this position.
    pub fn key(&self) -> PositionKey {
        PositionKey::new(&self.world, self.x, self.y, self.z)
    }

    /// Derive the disabled-side store key for this position.
    pub fn cable_key(&self) -> CableKey {
        CableKey {
            world: self.world.clone(),
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

/// String identity of a canonical position: `world:x,y,z`.
///
/// Ordering is lexicographic over the string form. Network roots are the
/// smallest key among a component's cables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionKey(String);

impl PositionKey {
    /// Build the key for a canonical coordinate tuple.
    pub fn new(world: &str, x: i32, y: i32, z: i32) -> Self {
        Self(format!("{world}:{x},{y},{z}"))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a cable in the persisted disabled-side store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CableKey {
    /// World (dimension) identifier.
    pub world: String,
    /// Block X coordinate.
    pub x: i32,
    /// Block Y coordinate.
    pub y: i32,
    /// Block Z coordinate.
    pub z: i32,
}

impl CableKey {
    /// Create a cable key.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

impl core::fmt::Display for CableKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

//! Collaborator seams consumed by the network manager.
//!
//! The manager never inspects the world directly. Three traits stand
//! between it and the host:
//!
//! - [`LocationAdapter`] -- canonicalizes opaque position handles and
//!   derives the string keys used for traversal identity.
//! - [`AccessProvider`] -- classifies positions (cable, producer, cell,
//!   external endpoint) and performs the actual energy transfers.
//! - [`SideOverride`] -- optional per-cable disabled-side lookup that, when
//!   supplied, replaces [`AccessProvider::is_cable_side_disabled`] for all
//!   traversal decisions.
//!
//! Energy amounts are plain `i64` values. Implementations are expected to
//! clamp to `>= 0` and to available stock or capacity; the manager clamps
//! negative return values to zero regardless.

use conduit_types::{CableKey, Direction, PositionKey};

/// Canonicalizes and offsets opaque position handles.
pub trait LocationAdapter {
    /// The host's position handle.
    type Pos: Clone;

    /// Canonicalize a position. Returns `None` if it cannot be resolved.
    fn normalize(&self, pos: &Self::Pos) -> Option<Self::Pos>;

    /// Shift a position by `(dx, dy, dz)`. Returns `None` if the result
    /// cannot be represented.
    fn offset(&self, pos: &Self::Pos, dx: i32, dy: i32, dz: i32) -> Option<Self::Pos>;

    /// Identifier of the world (dimension) containing `pos`.
    fn world_id(&self, pos: &Self::Pos) -> String;

    /// Block X coordinate.
    fn block_x(&self, pos: &Self::Pos) -> i32;

    /// Block Y coordinate.
    fn block_y(&self, pos: &Self::Pos) -> i32;

    /// Block Z coordinate.
    fn block_z(&self, pos: &Self::Pos) -> i32;

    /// Traversal key `world:x,y,z` for a canonical position.
    fn key(&self, pos: &Self::Pos) -> PositionKey {
        PositionKey::new(
            &self.world_id(pos),
            self.block_x(pos),
            self.block_y(pos),
            self.block_z(pos),
        )
    }

    /// Key used for disabled-side override lookups.
    fn to_cable_key(&self, pos: &Self::Pos) -> CableKey {
        CableKey::new(
            self.world_id(pos),
            self.block_x(pos),
            self.block_y(pos),
            self.block_z(pos),
        )
    }

    /// The adjacent position in `direction`.
    fn neighbor(&self, pos: &Self::Pos, direction: Direction) -> Option<Self::Pos> {
        let (dx, dy, dz) = direction.offset();
        self.offset(pos, dx, dy, dz)
    }
}

/// Classifies positions and moves energy in and out of them.
///
/// Query methods take `&self`; transfers take `&mut self`. Any error is
/// returned to the caller of the manager operation unchanged.
pub trait AccessProvider {
    /// The host's position handle. Must match the adapter's.
    type Pos;

    /// Error raised by the host.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `pos` is a traversable cable.
    fn is_cable(&self, pos: &Self::Pos) -> Result<bool, Self::Error>;

    /// Whether the cable at `pos` has its `side` face disabled.
    ///
    /// Ignored when the manager was built with a [`SideOverride`].
    fn is_cable_side_disabled(
        &self,
        _pos: &Self::Pos,
        _side: Direction,
    ) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Whether `pos` generates energy every tick.
    fn is_producer(&self, pos: &Self::Pos) -> Result<bool, Self::Error>;

    /// Per-tick output of the producer at `pos`. Only called when
    /// [`is_producer`](Self::is_producer) returned `true`.
    fn producer_cfe_per_tick(&self, pos: &Self::Pos) -> Result<i64, Self::Error>;

    /// Whether `pos` is a storage cell.
    fn is_cell(&self, pos: &Self::Pos) -> Result<bool, Self::Error>;

    /// Insert up to `amount` into the cell. Returns the amount accepted.
    fn cell_insert_cfe(&mut self, pos: &Self::Pos, amount: i64) -> Result<i64, Self::Error>;

    /// Extract up to `amount` from the cell. Returns the amount removed.
    fn cell_extract_cfe(&mut self, pos: &Self::Pos, amount: i64) -> Result<i64, Self::Error>;

    /// Amount currently stored in the cell.
    fn cell_stored_cfe(&self, pos: &Self::Pos) -> Result<i64, Self::Error>;

    /// Whether the host exposes a foreign storage API at all.
    fn external_api_present(&self) -> bool;

    /// Whether the `side` face of `pos` exposes foreign storage.
    fn is_external_storage(&self, pos: &Self::Pos, side: Direction) -> Result<bool, Self::Error>;

    /// Extract up to `amount` through the `side` face of `pos`.
    fn external_extract_cfe(
        &mut self,
        pos: &Self::Pos,
        side: Direction,
        amount: i64,
    ) -> Result<i64, Self::Error>;

    /// Amount stored behind the `side` face of `pos`.
    fn external_stored_cfe(&self, pos: &Self::Pos, side: Direction) -> Result<i64, Self::Error>;

    /// Capacity behind the `side` face of `pos`.
    fn external_capacity_cfe(&self, pos: &Self::Pos, side: Direction)
    -> Result<i64, Self::Error>;
}

/// Per-cable, per-side connectivity override.
pub trait SideOverride {
    /// Whether the `side` face of the cable identified by `key` is disabled.
    fn is_side_disabled(&self, key: &CableKey, side: Direction) -> bool;
}

/// Placeholder override type for managers built without one.
///
/// Never consulted: a manager without an override asks the
/// [`AccessProvider`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSideOverride;

impl SideOverride for NoSideOverride {
    fn is_side_disabled(&self, _key: &CableKey, _side: Direction) -> bool {
        false
    }
}

/// Clamp a collaborator-supplied amount to `>= 0`.
pub(crate) const fn non_negative(value: i64) -> i64 {
    if value < 0 { 0 } else { value }
}

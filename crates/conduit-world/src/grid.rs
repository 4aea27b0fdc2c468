//! Sparse block grid implementing the network collaborator traits.
//!
//! A [`GridWorld`] holds every placed block keyed by [`BlockPos`]. Empty
//! positions are air. Worlds must be registered with their build height
//! before anything can be placed in them, and the [`GridLocator`] handed
//! to the network manager rejects positions outside those bounds.
//!
//! All transfers clamp to the available stock or free capacity and never
//! move a negative amount.

use std::collections::BTreeMap;

use conduit_network::{AccessProvider, LocationAdapter};
use conduit_types::{BlockPos, Direction};
use tracing::debug;

use crate::error::WorldError;

/// Vertical build limits of one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldBounds {
    /// Lowest buildable Y.
    pub min_y: i32,
    /// Highest buildable Y.
    pub max_y: i32,
}

impl WorldBounds {
    /// Overworld-style limits.
    pub const STANDARD: Self = Self {
        min_y: -64,
        max_y: 319,
    };

    /// Whether `y` lies within the limits.
    pub const fn contains(self, y: i32) -> bool {
        y >= self.min_y && y <= self.max_y
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Stock and capacity of one storage buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
    /// Amount currently held.
    pub stored: i64,
    /// Maximum amount held.
    pub capacity: i64,
}

impl Storage {
    /// Create a buffer. Returns `None` unless `0 <= stored <= capacity`.
    pub const fn new(stored: i64, capacity: i64) -> Option<Self> {
        if stored < 0 || capacity < 0 || stored > capacity {
            return None;
        }
        Some(Self { stored, capacity })
    }

    /// Unused capacity.
    pub const fn free(self) -> i64 {
        let free = self.capacity.saturating_sub(self.stored);
        if free < 0 { 0 } else { free }
    }

    /// Accept up to `amount`. Returns the amount accepted.
    pub fn insert(&mut self, amount: i64) -> i64 {
        let accepted = amount.clamp(0, self.free());
        self.stored = self.stored.saturating_add(accepted);
        accepted
    }

    /// Release up to `amount`. Returns the amount released.
    pub fn extract(&mut self, amount: i64) -> i64 {
        let taken = amount.clamp(0, self.stored.max(0));
        self.stored = self.stored.saturating_sub(taken);
        taken
    }
}

/// Contents of a non-air grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Traversable cable.
    Cable,
    /// Consumer access point. Never part of a network.
    Controller,
    /// Generates `output` every tick.
    Producer {
        /// Per-tick generation.
        output: i64,
    },
    /// Native storage cell.
    Cell(Storage),
    /// Foreign storage exposed per face.
    External {
        /// Storage reachable through each exposed face.
        faces: BTreeMap<Direction, Storage>,
    },
}

/// In-memory host world.
#[derive(Debug, Clone)]
pub struct GridWorld {
    worlds: BTreeMap<String, WorldBounds>,
    blocks: BTreeMap<BlockPos, Block>,
    disabled_sides: BTreeMap<BlockPos, u8>,
    external_api: bool,
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl GridWorld {
    /// Create an empty grid with no registered worlds and the foreign
    /// storage API present.
    pub const fn new() -> Self {
        Self {
            worlds: BTreeMap::new(),
            blocks: BTreeMap::new(),
            disabled_sides: BTreeMap::new(),
            external_api: true,
        }
    }

    /// Register a world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyBounds`] if `min_y > max_y`.
    pub fn add_world(&mut self, name: &str, bounds: WorldBounds) -> Result<(), WorldError> {
        if bounds.min_y > bounds.max_y {
            return Err(WorldError::EmptyBounds {
                name: name.to_owned(),
                min_y: bounds.min_y,
                max_y: bounds.max_y,
            });
        }
        self.worlds.insert(name.to_owned(), bounds);
        Ok(())
    }

    /// A locator over the worlds registered so far.
    pub fn locator(&self) -> GridLocator {
        GridLocator {
            worlds: self.worlds.clone(),
        }
    }

    /// Toggle whether the foreign storage API is present.
    pub const fn set_external_api(&mut self, present: bool) {
        self.external_api = present;
    }

    /// Number of non-air positions.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the grid holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block at `pos`, if any.
    pub fn block(&self, pos: &BlockPos) -> Option<&Block> {
        self.blocks.get(pos)
    }

    /// Place `block` at `pos`, returning whatever was there before.
    ///
    /// Replacing a cable forgets its disabled sides.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world is unknown, the position is
    /// outside the build height, or the block carries invalid values.
    pub fn place(&mut self, pos: BlockPos, block: Block) -> Result<Option<Block>, WorldError> {
        self.check_bounds(&pos)?;
        validate(&pos, &block)?;
        if block != Block::Cable {
            self.disabled_sides.remove(&pos);
        }
        debug!(pos = %pos, block = ?block, "Block placed");
        Ok(self.blocks.insert(pos, block))
    }

    /// Remove the block at `pos`, returning it.
    pub fn remove(&mut self, pos: &BlockPos) -> Option<Block> {
        self.disabled_sides.remove(pos);
        self.blocks.remove(pos)
    }

    /// Place a cable.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn cable(&mut self, pos: BlockPos) -> Result<(), WorldError> {
        self.place(pos, Block::Cable)?;
        Ok(())
    }

    /// Place `length` cables starting at `start` and stepping in `direction`.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn cable_run(
        &mut self,
        start: &BlockPos,
        direction: Direction,
        length: u32,
    ) -> Result<(), WorldError> {
        let mut cursor = start.clone();
        for step in 0..length {
            if step > 0 {
                cursor = cursor
                    .neighbor(direction)
                    .ok_or_else(|| out_of_bounds(&cursor, WorldBounds::default()))?;
            }
            self.cable(cursor.clone())?;
        }
        Ok(())
    }

    /// Place a controller.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn controller(&mut self, pos: BlockPos) -> Result<(), WorldError> {
        self.place(pos, Block::Controller)?;
        Ok(())
    }

    /// Place a producer generating `output` per tick.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn producer(&mut self, pos: BlockPos, output: i64) -> Result<(), WorldError> {
        self.place(pos, Block::Producer { output })?;
        Ok(())
    }

    /// Place a storage cell.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn cell(&mut self, pos: BlockPos, stored: i64, capacity: i64) -> Result<(), WorldError> {
        let storage = Storage::new(stored, capacity).ok_or_else(|| WorldError::InvalidCapacity {
            pos: pos.clone(),
            stored,
            capacity,
        })?;
        self.place(pos, Block::Cell(storage))?;
        Ok(())
    }

    /// Place a foreign storage block exposing a single face.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub fn external(
        &mut self,
        pos: BlockPos,
        face: Direction,
        stored: i64,
        capacity: i64,
    ) -> Result<(), WorldError> {
        let storage = Storage::new(stored, capacity).ok_or_else(|| WorldError::InvalidCapacity {
            pos: pos.clone(),
            stored,
            capacity,
        })?;
        let faces = BTreeMap::from([(face, storage)]);
        self.place(pos, Block::External { faces })?;
        Ok(())
    }

    /// Enable or disable one face of the cable at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotACable`] if `pos` holds no cable.
    pub fn set_cable_side_disabled(
        &mut self,
        pos: &BlockPos,
        side: Direction,
        disabled: bool,
    ) -> Result<(), WorldError> {
        if self.blocks.get(pos) != Some(&Block::Cable) {
            return Err(WorldError::NotACable(pos.clone()));
        }
        let mask = self.disabled_sides.get(pos).copied().unwrap_or(0);
        let updated = if disabled {
            mask | side.mask_bit()
        } else {
            mask & !side.mask_bit()
        };
        if updated == 0 {
            self.disabled_sides.remove(pos);
        } else {
            self.disabled_sides.insert(pos.clone(), updated);
        }
        Ok(())
    }

    /// Energy held at `pos`, summed over every storage face.
    pub fn stored_at(&self, pos: &BlockPos) -> i64 {
        match self.blocks.get(pos) {
            Some(Block::Cell(storage)) => storage.stored,
            Some(Block::External { faces }) => faces
                .values()
                .fold(0_i64, |acc, storage| acc.saturating_add(storage.stored)),
            _ => 0,
        }
    }

    fn check_bounds(&self, pos: &BlockPos) -> Result<(), WorldError> {
        let bounds = self
            .worlds
            .get(&pos.world)
            .ok_or_else(|| WorldError::UnknownWorld(pos.world.clone()))?;
        if bounds.contains(pos.y) {
            Ok(())
        } else {
            Err(out_of_bounds(pos, *bounds))
        }
    }

    fn face(&self, pos: &BlockPos, side: Direction) -> Option<&Storage> {
        match self.blocks.get(pos) {
            Some(Block::External { faces }) => faces.get(&side),
            _ => None,
        }
    }
}

fn out_of_bounds(pos: &BlockPos, bounds: WorldBounds) -> WorldError {
    WorldError::OutOfBounds {
        pos: pos.clone(),
        min_y: bounds.min_y,
        max_y: bounds.max_y,
    }
}

fn validate(pos: &BlockPos, block: &Block) -> Result<(), WorldError> {
    let invalid = |storage: &Storage| WorldError::InvalidCapacity {
        pos: pos.clone(),
        stored: storage.stored,
        capacity: storage.capacity,
    };
    match block {
        Block::Producer { output } if *output < 0 => Err(WorldError::InvalidOutput {
            pos: pos.clone(),
            output: *output,
        }),
        Block::Cell(storage) if Storage::new(storage.stored, storage.capacity).is_none() => {
            Err(invalid(storage))
        }
        Block::External { faces } => faces
            .values()
            .find(|storage| Storage::new(storage.stored, storage.capacity).is_none())
            .map_or(Ok(()), |storage| Err(invalid(storage))),
        _ => Ok(()),
    }
}

impl AccessProvider for GridWorld {
    type Pos = BlockPos;
    type Error = WorldError;

    fn is_cable(&self, pos: &BlockPos) -> Result<bool, WorldError> {
        if !self.worlds.contains_key(&pos.world) {
            return Err(WorldError::UnknownWorld(pos.world.clone()));
        }
        Ok(self.blocks.get(pos) == Some(&Block::Cable))
    }

    fn is_cable_side_disabled(&self, pos: &BlockPos, side: Direction) -> Result<bool, WorldError> {
        Ok(self
            .disabled_sides
            .get(pos)
            .is_some_and(|mask| mask & side.mask_bit() != 0))
    }

    fn is_producer(&self, pos: &BlockPos) -> Result<bool, WorldError> {
        Ok(matches!(self.blocks.get(pos), Some(Block::Producer { .. })))
    }

    fn producer_cfe_per_tick(&self, pos: &BlockPos) -> Result<i64, WorldError> {
        match self.blocks.get(pos) {
            Some(Block::Producer { output }) => Ok((*output).max(0)),
            _ => Ok(0),
        }
    }

    fn is_cell(&self, pos: &BlockPos) -> Result<bool, WorldError> {
        Ok(matches!(self.blocks.get(pos), Some(Block::Cell(_))))
    }

    fn cell_insert_cfe(&mut self, pos: &BlockPos, amount: i64) -> Result<i64, WorldError> {
        match self.blocks.get_mut(pos) {
            Some(Block::Cell(storage)) => Ok(storage.insert(amount)),
            _ => Ok(0),
        }
    }

    fn cell_extract_cfe(&mut self, pos: &BlockPos, amount: i64) -> Result<i64, WorldError> {
        match self.blocks.get_mut(pos) {
            Some(Block::Cell(storage)) => Ok(storage.extract(amount)),
            _ => Ok(0),
        }
    }

    fn cell_stored_cfe(&self, pos: &BlockPos) -> Result<i64, WorldError> {
        match self.blocks.get(pos) {
            Some(Block::Cell(storage)) => Ok(storage.stored),
            _ => Ok(0),
        }
    }

    fn external_api_present(&self) -> bool {
        self.external_api
    }

    fn is_external_storage(&self, pos: &BlockPos, side: Direction) -> Result<bool, WorldError> {
        Ok(self.external_api && self.face(pos, side).is_some())
    }

    fn external_extract_cfe(
        &mut self,
        pos: &BlockPos,
        side: Direction,
        amount: i64,
    ) -> Result<i64, WorldError> {
        if !self.external_api {
            return Ok(0);
        }
        match self.blocks.get_mut(pos) {
            Some(Block::External { faces }) => {
                Ok(faces.get_mut(&side).map_or(0, |storage| storage.extract(amount)))
            }
            _ => Ok(0),
        }
    }

    fn external_stored_cfe(&self, pos: &BlockPos, side: Direction) -> Result<i64, WorldError> {
        Ok(self.face(pos, side).map_or(0, |storage| storage.stored))
    }

    fn external_capacity_cfe(&self, pos: &BlockPos, side: Direction) -> Result<i64, WorldError> {
        Ok(self.face(pos, side).map_or(0, |storage| storage.capacity))
    }
}

/// Canonicalizes [`BlockPos`] handles against a set of registered worlds.
#[derive(Debug, Clone, Default)]
pub struct GridLocator {
    worlds: BTreeMap<String, WorldBounds>,
}

impl GridLocator {
    /// Build a locator over an explicit set of worlds.
    pub const fn new(worlds: BTreeMap<String, WorldBounds>) -> Self {
        Self { worlds }
    }

    /// Whether `pos` lies inside a registered world's build height.
    pub fn contains(&self, pos: &BlockPos) -> bool {
        self.worlds
            .get(&pos.world)
            .is_some_and(|bounds| bounds.contains(pos.y))
    }
}

impl LocationAdapter for GridLocator {
    type Pos = BlockPos;

    fn normalize(&self, pos: &BlockPos) -> Option<BlockPos> {
        self.contains(pos).then(|| pos.clone())
    }

    fn offset(&self, pos: &BlockPos, dx: i32, dy: i32, dz: i32) -> Option<BlockPos> {
        pos.offset(dx, dy, dz).filter(|shifted| self.contains(shifted))
    }

    fn world_id(&self, pos: &BlockPos) -> String {
        pos.world.clone()
    }

    fn block_x(&self, pos: &BlockPos) -> i32 {
        pos.x
    }

    fn block_y(&self, pos: &BlockPos) -> i32 {
        pos.y
    }

    fn block_z(&self, pos: &BlockPos) -> i32 {
        pos.z
    }
}

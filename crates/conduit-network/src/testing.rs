//! In-memory collaborators for unit tests.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use conduit_types::{BlockPos, CableKey, Direction};

use crate::access::{AccessProvider, LocationAdapter, SideOverride};

pub const WORLD: &str = "test";

pub fn pos(x: i32, y: i32, z: i32) -> BlockPos {
    BlockPos::new(WORLD, x, y, z)
}

#[derive(Debug, thiserror::Error)]
#[error("probe failed at {0}")]
pub struct ProbeFailed(pub BlockPos);

#[derive(Debug, Clone)]
pub enum Block {
    Cable,
    Producer(i64),
    Cell { stored: i64, capacity: i64 },
    External { side: Direction, stored: i64, capacity: i64 },
}

/// Adapter accepting positions in [`WORLD`] only.
#[derive(Debug, Default)]
pub struct Locator;

impl LocationAdapter for Locator {
    type Pos = BlockPos;

    fn normalize(&self, pos: &BlockPos) -> Option<BlockPos> {
        (pos.world == WORLD).then(|| pos.clone())
    }

    fn offset(&self, pos: &BlockPos, dx: i32, dy: i32, dz: i32) -> Option<BlockPos> {
        pos.offset(dx, dy, dz)
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

#[derive(Debug, Default)]
pub struct Grid {
    pub blocks: BTreeMap<BlockPos, Block>,
    pub disabled: BTreeSet<(BlockPos, Direction)>,
    pub external_api: bool,
    pub fail_at: Option<BlockPos>,
    pub producer_samples: Cell<usize>,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            external_api: true,
            ..Self::default()
        }
    }

    pub fn place(&mut self, at: BlockPos, block: Block) -> &mut Self {
        self.blocks.insert(at, block);
        self
    }

    pub fn cable_line(&mut self, from_x: i32, to_x: i32) -> &mut Self {
        for x in from_x..=to_x {
            self.blocks.insert(pos(x, 0, 0), Block::Cable);
        }
        self
    }

    pub fn disable(&mut self, at: BlockPos, side: Direction) -> &mut Self {
        self.disabled.insert((at, side));
        self
    }

    pub fn stored(&self, at: &BlockPos) -> i64 {
        match self.blocks.get(at) {
            Some(Block::Cell { stored, .. } | Block::External { stored, .. }) => *stored,
            _ => 0,
        }
    }

    fn check(&self, at: &BlockPos) -> Result<(), ProbeFailed> {
        match &self.fail_at {
            Some(fail) if fail == at => Err(ProbeFailed(at.clone())),
            _ => Ok(()),
        }
    }
}

impl AccessProvider for Grid {
    type Pos = BlockPos;
    type Error = ProbeFailed;

    fn is_cable(&self, pos: &BlockPos) -> Result<bool, ProbeFailed> {
        self.check(pos)?;
        Ok(matches!(self.blocks.get(pos), Some(Block::Cable)))
    }

    fn is_cable_side_disabled(&self, pos: &BlockPos, side: Direction) -> Result<bool, ProbeFailed> {
        Ok(self.disabled.contains(&(pos.clone(), side)))
    }

    fn is_producer(&self, pos: &BlockPos) -> Result<bool, ProbeFailed> {
        Ok(matches!(self.blocks.get(pos), Some(Block::Producer(_))))
    }

    fn producer_cfe_per_tick(&self, pos: &BlockPos) -> Result<i64, ProbeFailed> {
        self.producer_samples.set(self.producer_samples.get().saturating_add(1));
        match self.blocks.get(pos) {
            Some(Block::Producer(output)) => Ok(*output),
            _ => Ok(0),
        }
    }

    fn is_cell(&self, pos: &BlockPos) -> Result<bool, ProbeFailed> {
        Ok(matches!(self.blocks.get(pos), Some(Block::Cell { .. })))
    }

    fn cell_insert_cfe(&mut self, pos: &BlockPos, amount: i64) -> Result<i64, ProbeFailed> {
        match self.blocks.get_mut(pos) {
            Some(Block::Cell { stored, capacity }) => {
                let accepted = amount.clamp(0, capacity.saturating_sub(*stored).max(0));
                *stored = stored.saturating_add(accepted);
                Ok(accepted)
            }
            _ => Ok(0),
        }
    }

    fn cell_extract_cfe(&mut self, pos: &BlockPos, amount: i64) -> Result<i64, ProbeFailed> {
        match self.blocks.get_mut(pos) {
            Some(Block::Cell { stored, .. }) => {
                let taken = amount.clamp(0, (*stored).max(0));
                *stored = stored.saturating_sub(taken);
                Ok(taken)
            }
            _ => Ok(0),
        }
    }

    fn cell_stored_cfe(&self, pos: &BlockPos) -> Result<i64, ProbeFailed> {
        Ok(self.stored(pos))
    }

    fn external_api_present(&self) -> bool {
        self.external_api
    }

    fn is_external_storage(&self, pos: &BlockPos, side: Direction) -> Result<bool, ProbeFailed> {
        Ok(matches!(
            self.blocks.get(pos),
            Some(Block::External { side: face, .. }) if *face == side
        ))
    }

    fn external_extract_cfe(
        &mut self,
        pos: &BlockPos,
        side: Direction,
        amount: i64,
    ) -> Result<i64, ProbeFailed> {
        match self.blocks.get_mut(pos) {
            Some(Block::External { side: face, stored, .. }) if *face == side => {
                let taken = amount.clamp(0, (*stored).max(0));
                *stored = stored.saturating_sub(taken);
                Ok(taken)
            }
            _ => Ok(0),
        }
    }

    fn external_stored_cfe(&self, pos: &BlockPos, _side: Direction) -> Result<i64, ProbeFailed> {
        Ok(self.stored(pos))
    }

    fn external_capacity_cfe(&self, pos: &BlockPos, _side: Direction) -> Result<i64, ProbeFailed> {
        match self.blocks.get(pos) {
            Some(Block::External { capacity, .. }) => Ok(*capacity),
            _ => Ok(0),
        }
    }
}

/// Override backed by a plain set of disabled faces.
#[derive(Debug, Default)]
pub struct Overrides(pub BTreeSet<(CableKey, Direction)>);

impl SideOverride for Overrides {
    fn is_side_disabled(&self, key: &CableKey, side: Direction) -> bool {
        self.0.contains(&(key.clone(), side))
    }
}

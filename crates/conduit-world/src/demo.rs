//! Ready-made demonstration layout.
//!
//! Two disjoint networks at build height 64:
//!
//! - Main line: six cables along X with two producers (40 and 20 per
//!   tick) and an empty cell at the far end. Two controllers share it.
//! - Pump line: four cables along X ten blocks south, with a weak
//!   producer, a half-full cell, and a foreign storage block on its east
//!   end. One controller draws from it.

use conduit_types::{BlockPos, Direction};

use crate::error::WorldError;
use crate::grid::{GridWorld, WorldBounds};

const Y: i32 = 64;
const PUMP_Z: i32 = 10;

/// The demo world plus its controller positions.
#[derive(Debug, Clone)]
pub struct DemoLayout {
    /// The populated world.
    pub world: GridWorld,
    /// Controller on the west end of the main line.
    pub workshop: BlockPos,
    /// Controller beside the middle of the main line.
    pub furnace: BlockPos,
    /// Controller on the west end of the pump line.
    pub pump: BlockPos,
    /// Cell at the east end of the main line.
    pub main_cell: BlockPos,
    /// Foreign storage block on the pump line.
    pub reservoir: BlockPos,
}

impl DemoLayout {
    /// Controllers with display names, in a stable order.
    pub fn controllers(&self) -> [(&'static str, &BlockPos); 3] {
        [
            ("workshop", &self.workshop),
            ("furnace", &self.furnace),
            ("pump", &self.pump),
        ]
    }
}

/// Build the demo layout inside a world called `name`.
///
/// # Errors
///
/// Returns [`WorldError`] if placement fails (does not happen with the
/// hard-coded layout).
pub fn demo_layout(name: &str) -> Result<DemoLayout, WorldError> {
    let at = |x: i32, y: i32, z: i32| BlockPos::new(name, x, y, z);
    let mut world = GridWorld::new();
    world.add_world(name, WorldBounds::STANDARD)?;

    // --- Main line ---
    world.cable_run(&at(0, Y, 0), Direction::East, 6)?;
    world.producer(at(2, Y.saturating_add(1), 0), 40)?;
    world.producer(at(4, Y.saturating_sub(1), 0), 20)?;
    let main_cell = at(6, Y, 0);
    world.cell(main_cell.clone(), 0, 400)?;
    let workshop = at(-1, Y, 0);
    world.controller(workshop.clone())?;
    let furnace = at(3, Y, 1);
    world.controller(furnace.clone())?;

    // --- Pump line ---
    world.cable_run(&at(0, Y, PUMP_Z), Direction::East, 4)?;
    world.producer(at(0, Y.saturating_add(1), PUMP_Z), 5)?;
    world.cell(at(1, Y.saturating_sub(1), PUMP_Z), 200, 500)?;
    let reservoir = at(4, Y, PUMP_Z);
    world.external(reservoir.clone(), Direction::West, 1000, 2000)?;
    let pump = at(-1, Y, PUMP_Z);
    world.controller(pump.clone())?;

    Ok(DemoLayout {
        world,
        workshop,
        furnace,
        pump,
        main_cell,
        reservoir,
    })
}

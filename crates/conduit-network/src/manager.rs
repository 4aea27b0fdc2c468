//! The power network manager: tick lifecycle, extraction, and measurement.
//!
//! The manager alternates between two phases per tick:
//!
//! - **Open** -- after [`begin_tick`], extractions lazily discover networks
//!   and draw from their shared generation budgets.
//! - **Settled** -- after [`end_tick`], every touched network has moved its
//!   unused generation into its cells (or lost it).
//!
//! Extraction draws in layers: fresh generation first, then cells in
//! discovery order, then external endpoints. Every extraction against the
//! same network within one tick shares one budget, so several controllers
//! on one network can never spend the same generation twice.
//!
//! Measurements always walk the graph afresh and never touch the cache.
//!
//! [`begin_tick`]: PowerNetworkManager::begin_tick
//! [`end_tick`]: PowerNetworkManager::end_tick

use conduit_types::{NetworkMeasurement, ProbeMeasurement, PositionKey};
use tracing::{debug, trace};

use crate::access::{AccessProvider, LocationAdapter, NoSideOverride, SideOverride, non_negative};
use crate::discovery::{DEFAULT_NODE_LIMIT, Discovery, NetworkDiscovery};
use crate::snapshot::{NetworkId, SnapshotCache};

/// Construction-time settings for a [`PowerNetworkManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Maximum cables visited per discovery. Values below
    /// [`MIN_NODE_LIMIT`](crate::discovery::MIN_NODE_LIMIT) are raised.
    pub max_nodes: usize,
    /// Whether foreign storage endpoints take part in discovery and
    /// extraction. Also requires the host to report its API as present.
    pub external_endpoints: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_NODE_LIMIT,
            external_endpoints: true,
        }
    }
}

/// Where the manager is within the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// Snapshots may be created and drawn from.
    Open,
    /// `end_tick` has settled every cached snapshot.
    Settled,
}

/// Outcome of settling one tick's unused generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Snapshots that still held generation when the tick ended.
    pub networks: usize,
    /// Generation moved into cells.
    pub stored_cfe: i64,
    /// Generation no cell could absorb.
    pub discarded_cfe: i64,
}

/// Owns the per-tick snapshot cache and serves extraction and measurement.
///
/// Single-threaded: every method takes `&mut self` or `&self` and runs to
/// completion synchronously.
#[derive(Debug)]
pub struct PowerNetworkManager<L: LocationAdapter, O = NoSideOverride> {
    adapter: L,
    side_override: Option<O>,
    config: ManagerConfig,
    phase: TickPhase,
    cache: SnapshotCache<L::Pos>,
}

impl<L: LocationAdapter> PowerNetworkManager<L> {
    /// Create a manager that asks the access provider about disabled sides.
    pub const fn new(adapter: L, config: ManagerConfig) -> Self {
        Self {
            adapter,
            side_override: None,
            config,
            phase: TickPhase::Open,
            cache: SnapshotCache::new(),
        }
    }
}

impl<L, O> PowerNetworkManager<L, O>
where
    L: LocationAdapter,
    O: SideOverride,
{
    /// Create a manager whose traversal decisions all consult `side_override`.
    pub const fn with_side_override(adapter: L, config: ManagerConfig, side_override: O) -> Self {
        Self {
            adapter,
            side_override: Some(side_override),
            config,
            phase: TickPhase::Open,
            cache: SnapshotCache::new(),
        }
    }

    /// The location adapter.
    pub const fn adapter(&self) -> &L {
        &self.adapter
    }

    /// The side override, if one was supplied.
    pub const fn side_override(&self) -> Option<&O> {
        self.side_override.as_ref()
    }

    /// Mutable access to the side override, e.g. to toggle a side.
    ///
    /// Changes take effect for networks discovered after the next
    /// [`begin_tick`](Self::begin_tick).
    pub const fn side_override_mut(&mut self) -> Option<&mut O> {
        self.side_override.as_mut()
    }

    /// Construction-time settings.
    pub const fn config(&self) -> ManagerConfig {
        self.config
    }

    /// The tick the manager currently serves.
    pub const fn current_tick(&self) -> u64 {
        self.cache.tick()
    }

    /// The current phase.
    pub const fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Number of networks cached for the current tick.
    pub fn cached_networks(&self) -> usize {
        self.cache.len()
    }

    fn discovery(&self) -> Discovery<'_, L, O> {
        Discovery::new(
            &self.adapter,
            self.side_override.as_ref(),
            self.config.max_nodes,
            self.config.external_endpoints,
        )
    }

    // -------------------------------------------------------------------
    // Tick lifecycle
    // -------------------------------------------------------------------

    /// Start serving `tick`.
    ///
    /// A tick different from the current one clears the whole snapshot
    /// cache. Repeating the current tick is a no-op.
    pub fn begin_tick(&mut self, tick: u64) {
        if self.cache.advance_to(tick) {
            self.phase = TickPhase::Open;
            trace!(tick, "Snapshot cache cleared");
        }
    }

    /// Settle the current tick.
    ///
    /// Every snapshot with generation left pushes it into its cells in
    /// discovery order until the cells are full or the budget is spent.
    /// Whatever remains is discarded: each budget ends at zero.
    pub fn end_tick<A>(&mut self, access: &mut A) -> Result<SettlementReport, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let mut report = SettlementReport::default();
        for (id, snapshot) in self.cache.iter_mut() {
            if snapshot.remaining_generation_cfe <= 0 {
                snapshot.remaining_generation_cfe = 0;
                continue;
            }
            report.networks = report.networks.saturating_add(1);
            let mut remaining = snapshot.remaining_generation_cfe;
            for cell in &snapshot.cells {
                if remaining <= 0 {
                    break;
                }
                let inserted = non_negative(access.cell_insert_cfe(cell, remaining)?).min(remaining);
                remaining = remaining.saturating_sub(inserted);
                report.stored_cfe = report.stored_cfe.saturating_add(inserted);
            }
            if remaining > 0 {
                trace!(network = %id, discarded = remaining, "Unabsorbed generation discarded");
                report.discarded_cfe = report.discarded_cfe.saturating_add(remaining);
            }
            snapshot.remaining_generation_cfe = 0;
        }
        self.phase = TickPhase::Settled;
        debug!(
            tick = self.cache.tick(),
            networks = report.networks,
            stored_cfe = report.stored_cfe,
            discarded_cfe = report.discarded_cfe,
            "Tick settled"
        );
        Ok(report)
    }

    // -------------------------------------------------------------------
    // Extraction
    // -------------------------------------------------------------------

    /// Locate (or discover) the snapshot of the network around a
    /// controller. Returns `None` when the controller reaches no cable.
    fn resolve_network<A>(
        &mut self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<Option<NetworkId>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some(controller) = self.adapter.normalize(controller) else {
            return Ok(None);
        };
        let discovery = self.discovery();
        let seeds = discovery.controller_seeds(access, &controller)?;
        if seeds.is_empty() {
            return Ok(None);
        }

        let seed_keys: Vec<PositionKey> = seeds.iter().map(|seed| self.adapter.key(seed)).collect();
        if let Some(id) = self.cache.lookup_seeds(&seed_keys) {
            return Ok(Some(id));
        }

        let Some(found) = discovery.walk(access, seeds)? else {
            return Ok(None);
        };
        let (id, fresh) = self.cache.get_or_insert(found);
        if fresh {
            debug!(network = %id, tick = self.cache.tick(), "Snapshot created");
        }
        Ok(Some(id))
    }

    /// Draw from the fresh generation budget only.
    ///
    /// A zero request still creates the snapshot, so the network takes part
    /// in this tick's settlement.
    fn draw_generation<A>(
        &mut self,
        access: &A,
        controller: &L::Pos,
        amount: i64,
    ) -> Result<Option<(NetworkId, i64)>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some(id) = self.resolve_network(access, controller)? else {
            return Ok(None);
        };
        let drawn = self
            .cache
            .get_mut(&id)
            .map_or(0, |snapshot| snapshot.draw_generation(amount));
        Ok(Some((id, drawn)))
    }

    /// Extract up to `amount` for the controller at `controller`.
    ///
    /// Draws from this tick's generation first, then from cells in
    /// discovery order, then from external endpoints (when enabled).
    /// The result is always within `0..=amount`.
    pub fn extract_power_cfe<A>(
        &mut self,
        access: &mut A,
        controller: &L::Pos,
        amount: i64,
    ) -> Result<i64, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some((id, mut extracted)) = self.draw_generation(access, controller, amount)? else {
            return Ok(0);
        };
        let mut wanted = amount.saturating_sub(extracted);
        if wanted <= 0 {
            return Ok(extracted);
        }

        let external_enabled = self.config.external_endpoints && access.external_api_present();
        let Some(snapshot) = self.cache.get_mut(&id) else {
            return Ok(extracted);
        };

        for cell in &snapshot.cells {
            if wanted <= 0 {
                break;
            }
            let taken = non_negative(access.cell_extract_cfe(cell, wanted)?).min(wanted);
            wanted = wanted.saturating_sub(taken);
            extracted = extracted.saturating_add(taken);
        }

        if external_enabled {
            for endpoint in &snapshot.external_endpoints {
                if wanted <= 0 {
                    break;
                }
                let taken = non_negative(access.external_extract_cfe(
                    &endpoint.position,
                    endpoint.side,
                    wanted,
                )?)
                .min(wanted);
                wanted = wanted.saturating_sub(taken);
                extracted = extracted.saturating_add(taken);
            }
        }

        trace!(network = %id, requested = amount, extracted, "Power extracted");
        Ok(extracted)
    }

    /// Extract up to `amount` from this tick's generation only.
    ///
    /// Never drains cells or external endpoints.
    pub fn extract_generation_only_cfe<A>(
        &mut self,
        access: &A,
        controller: &L::Pos,
        amount: i64,
    ) -> Result<i64, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        Ok(self
            .draw_generation(access, controller, amount)?
            .map_or(0, |(_, drawn)| drawn))
    }

    // -------------------------------------------------------------------
    // Measurement
    // -------------------------------------------------------------------

    /// Generation and storage of the network around a controller.
    ///
    /// Walks the graph afresh; the snapshot cache is neither read nor
    /// written.
    pub fn measure_network<A>(
        &self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<NetworkMeasurement, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let found = self.discovery().from_controller(access, controller)?;
        summarize(access, found.as_ref())
    }

    /// Detailed measurement of the network around a controller.
    pub fn measure_network_for_probe<A>(
        &self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<ProbeMeasurement, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let found = self.discovery().from_controller(access, controller)?;
        probe(access, found.as_ref())
    }

    /// Generation and storage of the network containing a cable.
    ///
    /// Zero if `cable` is not a cable.
    pub fn measure_cable_network<A>(
        &self,
        access: &A,
        cable: &L::Pos,
    ) -> Result<NetworkMeasurement, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let found = self.discovery().from_cable(access, cable)?;
        summarize(access, found.as_ref())
    }

    /// Detailed measurement of the network containing a cable.
    pub fn measure_cable_network_for_probe<A>(
        &self,
        access: &A,
        cable: &L::Pos,
    ) -> Result<ProbeMeasurement, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let found = self.discovery().from_cable(access, cable)?;
        probe(access, found.as_ref())
    }

    /// Discover the network around a controller without caching it.
    pub fn discover_from_controller<A>(
        &self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<Option<NetworkDiscovery<L::Pos>>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        self.discovery().from_controller(access, controller)
    }

    /// Discover the network containing a cable without caching it.
    pub fn discover_from_cable<A>(
        &self,
        access: &A,
        cable: &L::Pos,
    ) -> Result<Option<NetworkDiscovery<L::Pos>>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        self.discovery().from_cable(access, cable)
    }
}

fn stored_in_cells<A: AccessProvider>(
    access: &A,
    found: &NetworkDiscovery<A::Pos>,
) -> Result<i64, A::Error> {
    let mut stored: i64 = 0;
    for cell in &found.cells {
        stored = stored.saturating_add(non_negative(access.cell_stored_cfe(cell)?));
    }
    Ok(stored)
}

fn summarize<A: AccessProvider>(
    access: &A,
    found: Option<&NetworkDiscovery<A::Pos>>,
) -> Result<NetworkMeasurement, A::Error> {
    let Some(found) = found else {
        return Ok(NetworkMeasurement::default());
    };
    Ok(NetworkMeasurement {
        produced_cfe_per_tick: found.produced_cfe_per_tick,
        stored_cfe: stored_in_cells(access, found)?,
    })
}

fn probe<A: AccessProvider>(
    access: &A,
    found: Option<&NetworkDiscovery<A::Pos>>,
) -> Result<ProbeMeasurement, A::Error> {
    let external_api_present = access.external_api_present();
    let Some(found) = found else {
        return Ok(ProbeMeasurement {
            external_api_present,
            ..ProbeMeasurement::default()
        });
    };

    let mut external_stored_cfe: i64 = 0;
    let mut external_capacity_cfe: i64 = 0;
    for endpoint in &found.external_endpoints {
        external_stored_cfe = external_stored_cfe.saturating_add(non_negative(
            access.external_stored_cfe(&endpoint.position, endpoint.side)?,
        ));
        external_capacity_cfe = external_capacity_cfe.saturating_add(non_negative(
            access.external_capacity_cfe(&endpoint.position, endpoint.side)?,
        ));
    }

    Ok(ProbeMeasurement {
        produced_cfe_per_tick: found.produced_cfe_per_tick,
        stored_cfe: stored_in_cells(access, found)?,
        external_api_present,
        external_endpoint_count: found.external_endpoints.len(),
        external_stored_cfe,
        external_capacity_cfe,
        cable_count: found.cables.len(),
        cell_count: found.cells.len(),
        truncated: found.truncated,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use conduit_types::{BlockPos, Direction};

    use super::*;
    use crate::testing::{Block, Grid, Locator, Overrides, WORLD, pos};

    fn manager() -> PowerNetworkManager<Locator> {
        PowerNetworkManager::new(Locator, ManagerConfig::default())
    }

    /// Three cables along X, a 10/tick producer above the middle one, and
    /// a controller west of the first cable.
    fn three_cable_line() -> (Grid, BlockPos) {
        let mut grid = Grid::new();
        grid.cable_line(0, 2).place(pos(1, 1, 0), Block::Producer(10));
        (grid, pos(-1, 0, 0))
    }

    fn empty_cell(capacity: i64) -> Block {
        Block::Cell {
            stored: 0,
            capacity,
        }
    }

    #[test]
    fn generation_budget_is_spent_once_per_tick() {
        let (mut grid, controller) = three_cable_line();
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 15).unwrap(), 10);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 5).unwrap(), 0);

        manager.begin_tick(2);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 3).unwrap(), 3);
    }

    #[test]
    fn repeated_begin_tick_keeps_budget() {
        let (mut grid, controller) = three_cable_line();
        let mut manager = manager();

        manager.begin_tick(7);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 6).unwrap(), 6);
        manager.begin_tick(7);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 6).unwrap(), 4);
    }

    #[test]
    fn controllers_on_one_network_share_the_budget() {
        let (mut grid, west) = three_cable_line();
        let below = pos(1, -1, 0);
        let east = pos(3, 0, 0);
        let mut manager = manager();

        manager.begin_tick(1);
        let a = manager.extract_power_cfe(&mut grid, &west, 6).unwrap();
        let b = manager.extract_power_cfe(&mut grid, &below, 6).unwrap();
        let c = manager.extract_generation_only_cfe(&grid, &east, 6).unwrap();
        assert_eq!((a, b, c), (6, 4, 0));
        assert_eq!(manager.cached_networks(), 1);
    }

    #[test]
    fn second_extraction_reuses_the_snapshot() {
        let (mut grid, controller) = three_cable_line();
        let mut manager = manager();

        manager.begin_tick(1);
        manager.extract_power_cfe(&mut grid, &controller, 1).unwrap();
        manager.extract_power_cfe(&mut grid, &controller, 1).unwrap();
        manager.extract_generation_only_cfe(&grid, &controller, 1).unwrap();
        assert_eq!(grid.producer_samples.get(), 1);

        manager.begin_tick(2);
        manager.extract_power_cfe(&mut grid, &controller, 1).unwrap();
        assert_eq!(grid.producer_samples.get(), 2);
    }

    #[test]
    fn extraction_never_exceeds_request() {
        let (mut grid, controller) = three_cable_line();
        grid.place(
            pos(3, 0, 0),
            Block::Cell {
                stored: 500,
                capacity: 1000,
            },
        );
        let mut manager = manager();

        manager.begin_tick(1);
        for amount in [0, 1, 9, 10, 11, 250] {
            let got = manager.extract_power_cfe(&mut grid, &controller, amount).unwrap();
            assert!((0..=amount).contains(&got), "{got} outside 0..={amount}");
        }
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, -5).unwrap(), 0);
    }

    #[test]
    fn empty_network_yields_nothing() {
        let mut grid = Grid::new();
        grid.cable_line(0, 2);
        let controller = pos(-1, 0, 0);
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);
        assert_eq!(
            manager.measure_network(&grid, &controller).unwrap(),
            NetworkMeasurement::default()
        );
    }

    #[test]
    fn controller_without_cable_yields_nothing() {
        let (mut grid, _) = three_cable_line();
        let lonely = pos(10, 10, 10);
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &lonely, 10).unwrap(), 0);
        assert_eq!(manager.cached_networks(), 0);
    }

    #[test]
    fn unresolvable_controller_yields_nothing() {
        let (mut grid, _) = three_cable_line();
        let elsewhere = BlockPos::new("nether", -1, 0, 0);
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &elsewhere, 10).unwrap(), 0);
        assert_eq!(
            manager.measure_network_for_probe(&grid, &elsewhere).unwrap().produced_cfe_per_tick,
            0
        );
    }

    #[test]
    fn settlement_stores_leftover_generation() {
        let (mut grid, controller) = three_cable_line();
        let cell = pos(3, 0, 0);
        grid.place(cell.clone(), empty_cell(100));
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_generation_only_cfe(&grid, &controller, 0).unwrap(), 0);
        let report = manager.end_tick(&mut grid).unwrap();
        assert_eq!(report.stored_cfe, 10);
        assert_eq!(report.discarded_cfe, 0);
        assert_eq!(grid.stored(&cell), 10);
        assert_eq!(manager.phase(), TickPhase::Settled);

        manager.begin_tick(2);
        assert_eq!(manager.phase(), TickPhase::Open);
        assert_eq!(manager.extract_generation_only_cfe(&grid, &controller, 15).unwrap(), 10);
        assert_eq!(grid.stored(&cell), 10);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 4).unwrap(), 4);
        assert_eq!(grid.stored(&cell), 6);
    }

    #[test]
    fn settlement_discards_overflow() {
        let (mut grid, controller) = three_cable_line();
        let cell = pos(3, 0, 0);
        grid.place(cell.clone(), empty_cell(4));
        let mut manager = manager();

        manager.begin_tick(1);
        manager.extract_generation_only_cfe(&grid, &controller, 0).unwrap();
        let report = manager.end_tick(&mut grid).unwrap();
        assert_eq!(grid.stored(&cell), 4);
        assert_eq!(report.discarded_cfe, 6);

        manager.begin_tick(2);
        assert_eq!(manager.extract_generation_only_cfe(&grid, &controller, 100).unwrap(), 10);
    }

    #[test]
    fn settlement_fills_cells_in_discovery_order() {
        let (mut grid, controller) = three_cable_line();
        let near = pos(0, 1, 0);
        let far = pos(3, 0, 0);
        grid.place(near.clone(), empty_cell(7)).place(far.clone(), empty_cell(7));
        let mut manager = manager();

        manager.begin_tick(1);
        manager.extract_generation_only_cfe(&grid, &controller, 0).unwrap();
        manager.end_tick(&mut grid).unwrap();
        assert_eq!(grid.stored(&near), 7);
        assert_eq!(grid.stored(&far), 3);
    }

    #[test]
    fn settlement_ignores_untouched_networks() {
        let (mut grid, _) = three_cable_line();
        let cell = pos(3, 0, 0);
        grid.place(cell.clone(), empty_cell(100));
        let mut manager = manager();

        manager.begin_tick(1);
        let report = manager.end_tick(&mut grid).unwrap();
        assert_eq!(report, SettlementReport::default());
        assert_eq!(grid.stored(&cell), 0);
    }

    #[test]
    fn extraction_layers_generation_then_cells_then_external() {
        let mut grid = Grid::new();
        let cell = pos(1, 1, 0);
        let external = pos(2, 1, 0);
        grid.cable_line(0, 2)
            .place(pos(0, 1, 0), Block::Producer(5))
            .place(
                cell.clone(),
                Block::Cell {
                    stored: 20,
                    capacity: 20,
                },
            )
            .place(
                external.clone(),
                Block::External {
                    side: Direction::Down,
                    stored: 50,
                    capacity: 80,
                },
            );
        let controller = pos(-1, 0, 0);
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 40).unwrap(), 40);
        assert_eq!(grid.stored(&cell), 0);
        assert_eq!(grid.stored(&external), 35);
    }

    #[test]
    fn generation_only_never_drains_storage() {
        let mut grid = Grid::new();
        let cell = pos(1, 1, 0);
        grid.cable_line(0, 2).place(
            cell.clone(),
            Block::Cell {
                stored: 20,
                capacity: 20,
            },
        );
        let controller = pos(-1, 0, 0);
        let mut manager = manager();

        manager.begin_tick(1);
        assert_eq!(manager.extract_generation_only_cfe(&grid, &controller, 10).unwrap(), 0);
        assert_eq!(grid.stored(&cell), 20);
    }

    #[test]
    fn external_endpoints_respect_config_and_host() {
        let mut grid = Grid::new();
        let external = pos(1, 1, 0);
        grid.cable_line(0, 2).place(
            external.clone(),
            Block::External {
                side: Direction::Down,
                stored: 50,
                capacity: 80,
            },
        );
        let controller = pos(-1, 0, 0);

        let mut disabled = PowerNetworkManager::new(
            Locator,
            ManagerConfig {
                external_endpoints: false,
                ..ManagerConfig::default()
            },
        );
        disabled.begin_tick(1);
        assert_eq!(disabled.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);

        grid.external_api = false;
        let mut absent = manager();
        absent.begin_tick(1);
        assert_eq!(absent.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);
        let probe = absent.measure_network_for_probe(&grid, &controller).unwrap();
        assert!(!probe.external_api_present);
        assert_eq!(probe.external_endpoint_count, 0);

        grid.external_api = true;
        let mut enabled = manager();
        enabled.begin_tick(1);
        assert_eq!(enabled.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 10);
        assert_eq!(grid.stored(&external), 40);
    }

    #[test]
    fn external_face_must_point_back_at_the_cable() {
        let mut grid = Grid::new();
        grid.cable_line(0, 2).place(
            pos(1, 1, 0),
            Block::External {
                side: Direction::Up,
                stored: 50,
                capacity: 80,
            },
        );
        let probe = manager()
            .measure_network_for_probe(&grid, &pos(-1, 0, 0))
            .unwrap();
        assert_eq!(probe.external_endpoint_count, 0);
    }

    #[test]
    fn measurement_is_side_effect_free() {
        let (mut grid, controller) = three_cable_line();
        grid.place(
            pos(3, 0, 0),
            Block::Cell {
                stored: 30,
                capacity: 100,
            },
        );
        let mut manager = manager();

        manager.begin_tick(1);
        for _ in 0..5 {
            let measured = manager.measure_network(&grid, &controller).unwrap();
            assert_eq!(
                measured,
                NetworkMeasurement {
                    produced_cfe_per_tick: 10,
                    stored_cfe: 30,
                }
            );
            manager.measure_network_for_probe(&grid, &controller).unwrap();
            manager.measure_cable_network(&grid, &pos(0, 0, 0)).unwrap();
        }
        assert_eq!(manager.cached_networks(), 0);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 25).unwrap(), 25);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 25).unwrap(), 15);
    }

    #[test]
    fn measurement_after_extraction_reports_full_generation() {
        let (mut grid, controller) = three_cable_line();
        let mut manager = manager();

        manager.begin_tick(1);
        manager.extract_power_cfe(&mut grid, &controller, 10).unwrap();
        let measured = manager.measure_network(&grid, &controller).unwrap();
        assert_eq!(measured.produced_cfe_per_tick, 10);
    }

    #[test]
    fn cable_measurement_of_non_cable_is_zero() {
        let (grid, _) = three_cable_line();
        let manager = manager();
        assert_eq!(
            manager.measure_cable_network(&grid, &pos(1, 1, 0)).unwrap(),
            NetworkMeasurement::default()
        );
        let probe = manager
            .measure_cable_network_for_probe(&grid, &pos(50, 0, 0))
            .unwrap();
        assert_eq!(probe.cable_count, 0);
        assert!(probe.external_api_present);
    }

    #[test]
    fn probe_counts_graph_shape() {
        let (mut grid, _) = three_cable_line();
        grid.place(pos(3, 0, 0), empty_cell(10)).place(
            pos(2, -1, 0),
            Block::External {
                side: Direction::Up,
                stored: 5,
                capacity: 9,
            },
        );
        let probe = manager()
            .measure_cable_network_for_probe(&grid, &pos(2, 0, 0))
            .unwrap();
        assert_eq!(probe.cable_count, 3);
        assert_eq!(probe.cell_count, 1);
        assert_eq!(probe.external_endpoint_count, 1);
        assert_eq!(probe.external_stored_cfe, 5);
        assert_eq!(probe.external_capacity_cfe, 9);
        assert!(!probe.truncated);
    }

    #[test]
    fn disabled_side_splits_the_network() {
        let mut grid = Grid::new();
        grid.cable_line(0, 4).place(pos(4, 1, 0), Block::Producer(10));
        let controller = pos(-1, 0, 0);

        grid.disable(pos(2, 0, 0), Direction::East);
        let mut manager = manager();
        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);

        grid.disabled.clear();
        grid.disable(pos(3, 0, 0), Direction::West);
        manager.begin_tick(2);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);

        grid.disabled.clear();
        manager.begin_tick(3);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 10);
    }

    #[test]
    fn disabled_face_toward_controller_blocks_access() {
        let (mut grid, controller) = three_cable_line();
        grid.disable(pos(0, 0, 0), Direction::West);
        let mut manager = manager();
        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);
    }

    #[test]
    fn side_override_replaces_provider_hook() {
        let mut grid = Grid::new();
        grid.cable_line(0, 4).place(pos(4, 1, 0), Block::Producer(10));
        grid.disable(pos(2, 0, 0), Direction::East);
        let controller = pos(-1, 0, 0);

        let mut manager =
            PowerNetworkManager::with_side_override(Locator, ManagerConfig::default(), Overrides::default());
        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 10);

        if let Some(overrides) = manager.side_override_mut() {
            overrides.0.insert((pos(3, 0, 0).cable_key(), Direction::West));
        }
        manager.begin_tick(2);
        assert_eq!(manager.extract_power_cfe(&mut grid, &controller, 10).unwrap(), 0);
    }

    #[test]
    fn root_is_entry_point_independent() {
        let mut grid = Grid::new();
        grid.cable_line(8, 11).place(pos(8, 1, 0), Block::Cable);
        let manager = manager();

        let roots: BTreeSet<String> = [pos(8, 0, 0), pos(9, 0, 0), pos(11, 0, 0), pos(8, 1, 0)]
            .iter()
            .map(|cable| {
                manager
                    .discover_from_cable(&grid, cable)
                    .unwrap()
                    .unwrap()
                    .root
                    .to_string()
            })
            .collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.first().map(String::as_str), Some("test:10,0,0"));
    }

    #[test]
    fn producer_touching_two_cables_counts_once() {
        let mut grid = Grid::new();
        grid.cable_line(0, 2)
            .place(pos(0, 1, 0), Block::Cable)
            .place(pos(1, 1, 0), Block::Producer(10));
        let found = manager()
            .discover_from_cable(&grid, &pos(0, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(found.produced_cfe_per_tick, 10);
    }

    #[test]
    fn negative_producer_output_is_clamped() {
        let mut grid = Grid::new();
        grid.cable_line(0, 1)
            .place(pos(0, 1, 0), Block::Producer(-40))
            .place(pos(1, 1, 0), Block::Producer(6));
        let measured = manager()
            .measure_cable_network(&grid, &pos(0, 0, 0))
            .unwrap();
        assert_eq!(measured.produced_cfe_per_tick, 6);
    }

    #[test]
    fn node_limit_truncates_with_floor() {
        let mut grid = Grid::new();
        grid.cable_line(0, 299);
        let manager = PowerNetworkManager::new(
            Locator,
            ManagerConfig {
                max_nodes: 10,
                ..ManagerConfig::default()
            },
        );
        let probe = manager
            .measure_cable_network_for_probe(&grid, &pos(0, 0, 0))
            .unwrap();
        assert_eq!(probe.cable_count, crate::discovery::MIN_NODE_LIMIT);
        assert!(probe.truncated);
    }

    #[test]
    fn collaborator_error_propagates_and_caches_nothing() {
        let (mut grid, controller) = three_cable_line();
        grid.fail_at = Some(pos(2, 0, 0));
        let mut manager = manager();

        manager.begin_tick(1);
        let err = manager.extract_power_cfe(&mut grid, &controller, 5);
        assert!(err.is_err());
        assert_eq!(manager.cached_networks(), 0);
        assert!(manager.measure_network(&grid, &controller).is_err());
    }

    #[test]
    fn controller_bridging_two_components_merges_them() {
        let mut grid = Grid::new();
        grid.place(pos(-1, 0, 0), Block::Cable)
            .place(pos(1, 0, 0), Block::Cable)
            .place(pos(-1, 1, 0), Block::Producer(3))
            .place(pos(1, 1, 0), Block::Producer(4));
        let controller = pos(0, 0, 0);
        let found = manager()
            .discover_from_controller(&grid, &controller)
            .unwrap()
            .unwrap();
        assert_eq!(found.produced_cfe_per_tick, 7);
        assert_eq!(found.world, WORLD);
        assert_eq!(found.seed_components, 2);
    }

    /// Two separate lines each fed by a 10/tick producer, with a 50 cfe
    /// cell on the west line. The first controller sits between both
    /// lines; the second touches only the east one.
    fn two_lines_and_a_bridge() -> (Grid, BlockPos, BlockPos) {
        let mut grid = Grid::new();
        grid.cable_line(-3, -1)
            .cable_line(1, 3)
            .place(pos(-2, 1, 0), Block::Producer(10))
            .place(pos(2, 1, 0), Block::Producer(10))
            .place(
                pos(-3, 1, 0),
                Block::Cell {
                    stored: 50,
                    capacity: 100,
                },
            );
        (grid, pos(0, 0, 0), pos(4, 0, 0))
    }

    #[test]
    fn bridged_snapshot_is_not_shared_with_one_side() {
        let (mut grid, bridge, east) = two_lines_and_a_bridge();
        let mut manager = manager();
        let reachable = manager.measure_network(&grid, &east).unwrap();
        assert_eq!(reachable.produced_cfe_per_tick, 10);

        manager.begin_tick(1);
        assert_eq!(manager.extract_power_cfe(&mut grid, &bridge, 5).unwrap(), 5);
        let drawn = manager.extract_power_cfe(&mut grid, &east, 100).unwrap();

        assert!(drawn <= reachable.produced_cfe_per_tick);
        assert_eq!(drawn, 10);
        assert_eq!(grid.stored(&pos(-3, 1, 0)), 50);
        assert_eq!(manager.extract_power_cfe(&mut grid, &east, 100).unwrap(), 0);
    }

    #[test]
    fn one_side_keeps_its_snapshot_after_a_bridge_draws() {
        let (mut grid, bridge, east) = two_lines_and_a_bridge();
        let mut manager = manager();
        let reachable = manager.measure_network(&grid, &east).unwrap();

        manager.begin_tick(1);
        let first = manager.extract_power_cfe(&mut grid, &east, 100).unwrap();
        assert_eq!(first, 10);
        manager.extract_power_cfe(&mut grid, &bridge, 5).unwrap();
        let second = manager.extract_power_cfe(&mut grid, &east, 100).unwrap();

        assert_eq!(second, 0);
        assert!(first.saturating_add(second) <= reachable.produced_cfe_per_tick);
        assert_eq!(grid.stored(&pos(-3, 1, 0)), 50);
    }
}

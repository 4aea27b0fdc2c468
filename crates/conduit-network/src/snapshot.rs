//! Tick-scoped network snapshots.
//!
//! A [`NetworkSnapshot`] is the cached result of one discovery plus the
//! generation budget still unspent this tick. The [`SnapshotCache`] is an
//! arena that is emptied whenever the tick changes, so membership learned
//! in one tick is never trusted in the next.
//!
//! The cache also indexes the visited cables of every snapshot whose seeds
//! lay in a single component. A later extraction whose seed cables all map
//! to the same cached network reuses that snapshot without walking the
//! graph again. Merged discoveries (seeds spanning several components) are
//! never indexed, and an indexed cable is never re-pointed within a tick.

use std::collections::BTreeMap;

use conduit_types::PositionKey;

use crate::discovery::{ExternalEndpoint, NetworkDiscovery};

/// Cache identity of a discovered network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetworkId {
    /// World containing the network.
    pub world: String,
    /// Root cable key of the network.
    pub root: PositionKey,
}

impl core::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// Discovery result plus the mutable generation budget for one tick.
#[derive(Debug, Clone)]
pub struct NetworkSnapshot<P> {
    /// Tick that produced this snapshot.
    pub tick: u64,
    /// Generation discovered for this tick.
    pub produced_cfe_per_tick: i64,
    /// Generation not yet drawn or settled. Only ever decreases.
    pub remaining_generation_cfe: i64,
    /// Cells in discovery order.
    pub cells: Vec<P>,
    /// External endpoints in discovery order.
    pub external_endpoints: Vec<ExternalEndpoint<P>>,
}

impl<P> NetworkSnapshot<P> {
    /// Build a fresh snapshot with a full budget.
    pub fn from_discovery(tick: u64, discovery: NetworkDiscovery<P>) -> Self {
        let produced = discovery.produced_cfe_per_tick.max(0);
        Self {
            tick,
            produced_cfe_per_tick: produced,
            remaining_generation_cfe: produced,
            cells: discovery.cells,
            external_endpoints: discovery.external_endpoints,
        }
    }

    /// Draw up to `amount` from the generation budget. Returns the amount
    /// drawn.
    pub fn draw_generation(&mut self, amount: i64) -> i64 {
        let drawn = amount.clamp(0, self.remaining_generation_cfe.max(0));
        self.remaining_generation_cfe = self.remaining_generation_cfe.saturating_sub(drawn);
        drawn
    }
}

/// Arena of snapshots valid for a single tick.
#[derive(Debug)]
pub struct SnapshotCache<P> {
    tick: u64,
    snapshots: BTreeMap<NetworkId, NetworkSnapshot<P>>,
    members: BTreeMap<PositionKey, NetworkId>,
}

impl<P> Default for SnapshotCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> SnapshotCache<P> {
    /// Create an empty cache at tick 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            snapshots: BTreeMap::new(),
            members: BTreeMap::new(),
        }
    }

    /// The tick the cache is currently valid for.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot is cached.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Adopt `tick`. Clears everything if it differs from the current tick.
    ///
    /// Returns `true` if the cache was cleared.
    pub fn advance_to(&mut self, tick: u64) -> bool {
        if tick == self.tick {
            return false;
        }
        self.tick = tick;
        self.snapshots.clear();
        self.members.clear();
        true
    }

    /// The network every key in `seeds` belongs to, if they all map to the
    /// same cached network.
    pub fn lookup_seeds(&self, seeds: &[PositionKey]) -> Option<NetworkId> {
        let (first, rest) = seeds.split_first()?;
        let id = self.members.get(first)?;
        rest.iter()
            .all(|key| self.members.get(key) == Some(id))
            .then(|| id.clone())
    }

    /// Return the current-tick snapshot for `id`, if cached.
    pub fn get_mut(&mut self, id: &NetworkId) -> Option<&mut NetworkSnapshot<P>> {
        let tick = self.tick;
        self.snapshots
            .get_mut(id)
            .filter(|snapshot| snapshot.tick == tick)
    }

    /// Return the snapshot for a discovered network, creating it if it is
    /// not cached for the current tick.
    ///
    /// An existing snapshot keeps its (possibly depleted) budget; the new
    /// discovery only extends the member index, and only when its seeds lay
    /// in one component.
    pub fn get_or_insert(&mut self, discovery: NetworkDiscovery<P>) -> (NetworkId, bool) {
        let id = NetworkId {
            world: discovery.world.clone(),
            root: discovery.root.clone(),
        };
        if discovery.seed_components == 1 {
            for cable in &discovery.cables {
                self.members
                    .entry(cable.clone())
                    .or_insert_with(|| id.clone());
            }
        }
        let tick = self.tick;
        let fresh = match self.snapshots.get(&id) {
            Some(existing) => existing.tick != tick,
            None => true,
        };
        if fresh {
            self.snapshots
                .insert(id.clone(), NetworkSnapshot::from_discovery(tick, discovery));
        }
        (id, fresh)
    }

    /// Iterate over all snapshots mutably, in network-id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&NetworkId, &mut NetworkSnapshot<P>)> {
        self.snapshots.iter_mut()
    }
}

//! Bounded breadth-first discovery of connected cable networks.
//!
//! Discovery starts from one or more seed cables and walks the cable graph
//! over canonical [`PositionKey`]s. For every visited cable all six faces
//! are scanned (skipping faces disabled on the current cable):
//!
//! - a **producer** neighbor contributes its per-tick output once per
//!   distinct position;
//! - a **cell** neighbor is appended to the cell list once, in discovery
//!   order;
//! - otherwise, when external endpoints are enabled and the neighbor is not
//!   a cable, the neighbor face pointing back at the cable is tested as a
//!   foreign storage endpoint and recorded once per `(position, side)`;
//! - independently, an unvisited **cable** neighbor whose incoming face is
//!   not disabled is enqueued.
//!
//! The walk stops silently once the node limit is reached. The result is
//! then a partial view of the network; callers treat it as an
//! approximation, not a fault.
//!
//! The network root is the lexicographically smallest key among visited
//! cables, tracked as a running minimum. It does not depend on the entry
//! point or on visitation order (for untruncated walks).
//!
//! Each visited cable remembers which seed's flood reached it. When two
//! floods touch over an enabled connection their seeds are joined, so the
//! result reports how many separate components the seeds lie in. A
//! controller wedged between two components yields one merged result with
//! `seed_components > 1`.
//!
//! Any collaborator error aborts the whole walk and is returned unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use conduit_types::{Direction, PositionKey};
use tracing::debug;

use crate::access::{AccessProvider, LocationAdapter, SideOverride, non_negative};

/// Default cap on visited cables per discovery.
pub const DEFAULT_NODE_LIMIT: usize = 8192;

/// Smallest node limit a manager will accept.
pub const MIN_NODE_LIMIT: usize = 128;

/// A foreign storage face reached by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEndpoint<P> {
    /// Position of the foreign block.
    pub position: P,
    /// Face of the foreign block that touches the cable.
    pub side: Direction,
}

/// The transient result of one discovery walk.
#[derive(Debug, Clone)]
pub struct NetworkDiscovery<P> {
    /// Smallest visited cable key; the network's identity for this tick.
    pub root: PositionKey,
    /// World containing the network.
    pub world: String,
    /// Sum of distinct producer outputs, clamped per producer to `>= 0`.
    pub produced_cfe_per_tick: i64,
    /// Distinct cells in discovery order.
    pub cells: Vec<P>,
    /// Distinct external endpoints in discovery order.
    pub external_endpoints: Vec<ExternalEndpoint<P>>,
    /// Keys of every visited cable, in visitation order.
    pub cables: Vec<PositionKey>,
    /// Whether the walk stopped at the node limit.
    pub truncated: bool,
    /// Number of separate components the seeds were found to lie in.
    pub seed_components: usize,
}

/// What a neighbor position is, evaluated once per position per walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Producer,
    Cell,
    Plain,
}

#[derive(Debug, Clone, Copy)]
struct Classification {
    cable: bool,
    member: Member,
}

fn classify<A: AccessProvider>(access: &A, pos: &A::Pos) -> Result<Classification, A::Error> {
    let cable = access.is_cable(pos)?;
    let member = if access.is_producer(pos)? {
        Member::Producer
    } else if access.is_cell(pos)? {
        Member::Cell
    } else {
        Member::Plain
    };
    Ok(Classification { cable, member })
}

/// Mutable state of a single walk.
struct Traversal<P> {
    node_limit: usize,
    /// Visited cable keys mapped to the seed whose flood reached them.
    origins: BTreeMap<PositionKey, usize>,
    /// Seed union-find; `seed_parents[i] == i` for a representative.
    seed_parents: Vec<usize>,
    cables: Vec<PositionKey>,
    queue: VecDeque<(P, usize)>,
    root: Option<PositionKey>,
    truncated: bool,
    roles: BTreeMap<PositionKey, Classification>,
    producers: BTreeSet<PositionKey>,
    produced: i64,
    seen_cells: BTreeSet<PositionKey>,
    cells: Vec<P>,
    seen_external: BTreeSet<(PositionKey, Direction)>,
    external_endpoints: Vec<ExternalEndpoint<P>>,
}

impl<P> Traversal<P> {
    const fn new(node_limit: usize) -> Self {
        Self {
            node_limit,
            origins: BTreeMap::new(),
            seed_parents: Vec::new(),
            cables: Vec::new(),
            queue: VecDeque::new(),
            root: None,
            truncated: false,
            roles: BTreeMap::new(),
            producers: BTreeSet::new(),
            produced: 0,
            seen_cells: BTreeSet::new(),
            cells: Vec::new(),
            seen_external: BTreeSet::new(),
            external_endpoints: Vec::new(),
        }
    }

    fn enqueue(&mut self, pos: P, key: PositionKey, origin: usize) {
        if self.origins.contains_key(&key) {
            return;
        }
        if self.origins.len() >= self.node_limit {
            self.truncated = true;
            return;
        }
        if self.root.as_ref().is_none_or(|root| key < *root) {
            self.root = Some(key.clone());
        }
        self.origins.insert(key.clone(), origin);
        self.cables.push(key);
        self.queue.push_back((pos, origin));
    }

    fn add_seed(&mut self, pos: P, key: PositionKey) {
        let origin = self.seed_parents.len();
        let parent = self.origins.get(&key).copied().unwrap_or(origin);
        self.seed_parents.push(parent);
        self.enqueue(pos, key, origin);
    }

    fn find_seed(&self, mut seed: usize) -> usize {
        while let Some(&parent) = self.seed_parents.get(seed) {
            if parent == seed {
                break;
            }
            seed = parent;
        }
        seed
    }

    fn join_seeds(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find_seed(a), self.find_seed(b));
        let (keep, merged) = (a.min(b), a.max(b));
        if let Some(parent) = self.seed_parents.get_mut(merged) {
            *parent = keep;
        }
    }

    fn seed_components(&self) -> usize {
        (0..self.seed_parents.len())
            .filter(|&seed| self.find_seed(seed) == seed)
            .count()
    }
}

/// A configured discovery walker.
///
/// Borrowed from the manager for the duration of one call; holds no state
/// between walks.
#[derive(Debug)]
pub struct Discovery<'a, L, O> {
    adapter: &'a L,
    side_override: Option<&'a O>,
    node_limit: usize,
    external_endpoints: bool,
}

impl<'a, L, O> Discovery<'a, L, O>
where
    L: LocationAdapter,
    O: SideOverride,
{
    /// Create a walker. `node_limit` is raised to [`MIN_NODE_LIMIT`] if
    /// lower.
    pub fn new(
        adapter: &'a L,
        side_override: Option<&'a O>,
        node_limit: usize,
        external_endpoints: bool,
    ) -> Self {
        Self {
            adapter,
            side_override,
            node_limit: node_limit.max(MIN_NODE_LIMIT),
            external_endpoints,
        }
    }

    /// The effective node limit.
    pub const fn node_limit(&self) -> usize {
        self.node_limit
    }

    /// Whether the `side` face of the cable at `pos` is disabled.
    ///
    /// Consults the override when one is configured, otherwise the access
    /// provider's default hook.
    pub fn side_disabled<A>(
        &self,
        access: &A,
        pos: &L::Pos,
        side: Direction,
    ) -> Result<bool, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        match self.side_override {
            Some(side_override) => {
                Ok(side_override.is_side_disabled(&self.adapter.to_cable_key(pos), side))
            }
            None => access.is_cable_side_disabled(pos, side),
        }
    }

    /// Cables adjacent to a canonical controller position whose face
    /// pointing back at the controller is enabled.
    pub fn controller_seeds<A>(
        &self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<Vec<L::Pos>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let mut seeds = Vec::new();
        for direction in Direction::ALL {
            let Some(neighbor) = self
                .adapter
                .neighbor(controller, direction)
                .and_then(|raw| self.adapter.normalize(&raw))
            else {
                continue;
            };
            if !access.is_cable(&neighbor)? {
                continue;
            }
            if self.side_disabled(access, &neighbor, direction.opposite())? {
                continue;
            }
            seeds.push(neighbor);
        }
        Ok(seeds)
    }

    /// Discover the network around a controller.
    ///
    /// Returns `Ok(None)` if the controller cannot be resolved or touches no
    /// enabled cable.
    pub fn from_controller<A>(
        &self,
        access: &A,
        controller: &L::Pos,
    ) -> Result<Option<NetworkDiscovery<L::Pos>>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some(controller) = self.adapter.normalize(controller) else {
            return Ok(None);
        };
        let seeds = self.controller_seeds(access, &controller)?;
        self.walk(access, seeds)
    }

    /// Discover the network containing a cable.
    ///
    /// Returns `Ok(None)` if the position cannot be resolved or is not a
    /// cable.
    pub fn from_cable<A>(
        &self,
        access: &A,
        cable: &L::Pos,
    ) -> Result<Option<NetworkDiscovery<L::Pos>>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some(cable) = self.adapter.normalize(cable) else {
            return Ok(None);
        };
        if !access.is_cable(&cable)? {
            return Ok(None);
        }
        self.walk(access, vec![cable])
    }

    /// Walk the cable graph from canonical seed cables.
    ///
    /// Returns `Ok(None)` when `seeds` is empty.
    pub fn walk<A>(
        &self,
        access: &A,
        seeds: Vec<L::Pos>,
    ) -> Result<Option<NetworkDiscovery<L::Pos>>, A::Error>
    where
        A: AccessProvider<Pos = L::Pos>,
    {
        let Some(world) = seeds.first().map(|seed| self.adapter.world_id(seed)) else {
            return Ok(None);
        };
        let external_enabled = self.external_endpoints && access.external_api_present();

        let mut walk = Traversal::new(self.node_limit);
        for seed in seeds {
            let key = self.adapter.key(&seed);
            walk.add_seed(seed, key);
        }

        while let Some((current, origin)) = walk.queue.pop_front() {
            for direction in Direction::ALL {
                if self.side_disabled(access, &current, direction)? {
                    continue;
                }
                let Some(neighbor) = self
                    .adapter
                    .neighbor(&current, direction)
                    .and_then(|raw| self.adapter.normalize(&raw))
                else {
                    continue;
                };
                let key = self.adapter.key(&neighbor);
                let role = if let Some(role) = walk.roles.get(&key) {
                    *role
                } else {
                    let role = classify(access, &neighbor)?;
                    walk.roles.insert(key.clone(), role);
                    role
                };
                let incoming = direction.opposite();

                match role.member {
                    Member::Producer => {
                        if walk.producers.insert(key.clone()) {
                            let output = non_negative(access.producer_cfe_per_tick(&neighbor)?);
                            walk.produced = walk.produced.saturating_add(output);
                        }
                    }
                    Member::Cell => {
                        if walk.seen_cells.insert(key.clone()) {
                            walk.cells.push(neighbor.clone());
                        }
                    }
                    Member::Plain => {
                        let endpoint = (key.clone(), incoming);
                        if external_enabled
                            && !role.cable
                            && !walk.seen_external.contains(&endpoint)
                            && access.is_external_storage(&neighbor, incoming)?
                        {
                            walk.seen_external.insert(endpoint);
                            walk.external_endpoints.push(ExternalEndpoint {
                                position: neighbor.clone(),
                                side: incoming,
                            });
                        }
                    }
                }

                if !role.cable {
                    continue;
                }
                match walk.origins.get(&key).copied() {
                    Some(other) => {
                        if walk.find_seed(other) != walk.find_seed(origin)
                            && !self.side_disabled(access, &neighbor, incoming)?
                        {
                            walk.join_seeds(origin, other);
                        }
                    }
                    None => {
                        if !self.side_disabled(access, &neighbor, incoming)? {
                            walk.enqueue(neighbor, key, origin);
                        }
                    }
                }
            }
        }

        let Some(root) = walk.root.clone() else {
            return Ok(None);
        };

        if walk.truncated {
            debug!(
                %root,
                node_limit = self.node_limit,
                "Discovery stopped at node limit"
            );
        }
        let seed_components = walk.seed_components();
        debug!(
            %root,
            seed_components,
            cables = walk.cables.len(),
            cells = walk.cells.len(),
            external_endpoints = walk.external_endpoints.len(),
            produced_cfe_per_tick = walk.produced,
            "Network discovered"
        );

        Ok(Some(NetworkDiscovery {
            root,
            world,
            produced_cfe_per_tick: walk.produced,
            cells: walk.cells,
            external_endpoints: walk.external_endpoints,
            cables: walk.cables,
            truncated: walk.truncated,
            seed_components,
        }))
    }
}

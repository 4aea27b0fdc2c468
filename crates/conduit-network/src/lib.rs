//! Power network discovery and tick-scoped energy accounting for Conduit.
//!
//! Cables placed in a grid world link producers, storage cells, and
//! foreign storage endpoints into networks that are discovered on demand.
//! Consumers draw energy through a controller block adjacent to a network.
//!
//! # Modules
//!
//! - [`access`] -- Collaborator traits: [`LocationAdapter`],
//!   [`AccessProvider`], and [`SideOverride`].
//! - [`discovery`] -- Bounded breadth-first network discovery.
//! - [`snapshot`] -- Per-tick snapshot cache keyed by network root.
//! - [`manager`] -- [`PowerNetworkManager`]: tick lifecycle, layered
//!   extraction, and side-effect-free measurement.
//!
//! # Usage
//!
//! ```ignore
//! manager.begin_tick(tick);
//! let got = manager.extract_power_cfe(&mut world, &controller, 40)?;
//! let report = manager.end_tick(&mut world)?;
//! ```
//!
//! [`LocationAdapter`]: access::LocationAdapter
//! [`AccessProvider`]: access::AccessProvider
//! [`SideOverride`]: access::SideOverride
//! [`PowerNetworkManager`]: manager::PowerNetworkManager

pub mod access;
pub mod discovery;
pub mod manager;
pub mod snapshot;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root.
pub use access::{AccessProvider, LocationAdapter, NoSideOverride, SideOverride};
pub use discovery::{
    DEFAULT_NODE_LIMIT, Discovery, ExternalEndpoint, MIN_NODE_LIMIT, NetworkDiscovery,
};
pub use manager::{ManagerConfig, PowerNetworkManager, SettlementReport, TickPhase};
pub use snapshot::{NetworkId, NetworkSnapshot, SnapshotCache};

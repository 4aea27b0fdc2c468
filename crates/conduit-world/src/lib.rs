//! Reference host world for the Conduit power grid.
//!
//! Provides a sparse in-memory block grid that implements the collaborator
//! traits of `conduit-network`, plus the persisted per-cable disabled-side
//! store.
//!
//! # Modules
//!
//! - [`grid`] -- [`GridWorld`] (blocks and energy transfers) and
//!   [`GridLocator`] (position canonicalization).
//! - [`overrides`] -- [`DisabledSideStore`]: JSON-backed side bitmasks.
//! - [`demo`] -- A small ready-made layout used by the engine binary.
//! - [`error`] -- Error types for world and store operations.
//!
//! [`GridWorld`]: grid::GridWorld
//! [`GridLocator`]: grid::GridLocator
//! [`DisabledSideStore`]: overrides::DisabledSideStore

pub mod demo;
pub mod error;
pub mod grid;
pub mod overrides;

// Re-export primary types at crate root.
pub use demo::{DemoLayout, demo_layout};
pub use error::{StoreError, WorldError};
pub use grid::{Block, GridLocator, GridWorld, Storage, WorldBounds};
pub use overrides::DisabledSideStore;

//! Shared type definitions for the Conduit power grid.
//!
//! This crate is the single source of truth for the value types that flow
//! between the network manager, the world adapters, and the tick driver.
//!
//! # Modules
//!
//! - [`direction`] -- The fixed 6-way neighbor convention.
//! - [`position`] -- Canonical block positions and the string keys derived
//!   from them.
//! - [`measure`] -- Read-only network measurement records.

pub mod direction;
pub mod measure;
pub mod position;

// Re-export all public types at crate root for convenience.
pub use direction::Direction;
pub use measure::{NetworkMeasurement, ProbeMeasurement};
pub use position::{BlockPos, CableKey, PositionKey};

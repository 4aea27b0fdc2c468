//! Configuration, tick clock, and orchestration for the Conduit power grid.
//!
//! This crate drives the network manager one tick at a time: open the
//! tick, serve every consumer, settle leftover generation into cells.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic tick counter with checked advance.
//! - [`config`] -- Configuration loading from `conduit-config.yaml` into
//!   strongly-typed structs.
//! - [`tick`] -- [`SimulationState`], [`Consumer`], and the single-tick
//!   driver [`run_tick`].
//! - [`runner`] -- Async loop around [`run_tick`] with tick pacing.
//!
//! [`SimulationState`]: tick::SimulationState
//! [`Consumer`]: tick::Consumer
//! [`run_tick`]: tick::run_tick

pub mod clock;
pub mod config;
pub mod runner;
pub mod tick;

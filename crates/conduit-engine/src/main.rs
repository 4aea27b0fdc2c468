//! Grid engine binary for the Conduit power grid.
//!
//! Wires together configuration, the persisted disabled-side store, the
//! demo world, and the network manager, then runs the paced tick loop
//! until the tick limit is reached or Ctrl-C is pressed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first CLI argument, else `conduit-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the disabled-side store
//! 4. Build the demo world and its consumers
//! 5. Run the simulation loop
//! 6. Save the side store and log the result

mod error;
mod probe_callback;

use std::path::{Path, PathBuf};

use conduit_core::config::ConduitConfig;
use conduit_core::runner;
use conduit_core::tick::{Consumer, SimulationState};
use conduit_network::ManagerConfig;
use conduit_world::{DemoLayout, DisabledSideStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::probe_callback::ProbeCallback;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "conduit-config.yaml";

/// Ticks between network probes.
const PROBE_INTERVAL_TICKS: u64 = 5;

/// Application entry point for the grid engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("conduit-engine starting");
    if !from_file {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        max_nodes = config.network.max_nodes,
        external_endpoints = config.network.external_endpoints,
        max_ticks = config.simulation.max_ticks,
        tick_interval_ms = config.simulation.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Load the disabled-side store.
    let sides = DisabledSideStore::load(&config.overrides.path).map_err(EngineError::from)?;
    info!(
        path = %config.overrides.path.display(),
        cables = sides.len(),
        "Side store ready"
    );

    // 4. Build the demo world.
    let layout = conduit_world::demo_layout(&config.world.name).map_err(EngineError::from)?;
    let consumers = demo_consumers(&layout);
    let watched = layout
        .controllers()
        .into_iter()
        .map(|(name, pos)| (name.to_owned(), pos.clone()))
        .collect();
    info!(
        blocks = layout.world.len(),
        consumers = consumers.len(),
        "Demo world created"
    );

    let mut state = SimulationState::new(
        layout.world,
        ManagerConfig::from(config.network),
        sides,
    );
    let mut callback = ProbeCallback::new(watched, PROBE_INTERVAL_TICKS);

    // 5. Run the simulation, stopping early on Ctrl-C.
    let outcome = tokio::select! {
        result = runner::run_simulation(
            &mut state,
            &consumers,
            &config.simulation,
            &mut callback,
        ) => Some(result.map_err(EngineError::from)?),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|source| EngineError::Signal { source })?;
            None
        }
    };
    if outcome.is_none() {
        warn!(tick = state.clock.tick(), "Shutdown requested");
    }

    // 6. Persist sides and log results.
    if let Some(store) = state.manager.side_override() {
        store.save(&config.overrides.path).map_err(EngineError::from)?;
    }
    if let Some(result) = &outcome {
        runner::log_simulation_end(result);
    }
    for (name, probe) in callback.last() {
        info!(
            controller = %name,
            produced_cfe_per_tick = probe.produced_cfe_per_tick,
            stored_cfe = probe.stored_cfe,
            "Last probe"
        );
    }

    info!(final_tick = state.clock.tick(), "conduit-engine shutdown complete");
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Returns whether the file was read.
fn load_config(path: &Path) -> Result<(ConduitConfig, bool), EngineError> {
    if path.exists() {
        Ok((ConduitConfig::from_file(path)?, true))
    } else {
        let mut config = ConduitConfig::default();
        config.overrides.apply_env_overrides();
        Ok((config, false))
    }
}

/// Fixed demand for each demo controller.
fn demo_consumers(layout: &DemoLayout) -> Vec<Consumer> {
    vec![
        Consumer::new("workshop", layout.workshop.clone(), 50),
        Consumer::new("furnace", layout.furnace.clone(), 30).generation_only(),
        Consumer::new("pump", layout.pump.clone(), 120),
    ]
}

//! Tick callback that periodically probes consumer networks.
//!
//! Every `interval` ticks, each watched controller's network is measured
//! with the side-effect-free probe and the result logged at debug level.

use conduit_core::runner::TickCallback;
use conduit_core::tick::{SimulationState, TickSummary};
use conduit_types::{BlockPos, ProbeMeasurement};
use tracing::{debug, warn};

/// Callback that logs a probe measurement per watched controller.
pub struct ProbeCallback {
    controllers: Vec<(String, BlockPos)>,
    interval: u64,
    last: Vec<(String, ProbeMeasurement)>,
}

impl ProbeCallback {
    /// Watch `controllers`, probing every `interval` ticks (0 disables).
    pub const fn new(controllers: Vec<(String, BlockPos)>, interval: u64) -> Self {
        Self {
            controllers,
            interval,
            last: Vec::new(),
        }
    }

    /// Measurements from the most recent probe, in controller order.
    pub fn last(&self) -> &[(String, ProbeMeasurement)] {
        &self.last
    }

    const fn due(&self, tick: u64) -> bool {
        match tick.checked_rem(self.interval) {
            Some(rem) => rem == 0,
            None => false,
        }
    }
}

impl TickCallback for ProbeCallback {
    fn on_tick(&mut self, summary: &TickSummary, sim: &SimulationState) {
        if !self.due(summary.tick) {
            return;
        }
        self.last.clear();
        for (name, controller) in &self.controllers {
            match sim.manager.measure_network_for_probe(&sim.world, controller) {
                Ok(probe) => {
                    debug!(
                        tick = summary.tick,
                        controller = %name,
                        produced_cfe_per_tick = probe.produced_cfe_per_tick,
                        stored_cfe = probe.stored_cfe,
                        external_stored_cfe = probe.external_stored_cfe,
                        external_capacity_cfe = probe.external_capacity_cfe,
                        cables = probe.cable_count,
                        cells = probe.cell_count,
                        truncated = probe.truncated,
                        "Network probed"
                    );
                    self.last.push((name.clone(), probe));
                }
                Err(error) => {
                    warn!(tick = summary.tick, controller = %name, error = %error, "Probe failed");
                    self.last.push((name.clone(), ProbeMeasurement::default()));
                }
            }
        }
    }
}

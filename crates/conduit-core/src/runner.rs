//! Simulation loop runner.
//!
//! [`run_simulation`] drives [`run_tick`] until the configured tick limit
//! is reached, sleeping between ticks so the grid advances at a steady
//! real-time pace. A [`TickCallback`] observes every completed tick.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::time::Duration;

use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::tick::{self, Consumer, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Energy delivered across all ticks.
    pub delivered_cfe: i64,
    /// Unmet demand across all ticks.
    pub shortfall_cfe: i64,
    /// Generation settled into cells across all ticks.
    pub stored_cfe: i64,
    /// Generation discarded across all ticks.
    pub discarded_cfe: i64,
    /// Consumer draws that failed across all ticks.
    pub failed_draws: u64,
}

impl SimulationResult {
    fn record(&mut self, summary: TickSummary) {
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.delivered_cfe = self.delivered_cfe.saturating_add(summary.delivered_cfe);
        self.shortfall_cfe = self.shortfall_cfe.saturating_add(summary.shortfall_cfe);
        self.stored_cfe = self
            .stored_cfe
            .saturating_add(summary.settlement.stored_cfe);
        self.discarded_cfe = self
            .discarded_cfe
            .saturating_add(summary.settlement.discarded_cfe);
        let failed = u64::try_from(summary.failed_consumers).unwrap_or(u64::MAX);
        self.failed_draws = self.failed_draws.saturating_add(failed);
        self.final_summary = Some(summary);
    }
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Whether `tick` is the last one allowed by `max_ticks` (0 = unbounded).
const fn tick_limit_reached(max_ticks: u64, tick: u64) -> bool {
    max_ticks > 0 && tick >= max_ticks
}

/// Run the tick loop until `settings.max_ticks` ticks have completed.
///
/// With `max_ticks == 0` the loop only ends on error; callers race it
/// against a shutdown signal.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    consumers: &[Consumer],
    settings: &SimulationConfig,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut result = SimulationResult::default();

    info!(
        max_ticks = settings.max_ticks,
        tick_interval_ms = settings.tick_interval_ms,
        consumers = consumers.len(),
        "Simulation starting"
    );

    loop {
        let summary = tick::run_tick(state, consumers)?;
        callback.on_tick(&summary, state);

        let tick = summary.tick;
        result.record(summary);

        if tick_limit_reached(settings.max_ticks, tick) {
            info!(tick, max_ticks = settings.max_ticks, "Tick limit reached");
            return Ok(result);
        }

        if settings.tick_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(settings.tick_interval_ms)).await;
        }
    }
}

/// Log the totals of a finished run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        total_ticks = result.total_ticks,
        delivered_cfe = result.delivered_cfe,
        shortfall_cfe = result.shortfall_cfe,
        stored_cfe = result.stored_cfe,
        discarded_cfe = result.discarded_cfe,
        failed_draws = result.failed_draws,
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            delivered_cfe = summary.delivered_cfe,
            shortfall_cfe = summary.shortfall_cfe,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

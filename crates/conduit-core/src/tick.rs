//! Tick cycle: one pass of energy distribution over the grid.
//!
//! Each tick runs three phases:
//!
//! 1. **Open** -- advance the clock and start a fresh snapshot cache.
//! 2. **Serve** -- every consumer draws its demand through its controller,
//!    in list order, using its [`ConsumerPolicy`]. A collaborator error
//!    for one consumer is logged and counted; the others are still served.
//! 3. **Settle** -- leftover generation is pushed into cells and the rest
//!    discarded.
//!
//! The cycle is deterministic given the same world and consumer list.

use conduit_network::{ManagerConfig, PowerNetworkManager, SettlementReport};
use conduit_types::BlockPos;
use conduit_world::{DisabledSideStore, GridLocator, GridWorld, WorldError};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, TickClock};

/// Manager type used by the simulation.
pub type GridManager = PowerNetworkManager<GridLocator, DisabledSideStore>;

/// Errors that abort a whole tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// Settlement failed part-way through.
    #[error("settlement failed at tick {tick}: {source}")]
    Settlement {
        /// Tick being settled.
        tick: u64,
        /// The underlying world error.
        source: WorldError,
    },
}

/// Which sources a consumer may draw from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumerPolicy {
    /// Generation, then cells, then external endpoints.
    #[default]
    Full,
    /// This tick's generation only.
    GenerationOnly,
}

/// A machine drawing a fixed demand through a controller every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    /// Display name, used in logs and summaries.
    pub name: String,
    /// Controller block the consumer draws through.
    pub controller: BlockPos,
    /// Energy requested per tick.
    pub demand_cfe: i64,
    /// Sources the consumer may draw from.
    pub policy: ConsumerPolicy,
}

impl Consumer {
    /// A consumer with the [`ConsumerPolicy::Full`] policy.
    pub fn new(name: impl Into<String>, controller: BlockPos, demand_cfe: i64) -> Self {
        Self {
            name: name.into(),
            controller,
            demand_cfe,
            policy: ConsumerPolicy::Full,
        }
    }

    /// Restrict the consumer to fresh generation.
    #[must_use]
    pub fn generation_only(mut self) -> Self {
        self.policy = ConsumerPolicy::GenerationOnly;
        self
    }
}

/// What one consumer received during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Consumer name.
    pub name: String,
    /// Energy requested.
    pub requested_cfe: i64,
    /// Energy delivered.
    pub delivered_cfe: i64,
    /// Whether the draw failed with a collaborator error.
    pub failed: bool,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Per-consumer results, in consumer order.
    pub deliveries: Vec<Delivery>,
    /// Total energy delivered.
    pub delivered_cfe: i64,
    /// Total demand left unmet.
    pub shortfall_cfe: i64,
    /// Consumers whose draw failed.
    pub failed_consumers: usize,
    /// End-of-tick settlement.
    pub settlement: SettlementReport,
}

/// The mutable state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// The tick clock.
    pub clock: TickClock,
    /// The host world.
    pub world: GridWorld,
    /// The network manager.
    pub manager: GridManager,
}

impl SimulationState {
    /// Build a state at tick 0 with a manager over `world`'s registered
    /// worlds.
    pub fn new(world: GridWorld, config: ManagerConfig, sides: DisabledSideStore) -> Self {
        let manager = PowerNetworkManager::with_side_override(world.locator(), config, sides);
        Self {
            clock: TickClock::new(),
            world,
            manager,
        }
    }
}

/// Execute one tick for `consumers`.
///
/// # Errors
///
/// Returns [`TickError`] if the clock overflows or settlement fails.
/// Individual consumer failures are recorded in the summary instead.
pub fn run_tick(
    state: &mut SimulationState,
    consumers: &[Consumer],
) -> Result<TickSummary, TickError> {
    // --- Open ---
    let tick = state.clock.advance()?;
    state.manager.begin_tick(tick);

    // --- Serve ---
    let mut deliveries = Vec::with_capacity(consumers.len());
    let mut delivered_cfe: i64 = 0;
    let mut shortfall_cfe: i64 = 0;
    let mut failed_consumers: usize = 0;

    for consumer in consumers {
        let requested = consumer.demand_cfe.max(0);
        let drawn = match consumer.policy {
            ConsumerPolicy::Full => {
                state
                    .manager
                    .extract_power_cfe(&mut state.world, &consumer.controller, requested)
            }
            ConsumerPolicy::GenerationOnly => state.manager.extract_generation_only_cfe(
                &state.world,
                &consumer.controller,
                requested,
            ),
        };
        let (delivered, failed) = match drawn {
            Ok(delivered) => (delivered, false),
            Err(error) => {
                warn!(
                    tick,
                    consumer = %consumer.name,
                    controller = %consumer.controller,
                    error = %error,
                    "Consumer draw failed"
                );
                failed_consumers = failed_consumers.saturating_add(1);
                (0, true)
            }
        };
        debug!(tick, consumer = %consumer.name, requested, delivered, "Consumer served");
        delivered_cfe = delivered_cfe.saturating_add(delivered);
        shortfall_cfe = shortfall_cfe.saturating_add(requested.saturating_sub(delivered));
        deliveries.push(Delivery {
            name: consumer.name.clone(),
            requested_cfe: requested,
            delivered_cfe: delivered,
            failed,
        });
    }

    // --- Settle ---
    let settlement = state
        .manager
        .end_tick(&mut state.world)
        .map_err(|source| TickError::Settlement { tick, source })?;

    info!(
        tick,
        delivered_cfe,
        shortfall_cfe,
        failed_consumers,
        stored_cfe = settlement.stored_cfe,
        discarded_cfe = settlement.discarded_cfe,
        "Tick completed"
    );

    Ok(TickSummary {
        tick,
        deliveries,
        delivered_cfe,
        shortfall_cfe,
        failed_consumers,
        settlement,
    })
}

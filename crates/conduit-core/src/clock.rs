//! Tick counter for the simulation.
//!
//! The clock is the single source of truth for the current tick. The
//! network manager only compares ticks for equality, so the counter never
//! wraps: advancing past `u64::MAX` is an error.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonically increasing tick counter.
///
/// Starts at tick 0, meaning no tick has run yet. The first call to
/// [`advance`](Self::advance) yields tick 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickClock {
    tick: u64,
}

impl TickClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Resume a clock at `tick`.
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance by one tick and return the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] at `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// The most recently started tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

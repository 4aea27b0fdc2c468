//! Read-only measurement records returned by network queries.

use serde::{Deserialize, Serialize};

/// Generation and storage totals of one discovered network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMeasurement {
    /// Sum of all producer outputs reachable from the entry point.
    pub produced_cfe_per_tick: i64,
    /// Sum of the stored amounts of all reachable cells.
    pub stored_cfe: i64,
}

/// Detailed measurement used by diagnostic probes.
///
/// Extends [`NetworkMeasurement`] with external-endpoint totals and the
/// shape of the discovered graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeMeasurement {
    /// Sum of all producer outputs reachable from the entry point.
    pub produced_cfe_per_tick: i64,
    /// Sum of the stored amounts of all reachable cells.
    pub stored_cfe: i64,
    /// Whether the host exposes a foreign storage API at all.
    pub external_api_present: bool,
    /// Number of distinct `(position, side)` external endpoints reached.
    pub external_endpoint_count: usize,
    /// Sum of stored amounts across external endpoints.
    pub external_stored_cfe: i64,
    /// Sum of capacities across external endpoints.
    pub external_capacity_cfe: i64,
    /// Number of cable positions visited by discovery.
    pub cable_count: usize,
    /// Number of distinct cells reached.
    pub cell_count: usize,
    /// Whether discovery stopped at the node limit.
    pub truncated: bool,
}

impl ProbeMeasurement {
    /// Drop the probe-only fields.
    pub const fn summary(&self) -> NetworkMeasurement {
        NetworkMeasurement {
            produced_cfe_per_tick: self.produced_cfe_per_tick,
            stored_cfe: self.stored_cfe,
        }
    }
}

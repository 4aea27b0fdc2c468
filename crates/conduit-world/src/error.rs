//! Error types for the `conduit-world` crate.

use std::path::PathBuf;

use conduit_types::BlockPos;

/// Errors raised while building or probing a [`GridWorld`](crate::GridWorld).
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The position names a world that was never registered.
    #[error("unknown world: {0}")]
    UnknownWorld(String),

    /// The position lies outside the world's build height.
    #[error("{pos} is outside build height {min_y}..={max_y}")]
    OutOfBounds {
        /// The rejected position.
        pos: BlockPos,
        /// Lowest buildable Y.
        min_y: i32,
        /// Highest buildable Y.
        max_y: i32,
    },

    /// A storage block was given a negative capacity or more stock than
    /// it can hold.
    #[error("invalid storage at {pos}: {stored} stored with capacity {capacity}")]
    InvalidCapacity {
        /// The storage position.
        pos: BlockPos,
        /// Requested initial stock.
        stored: i64,
        /// Requested capacity.
        capacity: i64,
    },

    /// A producer was given a negative output.
    #[error("invalid producer output at {pos}: {output}")]
    InvalidOutput {
        /// The producer position.
        pos: BlockPos,
        /// Requested per-tick output.
        output: i64,
    },

    /// A cable-only operation targeted something else.
    #[error("no cable at {0}")]
    NotACable(BlockPos),

    /// A world was registered with `min_y > max_y`.
    #[error("world {name} has an empty build height {min_y}..={max_y}")]
    EmptyBounds {
        /// World name.
        name: String,
        /// Lowest buildable Y.
        min_y: i32,
        /// Highest buildable Y.
        max_y: i32,
    },
}

/// Errors raised while loading or saving the disabled-side store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to read or write the store file.
    #[error("failed to access side store {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The store file is not valid JSON.
    #[error("failed to parse side store: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

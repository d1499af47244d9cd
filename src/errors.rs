//! Typed error hierarchy for the builders engine.
//!
//! Filtering, classification and sorting never fail; errors only arise at the
//! edges where data enters the crate:
//! - `SnapshotError`: reading and decoding a realtime builder snapshot
//! - `SortError`: naming a comparator or direction that does not exist

use thiserror::Error;

/// Errors from loading a builder snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown build result code {0}")]
    UnknownResult(i64),
}

/// Errors from resolving sort configuration.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("Unknown sort type '{0}'")]
    UnknownSortType(String),

    #[error("Invalid sort direction '{0}'. Valid values: asc, desc")]
    InvalidDirection(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{0}' is not sortable")]
    NotSortable(String),
}

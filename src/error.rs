//! Error type for index construction, queries, and snapshots.

use thiserror::Error;

/// Errors surfaced by [`crate::HnswIndex`] operations.
///
/// The core never recovers internally; every failure is reported to the
/// caller. Wrapped I/O errors are carried as strings so the enum stays
/// `Clone + PartialEq` for tests and callers that match on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HnswError {
    /// Construction parameters violate their invariants
    /// (`m < 2`, `ef_construction < 1`, non-positive `level_lambda`).
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A query or serialization was attempted before `build` or
    /// `deserialize_graph` produced a graph.
    #[error("graph has not been built")]
    GraphNotBuilt,

    /// A k-NN search was attempted on a graph with zero items.
    #[error("graph contains no items")]
    EmptyGraph,

    /// A snapshot failed structural validation: bad magic, version, or
    /// checksum, truncated or trailing bytes, ids out of range, duplicate
    /// neighbors, self-loops, degree overflow, or asymmetric edges.
    #[error("corrupt graph snapshot: {0}")]
    CorruptGraph(String),

    /// The item sequence supplied at restore time does not match the
    /// node count recorded in the snapshot.
    #[error("item count {items} does not match snapshot node count {nodes}")]
    MismatchedItems {
        /// Number of items supplied by the caller.
        items: usize,
        /// Number of nodes recorded in the snapshot.
        nodes: usize,
    },

    /// An I/O failure while reading or writing a snapshot file.
    #[error("snapshot io error: {0}")]
    Snapshot(String),
}

impl From<std::io::Error> for HnswError {
    fn from(e: std::io::Error) -> Self {
        Self::Snapshot(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HnswError>;

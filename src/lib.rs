//! # smallworld
//!
//! Embeddable Hierarchical Navigable Small World (HNSW) approximate nearest
//! neighbor index (Malkov & Yashunin, arXiv:1603.09320).
//!
//! The index is generic over the item type, the distance scalar, and the
//! distance function: callers supply any `Fn(&T, &T) -> D` where `D` is a
//! totally-ordered scalar. Distances are only ever compared, never combined
//! arithmetically, so non-metric distance functions work too.
//!
//! Construction is deterministic for a fixed rng seed and input order. The
//! graph topology (not the items) can be serialized to a compact checksummed
//! byte layout and restored later against the same item sequence.
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use smallworld::{HnswIndex, HnswParams};
//!
//! fn euclidean(a: &[f64; 2], b: &[f64; 2]) -> f64 {
//!     ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
//! }
//!
//! let points = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
//! let mut index = HnswIndex::new(euclidean);
//! let mut rng = StdRng::seed_from_u64(42);
//! index.build(points, &mut rng, HnswParams::default()).unwrap();
//!
//! let hits = index.knn_search(&[0.9, 0.0], 2).unwrap();
//! assert_eq!(hits[0].id, 1);
//! ```

/// Compile-time default constants: tuning parameters and limits.
pub mod config;
/// Crate error type and `Result` alias.
pub mod error;
/// HNSW index: graph topology, search, insertion, and snapshot layout.
pub mod hnsw;

pub use error::{HnswError, Result};
pub use hnsw::graph::{HnswGraph, HnswParams, NeighborSelection, NodeId};
pub use hnsw::index::{HnswIndex, SearchResult};

//! Compile-time default constants for smallworld.
//!
//! Runtime tuning is done through [`crate::HnswParams`]; the values here are
//! the defaults it starts from.

/// Default number of bidirectional links per node (`M`).
///
/// Layer 0 allows `2 * M` links; every upper layer allows `M`.
/// Higher values improve recall at the cost of memory and build time.
pub const HNSW_DEFAULT_M: usize = 10;

/// Default beam width during index construction (`efConstruction`).
///
/// Size of the dynamic candidate list while inserting a node. Higher values
/// produce a better-connected graph but slow down the build.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Maximum number of items one graph can hold.
///
/// Node ids are dense `u32` positions into the item sequence.
pub const MAX_ITEMS: usize = u32::MAX as usize;

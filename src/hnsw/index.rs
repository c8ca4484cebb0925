//! Generic index facade binding caller items and a distance function to a
//! graph topology.
//!
//! [`HnswIndex`] owns the item sequence and the distance function; the graph
//! itself holds only ids. Build and restore take `&mut self`; queries take
//! `&self`, so read-only searches can run concurrently once construction has
//! finished.

use crate::config;
use crate::error::{HnswError, Result};
use crate::hnsw::graph::{HnswGraph, HnswParams, NodeId};
use crate::hnsw::insert::{insert_node, sample_level};
use crate::hnsw::search::{greedy_descent, search_layer};
use crate::hnsw::serialize;
use crate::hnsw::visited::VisitedSet;
use rand::Rng;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// One k-NN hit: the item's id, a borrow of the item, and its distance to
/// the query.
#[derive(Debug)]
pub struct SearchResult<'a, T, D> {
    /// Dense id, equal to the item's position in the build sequence.
    pub id: NodeId,
    /// The matched item.
    pub item: &'a T,
    /// Distance from the query to the item.
    pub distance: D,
}

impl<T, D: Copy> Clone for SearchResult<'_, T, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, D: Copy> Copy for SearchResult<'_, T, D> {}

/// An HNSW index over items of type `T` compared by a caller-supplied
/// distance function.
///
/// The distance scalar `D` only needs ordering and copying; distances are
/// never added or scaled. See the crate docs for a usage example.
pub struct HnswIndex<T, F> {
    items: Vec<T>,
    distance: F,
    params: HnswParams,
    graph: Option<HnswGraph>,
}

impl<T, F> HnswIndex<T, F> {
    /// An index with no graph yet. `build` or `deserialize_graph` must run
    /// before queries.
    pub fn new(distance: F) -> Self {
        Self {
            items: Vec::new(),
            distance,
            params: HnswParams::default(),
            graph: None,
        }
    }

    /// Number of indexed items (0 before any build).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when no items are indexed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item behind `id`, if the id is in range.
    pub fn item(&self, id: NodeId) -> Option<&T> {
        self.items.get(id as usize)
    }

    /// The active construction/query parameters.
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Replace the parameters after validation. The snapshot format stores
    /// only `m`, so a restored index runs with defaults until the caller
    /// re-supplies its tuning through this method. The topology itself is
    /// untouched.
    pub fn set_params(&mut self, params: HnswParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// The graph topology, once built or restored.
    pub fn graph(&self) -> Result<&HnswGraph> {
        self.graph.as_ref().ok_or(HnswError::GraphNotBuilt)
    }
}

impl<T, D, F> HnswIndex<T, F>
where
    D: PartialOrd + Copy,
    F: Fn(&T, &T) -> D,
{
    /// Build a fresh graph over `items` in input order, replacing any
    /// previous build. For a fixed rng seed and input order the resulting
    /// topology is fully deterministic.
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        items: Vec<T>,
        rng: &mut R,
        params: HnswParams,
    ) -> Result<()> {
        params.validate()?;
        if items.len() > config::MAX_ITEMS {
            return Err(HnswError::InvalidParameters(format!(
                "item count {} exceeds the u32 id space",
                items.len()
            )));
        }

        self.params = params;
        self.items = items;
        let mut graph = HnswGraph::new();
        for id in 0..self.items.len() {
            let level = sample_level(rng, self.params.level_lambda);
            insert_node(
                &mut graph,
                &self.items,
                &self.distance,
                &self.params,
                id as NodeId,
                level,
            );
        }
        tracing::debug!(
            nodes = self.items.len(),
            top_layer = graph.max_layer(),
            "hnsw graph built"
        );
        self.graph = Some(graph);
        Ok(())
    }

    /// The `k` indexed items closest to `query`, ascending by distance
    /// (ascending id on ties).
    ///
    /// Runs a greedy descent through the upper layers and a beam search at
    /// layer 0 with width `max(k, ef_construction)`.
    pub fn knn_search(&self, query: &T, k: usize) -> Result<Vec<SearchResult<'_, T, D>>> {
        let graph = self.graph()?;
        if graph.is_empty() {
            return Err(HnswError::EmptyGraph);
        }
        let entry = graph
            .entry_point()
            .expect("non-empty graph always has an entry point");

        let mut dist = |n: NodeId| (self.distance)(query, &self.items[n as usize]);
        let ep = greedy_descent(graph, entry, graph.max_layer(), 0, &mut dist);

        let ef = self.params.ef_construction.max(k);
        let mut visited = VisitedSet::with_capacity(graph.node_count());
        let found = search_layer(graph, &[ep], ef, 0, &mut visited, &mut dist);

        Ok(found
            .into_iter()
            .take(k)
            .map(|(distance, id)| SearchResult {
                id,
                item: &self.items[id as usize],
                distance,
            })
            .collect())
    }
}

impl<T, F> HnswIndex<T, F> {
    /// Serialize the graph topology (not the items) to the snapshot byte
    /// layout documented in [`crate::hnsw`]'s `serialize` module.
    pub fn serialize_graph(&self) -> Result<Vec<u8>> {
        let graph = self.graph()?;
        Ok(serialize::encode(graph, self.params.m))
    }

    /// Restore a topology from `bytes` and bind it to `items`, which must be
    /// the same sequence (same order) the snapshot was built from. Parameters
    /// other than `m` reset to defaults; use
    /// [`set_params`](HnswIndex::set_params) to re-apply tuning.
    pub fn deserialize_graph(&mut self, items: Vec<T>, bytes: &[u8]) -> Result<()> {
        let (m, graph) = serialize::decode(bytes)?;
        if items.len() != graph.node_count() {
            return Err(HnswError::MismatchedItems {
                items: items.len(),
                nodes: graph.node_count(),
            });
        }
        self.items = items;
        self.params = HnswParams::new(m);
        self.graph = Some(graph);
        Ok(())
    }

    /// Write the snapshot to `path` atomically (temp file + rename).
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.serialize_graph()?;
        let path = path.as_ref();
        let tmp = path.with_extension("swg.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        tracing::info!(bytes = bytes.len(), path = %path.display(), "saved graph snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`save_to_file`](HnswIndex::save_to_file)
    /// and bind it to `items`.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, items: Vec<T>, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        self.deserialize_graph(items, &bytes)?;
        tracing::info!(bytes = bytes.len(), path = %path.display(), "loaded graph snapshot");
        Ok(())
    }

    /// Human-readable edge listing, one node per line. Debug aid only; the
    /// exact format carries no stability guarantee.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let Ok(graph) = self.graph() else {
            out.push_str("<graph not built>\n");
            return out;
        };
        for id in 0..graph.node_count() as NodeId {
            let _ = write!(out, "{id} (top layer {})", graph.level(id));
            for layer in 0..=graph.level(id) {
                let _ = write!(out, " | L{layer} -> {:?}", graph.neighbors(id, layer));
            }
            out.push('\n');
        }
        out
    }

    /// Print [`dump`](HnswIndex::dump) to stdout.
    pub fn print(&self) {
        print!("{}", self.dump());
    }
}

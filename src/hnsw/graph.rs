//! HNSW graph topology and construction parameters.
//!
//! [`HnswParams`] carries the tuning knobs and their invariants.
//! [`HnswGraph`] stores the layered adjacency in a struct-of-arrays layout:
//! one `Vec` of per-layer neighbor lists per node plus the node's top layer,
//! with the entry point tracked alongside. Items live with the caller; the
//! graph knows them only as dense `u32` ids equal to their position in the
//! item sequence.

use crate::config;
use crate::error::{HnswError, Result};
use serde::{Deserialize, Serialize};

/// Dense node identifier, equal to the item's position in the input sequence.
pub type NodeId = u32;

/// Neighbor selection strategy used during insertion and pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborSelection {
    /// Keep the `m` closest candidates (paper Algorithm 3).
    Simple,
    /// Prefer diverse candidates: accept one only when it is closer to the
    /// target than to everything already accepted (paper Algorithm 4).
    Heuristic,
}

/// Construction parameters for an HNSW graph.
///
/// Controls the trade-off between build time, memory, and recall.
/// Validated by [`HnswParams::validate`] before any build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswParams {
    /// Target number of bidirectional links per node. Layer 0 caps at `2 * m`,
    /// upper layers at `m`.
    pub m: usize,
    /// Decay of the level-sampling distribution. New nodes get layer
    /// `floor(-ln(u) * level_lambda)`. Defaults to `1 / ln(m)`.
    pub level_lambda: f64,
    /// Which selection strategy connects new nodes and prunes full ones.
    pub selection: NeighborSelection,
    /// Beam width while inserting (`efConstruction`).
    pub ef_construction: usize,
    /// Heuristic only: widen the candidate set with the candidates' own
    /// layer neighbors before selecting.
    pub extend_candidates: bool,
    /// Heuristic only: backfill with the closest rejected candidates until
    /// the degree target is reached.
    pub keep_pruned: bool,
    /// Memoize pairwise distances for the duration of each insertion.
    pub distance_cache: bool,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(config::HNSW_DEFAULT_M)
    }
}

impl HnswParams {
    /// Parameters with the given `m` and every other knob at its default,
    /// including `level_lambda = 1 / ln(m)`.
    pub fn new(m: usize) -> Self {
        Self {
            m,
            level_lambda: 1.0 / (m as f64).ln(),
            selection: NeighborSelection::Simple,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            extend_candidates: false,
            keep_pruned: false,
            distance_cache: false,
        }
    }

    /// Hard degree cap at `layer`: `2 * m` at layer 0, `m` above.
    #[inline]
    pub fn max_degree(&self, layer: usize) -> usize {
        layer_capacity(self.m, layer)
    }

    /// Check the parameter invariants: `m >= 2`, `ef_construction >= 1`,
    /// `level_lambda` finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(HnswError::InvalidParameters(format!(
                "m must be at least 2, got {}",
                self.m
            )));
        }
        if self.ef_construction < 1 {
            return Err(HnswError::InvalidParameters(
                "ef_construction must be at least 1".into(),
            ));
        }
        if !(self.level_lambda.is_finite() && self.level_lambda > 0.0) {
            return Err(HnswError::InvalidParameters(format!(
                "level_lambda must be finite and positive, got {}",
                self.level_lambda
            )));
        }
        Ok(())
    }
}

/// Degree cap for the given `m` at `layer`.
#[inline]
pub(crate) fn layer_capacity(m: usize, layer: usize) -> usize {
    if layer == 0 {
        m * 2
    } else {
        m
    }
}

/// Layered adjacency of an HNSW graph.
///
/// `neighbors[id][layer]` is the neighbor list of `id` at `layer`; a node
/// participates in layers `0..=level(id)`. Entries are unique and kept in
/// insertion order, which makes fixed-seed builds reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnswGraph {
    neighbors: Vec<Vec<Vec<NodeId>>>,
    levels: Vec<usize>,
    entry_point: Option<NodeId>,
    max_layer: usize,
}

impl HnswGraph {
    /// An empty graph with no entry point.
    pub(crate) fn new() -> Self {
        Self {
            neighbors: Vec::new(),
            levels: Vec::new(),
            entry_point: None,
            max_layer: 0,
        }
    }

    /// Rebuild a graph from restored parts. The entry point is the node with
    /// the highest top layer, ties broken by smallest id, matching what an
    /// incremental build produces.
    pub(crate) fn from_parts(levels: Vec<usize>, neighbors: Vec<Vec<Vec<NodeId>>>) -> Self {
        let mut entry_point = None;
        let mut max_layer = 0;
        for (id, &level) in levels.iter().enumerate() {
            if entry_point.is_none() || level > max_layer {
                entry_point = Some(id as NodeId);
                max_layer = level;
            }
        }
        Self {
            neighbors,
            levels,
            entry_point,
            max_layer,
        }
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.levels.len()
    }

    /// `true` when the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Top layer at which `id` participates.
    pub fn level(&self, id: NodeId) -> usize {
        self.levels[id as usize]
    }

    /// Neighbor list of `id` at `layer`; empty above the node's top layer.
    pub fn neighbors(&self, id: NodeId, layer: usize) -> &[NodeId] {
        self.neighbors[id as usize]
            .get(layer)
            .map_or(&[], Vec::as_slice)
    }

    /// The node all searches start from, `None` iff the graph is empty.
    pub fn entry_point(&self) -> Option<NodeId> {
        self.entry_point
    }

    /// Top layer of the entry point (0 for an empty graph).
    pub fn max_layer(&self) -> usize {
        self.max_layer
    }

    /// Append a node with empty neighbor lists for layers `0..=level`.
    pub(crate) fn push_node(&mut self, level: usize) -> NodeId {
        let id = self.levels.len() as NodeId;
        self.neighbors.push(vec![Vec::new(); level + 1]);
        self.levels.push(level);
        id
    }

    pub(crate) fn set_entry_point(&mut self, id: NodeId, level: usize) {
        self.entry_point = Some(id);
        self.max_layer = level;
    }

    /// Add the bidirectional edge `a <-> b` at `layer`, ignoring duplicates.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId, layer: usize) {
        self.push_unique(a, b, layer);
        self.push_unique(b, a, layer);
    }

    fn push_unique(&mut self, from: NodeId, to: NodeId, layer: usize) {
        let list = &mut self.neighbors[from as usize][layer];
        if !list.contains(&to) {
            list.push(to);
        }
    }

    /// Overwrite the neighbor list of `id` at `layer`.
    pub(crate) fn replace_neighbors(&mut self, id: NodeId, layer: usize, list: Vec<NodeId>) {
        self.neighbors[id as usize][layer] = list;
    }

    /// Remove the one-directional edge `from -> to` at `layer`, if present.
    pub(crate) fn unlink_from(&mut self, from: NodeId, to: NodeId, layer: usize) {
        let list = &mut self.neighbors[from as usize][layer];
        if let Some(pos) = list.iter().position(|&n| n == to) {
            list.remove(pos);
        }
    }

    /// Check every structural invariant against the degree caps implied by
    /// `m`. Returns a description of the first violation found.
    ///
    /// Checked: parallel array lengths, per-node list count = top layer + 1,
    /// entry point presence and dominance, degree caps, no self-loops, no
    /// duplicate neighbors, neighbor ids in range and participating at the
    /// layer, and edge symmetry.
    pub fn validate(&self, m: usize) -> std::result::Result<(), String> {
        let n = self.levels.len();
        if self.neighbors.len() != n {
            return Err(format!(
                "neighbors length {} != levels length {}",
                self.neighbors.len(),
                n
            ));
        }

        match self.entry_point {
            None => {
                if n > 0 {
                    return Err("non-empty graph without entry point".into());
                }
            }
            Some(ep) => {
                if (ep as usize) >= n {
                    return Err(format!("entry point {ep} out of range"));
                }
                if self.levels[ep as usize] != self.max_layer {
                    return Err(format!(
                        "entry point {} has level {} but max_layer is {}",
                        ep, self.levels[ep as usize], self.max_layer
                    ));
                }
            }
        }

        for id in 0..n {
            let level = self.levels[id];
            if level > self.max_layer {
                return Err(format!(
                    "node {id} level {level} exceeds max_layer {}",
                    self.max_layer
                ));
            }
            let lists = &self.neighbors[id];
            if lists.len() != level + 1 {
                return Err(format!(
                    "node {id} has {} layer lists for level {level}",
                    lists.len()
                ));
            }
            for (layer, list) in lists.iter().enumerate() {
                if list.len() > layer_capacity(m, layer) {
                    return Err(format!(
                        "node {id} layer {layer} degree {} exceeds cap {}",
                        list.len(),
                        layer_capacity(m, layer)
                    ));
                }
                for (i, &nb) in list.iter().enumerate() {
                    if nb as usize == id {
                        return Err(format!("node {id} has a self-loop at layer {layer}"));
                    }
                    if nb as usize >= n {
                        return Err(format!(
                            "node {id} layer {layer} references out-of-range id {nb}"
                        ));
                    }
                    if list[i + 1..].contains(&nb) {
                        return Err(format!(
                            "node {id} layer {layer} lists neighbor {nb} twice"
                        ));
                    }
                    if self.levels[nb as usize] < layer {
                        return Err(format!(
                            "node {id} layer {layer} references {nb} which tops out at layer {}",
                            self.levels[nb as usize]
                        ));
                    }
                    if !self.neighbors(nb, layer).contains(&(id as NodeId)) {
                        return Err(format!(
                            "asymmetric edge {id} -> {nb} at layer {layer}"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let p = HnswParams::default();
        assert_eq!(p.m, config::HNSW_DEFAULT_M);
        assert_eq!(p.ef_construction, config::HNSW_DEFAULT_EF_CONSTRUCTION);
        assert_eq!(p.selection, NeighborSelection::Simple);
        assert!((p.level_lambda - 1.0 / (10.0f64).ln()).abs() < 1e-12);
        assert!(!p.extend_candidates && !p.keep_pruned && !p.distance_cache);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_max_degree() {
        let p = HnswParams::new(4);
        assert_eq!(p.max_degree(0), 8);
        assert_eq!(p.max_degree(1), 4);
        assert_eq!(p.max_degree(5), 4);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        assert!(matches!(
            HnswParams::new(1).validate(),
            Err(HnswError::InvalidParameters(_))
        ));

        let mut p = HnswParams::default();
        p.ef_construction = 0;
        assert!(matches!(
            p.validate(),
            Err(HnswError::InvalidParameters(_))
        ));

        let mut p = HnswParams::default();
        p.level_lambda = -0.5;
        assert!(matches!(
            p.validate(),
            Err(HnswError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_params_serde_round_trip() {
        let p = HnswParams {
            selection: NeighborSelection::Heuristic,
            keep_pruned: true,
            ..HnswParams::new(6)
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: HnswParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.m, 6);
        assert_eq!(back.selection, NeighborSelection::Heuristic);
        assert!(back.keep_pruned);
    }

    #[test]
    fn test_push_node_and_link() {
        let mut g = HnswGraph::new();
        assert!(g.is_empty());
        assert_eq!(g.push_node(1), 0);
        assert_eq!(g.push_node(0), 1);
        g.set_entry_point(0, 1);

        g.link(0, 1, 0);
        assert_eq!(g.neighbors(0, 0), &[1]);
        assert_eq!(g.neighbors(1, 0), &[0]);
        // Linking twice is a no-op.
        g.link(0, 1, 0);
        assert_eq!(g.neighbors(0, 0), &[1]);
        // Layer above node 1's top layer reads as empty.
        assert_eq!(g.neighbors(1, 1), &[] as &[NodeId]);

        assert!(g.validate(2).is_ok());
    }

    #[test]
    fn test_unlink_and_replace() {
        let mut g = HnswGraph::new();
        g.push_node(0);
        g.push_node(0);
        g.push_node(0);
        g.set_entry_point(0, 0);
        g.link(0, 1, 0);
        g.link(0, 2, 0);

        g.unlink_from(0, 1, 0);
        assert_eq!(g.neighbors(0, 0), &[2]);

        g.replace_neighbors(2, 0, vec![]);
        assert_eq!(g.neighbors(2, 0), &[] as &[NodeId]);
        // Now 0 -> 2 has no reverse edge.
        let err = g.validate(2).unwrap_err();
        assert!(err.contains("asymmetric"), "{err}");
    }

    #[test]
    fn test_validate_catches_violations() {
        // Self-loop.
        let mut g = HnswGraph::new();
        g.push_node(0);
        g.set_entry_point(0, 0);
        g.replace_neighbors(0, 0, vec![0]);
        assert!(g.validate(2).unwrap_err().contains("self-loop"));

        // Degree overflow at layer 0 (cap 2*m = 4 for m = 2).
        let mut g = HnswGraph::new();
        for _ in 0..6 {
            g.push_node(0);
        }
        g.set_entry_point(0, 0);
        for other in 1..6 {
            g.link(0, other, 0);
        }
        assert!(g.validate(2).unwrap_err().contains("exceeds cap"));

        // Entry point must sit on the top layer.
        let mut g = HnswGraph::new();
        g.push_node(0);
        g.push_node(2);
        g.set_entry_point(0, 0);
        assert!(g.validate(2).unwrap_err().contains("exceeds max_layer"));
    }

    #[test]
    fn test_from_parts_entry_point_tie_break() {
        let levels = vec![1, 2, 2, 0];
        let neighbors = levels
            .iter()
            .map(|&l| vec![Vec::new(); l + 1])
            .collect::<Vec<_>>();
        let g = HnswGraph::from_parts(levels, neighbors);
        // Highest level is 2, first reached by id 1.
        assert_eq!(g.entry_point(), Some(1));
        assert_eq!(g.max_layer(), 2);
    }
}

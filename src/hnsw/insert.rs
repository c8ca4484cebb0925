//! Insertion protocol: level sampling, neighbor selection, and wiring a new
//! node into every layer it participates in.
//!
//! Inserting id `x` with sampled level `l`:
//!
//! 1. Greedily descend from the entry point to layer `l + 1`.
//! 2. For each layer from `min(l, top)` down to 0: beam-search the layer,
//!    select up to `m` neighbors from the beam, add bidirectional edges, and
//!    re-select the neighbor list of any node pushed over its degree cap.
//!    The selected neighbors seed the next layer's beam.
//! 3. If `l` tops the current entry layer, `x` becomes the entry point.
//!
//! Pruning replaces a node's list with a fresh selection over it and removes
//! the dropped reverse edges as well, so edge symmetry holds again by the
//! time the insertion returns.

use crate::hnsw::distance::{DistanceCache, PairMetric};
use crate::hnsw::graph::{HnswGraph, HnswParams, NeighborSelection, NodeId};
use crate::hnsw::search::{greedy_descent, order, search_layer};
use crate::hnsw::visited::VisitedSet;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Draw an insertion level from the geometric-like distribution
/// `floor(-ln(u) * lambda)` with `u` uniform in `(0, 1]`.
///
/// `Rng::gen` yields `[0, 1)`; mirroring it to `1 - u` keeps the draw away
/// from `ln(0)`.
pub(crate) fn sample_level<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> usize {
    let u: f64 = 1.0 - rng.gen::<f64>();
    (-u.ln() * lambda).floor() as usize
}

/// Paper Algorithm 3: the `m` candidates closest to the target, ties resolved
/// by ascending id.
pub(crate) fn select_neighbors_simple<D>(
    candidates: &[(D, NodeId)],
    m: usize,
) -> Vec<(D, NodeId)>
where
    D: PartialOrd + Copy,
{
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| order(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));
    sorted.truncate(m);
    sorted
}

/// Paper Algorithm 4: scan candidates by ascending distance to the target and
/// accept one only when it is strictly closer to the target than to every
/// already-accepted neighbor, which spreads the selection across directions.
///
/// `extend` widens the candidate set with the candidates' own layer-`layer`
/// neighbors first; `keep_pruned` backfills the closest rejected candidates
/// until `m` are selected.
#[allow(clippy::too_many_arguments)]
pub(crate) fn select_neighbors_heuristic<T, D, F>(
    graph: &HnswGraph,
    target: NodeId,
    candidates: &[(D, NodeId)],
    m: usize,
    layer: usize,
    extend: bool,
    keep_pruned: bool,
    metric: &PairMetric<'_, T, F>,
    cache: &mut DistanceCache<D>,
) -> Vec<(D, NodeId)>
where
    D: PartialOrd + Copy,
    F: Fn(&T, &T) -> D,
{
    let mut working = candidates.to_vec();
    if extend {
        let mut seen: HashSet<NodeId> = working.iter().map(|&(_, id)| id).collect();
        seen.insert(target);
        for &(_, id) in candidates {
            for &n in graph.neighbors(id, layer) {
                if seen.insert(n) {
                    working.push((metric.between(cache, n, target), n));
                }
            }
        }
    }
    working.sort_by(|a, b| order(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));

    let mut selected: Vec<(D, NodeId)> = Vec::with_capacity(m);
    let mut rejected: Vec<(D, NodeId)> = Vec::new();
    for &(dist_to_target, id) in &working {
        if selected.len() >= m {
            break;
        }
        let diverse = selected.iter().all(|&(_, sid)| {
            order(&dist_to_target, &metric.between(cache, id, sid)) == Ordering::Less
        });
        if diverse {
            selected.push((dist_to_target, id));
        } else {
            rejected.push((dist_to_target, id));
        }
    }

    if keep_pruned {
        // `rejected` inherits the ascending (distance, id) order of `working`.
        for &(d, id) in &rejected {
            if selected.len() >= m {
                break;
            }
            selected.push((d, id));
        }
    }
    selected
}

/// Run the configured selection strategy over `candidates` with target degree
/// `m`. `extend` is only meaningful for the heuristic.
#[allow(clippy::too_many_arguments)]
fn select_neighbors<T, D, F>(
    graph: &HnswGraph,
    target: NodeId,
    candidates: &[(D, NodeId)],
    m: usize,
    layer: usize,
    params: &HnswParams,
    extend: bool,
    metric: &PairMetric<'_, T, F>,
    cache: &mut DistanceCache<D>,
) -> Vec<(D, NodeId)>
where
    D: PartialOrd + Copy,
    F: Fn(&T, &T) -> D,
{
    match params.selection {
        NeighborSelection::Simple => select_neighbors_simple(candidates, m),
        NeighborSelection::Heuristic => select_neighbors_heuristic(
            graph,
            target,
            candidates,
            m,
            layer,
            extend,
            params.keep_pruned,
            metric,
            cache,
        ),
    }
}

/// Insert the item behind `new_id` at the pre-sampled `level`.
///
/// `new_id` must be the next dense id (`graph.node_count()` before the call)
/// and `items[new_id]` must already be present so distances to it resolve.
pub(crate) fn insert_node<T, D, F>(
    graph: &mut HnswGraph,
    items: &[T],
    distance: &F,
    params: &HnswParams,
    new_id: NodeId,
    level: usize,
) where
    D: PartialOrd + Copy,
    F: Fn(&T, &T) -> D,
{
    let pushed = graph.push_node(level);
    debug_assert_eq!(pushed, new_id, "node ids must be dense and in order");

    let Some(entry) = graph.entry_point() else {
        graph.set_entry_point(new_id, level);
        return;
    };
    let entry_level = graph.max_layer();

    let metric = PairMetric::new(items, distance);
    let mut cache = DistanceCache::new(params.distance_cache);
    let mut visited = VisitedSet::with_capacity(graph.node_count());

    // Cheap single-pointer descent through the layers above the new node.
    let ep = if entry_level > level {
        greedy_descent(&*graph, entry, entry_level, level, |n| {
            metric.between(&mut cache, n, new_id)
        })
    } else {
        entry
    };

    let mut seeds: Vec<NodeId> = vec![ep];
    let top = level.min(entry_level);
    for layer in (0..=top).rev() {
        let found = search_layer(
            &*graph,
            &seeds,
            params.ef_construction,
            layer,
            &mut visited,
            |n| metric.between(&mut cache, n, new_id),
        );
        let chosen = select_neighbors(
            &*graph,
            new_id,
            &found,
            params.m,
            layer,
            params,
            params.extend_candidates,
            &metric,
            &mut cache,
        );

        for &(_, n) in &chosen {
            graph.link(new_id, n, layer);
        }

        // Re-select any neighbor the new edges pushed over its cap. The
        // replacement list is drawn from the existing connections only, so
        // dropped edges just need their reverse side removed.
        let cap = params.max_degree(layer);
        for &(_, n) in &chosen {
            if graph.neighbors(n, layer).len() <= cap {
                continue;
            }
            let ranked: Vec<(D, NodeId)> = graph
                .neighbors(n, layer)
                .iter()
                .map(|&c| (metric.between(&mut cache, c, n), c))
                .collect();
            let kept = select_neighbors(
                &*graph,
                n,
                &ranked,
                cap,
                layer,
                params,
                false,
                &metric,
                &mut cache,
            );
            let kept_ids: Vec<NodeId> = kept.iter().map(|&(_, id)| id).collect();
            let dropped: Vec<NodeId> = graph
                .neighbors(n, layer)
                .iter()
                .copied()
                .filter(|c| !kept_ids.contains(c))
                .collect();
            graph.replace_neighbors(n, layer, kept_ids);
            for c in dropped {
                graph.unlink_from(c, n, layer);
            }
            debug_assert!(graph.neighbors(n, layer).len() <= cap);
        }

        seeds.clear();
        seeds.extend(chosen.iter().map(|&(_, id)| id));
    }

    if level > entry_level {
        graph.set_entry_point(new_id, level);
    }
}

//! Layer navigation: beam search (paper Algorithm 2) and greedy descent.
//!
//! Both routines take distances through an `FnMut(NodeId) -> D` closure so the
//! same code serves plain queries and construction-time searches that go
//! through the per-insert distance cache.
//!
//! The candidate set is tracked in two heaps over the same entries: a min-heap
//! of nodes still to expand and a max-heap of the best `ef` found so far.
//! Every ordering extends the distance order with an ascending-id tie-break,
//! which is what makes fixed-seed builds reproducible.

use crate::hnsw::graph::{HnswGraph, NodeId};
use crate::hnsw::visited::VisitedSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Total order over possibly-incomparable distances. Incomparable pairs
/// (e.g. NaN) collapse to `Equal` and fall through to the id tie-break.
#[inline]
pub(crate) fn order<D: PartialOrd>(a: &D, b: &D) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Min-heap entry: the nearest node (smallest id on ties) pops first.
#[derive(Debug, Clone, Copy)]
struct Candidate<D> {
    distance: D,
    id: NodeId,
}

impl<D: PartialOrd> PartialEq for Candidate<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: PartialOrd> Eq for Candidate<D> {}

impl<D: PartialOrd> Ord for Candidate<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap's max is the closest candidate.
        order(&other.distance, &self.distance).then_with(|| other.id.cmp(&self.id))
    }
}

impl<D: PartialOrd> PartialOrd for Candidate<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap entry: the farthest node (largest id on ties) pops first.
#[derive(Debug, Clone, Copy)]
struct Furthest<D> {
    distance: D,
    id: NodeId,
}

impl<D: PartialOrd> PartialEq for Furthest<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: PartialOrd> Eq for Furthest<D> {}

impl<D: PartialOrd> Ord for Furthest<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        order(&self.distance, &other.distance).then_with(|| self.id.cmp(&other.id))
    }
}

impl<D: PartialOrd> PartialOrd for Furthest<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Beam search at one layer. Returns the `ef` nodes closest to the query
/// reachable from `entries`, sorted ascending by distance (id on ties).
///
/// `visited` is per-call scratch and is reset on entry.
pub(crate) fn search_layer<D, DF>(
    graph: &HnswGraph,
    entries: &[NodeId],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
    mut dist_to_query: DF,
) -> Vec<(D, NodeId)>
where
    D: PartialOrd + Copy,
    DF: FnMut(NodeId) -> D,
{
    visited.reset();
    let mut candidates: BinaryHeap<Candidate<D>> = BinaryHeap::with_capacity(ef * 2);
    let mut best: BinaryHeap<Furthest<D>> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entries {
        if visited.mark(ep) {
            let d = dist_to_query(ep);
            candidates.push(Candidate { distance: d, id: ep });
            best.push(Furthest { distance: d, id: ep });
            if best.len() > ef {
                best.pop();
            }
        }
    }

    while let Some(Candidate { distance: c_dist, id: c }) = candidates.pop() {
        // The closest unexpanded node is already farther than the worst
        // result and the beam is full: nothing reachable can improve it.
        if best.len() >= ef {
            if let Some(worst) = best.peek() {
                if order(&c_dist, &worst.distance) == Ordering::Greater {
                    break;
                }
            }
        }

        for &n in graph.neighbors(c, layer) {
            if !visited.mark(n) {
                continue;
            }
            let d = dist_to_query(n);
            let admit = match best.peek() {
                Some(worst) => best.len() < ef || order(&d, &worst.distance) == Ordering::Less,
                None => true,
            };
            if admit {
                candidates.push(Candidate { distance: d, id: n });
                best.push(Furthest { distance: d, id: n });
                if best.len() > ef {
                    best.pop();
                }
            }
        }
    }

    best.into_sorted_vec()
        .into_iter()
        .map(|e| (e.distance, e.id))
        .collect()
}

/// Greedy descent from `start` through layers `from_layer` down to
/// `to_layer + 1`: at each layer, move to the neighbor strictly closest to
/// the query until no neighbor improves, then drop a layer. Returns the final
/// node, a good entry point for a finer search at `to_layer`.
pub(crate) fn greedy_descent<D, DF>(
    graph: &HnswGraph,
    start: NodeId,
    from_layer: usize,
    to_layer: usize,
    mut dist_to_query: DF,
) -> NodeId
where
    D: PartialOrd + Copy,
    DF: FnMut(NodeId) -> D,
{
    let mut current = start;
    let mut current_dist = dist_to_query(current);
    let mut layer = from_layer;
    while layer > to_layer {
        loop {
            let mut improved = false;
            for &n in graph.neighbors(current, layer) {
                let d = dist_to_query(n);
                if order(&d, &current_dist) == Ordering::Less {
                    current = n;
                    current_dist = d;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
        layer -= 1;
    }
    current
}

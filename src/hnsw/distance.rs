//! Pair-distance evaluation with an optional construction-time cache.
//!
//! During one insertion the same id pair can be measured several times: once
//! while the beam search ranks it, again inside the selection heuristic, and
//! again while pruning an over-full neighbor. [`PairMetric`] routes every
//! id-pair evaluation through [`DistanceCache`], which memoizes by unordered
//! pair so an enabled cache evaluates the caller's distance function at most
//! once per pair. The cache is created fresh for each insertion and dropped
//! with it, so it can never serve a stale value under the insert-only model.

use crate::hnsw::graph::NodeId;
use std::collections::HashMap;

/// Memoized distances keyed by unordered id pair. `None` entries map means
/// the cache is disabled and every request recomputes.
#[derive(Debug)]
pub(crate) struct DistanceCache<D> {
    entries: Option<HashMap<(NodeId, NodeId), D>>,
}

impl<D: Copy> DistanceCache<D> {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            entries: enabled.then(HashMap::new),
        }
    }

    #[inline]
    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn lookup(&self, a: NodeId, b: NodeId) -> Option<D> {
        self.entries.as_ref()?.get(&Self::key(a, b)).copied()
    }

    fn store(&mut self, a: NodeId, b: NodeId, distance: D) {
        if let Some(map) = self.entries.as_mut() {
            map.insert(Self::key(a, b), distance);
        }
    }
}

/// Bundles the item sequence, the caller's distance function, and one
/// insertion's [`DistanceCache`] behind a single id-pair evaluator.
pub(crate) struct PairMetric<'a, T, F> {
    items: &'a [T],
    distance: &'a F,
}

impl<'a, T, F> PairMetric<'a, T, F> {
    pub(crate) fn new(items: &'a [T], distance: &'a F) -> Self {
        Self { items, distance }
    }

    /// Distance between the items behind two ids, memoized when the cache is
    /// enabled.
    pub(crate) fn between<D: Copy>(
        &self,
        cache: &mut DistanceCache<D>,
        a: NodeId,
        b: NodeId,
    ) -> D
    where
        F: Fn(&T, &T) -> D,
    {
        if let Some(d) = cache.lookup(a, b) {
            return d;
        }
        let d = (self.distance)(&self.items[a as usize], &self.items[b as usize]);
        cache.store(a, b, d);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_distance(counter: &Cell<usize>) -> impl Fn(&i64, &i64) -> i64 + '_ {
        move |a, b| {
            counter.set(counter.get() + 1);
            (a - b).abs()
        }
    }

    #[test]
    fn test_enabled_cache_evaluates_each_pair_once() {
        let items: Vec<i64> = vec![10, 20, 35];
        let calls = Cell::new(0);
        let distance = counting_distance(&calls);
        let metric = PairMetric::new(&items, &distance);
        let mut cache = DistanceCache::new(true);

        assert_eq!(metric.between(&mut cache, 0, 1), 10);
        assert_eq!(metric.between(&mut cache, 1, 0), 10);
        assert_eq!(metric.between(&mut cache, 0, 1), 10);
        assert_eq!(calls.get(), 1);

        assert_eq!(metric.between(&mut cache, 1, 2), 15);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_disabled_cache_recomputes() {
        let items: Vec<i64> = vec![1, 4];
        let calls = Cell::new(0);
        let distance = counting_distance(&calls);
        let metric = PairMetric::new(&items, &distance);
        let mut cache = DistanceCache::new(false);

        metric.between(&mut cache, 0, 1);
        metric.between(&mut cache, 0, 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unordered_key() {
        assert_eq!(DistanceCache::<i64>::key(5, 2), (2, 5));
        assert_eq!(DistanceCache::<i64>::key(2, 5), (2, 5));
        assert_eq!(DistanceCache::<i64>::key(3, 3), (3, 3));
    }
}

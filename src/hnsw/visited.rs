//! Generation-stamped visited set for graph traversal.
//!
//! Replaces a `HashSet<NodeId>` with O(1) array indexing. `reset()` bumps an
//! epoch counter instead of zeroing the array, so the set can be reused across
//! every layer of a search without paying a memset each time.

use crate::hnsw::graph::NodeId;

/// Visited marker array. A slot counts as marked when it carries the current
/// epoch; a full re-zero only happens once every `u32::MAX - 1` resets.
#[derive(Debug)]
pub(crate) struct VisitedSet {
    stamp: Vec<u32>,
    epoch: u32,
}

impl VisitedSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            stamp: vec![0; capacity],
            epoch: 1,
        }
    }

    /// Forget all marks. O(1) except when the epoch counter wraps.
    pub(crate) fn reset(&mut self) {
        if self.epoch == u32::MAX {
            self.stamp.fill(0);
            self.epoch = 1;
        } else {
            self.epoch += 1;
        }
    }

    /// Mark `id`, returning `true` if it was not already marked this epoch.
    #[inline]
    pub(crate) fn mark(&mut self, id: NodeId) -> bool {
        let slot = &mut self.stamp[id as usize];
        if *slot == self.epoch {
            false
        } else {
            *slot = self.epoch;
            true
        }
    }
}

//! # Distributed GC Synchronizer
//!
//! Tracks which remote ids are still referenced by live proxies on this
//! side. There is no cross-context finalizer hook, so reconciliation is an
//! explicit sweep: `sync_gc` on the store walks this table and tells the
//! peer which ids nothing local points at anymore.
//!
//! The sweep is idempotent (a released id is remembered as released) and
//! never reports an id that an in-flight request still targets. Delivery is
//! best effort; a lost release costs the peer some memory, never
//! correctness.

use dashmap::DashMap;

#[derive(Default)]
struct RefState {
    /// Live proxy handles for this id on this side.
    live: usize,
    /// Already reported to the peer; cleared if the id is retained again.
    released: bool,
}

pub(crate) struct GcTable {
    refs: DashMap<String, RefState>,
}

impl GcTable {
    pub fn new() -> Self {
        Self {
            refs: DashMap::new(),
        }
    }

    /// Records a new proxy handle for `id`.
    pub fn retain(&self, id: &str) {
        let mut state = self.refs.entry(id.to_string()).or_default();
        state.live += 1;
        state.released = false;
    }

    /// Records that a proxy handle for `id` was dropped.
    pub fn release(&self, id: &str) {
        if let Some(mut state) = self.refs.get_mut(id) {
            state.live = state.live.saturating_sub(1);
        }
    }

    /// Collects the ids that are dead locally, not yet reported, and not
    /// pinned by an outstanding request. Marks them as released so a
    /// redundant sweep reports nothing new.
    pub fn sweep(&self, pinned: impl Fn(&str) -> bool) -> Vec<String> {
        let candidates: Vec<String> = self
            .refs
            .iter()
            .filter(|entry| entry.value().live == 0 && !entry.value().released)
            .map(|entry| entry.key().clone())
            .collect();

        let mut releasable = Vec::new();
        for id in candidates {
            if pinned(&id) {
                continue;
            }
            if let Some(mut state) = self.refs.get_mut(&id) {
                // Re-check under the entry lock; a proxy may have appeared.
                if state.live == 0 && !state.released {
                    state.released = true;
                    releasable.push(id);
                }
            }
        }
        releasable
    }

    #[cfg(test)]
    pub fn live_count(&self, id: &str) -> usize {
        self.refs.get(id).map(|state| state.live).unwrap_or(0)
    }
}

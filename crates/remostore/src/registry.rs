//! # Local Registry
//!
//! The answering side of the protocol: string ids mapped to locally exposed
//! values. Ids are scoped to one store; re-exposing an id replaces the prior
//! registration silently (the documented policy, not an accident).

use std::sync::Arc;

use dashmap::DashMap;

use crate::object::Remotable;

struct Entry {
    value: Arc<dyn Remotable>,
    /// Auto-created for callback arguments and object-valued results.
    /// Only these may be evicted by a peer GC release.
    ephemeral: bool,
}

pub(crate) struct Registry {
    entries: DashMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers `value` under `id`, replacing any prior registration.
    pub fn expose(&self, id: String, value: Arc<dyn Remotable>) {
        self.entries.insert(
            id,
            Entry {
                value,
                ephemeral: false,
            },
        );
    }

    /// Registers an auto-generated exposure for a value crossing the wire.
    pub fn expose_ephemeral(&self, id: String, value: Arc<dyn Remotable>) {
        self.entries.insert(
            id,
            Entry {
                value,
                ephemeral: true,
            },
        );
    }

    /// Looks up the value behind an incoming call's target id.
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn Remotable>> {
        self.entries.get(id).map(|entry| entry.value.clone())
    }

    /// Removes a mapping; later calls for `id` fail with a not-found error.
    pub fn delete(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Handles a peer GC release: evicts the entry only if it was ephemeral.
    /// A named exposure stays reachable for later lookups.
    pub fn release_ephemeral(&self, id: &str) -> bool {
        self.entries
            .remove_if(id, |_, entry| entry.ephemeral)
            .is_some()
    }

    /// Drops every entry. Called on store close; the peer is assumed gone,
    /// so nothing is notified.
    pub fn unwind_all(&self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

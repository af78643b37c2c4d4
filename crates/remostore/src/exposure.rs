//! # Exposure Snapshot
//!
//! Stores are single-use: when a channel reloads, the owner closes the old
//! store, builds a fresh one on the new transport, and must re-expose
//! everything it had shared. An [`ExposureSet`] is that replayable snapshot,
//! kept by the host alongside (not inside) its store.

use std::sync::Arc;

use crate::object::Remotable;
use crate::store::ObjectStore;

/// An ordered, replayable set of exposures.
pub struct ExposureSet {
    entries: Vec<(String, Arc<dyn Remotable>)>,
}

impl ExposureSet {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records an exposure, replacing any prior entry with the same id.
    pub fn insert(&mut self, id: impl Into<String>, value: Arc<dyn Remotable>) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    /// Drops an entry. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != id);
        self.entries.len() != before
    }

    /// Replays every exposure into a store, in insertion order.
    pub fn apply(&self, store: &ObjectStore) {
        for (id, value) in &self.entries {
            store.expose_remote_object(id.clone(), value.clone());
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExposureSet {
    fn default() -> Self {
        Self::new()
    }
}

//! # Request/Response Correlator
//!
//! Assigns correlation ids to outbound calls, parks the callers on oneshot
//! channels, and settles them when the matching response arrives, when the
//! timeout fires, or when the channel dies.
//!
//! ## Invariants
//! - A correlation id is never reused while its request is outstanding
//!   (monotonic counter, per store).
//! - Every pending entry is settled exactly once: response, timeout,
//!   disconnect, or close. No caller is left parked forever.
//! - Correlation is solely by id; responses may arrive in any order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use remowire::{WireError, WireValue};
use tokio::sync::oneshot;

use crate::error::Error;

struct Pending {
    /// Target id of the outstanding request; the GC sweep uses this to keep
    /// an id alive while a call still points at it.
    target: String,
    tx: oneshot::Sender<Result<WireValue, Error>>,
}

pub(crate) struct Correlator {
    pending: DashMap<u64, Pending>,
    next_id: AtomicU64,
    timeout: Duration,
    max_pending: Option<usize>,
}

impl Correlator {
    pub fn new(timeout: Duration, max_pending: Option<usize>) -> Self {
        Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            timeout,
            max_pending,
        }
    }

    /// Reserves a correlation id and parks a receiver for the response.
    ///
    /// Fails fast with `Saturated` when the configured bound on outstanding
    /// requests is reached; nothing is sent in that case.
    pub fn prepare(
        &self,
        target: &str,
    ) -> Result<(u64, oneshot::Receiver<Result<WireValue, Error>>), Error> {
        if let Some(limit) = self.max_pending {
            if self.pending.len() >= limit {
                return Err(Error::Saturated(limit));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            Pending {
                target: target.to_string(),
                tx,
            },
        );
        Ok((id, rx))
    }

    /// Drops a reservation whose request never made it onto the wire.
    pub fn abandon(&self, id: u64) {
        self.pending.remove(&id);
    }

    /// Awaits the response for `id` under the per-store timeout.
    pub async fn wait(
        &self,
        id: u64,
        rx: oneshot::Receiver<Result<WireValue, Error>>,
    ) -> Result<WireValue, Error> {
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(settled)) => settled,
            Ok(Err(_)) => {
                // Sender dropped without settling: the store went away.
                self.pending.remove(&id);
                Err(Error::Closed)
            }
            Err(_) => {
                self.pending.remove(&id);
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    /// Settles the pending request matching an incoming response.
    ///
    /// A response for an id that already timed out (or was never issued) is
    /// dropped; later unrelated calls are unaffected.
    pub fn complete(&self, id: u64, outcome: Result<WireValue, WireError>) {
        let Some((_, pending)) = self.pending.remove(&id) else {
            tracing::debug!(correlation = id, "dropping late or unknown response");
            return;
        };
        let settled = outcome.map_err(Error::from_wire);
        // The caller may have given up in the meantime; that is fine.
        let _ = pending.tx.send(settled);
    }

    /// Rejects every still-pending request. Runs on disconnect and close,
    /// before any reconnection logic builds a replacement store.
    pub fn fail_all(&self, error: Error) {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                let _ = pending.tx.send(Err(error.clone()));
            }
        }
    }

    /// Whether any outstanding request still targets `id`.
    pub fn has_pending_target(&self, id: &str) -> bool {
        self.pending.iter().any(|entry| entry.value().target == id)
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

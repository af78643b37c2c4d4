//! # Object Store
//!
//! The per-channel facade composing the registry, the correlator, the proxy
//! factory, and the GC synchronizer over one transport.
//!
//! ## Architecture
//!
//! Opening a store spawns a pump task that owns the receive side of the
//! transport and demultiplexes every inbound frame: responses settle pending
//! requests, incoming calls are dispatched on their own tasks (a handler may
//! itself call back across the channel, so the pump must never wait on user
//! code), and handshake traffic drives the state machine.
//!
//! ## State Machine
//!
//! `Connecting -> Open -> Closed`, strictly forward. Exposing works from the
//! start; proxy round trips wait for `Open`. A closed store rejects
//! everything and is never reused. Reload paths build a fresh store and
//! replay their exposures (see [`crate::exposure::ExposureSet`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use remowire::{Frame, WireError, WireValue};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::correlator::Correlator;
use crate::error::{Error, Result};
use crate::gc::GcTable;
use crate::object::{Descriptor, Remotable, RemoteValue, Reply};
use crate::proxy::{CallArg, RemoteObject};
use crate::registry::Registry;
use crate::transport::Transport;

/// Lifecycle of a store.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Transport handshake not yet confirmed. Exposing works; round trips
    /// wait.
    Connecting,
    /// Normal operation.
    Open,
    /// Torn down, locally or by the transport. Terminal.
    Closed,
}

/// Configuration for a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Window after which a request rejects with a timeout error.
    pub timeout: Duration,
    /// Optional bound on concurrently outstanding requests. `None` leaves
    /// them unbounded; `Some(n)` fails the excess call locally without
    /// touching the wire contract.
    pub max_pending: Option<usize>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_pending: None,
        }
    }
}

impl StoreOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }
}

/// State shared between the facade, its proxies, and the pump task.
pub(crate) struct StoreShared {
    transport: Arc<dyn Transport>,
    pub(crate) registry: Registry,
    pub(crate) correlator: Correlator,
    pub(crate) gc: GcTable,
    state: watch::Sender<State>,
    next_ephemeral: AtomicU64,
    timeout: Duration,
}

impl StoreShared {
    pub(crate) fn state(&self) -> State {
        *self.state.borrow()
    }

    fn set_open(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, State::Connecting) {
                *state = State::Open;
                true
            } else {
                false
            }
        });
    }

    /// Moves to `Closed` exactly once: fails every pending request with
    /// `reason` and unwinds the registry. Redundant calls are no-ops.
    fn shutdown(&self, reason: Error) {
        let transitioned = self.state.send_if_modified(|state| {
            if matches!(state, State::Closed) {
                false
            } else {
                *state = State::Closed;
                true
            }
        });
        if !transitioned {
            return;
        }
        self.correlator.fail_all(reason);
        self.registry.unwind_all();
    }

    async fn wait_open(&self) -> Result<()> {
        let mut rx = self.state.subscribe();
        loop {
            match *rx.borrow_and_update() {
                State::Open => return Ok(()),
                State::Closed => return Err(Error::Closed),
                State::Connecting => {}
            }
            if rx.changed().await.is_err() {
                return Err(Error::Closed);
            }
        }
    }

    async fn send_frame(&self, frame: &Frame) -> Result<()> {
        if matches!(self.state(), State::Closed) {
            return Err(Error::Closed);
        }
        let message = remowire::encode(frame)?;
        self.transport.send(message).await?;
        Ok(())
    }

    fn expose_ephemeral(&self, value: Arc<dyn Remotable>) -> String {
        let id = format!("#eph-{}", self.next_ephemeral.fetch_add(1, Ordering::Relaxed));
        self.registry.expose_ephemeral(id.clone(), value);
        id
    }

    pub(crate) fn gc_retain(&self, id: &str) {
        self.gc.retain(id);
    }

    pub(crate) fn gc_release(&self, id: &str) {
        self.gc.release(id);
    }

    /// Replaces outbound arguments with wire values, exposing object
    /// arguments under ephemeral ids so the peer can call back into them.
    fn lower_args(&self, args: Vec<CallArg>) -> Vec<WireValue> {
        args.into_iter()
            .map(|arg| match arg {
                CallArg::Plain(value) => WireValue::plain(value),
                CallArg::Object(object) => WireValue::reference(self.expose_ephemeral(object)),
            })
            .collect()
    }

    /// Turns a result wire value into what the caller sees. References
    /// become fresh proxies onto the peer.
    fn lift(self: &Arc<Self>, value: WireValue) -> Result<RemoteValue> {
        match value {
            WireValue::Plain { data } => Ok(RemoteValue::Plain(data)),
            WireValue::Ref { id } => Ok(RemoteValue::Remote(RemoteObject::new(
                self.clone(),
                id,
                None,
            ))),
            WireValue::Descriptor { .. } => {
                Err(Error::Protocol("descriptor outside a describe response".into()))
            }
        }
    }

    pub(crate) async fn call_remote(
        self: &Arc<Self>,
        target: &str,
        path: Vec<String>,
        args: Vec<CallArg>,
    ) -> Result<RemoteValue> {
        tokio::time::timeout(self.timeout, self.wait_open())
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let args = self.lower_args(args);
        let (id, rx) = self.correlator.prepare(target)?;
        let frame = Frame::Call {
            id,
            target: target.to_string(),
            path,
            args,
        };
        if let Err(e) = self.send_frame(&frame).await {
            self.correlator.abandon(id);
            return Err(e);
        }
        let value = self.correlator.wait(id, rx).await?;
        self.lift(value)
    }

    pub(crate) async fn describe_remote(self: &Arc<Self>, target: &str) -> Result<Descriptor> {
        tokio::time::timeout(self.timeout, self.wait_open())
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let (id, rx) = self.correlator.prepare(target)?;
        let frame = Frame::Describe {
            id,
            target: target.to_string(),
        };
        if let Err(e) = self.send_frame(&frame).await {
            self.correlator.abandon(id);
            return Err(e);
        }
        match self.correlator.wait(id, rx).await? {
            WireValue::Descriptor { keys, callable } => Ok(Descriptor { keys, callable }),
            _ => Err(Error::Protocol("describe response was not a descriptor".into())),
        }
    }
}

/// One side of a remote-object channel.
///
/// Stores are single-use: once closed (explicitly or by the transport) every
/// operation rejects, and a replacement must be built on a fresh transport.
pub struct ObjectStore {
    shared: Arc<StoreShared>,
    pump: JoinHandle<()>,
}

impl ObjectStore {
    /// Builds the store, spawns its pump, and announces itself to the peer.
    ///
    /// Returns immediately; the store is `Connecting` until the peer's
    /// handshake traffic arrives.
    pub fn open(transport: Arc<dyn Transport>, options: StoreOptions) -> Self {
        let (state, _) = watch::channel(State::Connecting);
        let shared = Arc::new(StoreShared {
            transport,
            registry: Registry::new(),
            correlator: Correlator::new(options.timeout, options.max_pending),
            gc: GcTable::new(),
            state,
            next_ephemeral: AtomicU64::new(1),
            timeout: options.timeout,
        });

        let pump = tokio::spawn(pump(shared.clone()));

        let greeter = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = greeter.send_frame(&Frame::Handshake).await {
                tracing::debug!(error = %e, "handshake could not be sent");
            }
        });

        Self { shared, pump }
    }

    /// Stores an object or function for the peer to use.
    ///
    /// Re-exposing an id replaces the prior value silently. Works while
    /// `Connecting`; a no-op on a closed store.
    pub fn expose_remote_object(&self, id: impl Into<String>, value: Arc<dyn Remotable>) {
        if matches!(self.shared.state(), State::Closed) {
            return;
        }
        self.shared.registry.expose(id.into(), value);
    }

    /// Withdraws an exposed id; subsequent peer calls for it fail as not
    /// found. Returns whether the id was exposed.
    pub fn delete_remote_object(&self, id: &str) -> bool {
        self.shared.registry.delete(id)
    }

    /// Returns a lazy proxy for `id` without any round trip.
    ///
    /// Always succeeds locally, even if the peer never exposed `id`; the
    /// mismatch surfaces on the first invocation. The proxy carries no
    /// structural knowledge; use [`Self::request_remote_object`] when
    /// `has`/`keys` answers are needed.
    pub fn get_remote_object(&self, id: impl Into<String>) -> RemoteObject {
        RemoteObject::new(self.shared.clone(), id.into(), None)
    }

    /// Fetches the structural descriptor of `id` eagerly and returns a proxy
    /// that can answer `has`/`keys`/`is_callable` locally.
    ///
    /// Fails fast with a not-found error when the peer does not expose `id`.
    pub async fn request_remote_object(&self, id: impl Into<String>) -> Result<RemoteObject> {
        let id = id.into();
        let descriptor = self.shared.describe_remote(&id).await?;
        Ok(RemoteObject::new(self.shared.clone(), id, Some(descriptor)))
    }

    /// Reconciles distributed object lifetimes: tells the peer which remote
    /// ids have no surviving local proxy.
    ///
    /// Safe to call redundantly. An id targeted by an in-flight request is
    /// never released. Delivery is best effort; failures are logged and
    /// swallowed.
    pub async fn sync_gc(&self) {
        let releasable = self
            .shared
            .gc
            .sweep(|id| self.shared.correlator.has_pending_target(id));
        for target in releasable {
            let frame = Frame::GcRelease {
                target: target.clone(),
            };
            if let Err(e) = self.shared.send_frame(&frame).await {
                tracing::debug!(%target, error = %e, "gc release not delivered");
            }
        }
    }

    /// Tears the store down: every pending request rejects as disconnected,
    /// exposed ids become unreachable, and the pump stops. Idempotent.
    pub fn close(&self) {
        self.shared.shutdown(Error::Disconnected);
        self.pump.abort();
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }
}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        self.shared.shutdown(Error::Disconnected);
        self.pump.abort();
    }
}

/// Receive loop: demultiplexes inbound frames until the transport ends.
async fn pump(shared: Arc<StoreShared>) {
    let reason = loop {
        match shared.transport.recv().await {
            Ok(Some(message)) => match remowire::decode(message) {
                Ok(frame) => handle_frame(&shared, frame).await,
                Err(e) => tracing::warn!(error = %e, "dropping undecodable message"),
            },
            Ok(None) => break Error::Disconnected,
            Err(e) => break Error::Transport(e),
        }
    };
    shared.shutdown(reason);
}

async fn handle_frame(shared: &Arc<StoreShared>, frame: Frame) {
    match frame {
        Frame::Handshake => {
            shared.set_open();
            if let Err(e) = shared.send_frame(&Frame::Done).await {
                tracing::debug!(error = %e, "handshake ack not delivered");
            }
        }
        Frame::Done => shared.set_open(),
        Frame::Response { id, body } => shared.correlator.complete(id, body.into_result()),
        Frame::Call {
            id,
            target,
            path,
            args,
        } => {
            // Handlers may call back across the channel; never run them on
            // the pump.
            let shared = shared.clone();
            tokio::spawn(async move {
                dispatch_call(shared, id, target, path, args).await;
            });
        }
        Frame::Describe { id, target } => dispatch_describe(shared, id, target).await,
        Frame::GcRelease { target } => {
            if shared.registry.release_ephemeral(&target) {
                tracing::debug!(%target, "released ephemeral exposure");
            }
        }
    }
}

/// Turns incoming wire arguments into handler values. References become
/// proxies so callback arguments are live.
fn lift_incoming(
    shared: &Arc<StoreShared>,
    value: WireValue,
) -> std::result::Result<RemoteValue, WireError> {
    match value {
        WireValue::Plain { data } => Ok(RemoteValue::Plain(data)),
        WireValue::Ref { id } => Ok(RemoteValue::Remote(RemoteObject::new(
            shared.clone(),
            id,
            None,
        ))),
        WireValue::Descriptor { .. } => Err(WireError::other("descriptor is not a valid argument")),
    }
}

async fn dispatch_call(
    shared: Arc<StoreShared>,
    id: u64,
    target: String,
    path: Vec<String>,
    args: Vec<WireValue>,
) {
    let body = match shared.registry.resolve(&target) {
        None => Err(WireError::not_found(&target)),
        Some(value) => {
            let args: std::result::Result<Vec<RemoteValue>, WireError> = args
                .into_iter()
                .map(|arg| lift_incoming(&shared, arg))
                .collect();
            match args {
                Err(error) => Err(error),
                Ok(args) => match value.invoke(&path, args).await {
                    Ok(Reply::Value(data)) => Ok(WireValue::plain(data)),
                    Ok(Reply::Object(object)) => {
                        Ok(WireValue::reference(shared.expose_ephemeral(object)))
                    }
                    Err(thrown) => Err(WireError::throw(thrown.message())),
                },
            }
        }
    };
    respond(&shared, id, body).await;
}

async fn dispatch_describe(shared: &Arc<StoreShared>, id: u64, target: String) {
    let body = match shared.registry.resolve(&target) {
        None => Err(WireError::not_found(&target)),
        Some(value) => {
            let descriptor = value.describe();
            Ok(WireValue::Descriptor {
                keys: descriptor.keys,
                callable: descriptor.callable,
            })
        }
    };
    respond(shared, id, body).await;
}

/// Exactly one response per call or describe.
async fn respond(
    shared: &Arc<StoreShared>,
    id: u64,
    body: std::result::Result<WireValue, WireError>,
) {
    let frame = match body {
        Ok(value) => Frame::response_ok(id, value),
        Err(error) => Frame::response_err(id, error),
    };
    if let Err(e) = shared.send_frame(&frame).await {
        tracing::debug!(correlation = id, error = %e, "response not delivered");
    }
}

//! # Remote Proxies
//!
//! Local stand-ins for objects living on the other side of the channel.
//!
//! ## Philosophy
//!
//! - **Lazy Creation**: Building a proxy is local and infallible, even for an
//!   id the peer never exposed. The mismatch surfaces asynchronously on the
//!   first real invocation.
//! - **Everything Round-Trips**: There is no local cache of remote state;
//!   every invocation and property read crosses the wire. Structural queries
//!   (`has`, `keys`) are only answered by proxies built through the eager
//!   [`crate::store::ObjectStore::request_remote_object`] path, which fetched
//!   a descriptor up front.
//! - **Counted**: Each proxy handle participates in distributed GC; dropping
//!   the last handle for an id makes it releasable by the next sweep.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::object::{Descriptor, Remotable, RemoteValue};
use crate::store::StoreShared;

/// An outbound call argument.
pub enum CallArg {
    /// Plain structured data, passed by copy.
    Plain(Value),
    /// A local object passed by reference: it is exposed under an ephemeral
    /// id so the peer can call back into it.
    Object(Arc<dyn Remotable>),
}

impl CallArg {
    pub fn object(value: impl Remotable) -> Self {
        Self::Object(Arc::new(value))
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

pub(crate) struct ProxyInner {
    target: String,
    descriptor: Option<Descriptor>,
    shared: Arc<StoreShared>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        self.shared.gc_release(&self.target);
    }
}

/// A handle to a remote object.
///
/// Cloning is cheap and aliases the same logical reference; the reference is
/// considered live as long as any clone survives.
#[derive(Clone)]
pub struct RemoteObject {
    inner: Arc<ProxyInner>,
}

impl RemoteObject {
    pub(crate) fn new(
        shared: Arc<StoreShared>,
        target: String,
        descriptor: Option<Descriptor>,
    ) -> Self {
        shared.gc_retain(&target);
        Self {
            inner: Arc::new(ProxyInner {
                target,
                descriptor,
                shared,
            }),
        }
    }

    /// The id this proxy points at on the peer.
    pub fn id(&self) -> &str {
        &self.inner.target
    }

    /// The structural descriptor, if this proxy was requested eagerly.
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.inner.descriptor.as_ref()
    }

    /// Whether the remote object has a member named `key`.
    /// `None` for lazy proxies, which carry no structural knowledge.
    pub fn has(&self, key: &str) -> Option<bool> {
        self.descriptor()
            .map(|descriptor| descriptor.keys.iter().any(|k| k == key))
    }

    /// The remote object's member names, if known.
    pub fn keys(&self) -> Option<&[String]> {
        self.descriptor().map(|descriptor| descriptor.keys.as_slice())
    }

    /// Whether the remote value itself is callable, if known.
    pub fn is_callable(&self) -> Option<bool> {
        self.descriptor().map(|descriptor| descriptor.callable)
    }

    /// Invokes the remote value itself (a bare exposed function).
    pub async fn call(&self, args: Vec<CallArg>) -> Result<RemoteValue> {
        self.inner
            .shared
            .call_remote(&self.inner.target, Vec::new(), args)
            .await
    }

    /// Invokes a member of the remote object.
    pub async fn invoke(&self, member: &str, args: Vec<CallArg>) -> Result<RemoteValue> {
        self.inner
            .shared
            .call_remote(&self.inner.target, vec![member.to_string()], args)
            .await
    }

    /// Invokes a nested member path in a single round trip.
    pub async fn invoke_path(&self, path: &[&str], args: Vec<CallArg>) -> Result<RemoteValue> {
        let path = path.iter().map(|segment| segment.to_string()).collect();
        self.inner
            .shared
            .call_remote(&self.inner.target, path, args)
            .await
    }

    /// Reads a property: an invocation with no arguments. Object-valued
    /// properties come back as nested proxies.
    pub async fn get(&self, member: &str) -> Result<RemoteValue> {
        self.invoke(member, Vec::new()).await
    }
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject")
            .field("target", &self.inner.target)
            .field("eager", &self.inner.descriptor.is_some())
            .finish()
    }
}

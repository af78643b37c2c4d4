//! # Remotable Values
//!
//! The contract for values that can be exposed through a store, and a
//! dynamic builder for the common "JSON plus functions" shape.
//!
//! Rust has no property traps, so exposure is explicit: a [`Remotable`]
//! answers `invoke(path, args)` for any member path and can describe its own
//! structure. [`DynObject`] covers plain data members, sync and async
//! methods, nested objects, and bare functions without hand-writing the
//! trait.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::proxy::RemoteObject;

/// A failure raised by an exposed handler.
///
/// Only the message crosses the channel; the caller receives a
/// reconstructed error, never a live exception object.
#[derive(Debug, Clone)]
pub struct ThrownError(String);

impl ThrownError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThrownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ThrownError {}

impl From<String> for ThrownError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ThrownError {
    fn from(message: &str) -> Self {
        Self(message.into())
    }
}

/// What an invocation hands back to the store.
pub enum Reply {
    /// Plain data, passed to the caller by copy.
    Value(Value),
    /// An object, auto-exposed under an ephemeral id and passed by reference.
    Object(Arc<dyn Remotable>),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Object(_) => f.debug_tuple("Object").field(&"<dyn Remotable>").finish(),
        }
    }
}

/// An argument or result as seen by local code.
#[derive(Clone)]
pub enum RemoteValue {
    /// Plain structured data.
    Plain(Value),
    /// A live proxy for an object owned by the peer (callback arguments,
    /// object-valued results).
    Remote(RemoteObject),
}

impl RemoteValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Plain(value) => Some(value),
            Self::Remote(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    pub fn as_remote(&self) -> Option<&RemoteObject> {
        match self {
            Self::Plain(_) => None,
            Self::Remote(proxy) => Some(proxy),
        }
    }

    pub fn into_remote(self) -> Option<RemoteObject> {
        match self {
            Self::Plain(_) => None,
            Self::Remote(proxy) => Some(proxy),
        }
    }
}

impl std::fmt::Debug for RemoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(value) => write!(f, "Plain({})", value),
            Self::Remote(proxy) => write!(f, "Remote({})", proxy.id()),
        }
    }
}

/// The structural description of an exposed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Member names, sorted.
    pub keys: Vec<String>,
    /// Whether the value itself can be invoked with an empty path.
    pub callable: bool,
}

pub type InvokeResult = std::result::Result<Reply, ThrownError>;

/// A value that can be exposed to the peer.
#[async_trait::async_trait]
pub trait Remotable: Send + Sync + 'static {
    /// Invokes the member at `path` (empty = the value itself).
    ///
    /// A property read arrives as an invocation with empty `args`; the
    /// implementation decides whether that returns data, an object
    /// reference, or a throw.
    async fn invoke(&self, path: &[String], args: Vec<RemoteValue>) -> InvokeResult;

    /// Describes the member names and callable-ness of this value.
    fn describe(&self) -> Descriptor;
}

type SyncHandler = Box<dyn Fn(Vec<RemoteValue>) -> InvokeResult + Send + Sync>;

/// The future an async handler hands back: `Box::pin(async move { ... })`.
pub type BoxedInvoke = Pin<Box<dyn Future<Output = InvokeResult> + Send + 'static>>;

type AsyncHandler = Box<dyn Fn(Vec<RemoteValue>) -> BoxedInvoke + Send + Sync>;

enum Member {
    Value(Value),
    Method(SyncHandler),
    MethodAsync(AsyncHandler),
    Object(Arc<dyn Remotable>),
}

/// A dynamically assembled remotable value.
///
/// ```ignore
/// let math = DynObject::new()
///     .value("version", json!(1))
///     .method("add", |args| {
///         let a = args[0].as_f64().ok_or_else(|| ThrownError::new("add: not a number"))?;
///         let b = args[1].as_f64().ok_or_else(|| ThrownError::new("add: not a number"))?;
///         Ok(Reply::Value(json!(a + b)))
///     });
/// store.expose_remote_object("math", Arc::new(math));
/// ```
pub struct DynObject {
    members: HashMap<String, Member>,
    call: Option<SyncHandler>,
}

impl DynObject {
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
            call: None,
        }
    }

    /// A bare function: invoking the exposed id itself runs the handler.
    pub fn function<F>(handler: F) -> Self
    where
        F: Fn(Vec<RemoteValue>) -> InvokeResult + Send + Sync + 'static,
    {
        Self {
            members: HashMap::new(),
            call: Some(Box::new(handler)),
        }
    }

    /// Adds a plain data member.
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.members.insert(name.into(), Member::Value(value));
        self
    }

    /// Adds a synchronous method.
    pub fn method<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<RemoteValue>) -> InvokeResult + Send + Sync + 'static,
    {
        self.members
            .insert(name.into(), Member::Method(Box::new(handler)));
        self
    }

    /// Adds an asynchronous method.
    ///
    /// The handler returns a boxed future:
    /// `|args| Box::pin(async move { ... })`.
    pub fn method_async<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<RemoteValue>) -> BoxedInvoke + Send + Sync + 'static,
    {
        self.members
            .insert(name.into(), Member::MethodAsync(Box::new(handler)));
        self
    }

    /// Adds a nested object member. Reading the member returns a reference,
    /// not a copy; the caller gets a proxy onto it.
    pub fn object(mut self, name: impl Into<String>, value: Arc<dyn Remotable>) -> Self {
        self.members.insert(name.into(), Member::Object(value));
        self
    }
}

impl Default for DynObject {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Remotable for DynObject {
    async fn invoke(&self, path: &[String], args: Vec<RemoteValue>) -> InvokeResult {
        let Some((head, rest)) = path.split_first() else {
            // Empty path: invoke the value itself.
            let Some(call) = &self.call else {
                return Err(ThrownError::new("object is not callable"));
            };
            return call(args);
        };

        match self.members.get(head) {
            None => Err(ThrownError::new(format!("no such member '{}'", head))),
            Some(Member::Value(value)) => {
                if !rest.is_empty() {
                    return Err(ThrownError::new(format!(
                        "member '{}' is plain data, cannot descend into it",
                        head
                    )));
                }
                if !args.is_empty() {
                    return Err(ThrownError::new(format!("member '{}' is not callable", head)));
                }
                Ok(Reply::Value(value.clone()))
            }
            Some(Member::Method(handler)) => {
                if !rest.is_empty() {
                    return Err(ThrownError::new(format!(
                        "member '{}' is a method, cannot descend into it",
                        head
                    )));
                }
                handler(args)
            }
            Some(Member::MethodAsync(handler)) => {
                if !rest.is_empty() {
                    return Err(ThrownError::new(format!(
                        "member '{}' is a method, cannot descend into it",
                        head
                    )));
                }
                handler(args).await
            }
            Some(Member::Object(object)) => {
                if rest.is_empty() && args.is_empty() {
                    // Property read of an object member: pass by reference.
                    return Ok(Reply::Object(object.clone()));
                }
                object.invoke(rest, args).await
            }
        }
    }

    fn describe(&self) -> Descriptor {
        let mut keys: Vec<String> = self.members.keys().cloned().collect();
        keys.sort();
        Descriptor {
            keys,
            callable: self.call.is_some(),
        }
    }
}

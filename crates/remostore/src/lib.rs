//! # Remostore
//!
//! A remote-object store: transparent method invocation, property access,
//! and distributed garbage collection between two isolated contexts that
//! share nothing but an asynchronous, message-oriented transport.
//!
//! ## Architecture
//!
//! Each side of a channel owns one [`store::ObjectStore`]. Values exposed
//! under a string id on one side become callable through lazy
//! [`proxy::RemoteObject`] handles on the other. Calls are correlated by id,
//! bounded by a per-store timeout, and answered exactly once; object-valued
//! results and callback arguments travel as references, so arbitrary object
//! graphs can be proxied without ever copying them. Stores are single-use:
//! a disconnected or closed store rejects everything, and a reload path
//! builds a fresh one (see [`exposure::ExposureSet`]).

pub mod error;
pub mod exposure;
pub mod mock_transport;
pub mod object;
pub mod proxy;
pub mod store;
pub mod transport;

mod correlator;
mod gc;
mod registry;

pub use error::{Error, Result};
pub use exposure::ExposureSet;
pub use object::{Descriptor, DynObject, InvokeResult, Remotable, RemoteValue, Reply, ThrownError};
pub use proxy::{CallArg, RemoteObject};
pub use store::{ObjectStore, State, StoreOptions};
pub use transport::Transport;

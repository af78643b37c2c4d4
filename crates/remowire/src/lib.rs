//! # Remowire
//!
//! The wire protocol for remote-object channels: a small, tagged message
//! vocabulary carried as structured values over an opaque duplex transport.
//!
//! ## Architecture
//!
//! Every message between two object stores is a [`Frame`]. Calls carry a
//! correlation id, a target object id, a member path, and arguments; every
//! call is answered by exactly one response with the same correlation id.
//! Values inside frames are [`WireValue`]s, which tag remote-object
//! references distinctly from plain data so that object graphs can be
//! proxied recursively instead of being copied across the channel.

pub mod error;
pub mod frame;
pub mod value;

pub use error::{Error, ErrorKind, Result, WireError};
pub use frame::{decode, encode, Frame, ResponseBody};
pub use value::WireValue;

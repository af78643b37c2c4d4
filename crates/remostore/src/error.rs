//! # Error Definitions
//!
//! Every failure a caller can observe from a proxy invocation or store
//! operation. Peer-side failures arrive as serialized payloads and are
//! reconstructed here with their kind preserved.

use std::time::Duration;

use remowire::{ErrorKind, WireError};

use crate::transport;

#[derive(Debug, Clone)]
pub enum Error {
    /// The target id is not exposed on the peer.
    NotFound(String),
    /// No response arrived within the configured window.
    Timeout(Duration),
    /// The transport closed while the request was pending.
    Disconnected,
    /// The store was closed locally; it is single-use and never reopens.
    Closed,
    /// The peer-side handler threw.
    Throw(String),
    /// The peer reported a failure that is neither a miss nor a throw.
    Remote(String),
    /// The outstanding-request bound was reached before the call was sent.
    Saturated(usize),
    /// The peer answered with something structurally impossible.
    Protocol(String),
    /// Channel-layer failure.
    Transport(transport::Error),
    /// Wire codec failure.
    Codec(remowire::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Timeout(window) => write!(f, "Request timed out after {}ms", window.as_millis()),
            Self::Disconnected => write!(f, "Transport disconnected while request was pending"),
            Self::Closed => write!(f, "Object store is closed"),
            Self::Throw(msg) => write!(f, "Remote handler threw: {}", msg),
            Self::Remote(msg) => write!(f, "Remote failure: {}", msg),
            Self::Saturated(limit) => write!(f, "Too many pending requests (limit {})", limit),
            Self::Protocol(msg) => write!(f, "Protocol violation: {}", msg),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Codec(e) => write!(f, "Codec error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<remowire::Error> for Error {
    fn from(e: remowire::Error) -> Self {
        Self::Codec(e)
    }
}

impl Error {
    /// Reconstructs a peer-side failure from its wire payload.
    pub(crate) fn from_wire(error: WireError) -> Self {
        match error.kind {
            ErrorKind::NotFound => Self::NotFound(error.message),
            ErrorKind::Throw => Self::Throw(error.message),
            ErrorKind::Other => Self::Remote(error.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

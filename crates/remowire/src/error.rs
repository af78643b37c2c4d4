//! # Error Definitions
//!
//! Codec failures and the serialized form of peer-side failures.

use serde::{Deserialize, Serialize};

/// Failures of the codec itself.
#[derive(Debug, Clone)]
pub enum Error {
    /// The frame could not be serialized into a transport message.
    Encode(String),
    /// The transport message could not be parsed as a protocol frame.
    Decode(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "Frame encoding failed: {}", msg),
            Self::Decode(msg) => write!(f, "Frame decoding failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Kind tag for a peer-side failure.
///
/// These are distinct from [`Error`]; a `WireError` is a failure on the
/// *remote* side, round-tripped as structured data so the caller can
/// reconstruct an error of the same kind, whereas `Error` means the message
/// itself was unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The target object id is not exposed on the peer.
    NotFound,
    /// The peer-side handler threw; the message is carried, never a live
    /// exception object.
    Throw,
    /// Any other peer-side failure.
    Other,
}

/// The serialized failure payload of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl WireError {
    pub fn not_found(target: &str) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("no remote object exposed under id '{}'", target),
        }
    }

    pub fn throw(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Throw,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Other,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::NotFound => write!(f, "Not found: {}", self.message),
            ErrorKind::Throw => write!(f, "Remote throw: {}", self.message),
            ErrorKind::Other => write!(f, "Remote failure: {}", self.message),
        }
    }
}

impl std::error::Error for WireError {}

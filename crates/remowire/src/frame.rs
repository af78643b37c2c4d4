//! # Protocol Frames
//!
//! The message vocabulary of a remote-object channel.
//!
//! ## Invariants
//! - Every `Call` and `Describe` is answered by exactly one `Response` with
//!   the same correlation id, unless the channel is torn down first.
//! - Decoding never panics on unknown data; a malformed message is an error
//!   the receiver can log and drop.
//! - `Handshake` and `Done` carry no payload; either one moves the receiving
//!   store out of its connecting state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result, WireError};
use crate::value::WireValue;

/// A single message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Channel-ready probe, sent once by each side when its store starts.
    Handshake,
    /// Acknowledgement of a `Handshake`.
    Done,
    /// Invoke a member of a remote object.
    ///
    /// `path` is the member path on the target; an empty path invokes the
    /// target value itself. A property read is a call with empty `args`.
    Call {
        id: u64,
        target: String,
        #[serde(default)]
        path: Vec<String>,
        #[serde(default)]
        args: Vec<WireValue>,
    },
    /// Fetch the structural descriptor of a remote object eagerly.
    Describe { id: u64, target: String },
    /// The single answer to a `Call` or `Describe`.
    Response { id: u64, body: ResponseBody },
    /// Best-effort notice that this side no longer references `target`.
    GcRelease { target: String },
}

/// Outcome of a call, as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseBody {
    Ok { value: WireValue },
    Err { error: WireError },
}

impl ResponseBody {
    pub fn into_result(self) -> std::result::Result<WireValue, WireError> {
        match self {
            Self::Ok { value } => Ok(value),
            Self::Err { error } => Err(error),
        }
    }
}

impl Frame {
    /// Builds a successful response.
    pub fn response_ok(id: u64, value: WireValue) -> Self {
        Self::Response {
            id,
            body: ResponseBody::Ok { value },
        }
    }

    /// Builds a failure response.
    pub fn response_err(id: u64, error: WireError) -> Self {
        Self::Response {
            id,
            body: ResponseBody::Err { error },
        }
    }
}

/// Encodes a frame into the structured value a transport carries.
pub fn encode(frame: &Frame) -> Result<Value> {
    serde_json::to_value(frame).map_err(|e| Error::Encode(e.to_string()))
}

/// Decodes a transport message back into a frame.
pub fn decode(message: Value) -> Result<Frame> {
    serde_json::from_value(message).map_err(|e| Error::Decode(e.to_string()))
}

//! # Value Tagging
//!
//! Values crossing the channel are either plain structured data or a
//! reference to an object living on the sending side. The tag is what makes
//! recursive proxying possible: an object-valued result does not get copied,
//! it travels as a `Ref` that the receiver turns into a new proxy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single value inside a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireValue {
    /// Plain structured-clone data, passed by copy.
    Plain { data: Value },
    /// A reference to an object exposed by the sending side, passed by id.
    Ref { id: String },
    /// The structural description of an object: its member names and whether
    /// the value itself is callable. Only produced by describe requests.
    Descriptor { keys: Vec<String>, callable: bool },
}

impl WireValue {
    pub fn plain(data: Value) -> Self {
        Self::Plain { data }
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self::Ref { id: id.into() }
    }

    /// Whether this value is a remote-object reference.
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref { .. })
    }
}

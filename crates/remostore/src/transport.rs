//! # Transport Abstraction
//!
//! A minimal, async interface for moving structured messages between two
//! isolated contexts.
//!
//! ## Philosophy
//!
//! - **Message-Oriented**: The transport knows nothing about frames, proxies,
//!   or correlation. It moves opaque structured values.
//! - **Duplex**: Both sides send and receive independently; there is no
//!   request/response pairing at this layer.
//! - **Assumed Delivery**: Implementations are expected to deliver messages
//!   at least once and in order per channel. The protocol above tolerates
//!   duplicates of best-effort messages but not reordering of responses
//!   against their own channel.

use std::fmt;

use serde_json::Value;

/// Errors that occur at the channel layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The peer is unreachable or the channel was dropped.
    ConnectionLost(String),
    /// The channel refused the message (size, shape, policy).
    PayloadRejected(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::PayloadRejected(msg) => write!(f, "Payload rejected: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A duplex channel carrying structured messages.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
///
/// # Invariants
/// - `recv` returning `Ok(None)` means the channel is closed for good; the
///   store reacts by failing every pending request. There is no reconnect at
///   this layer.
/// - `send` after the channel closed must return `Err`, not block.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one message to the peer.
    async fn send(&self, message: Value) -> Result<()>;

    /// Waits for the next message from the peer.
    ///
    /// Returns `Ok(None)` once the channel is disconnected.
    async fn recv(&self) -> Result<Option<Value>>;
}

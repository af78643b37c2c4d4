//! Mock transports for testing.
//!
//! These are used by the test suites and are not part of the public API.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::transport;
use crate::transport::Transport;

/// A duplex channel transport using tokio mpsc channels.
///
/// Messages sent via send() appear on the peer's recv() and vice versa.
/// Dropping one endpoint closes the other's receive side, which is how the
/// tests simulate a disconnect.
pub struct DuplexChannelTransport {
    tx: mpsc::UnboundedSender<Value>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Value>>>,
}

impl DuplexChannelTransport {
    /// Creates a pair of transports connected to each other.
    ///
    /// Messages sent on `a` are received by `b` and vice versa.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self {
            tx: tx_a,
            rx: Arc::new(Mutex::new(rx_b)),
        };

        let b = Self {
            tx: tx_b,
            rx: Arc::new(Mutex::new(rx_a)),
        };

        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for DuplexChannelTransport {
    async fn send(&self, message: Value) -> transport::Result<()> {
        self.tx
            .send(message)
            .map_err(|_| transport::Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Value>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}

/// A transport that swallows every outbound message and never delivers
/// anything inbound. Used to provoke timeouts.
pub struct BlackHoleTransport {
    // Keeping a sender alive stops recv() from observing a closed channel.
    _tx: mpsc::UnboundedSender<Value>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Value>>>,
}

impl BlackHoleTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            _tx: tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

impl Default for BlackHoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for BlackHoleTransport {
    async fn send(&self, _message: Value) -> transport::Result<()> {
        Ok(())
    }

    async fn recv(&self) -> transport::Result<Option<Value>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}

/// A transport whose channel is already gone.
pub struct ClosedTransport;

#[async_trait::async_trait]
impl Transport for ClosedTransport {
    async fn send(&self, _message: Value) -> transport::Result<()> {
        Err(transport::Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Value>> {
        Ok(None)
    }
}

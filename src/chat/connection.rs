//! Connection abstraction.
//!
//! A connection is a duplex channel of text frames to one peer. It is split
//! into a [`FrameSource`] read by the session's receive loop and a
//! [`FrameSink`] owned by the session's outbound writer, so reading and
//! writing never wait on each other.
//!
//! [`memory_pair`] provides an in-process connection for tests and for
//! embedding the engine without a network transport.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::protocol::ServerFrame;

/// Receiving half of a connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next text frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn receive(&mut self) -> Result<Option<String>, TransportError>;
}

/// Sending half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one text frame to the peer.
    async fn send(&mut self, payload: String) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    async fn close(&mut self);
}

/// A connection that can be split into its two halves.
pub trait Connection: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    sink: MemorySink,
    source: MemorySource,
}

/// Sending half of a [`MemoryConnection`].
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

/// Receiving half of a [`MemoryConnection`].
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Client side of an in-memory connection.
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a connected in-memory pair.
pub fn memory_pair() -> (MemoryConnection, MemoryPeer) {
    let (to_server, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_server) = mpsc::unbounded_channel();

    let connection = MemoryConnection {
        sink: MemorySink { tx: Some(to_peer) },
        source: MemorySource { rx: from_peer },
    };
    let peer = MemoryPeer {
        tx: Some(to_server),
        rx: from_server,
    };
    (connection, peer)
}

impl Connection for MemoryConnection {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (MemorySink, MemorySource) {
        (self.sink, self.source)
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(payload).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

impl MemoryPeer {
    /// Send a raw text frame. Returns false if the server side is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        match &self.tx {
            Some(tx) => tx.send(text.into()).is_ok(),
            None => false,
        }
    }

    /// Send a value serialized as JSON.
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(json),
            Err(_) => false,
        }
    }

    /// Wait for the next raw frame, `None` once the server closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Wait for the next frame and decode it.
    pub async fn recv_frame(&mut self) -> Option<ServerFrame> {
        let text = self.rx.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Take a frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Stop sending; the server sees end-of-stream.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

//! Transport abstraction layer for the Galerra gallery server.
//!
//! Provides the [`Transport`] and [`Connection`] traits that decouple the
//! server core from any specific network protocol, plus the WebSocket
//! implementation used in production. Session identifiers are assigned
//! here, at accept time, because a session lives exactly as long as its
//! connection.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive message frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one message to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection normally.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Closes the connection with an application close code and reason,
    /// used when a session is evicted in favor of a replacement.
    ///
    /// Transports without coded closes may fall back to a plain close.
    async fn close_with(
        &self,
        code: u16,
        reason: &str,
    ) -> Result<(), Self::Error>;

    /// The session identifier assigned to this connection at accept.
    fn id(&self) -> galerra_protocol::SessionId;
}

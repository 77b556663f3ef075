//! `GalerraServer` builder and accept loop.
//!
//! This is the entry point for running a gallery server. It ties the
//! layers together: transport → protocol → rooms.

use std::sync::Arc;

use galerra_protocol::{Codec, JsonCodec};
use galerra_room::{RoomConfig, RoomManager};
use galerra_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::GalerraError;
use crate::handler::handle_connection;

/// Shared server state, one per process, handed to every connection
/// handler task behind an `Arc`.
///
/// The room manager sits behind a single `Mutex`; it is touched only at
/// join and leave, never per message, so the lock is not on the hot path.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a gallery server.
///
/// # Example
///
/// ```rust,no_run
/// use galerra::prelude::*;
///
/// # async fn run() -> Result<(), GalerraError> {
/// let server = GalerraServer::builder()
///     .bind("0.0.0.0:2567")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GalerraServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl GalerraServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:2567".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration applied to every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and builds the server, with `JsonCodec` and
    /// the WebSocket transport as defaults.
    pub async fn build(
        self,
    ) -> Result<GalerraServer<JsonCodec>, GalerraError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(self.room_config)),
            codec: JsonCodec,
        });

        Ok(GalerraServer { transport, state })
    }
}

impl Default for GalerraServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running gallery server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GalerraServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GalerraServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GalerraServerBuilder {
        GalerraServerBuilder::new()
    }
}

impl<C> GalerraServer<C>
where
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: each connection gets its own handler task.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), GalerraError> {
        tracing::info!("gallery server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection::<C>(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

//! Unified error type for the Galerra server.

use galerra_protocol::ProtocolError;
use galerra_room::RoomError;
use galerra_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes generate `From` impls, so `?` converts
/// sub-crate errors automatically at the server layer.
#[derive(Debug, thiserror::Error)]
pub enum GalerraError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, disposing, unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),
}

//! # Galerra
//!
//! Real-time session/room server for shared virtual galleries.
//!
//! Galerra admits WebSocket connections into per-gallery rooms, keeps
//! every occupant's presence (position, name, avatar) consistent across
//! the room, relays chat and peer-signaling traffic, and evicts stale
//! duplicate sessions when the same user or device connects again.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use galerra::prelude::*;
//!
//! # async fn run() -> Result<(), GalerraError> {
//! let server = GalerraServer::builder()
//!     .bind("0.0.0.0:2567")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::GalerraError;
pub use server::{GalerraServer, GalerraServerBuilder};

/// The common imports for running or talking to a gallery server.
pub mod prelude {
    pub use crate::{GalerraError, GalerraServer, GalerraServerBuilder};
    pub use galerra_protocol::{
        ChatEntry, ClientEvent, JoinOptions, PlayerSnapshot, ServerEvent,
        SessionId, SignalKind,
    };
    pub use galerra_room::{
        RateLimitConfig, REPLACED_CLOSE_CODE, RoomConfig,
    };
    pub use galerra_session::{Position, Presence};
}

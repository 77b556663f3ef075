//! Room lifecycle for the Galerra gallery server.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its own
//! session registry, rate limiter, and chat log. Handlers for a room are
//! run-to-completion steps on that task, so the core logic needs no
//! locks and admission ordering (evict duplicate, register, snapshot,
//! announce) is trivially atomic.
//!
//! # Key types
//!
//! - [`RoomManager`] — creates/disposes rooms, routes joins by gallery key
//! - [`RoomHandle`] — sends commands to a running room actor
//! - [`RoomOutbound`] / [`SessionSender`] — the per-session delivery seam;
//!   the room sends, a connection handler (or a test) receives
//! - [`RateLimiter`] — sliding-window budgets for chat and signaling
//! - [`RoomConfig`] / [`RoomPhase`] — settings and lifecycle state

mod chat;
mod config;
mod error;
mod limiter;
mod manager;
mod room;

pub use chat::ChatLog;
pub use config::{RateLimitConfig, RoomConfig, RoomPhase};
pub use error::RoomError;
pub use limiter::{RateChannel, RateLimiter};
pub use manager::RoomManager;
pub use room::{
    REPLACED_CLOSE_CODE, REPLACED_CLOSE_REASON, RoomHandle, RoomInfo,
    RoomOutbound, SessionSender,
};

//! Error types for the room layer.
//!
//! Only join-time refusals surface as errors; per-message problems
//! (bad coordinates, rate-limit denials, unknown signal targets) are
//! dropped silently inside the room, by policy.

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room exists under this key.
    #[error("room {0} not found")]
    NotFound(String),

    /// The room has no free slots.
    #[error("room {0} is full")]
    RoomFull(String),

    /// The room is shutting down and no longer accepts sessions.
    #[error("room {0} is disposing")]
    Disposing(String),

    /// The room's command channel is gone or not responding. Usually
    /// means the room task stopped between lookup and use.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}

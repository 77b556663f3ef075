//! Room configuration and lifecycle state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rate limit settings
// ---------------------------------------------------------------------------

/// A sliding-window budget: at most `limit` events in any trailing
/// interval of `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub limit: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    pub const fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window }
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum sessions in the room at once.
    pub max_clients: usize,

    /// Chat channel budget.
    pub chat_limit: RateLimitConfig,

    /// Peer-signaling channel budget. Looser than chat: an ICE exchange
    /// legitimately bursts a dozen candidates in under a second.
    pub signal_limit: RateLimitConfig,

    /// Maximum chat message length, in characters, after trimming.
    pub max_chat_len: usize,

    /// How many chat messages the room keeps for the join snapshot.
    pub chat_history: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_clients: 16,
            chat_limit: RateLimitConfig::new(3, Duration::from_millis(1000)),
            signal_limit: RateLimitConfig::new(
                30,
                Duration::from_millis(1000),
            ),
            max_chat_len: 500,
            chat_history: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// ```text
/// Active → Disposing → (gone)
/// ```
///
/// - **Active**: accepting joins and handling traffic, any occupancy.
/// - **Disposing**: the manager decided the room is done (it emptied
///   out); the command loop drains and stops. No join succeeds here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Active,
    Disposing,
}

impl RoomPhase {
    /// Whether the room accepts new sessions.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Disposing => write!(f, "Disposing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_phase_is_joinable() {
        assert!(RoomPhase::Active.is_joinable());
        assert!(!RoomPhase::Disposing.is_joinable());
    }

    #[test]
    fn test_room_phase_display() {
        assert_eq!(RoomPhase::Active.to_string(), "Active");
        assert_eq!(RoomPhase::Disposing.to_string(), "Disposing");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_clients, 16);
        assert_eq!(config.chat_limit.limit, 3);
        assert_eq!(config.chat_limit.window, Duration::from_millis(1000));
        assert_eq!(config.max_chat_len, 500);
        assert_eq!(config.chat_history, 50);
    }
}

//! Sliding-window rate limiter for per-session message channels.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use galerra_protocol::SessionId;

use crate::RateLimitConfig;

/// The rate-limited message channels. Each has its own independent
/// budget; a chatty session can still signal and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateChannel {
    Chat,
    Signal,
}

impl fmt::Display for RateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// A sliding-window counter keyed by (session, channel).
///
/// For each key the limiter keeps the timestamps of previously *allowed*
/// events. An event is allowed when, after pruning timestamps that have
/// aged out of the trailing window, fewer than `limit` remain. Denied
/// events are not recorded, so a flood of rejections cannot extend its
/// own lockout.
///
/// This is a true sliding window, not a fixed bucket: no trailing
/// interval of the window length ever contains more than `limit` allowed
/// events, regardless of how arrivals align.
#[derive(Debug)]
pub struct RateLimiter {
    chat: RateLimitConfig,
    signal: RateLimitConfig,
    windows: HashMap<(SessionId, RateChannel), VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with per-channel budgets.
    pub fn new(chat: RateLimitConfig, signal: RateLimitConfig) -> Self {
        Self {
            chat,
            signal,
            windows: HashMap::new(),
        }
    }

    /// Decides whether an event on `channel` from `session_id` at `now`
    /// is within budget. Allowed events are recorded at `now`; denials
    /// leave the window untouched.
    ///
    /// `now` is a parameter rather than read inside so callers control
    /// time in tests. It must not go backwards for a given key.
    pub fn allow(
        &mut self,
        session_id: SessionId,
        channel: RateChannel,
        now: Instant,
    ) -> bool {
        let config = match channel {
            RateChannel::Chat => self.chat,
            RateChannel::Signal => self.signal,
        };

        let window = self
            .windows
            .entry((session_id, channel))
            .or_default();

        // Prune timestamps that have aged out of the trailing window.
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= config.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < config.limit {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drops all windows belonging to a session. Called when the session
    /// leaves the room.
    pub fn clear(&mut self, session_id: SessionId) {
        self.windows.retain(|(sid, _), _| *sid != session_id);
    }

    /// Number of live (session, channel) windows. Exposed for tests and
    /// introspection.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

// =========================================================================
// Tests
// =========================================================================

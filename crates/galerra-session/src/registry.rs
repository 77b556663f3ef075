//! The session registry: every participant currently in one room.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. This is intentional: each registry is owned by exactly one
//! room task and mutated only from that task's run-to-completion command
//! loop, so there is nothing to lock.

use std::collections::HashMap;

use galerra_protocol::SessionId;

use crate::Presence;

/// Tracks the sessions present in a room, with an identity index for
/// duplicate detection and insertion-order iteration for snapshots.
///
/// The primary map is keyed by [`SessionId`]. Two secondary maps index
/// non-empty `user_id` and `device_id` values back to the owning session;
/// they are kept in sync with the primary map on every insert and remove,
/// which is what makes duplicate lookup O(1) instead of a scan.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// All sessions in the room.
    sessions: HashMap<SessionId, Presence>,

    /// Session ids in join order. Snapshots iterate this so that every
    /// new joiner sees occupants in a stable, arrival-ordered sequence.
    order: Vec<SessionId>,

    /// Index from `user_id` to the session holding it. At most one entry
    /// per identity; the eviction policy keeps it that way.
    by_user: HashMap<String, SessionId>,

    /// Index from `device_id` to the session holding it.
    by_device: HashMap<String, SessionId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session and indexes its identity strings.
    ///
    /// The caller resolves identity conflicts *before* inserting; if an
    /// identity is somehow still indexed, the new session simply takes
    /// over the index entry.
    pub fn insert(&mut self, session_id: SessionId, presence: Presence) {
        if let Some(user_id) = &presence.user_id {
            self.by_user.insert(user_id.clone(), session_id);
        }
        if let Some(device_id) = &presence.device_id {
            self.by_device.insert(device_id.clone(), session_id);
        }
        if !self.sessions.contains_key(&session_id) {
            self.order.push(session_id);
        }
        self.sessions.insert(session_id, presence);
    }

    /// Removes a session, returning its presence if it was registered.
    ///
    /// Removing an unknown session is a no-op, not an error: disconnects
    /// and evictions race benignly and the loser finds nothing to do.
    pub fn remove(&mut self, session_id: SessionId) -> Option<Presence> {
        let presence = self.sessions.remove(&session_id)?;
        self.order.retain(|sid| *sid != session_id);

        // Only drop index entries that still point at this session; the
        // identity may have been taken over by a newer session already.
        if let Some(user_id) = &presence.user_id {
            if self.by_user.get(user_id) == Some(&session_id) {
                self.by_user.remove(user_id);
            }
        }
        if let Some(device_id) = &presence.device_id {
            if self.by_device.get(device_id) == Some(&session_id) {
                self.by_device.remove(device_id);
            }
        }

        Some(presence)
    }

    /// Looks up a session's presence.
    pub fn get(&self, session_id: SessionId) -> Option<&Presence> {
        self.sessions.get(&session_id)
    }

    /// Mutable lookup, for movement and avatar updates.
    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut Presence> {
        self.sessions.get_mut(&session_id)
    }

    /// Whether a session is registered.
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Every session currently holding either of the given identity
    /// strings. Empty identities never match. A single session matching
    /// on both user and device is returned once.
    pub fn find_by_identity(
        &self,
        user_id: Option<&str>,
        device_id: Option<&str>,
    ) -> Vec<SessionId> {
        let mut matches = Vec::new();

        if let Some(user_id) = user_id.filter(|s| !s.is_empty()) {
            if let Some(sid) = self.by_user.get(user_id) {
                matches.push(*sid);
            }
        }
        if let Some(device_id) = device_id.filter(|s| !s.is_empty()) {
            if let Some(sid) = self.by_device.get(device_id) {
                if !matches.contains(sid) {
                    matches.push(*sid);
                }
            }
        }

        matches
    }

    /// Iterates sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &Presence)> {
        self.order.iter().filter_map(|sid| {
            self.sessions.get(sid).map(|presence| (*sid, presence))
        })
    }

    /// Session ids in join order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.order.clone()
    }

    /// Number of sessions in the room.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the room is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

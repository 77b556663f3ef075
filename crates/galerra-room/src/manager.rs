//! Room manager: creates, tracks, and disposes rooms by key.
//!
//! Matchmaking is by gallery key: every join carrying the same
//! `galleryId` lands in the same room, created on first use. A join with
//! no key gets a private room under a generated key.

use std::collections::HashMap;

use galerra_protocol::{JoinOptions, SessionId};
use rand::Rng;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo, SessionSender};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Manages all active rooms.
///
/// Not internally synchronized: the server keeps one manager behind a
/// `Mutex`, which serializes joins, leaves, and disposal. That ordering
/// is load-bearing: a room reported empty by a leave cannot have a join
/// in flight, because the join would have gone through the same lock.
pub struct RoomManager {
    /// Active rooms, keyed by room key.
    rooms: HashMap<String, RoomHandle>,

    /// Configuration applied to every room this manager creates.
    config: RoomConfig,
}

impl RoomManager {
    /// Creates an empty manager. Rooms inherit `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Routes a join to the room for its gallery key, creating the room
    /// on first use. Returns a handle the caller keeps for the life of
    /// the session.
    pub async fn join(
        &mut self,
        session_id: SessionId,
        options: JoinOptions,
        sender: SessionSender,
    ) -> Result<RoomHandle, RoomError> {
        let room_key = match options.gallery_id.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => generate_room_key(),
        };

        let handle = self
            .rooms
            .entry(room_key.clone())
            .or_insert_with(|| {
                spawn_room(
                    room_key.clone(),
                    self.config.clone(),
                    DEFAULT_CHANNEL_SIZE,
                )
            })
            .clone();

        match handle.join(session_id, options, sender).await {
            Ok(()) => Ok(handle),
            Err(err) => {
                // A dead actor leaves a stale handle behind; drop it so
                // the next join under this key starts a fresh room.
                if matches!(err, RoomError::Unavailable(_)) {
                    self.rooms.remove(&room_key);
                }
                Err(err)
            }
        }
    }

    /// Removes a session from its room, disposing the room if it
    /// emptied. Safe to call for sessions already evicted; the room
    /// treats that as a no-op and reports its unchanged occupancy.
    pub async fn leave(&mut self, room_key: &str, session_id: SessionId) {
        let Some(handle) = self.rooms.get(room_key) else {
            return;
        };

        match handle.leave(session_id).await {
            Ok(0) => {
                let _ = handle.dispose().await;
                self.rooms.remove(room_key);
                tracing::info!(%room_key, "room emptied, disposed");
            }
            Ok(_) => {}
            Err(_) => {
                // Actor already gone; just forget the handle.
                self.rooms.remove(room_key);
            }
        }
    }

    /// Returns info about a specific room.
    pub async fn get_info(
        &self,
        room_key: &str,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_key)
            .ok_or_else(|| RoomError::NotFound(room_key.to_string()))?;
        handle.get_info().await
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Keys of all active rooms.
    pub fn room_keys(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

/// Generates a random room key for joins that carry no gallery id:
/// 8 random bytes as 16 hex characters.
fn generate_room_key() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

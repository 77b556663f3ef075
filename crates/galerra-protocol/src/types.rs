//! Wire types for the gallery protocol.
//!
//! Everything in this module travels between a client and the server as
//! JSON. Both event enums are internally tagged: the variant name becomes a
//! kebab-case `"type"` field, so a movement update reads
//! `{"type":"move","x":1.0,...}` and a join broadcast reads
//! `{"type":"player-joined",...}`. Browser clients switch on that field.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for one connected participant.
///
/// Newtype over `u64`, assigned by the transport layer when a connection is
/// accepted. It lives exactly as long as the connection: a participant who
/// reconnects gets a fresh id. `#[serde(transparent)]` keeps it a plain
/// number on the wire, so `SessionId(42)` serializes as `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Join options
// ---------------------------------------------------------------------------

/// Options a client supplies when joining a room.
///
/// Every field is optional and opaque. `gallery_id` routes the connection
/// to a room (one room per gallery); `user_id` and `device_id` are trusted
/// identity strings from the external auth layer, used only to evict stale
/// duplicate sessions; the rest seed the participant's initial presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinOptions {
    pub gallery_id: Option<String>,
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub name: Option<String>,
    pub character_path: Option<String>,
    pub character_file: Option<String>,
    /// Optional spawn position. Applied only when every supplied
    /// coordinate is finite.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rotation: Option<f64>,
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

/// The kind of a peer-connection handshake message.
///
/// This is the full enumeration; anything else fails to decode and the
/// event is dropped at the protocol boundary. The payload that rides along
/// with a kind is never inspected by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Ice,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "offer"),
            Self::Answer => write!(f, "answer"),
            Self::Ice => write!(f, "ice"),
        }
    }
}

// ---------------------------------------------------------------------------
// Presence and chat records
// ---------------------------------------------------------------------------

/// One participant's presence as other clients see it.
///
/// Identity strings (`user_id`, `device_id`) deliberately never appear
/// here; they exist server-side only, for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub session_id: SessionId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation: f64,
    pub character_path: String,
    pub character_file: String,
}

/// A chat message as recorded and broadcast by the server.
///
/// The id and timestamp are assigned server-side at receive time, so every
/// client (including the sender) displays the same canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub sender_id: SessionId,
    pub sender_name: String,
    pub message: String,
    /// Server receive time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Client -> server events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `Join` must be the first event on a connection; everything after it is
/// room traffic for the joined session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Request admission to a room.
    Join(JoinOptions),

    /// A movement update: position plus heading.
    Move {
        x: f64,
        y: f64,
        z: f64,
        rotation: f64,
    },

    /// An avatar change. Both fields optional, validated independently.
    Character {
        path: Option<String>,
        file: Option<String>,
    },

    /// A chat message.
    Chat { message: String },

    /// A peer-connection handshake message for another session.
    Signal {
        target: SessionId,
        kind: SignalKind,
        payload: String,
    },
}

// ---------------------------------------------------------------------------
// Server -> client events
// ---------------------------------------------------------------------------

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full room snapshot, sent exactly once to a session right after it
    /// is admitted: the other occupants (in join order) and the recent
    /// chat log. The joiner itself is not in `players`.
    #[serde(rename_all = "camelCase")]
    RoomState {
        room_key: String,
        players: Vec<PlayerSnapshot>,
        chat: Vec<ChatEntry>,
    },

    /// A new occupant. Broadcast to everyone except the joiner.
    PlayerJoined { player: PlayerSnapshot },

    /// Someone moved. Broadcast to everyone except the mover, who already
    /// has authoritative local state.
    #[serde(rename_all = "camelCase")]
    PlayerMoved {
        session_id: SessionId,
        x: f64,
        y: f64,
        z: f64,
        rotation: f64,
    },

    /// Someone changed avatar. Carries the combined resulting state.
    /// Broadcast to everyone except the changer.
    #[serde(rename_all = "camelCase")]
    PlayerCharacter {
        session_id: SessionId,
        character_path: String,
        character_file: String,
    },

    /// An occupant left (disconnect or eviction). Broadcast to the rest.
    #[serde(rename_all = "camelCase")]
    PlayerLeft { session_id: SessionId },

    /// A chat message. Broadcast to all occupants, sender included, so
    /// the sender gets the canonical id/timestamp echo.
    Chat(ChatEntry),

    /// A relayed handshake message. Unicast to the target session.
    Signal {
        from: SessionId,
        kind: SignalKind,
        payload: String,
    },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire format is a contract with the browser client: these tests
    //! pin the exact JSON tags and field names the serde attributes
    //! produce, because a silent rename would strand every client.

    use super::*;

    // =====================================================================
    // SessionId
    // =====================================================================

    #[test]
    fn test_session_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&SessionId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_session_id_deserializes_from_plain_number() {
        let sid: SessionId = serde_json::from_str("42").unwrap();
        assert_eq!(sid, SessionId(42));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(7).to_string(), "S-7");
    }

    // =====================================================================
    // JoinOptions
    // =====================================================================

    #[test]
    fn test_join_options_all_fields_optional() {
        // An empty object is a valid join: everything defaults.
        let opts: JoinOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, JoinOptions::default());
    }

    #[test]
    fn test_join_options_uses_camel_case_keys() {
        let json = r#"{
            "galleryId": "gallery-7",
            "userId": "u1",
            "deviceId": "d1",
            "name": "Ada",
            "characterPath": "/models/characters/",
            "characterFile": "worker.glb"
        }"#;
        let opts: JoinOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.gallery_id.as_deref(), Some("gallery-7"));
        assert_eq!(opts.user_id.as_deref(), Some("u1"));
        assert_eq!(opts.device_id.as_deref(), Some("d1"));
        assert_eq!(opts.character_file.as_deref(), Some("worker.glb"));
    }

    #[test]
    fn test_join_options_unknown_keys_are_ignored() {
        // Clients ship extra fields across versions; they must not break
        // admission.
        let opts: JoinOptions =
            serde_json::from_str(r#"{"name":"Ada","favoriteColor":"teal"}"#)
                .unwrap();
        assert_eq!(opts.name.as_deref(), Some("Ada"));
    }

    // =====================================================================
    // SignalKind
    // =====================================================================

    #[test]
    fn test_signal_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SignalKind::Offer).unwrap(),
            "\"offer\""
        );
        assert_eq!(
            serde_json::to_string(&SignalKind::Ice).unwrap(),
            "\"ice\""
        );
    }

    #[test]
    fn test_signal_kind_unknown_value_fails_to_decode() {
        // Anything outside the enumeration is rejected at decode time,
        // which is how unknown signal kinds get dropped.
        let result: Result<SignalKind, _> =
            serde_json::from_str("\"renegotiate\"");
        assert!(result.is_err());
    }

    // =====================================================================
    // ClientEvent
    // =====================================================================

    #[test]
    fn test_client_event_join_json_format() {
        let json = r#"{"type":"join","galleryId":"g1","userId":"u1"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::Join(opts) => {
                assert_eq!(opts.gallery_id.as_deref(), Some("g1"));
                assert_eq!(opts.user_id.as_deref(), Some("u1"));
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn test_client_event_move_json_format() {
        let json =
            r#"{"type":"move","x":1.5,"y":0.0,"z":-3.25,"rotation":1.57}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::Move {
                x: 1.5,
                y: 0.0,
                z: -3.25,
                rotation: 1.57
            }
        );
    }

    #[test]
    fn test_client_event_character_fields_optional() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"character","file":"robot.glb"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Character {
                path: None,
                file: Some("robot.glb".into())
            }
        );
    }

    #[test]
    fn test_client_event_chat_round_trip() {
        let event = ClientEvent::Chat {
            message: "hello there".into(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_client_event_signal_json_format() {
        let json =
            r#"{"type":"signal","target":9,"kind":"offer","payload":"sdp"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::Signal {
                target: SessionId(9),
                kind: SignalKind::Offer,
                payload: "sdp".into()
            }
        );
    }

    #[test]
    fn test_client_event_signal_unknown_kind_fails_to_decode() {
        let json =
            r#"{"type":"signal","target":9,"kind":"sdp-blob","payload":"x"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_event_unknown_type_fails_to_decode() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"type":"teleport","x":0}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_server_event_room_state_json_format() {
        let event = ServerEvent::RoomState {
            room_key: "gallery-7".into(),
            players: vec![],
            chat: vec![],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "room-state");
        assert_eq!(json["roomKey"], "gallery-7");
        assert!(json["players"].as_array().unwrap().is_empty());
        assert!(json["chat"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_server_event_player_joined_json_format() {
        let event = ServerEvent::PlayerJoined {
            player: PlayerSnapshot {
                session_id: SessionId(3),
                name: "Guest-3".into(),
                x: 0.0,
                y: 0.0,
                z: 0.0,
                rotation: 0.0,
                character_path: "/models/characters/".into(),
                character_file: "worker.glb".into(),
            },
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player-joined");
        assert_eq!(json["player"]["sessionId"], 3);
        assert_eq!(json["player"]["characterFile"], "worker.glb");
    }

    #[test]
    fn test_server_event_player_moved_json_format() {
        let event = ServerEvent::PlayerMoved {
            session_id: SessionId(5),
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rotation: 0.5,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player-moved");
        assert_eq!(json["sessionId"], 5);
        assert_eq!(json["rotation"], 0.5);
    }

    #[test]
    fn test_server_event_player_left_json_format() {
        let event = ServerEvent::PlayerLeft {
            session_id: SessionId(5),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player-left");
        assert_eq!(json["sessionId"], 5);
    }

    #[test]
    fn test_server_event_chat_flattens_entry_fields() {
        // The Chat variant wraps a ChatEntry; internal tagging folds the
        // entry's fields in next to the tag.
        let event = ServerEvent::Chat(ChatEntry {
            id: "4-1000".into(),
            sender_id: SessionId(4),
            sender_name: "Ada".into(),
            message: "hi".into(),
            timestamp: 1000,
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["senderId"], 4);
        assert_eq!(json["senderName"], "Ada");
        assert_eq!(json["timestamp"], 1000);
    }

    #[test]
    fn test_server_event_signal_json_format() {
        let event = ServerEvent::Signal {
            from: SessionId(1),
            kind: SignalKind::Answer,
            payload: "sdp".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "signal");
        assert_eq!(json["from"], 1);
        assert_eq!(json["kind"], "answer");
        assert_eq!(json["payload"], "sdp");
    }

    #[test]
    fn test_server_event_round_trip() {
        let event = ServerEvent::PlayerCharacter {
            session_id: SessionId(2),
            character_path: "/models/characters/".into(),
            character_file: "robot.glb".into(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    // =====================================================================
    // Malformed input
    // =====================================================================

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientEvent, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_fields_returns_error() {
        // A move without coordinates is rejected whole.
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"type":"move","x":1.0}"#);
        assert!(result.is_err());
    }
}

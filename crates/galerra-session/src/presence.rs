//! Presence: the state the server keeps for one connected participant.
//!
//! A `Presence` is created when a session is admitted to a room and lives
//! until that session leaves or is evicted. It is mutated only by events
//! from its own connection (movement, avatar changes); everything the
//! room broadcasts about a participant is derived from it.

use galerra_protocol::{JoinOptions, PlayerSnapshot, SessionId};
use serde::{Deserialize, Serialize};

/// Default avatar asset directory for participants who pick nothing.
pub const DEFAULT_CHARACTER_PATH: &str = "/models/characters/";

/// Default avatar model file.
pub const DEFAULT_CHARACTER_FILE: &str = "worker.glb";

/// File extensions an avatar model is allowed to have.
pub const ALLOWED_CHARACTER_EXTENSIONS: [&str; 2] = [".glb", ".gltf"];

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A participant's position in the gallery: three coordinates plus a
/// rotation around the vertical axis.
///
/// Invariant: all four values are finite at all times. The constructors
/// and the movement path both enforce it, so a NaN or infinity from a
/// client can never end up stored or rebroadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation: f64,
}

impl Position {
    /// Returns `true` when every component is a finite real number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.rotation.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Whether `path` is acceptable as an avatar asset directory.
///
/// Rejects parent-directory traversal (`..` as a segment, on either
/// separator) and home-directory shorthand (`~`). The path is otherwise
/// opaque; the asset host decides what it means.
pub fn valid_character_path(path: &str) -> bool {
    !path.contains('~') && !path.split(['/', '\\']).any(|seg| seg == "..")
}

/// Whether `file` is acceptable as an avatar model file name.
///
/// Must end in one of [`ALLOWED_CHARACTER_EXTENSIONS`], case-insensitive,
/// with a non-empty stem.
pub fn valid_character_file(file: &str) -> bool {
    let lower = file.to_ascii_lowercase();
    ALLOWED_CHARACTER_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext) && lower.len() > ext.len())
}

/// The generated display name for a session that supplied none.
pub fn guest_name(session_id: SessionId) -> String {
    format!("Guest-{}", session_id.0)
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// One connected participant's server-side state.
#[derive(Debug, Clone, PartialEq)]
pub struct Presence {
    /// Display name, shown to other occupants.
    pub name: String,
    /// Opaque identity from the external auth layer. Used only for
    /// duplicate-session detection, never shown to other clients.
    pub user_id: Option<String>,
    /// Opaque device identity, same role as `user_id`.
    pub device_id: Option<String>,
    /// Current position. Always finite.
    pub position: Position,
    /// Avatar asset directory.
    pub character_path: String,
    /// Avatar model file.
    pub character_file: String,
}

impl Presence {
    /// Builds the initial presence for a newly admitted session.
    ///
    /// Every option is optional: missing or invalid fields fall back to
    /// defaults rather than failing the join. Empty identity strings are
    /// treated as absent so they never participate in duplicate
    /// detection. The spawn position is honored only when all supplied
    /// coordinates are finite.
    pub fn from_join(session_id: SessionId, options: &JoinOptions) -> Self {
        let name = match options.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => guest_name(session_id),
        };

        let character_path = match options.character_path.as_deref() {
            Some(path) if valid_character_path(path) => path.to_string(),
            Some(path) => {
                tracing::debug!(
                    %session_id,
                    %path,
                    "rejected character path at join, using default"
                );
                DEFAULT_CHARACTER_PATH.to_string()
            }
            None => DEFAULT_CHARACTER_PATH.to_string(),
        };

        let character_file = match options.character_file.as_deref() {
            Some(file) if valid_character_file(file) => file.to_string(),
            Some(file) => {
                tracing::debug!(
                    %session_id,
                    %file,
                    "rejected character file at join, using default"
                );
                DEFAULT_CHARACTER_FILE.to_string()
            }
            None => DEFAULT_CHARACTER_FILE.to_string(),
        };

        let spawn = Position {
            x: options.x.unwrap_or(0.0),
            y: options.y.unwrap_or(0.0),
            z: options.z.unwrap_or(0.0),
            rotation: options.rotation.unwrap_or(0.0),
        };
        let position = if spawn.is_finite() {
            spawn
        } else {
            Position::default()
        };

        Self {
            name,
            user_id: non_empty(options.user_id.as_deref()),
            device_id: non_empty(options.device_id.as_deref()),
            position,
            character_path,
            character_file,
        }
    }

    /// The wire-facing view of this presence.
    pub fn snapshot(&self, session_id: SessionId) -> PlayerSnapshot {
        PlayerSnapshot {
            session_id,
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            rotation: self.position.rotation,
            character_path: self.character_path.clone(),
            character_file: self.character_file.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(id: u64) -> SessionId {
        SessionId(id)
    }

    // =====================================================================
    // Position
    // =====================================================================

    #[test]
    fn test_position_is_finite_accepts_ordinary_values() {
        let pos = Position {
            x: 1.5,
            y: -2.0,
            z: 0.0,
            rotation: 3.14,
        };
        assert!(pos.is_finite());
    }

    #[test]
    fn test_position_is_finite_rejects_nan_and_infinity() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let pos = Position {
                x: bad,
                ..Position::default()
            };
            assert!(!pos.is_finite(), "{bad} should not count as finite");

            let pos = Position {
                rotation: bad,
                ..Position::default()
            };
            assert!(!pos.is_finite());
        }
    }

    // =====================================================================
    // valid_character_path()
    // =====================================================================

    #[test]
    fn test_valid_character_path_accepts_plain_paths() {
        assert!(valid_character_path("/models/characters/"));
        assert!(valid_character_path("models/custom"));
    }

    #[test]
    fn test_valid_character_path_rejects_parent_traversal() {
        assert!(!valid_character_path("../secrets/"));
        assert!(!valid_character_path("/models/../../etc/"));
        assert!(!valid_character_path("models\\..\\system"));
    }

    #[test]
    fn test_valid_character_path_rejects_home_shorthand() {
        assert!(!valid_character_path("~/models/"));
    }

    #[test]
    fn test_valid_character_path_allows_dotted_directory_names() {
        // Only a bare ".." segment is traversal; "..assets" is just a
        // strange directory name.
        assert!(valid_character_path("/models/..assets/"));
    }

    // =====================================================================
    // valid_character_file()
    // =====================================================================

    #[test]
    fn test_valid_character_file_accepts_allowed_extensions() {
        assert!(valid_character_file("worker.glb"));
        assert!(valid_character_file("scene.gltf"));
        assert!(valid_character_file("ROBOT.GLB"));
    }

    #[test]
    fn test_valid_character_file_rejects_other_extensions() {
        assert!(!valid_character_file("worker.exe"));
        assert!(!valid_character_file("worker.glb.exe"));
        assert!(!valid_character_file("worker"));
    }

    #[test]
    fn test_valid_character_file_rejects_bare_extension() {
        assert!(!valid_character_file(".glb"));
    }

    // =====================================================================
    // Presence::from_join()
    // =====================================================================

    #[test]
    fn test_from_join_empty_options_uses_defaults() {
        let presence = Presence::from_join(sid(7), &JoinOptions::default());

        assert_eq!(presence.name, "Guest-7");
        assert_eq!(presence.user_id, None);
        assert_eq!(presence.device_id, None);
        assert_eq!(presence.position, Position::default());
        assert_eq!(presence.character_path, DEFAULT_CHARACTER_PATH);
        assert_eq!(presence.character_file, DEFAULT_CHARACTER_FILE);
    }

    #[test]
    fn test_from_join_keeps_supplied_fields() {
        let options = JoinOptions {
            name: Some("Ada".into()),
            user_id: Some("u1".into()),
            character_file: Some("robot.glb".into()),
            x: Some(1.0),
            y: Some(2.0),
            z: Some(3.0),
            rotation: Some(0.5),
            ..JoinOptions::default()
        };

        let presence = Presence::from_join(sid(1), &options);

        assert_eq!(presence.name, "Ada");
        assert_eq!(presence.user_id.as_deref(), Some("u1"));
        assert_eq!(presence.character_file, "robot.glb");
        assert_eq!(
            presence.position,
            Position {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                rotation: 0.5
            }
        );
    }

    #[test]
    fn test_from_join_empty_identity_strings_treated_as_absent() {
        let options = JoinOptions {
            user_id: Some(String::new()),
            device_id: Some(String::new()),
            ..JoinOptions::default()
        };

        let presence = Presence::from_join(sid(1), &options);

        assert_eq!(presence.user_id, None);
        assert_eq!(presence.device_id, None);
    }

    #[test]
    fn test_from_join_invalid_character_fields_fall_back_to_defaults() {
        let options = JoinOptions {
            character_path: Some("../../etc/".into()),
            character_file: Some("payload.exe".into()),
            ..JoinOptions::default()
        };

        let presence = Presence::from_join(sid(1), &options);

        assert_eq!(presence.character_path, DEFAULT_CHARACTER_PATH);
        assert_eq!(presence.character_file, DEFAULT_CHARACTER_FILE);
    }

    #[test]
    fn test_from_join_non_finite_spawn_falls_back_to_origin() {
        let options = JoinOptions {
            x: Some(f64::NAN),
            y: Some(1.0),
            ..JoinOptions::default()
        };

        let presence = Presence::from_join(sid(1), &options);

        assert_eq!(presence.position, Position::default());
    }

    #[test]
    fn test_from_join_blank_name_falls_back_to_guest() {
        let options = JoinOptions {
            name: Some("   ".into()),
            ..JoinOptions::default()
        };

        let presence = Presence::from_join(sid(9), &options);

        assert_eq!(presence.name, "Guest-9");
    }

    // =====================================================================
    // snapshot()
    // =====================================================================

    #[test]
    fn test_snapshot_carries_presence_fields_but_not_identity() {
        let options = JoinOptions {
            name: Some("Ada".into()),
            user_id: Some("u1".into()),
            x: Some(4.0),
            ..JoinOptions::default()
        };
        let presence = Presence::from_join(sid(2), &options);

        let snap = presence.snapshot(sid(2));

        assert_eq!(snap.session_id, sid(2));
        assert_eq!(snap.name, "Ada");
        assert_eq!(snap.x, 4.0);
        // PlayerSnapshot has no identity fields at all; this is a
        // compile-time guarantee, the assert documents the intent.
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("userId").is_none());
    }
}

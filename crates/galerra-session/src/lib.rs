//! Session state for the Galerra gallery server.
//!
//! This crate owns the answer to "who is in this room, and what do they
//! look like right now":
//!
//! 1. **Presence** ([`Presence`], [`Position`]) — one participant's
//!    transient state: display name, opaque identity strings, position,
//!    chosen avatar, with the validation rules for each.
//! 2. **Registry** ([`SessionRegistry`]) — the per-room collection of
//!    presences, with an identity index for O(1) duplicate lookup and
//!    join-order iteration for snapshots.
//!
//! There is no authentication here and no persistence: identity strings
//! arrive pre-trusted from the external auth layer, and everything in
//! this crate dies with the room that owns it.

mod presence;
mod registry;

pub use presence::{
    ALLOWED_CHARACTER_EXTENSIONS, DEFAULT_CHARACTER_FILE,
    DEFAULT_CHARACTER_PATH, Position, Presence, guest_name,
    valid_character_file, valid_character_path,
};
pub use registry::SessionRegistry;

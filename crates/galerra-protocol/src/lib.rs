//! Wire protocol for the Galerra gallery server.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`JoinOptions`],
//!   [`PlayerSnapshot`], [`ChatEntry`], [`SessionId`]) — the structures
//!   that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those events become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! The protocol layer knows nothing about connections or rooms; it only
//! knows shapes. Validation of event *contents* (finite coordinates, safe
//! avatar paths, chat length) happens above, in the session and room
//! layers. The exception is what the type system checks for free, like
//! the fixed [`SignalKind`] enumeration.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChatEntry, ClientEvent, JoinOptions, PlayerSnapshot, ServerEvent,
    SessionId, SignalKind,
};

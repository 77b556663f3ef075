//! Codec trait and implementations for serializing wire events.
//!
//! The rest of the stack never touches `serde_json` directly: it goes
//! through the [`Codec`] trait, so the encoding can be swapped (and tests
//! can decode what a fake sender captured) without changing any caller.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between event types and raw bytes.
///
/// `Send + Sync + 'static` because a codec is shared across connection
/// handler tasks for the life of the server. The methods are generic over
/// the value type: anything `Serialize` goes out, anything
/// `DeserializeOwned` comes in (owned, so the input buffer can be dropped
/// right after decoding).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or don't match the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// JSON keeps the wire human-readable: events show up legibly in browser
/// DevTools and in logs, which is worth far more during development than
/// the bytes a binary format would save. Behind the `json` feature flag
/// (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

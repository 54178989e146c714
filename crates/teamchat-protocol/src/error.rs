//! Error types for the protocol layer.
//!
//! Each Teamchat crate owns its error enum, so a `ProtocolError` always
//! means a frame could not be turned into (or out of) a typed event.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an event).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, or a field
    /// of the wrong JSON type. Missing optional fields are NOT decode
    /// errors; the room layer reports those.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

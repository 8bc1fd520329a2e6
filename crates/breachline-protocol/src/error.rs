//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating
/// protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown message tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule (e.g. a `Call`
    /// before the handshake).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A room code has the wrong length or characters outside the
    /// room-code alphabet.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),

    /// A user id is empty or contains a path separator.
    #[error("invalid user id {0:?}")]
    InvalidUid(String),
}

//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding or framing packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a packet into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown packet type,
    /// missing fields or a truncated payload.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A frame header announced more bytes than the receiver accepts.
    /// The stream cannot be resynchronised after this.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },
}

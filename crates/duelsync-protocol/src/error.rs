//! Error types for the protocol layer.
//!
//! Each duelsync crate defines its own error enum. A `ProtocolError` always
//! means the bytes were wrong (or too many of them), never that a socket
//! failed.

/// Errors that can occur while encoding, decoding, or framing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into payload bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning payload bytes into a Rust value).
    ///
    /// Malformed payloads, unknown message tags, and missing fields all
    /// land here. A read cycle that hits this error yields nothing.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A frame (header included) is larger than the packet ceiling.
    ///
    /// Raised by `pack` for an oversized outgoing message and by `unpack`
    /// when a length header announces more than the ceiling, which can only
    /// mean a corrupted stream.
    #[error("frame of {size} bytes exceeds the {max} byte packet limit")]
    FrameTooLarge { size: usize, max: usize },

    /// A self-contained packet (one datagram) ended in the middle of a frame.
    #[error("packet ends with {remaining} bytes of an incomplete frame")]
    TruncatedFrame { remaining: usize },
}

//! Codec trait and implementations for serializing/deserializing payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The framer doesn't care HOW a message is serialized. It only needs
//! something that implements [`Codec`] and it adds the length header around
//! whatever comes out.
//!
//! Currently we provide [`JsonCodec`]. A compact binary codec can be added
//! later without touching the framer or the channels.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → a codec can be moved into whichever thread performs
///   the blocking handshake and then back into the game thread.
/// - `'static` → the codec owns everything it needs.
///
/// `decode<T: DeserializeOwned>` means the decoded value doesn't borrow
/// from the input bytes, so the receive buffer can be reused right after.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into payload bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes payload bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON keeps the wire readable in a packet capture, which is worth more
/// than the bytes it costs at ten snapshots per second.
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use duelsync_protocol::{Codec, Event, EventBody, Identity, JsonCodec, Message};
///
/// let codec = JsonCodec;
///
/// let message = Message::Event(Event {
///     sender: Identity::CLIENT,
///     receiver: Identity::HOST,
///     body: EventBody::EatPerson { damage: 3 },
/// });
///
/// let bytes = codec.encode(&message).unwrap();
/// let decoded: Message = codec.decode(&bytes).unwrap();
/// assert_eq!(message, decoded);
/// ```
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

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Identity, Message, Setup};

    #[test]
    fn test_json_codec_round_trips_setup() {
        let message = Message::Setup(Setup {
            me: Identity::HOST,
            you: Identity::CLIENT,
            become_eater: true,
        });
        let bytes = JsonCodec.encode(&message).unwrap();
        let decoded: Message = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Message, _> = JsonCodec.decode(b"\x00\x01garbage");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}

//! Length-prefixed framing.
//!
//! A byte stream has no message boundaries of its own, so every encoded
//! message is wrapped in a frame:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u32 BE  │ payload (len bytes, codec)   │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! Because the boundary is a count and not a marker, the payload may contain
//! any byte sequence at all. There is nothing to escape.
//!
//! A frame, header included, never exceeds [`MAX_PACKET_SIZE`]. That ceiling
//! matches the receive buffer of a best-effort channel, where one datagram
//! must hold at least one whole frame.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Codec, ProtocolError};

/// The largest frame (header + payload) either peer will produce or accept.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Size of the big-endian length header in front of every payload.
pub const HEADER_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameBuffer
// ---------------------------------------------------------------------------

/// Bytes read from a stream that have not been decoded yet.
///
/// A stream read can stop anywhere: in the middle of a header or halfway
/// through a payload. The buffer keeps those trailing bytes until the rest
/// of the frame shows up on a later read.
#[derive(Debug, Default, Clone)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed by a complete frame.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drops everything buffered.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

// ---------------------------------------------------------------------------
// Framer
// ---------------------------------------------------------------------------

/// Packs values into frames and unpacks frames back into values.
///
/// The framer is generic over its [`Codec`], so the channel code that owns a
/// `Framer` never mentions JSON.
///
/// ```rust
/// use duelsync_protocol::{FrameBuffer, Framer, JsonCodec};
///
/// let framer = Framer::new(JsonCodec);
/// let mut buffer = FrameBuffer::new();
///
/// buffer.extend(&framer.pack(&"hello\n\nworld".to_string()).unwrap());
/// let out: Vec<String> = framer.unpack(&mut buffer).unwrap();
///
/// assert_eq!(out, vec!["hello\n\nworld".to_string()]);
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Framer<C> {
    codec: C,
}

impl<C: Codec> Framer<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Encodes one value into a single frame.
    ///
    /// # Errors
    /// - `ProtocolError::Encode` if the codec fails.
    /// - `ProtocolError::FrameTooLarge` if header + payload exceeds
    ///   [`MAX_PACKET_SIZE`]. Nothing is ever truncated to fit.
    pub fn pack<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.codec.encode(value)?;
        let size = HEADER_SIZE + payload.len();
        if size > MAX_PACKET_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: MAX_PACKET_SIZE,
            });
        }

        let mut frame = Vec::with_capacity(size);
        // `size <= MAX_PACKET_SIZE` was checked above, so the cast can't
        // overflow a u32.
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decodes every complete frame at the front of `buffer`, in arrival
    /// order, and removes them. A trailing partial frame stays in the
    /// buffer for the next call.
    ///
    /// Zero-length frames carry nothing and are skipped.
    ///
    /// # Errors
    /// - `ProtocolError::FrameTooLarge` if a header announces a frame above
    ///   the ceiling. The stream is corrupt and cannot be resynchronized.
    /// - `ProtocolError::Decode` if a payload doesn't decode.
    ///
    /// On error nothing is returned, not even the frames that decoded
    /// before the bad one.
    pub fn unpack<T: DeserializeOwned>(
        &self,
        buffer: &mut FrameBuffer,
    ) -> Result<Vec<T>, ProtocolError> {
        let (values, consumed) = self.decode_frames(&buffer.bytes)?;
        buffer.bytes.drain(..consumed);
        Ok(values)
    }

    /// Decodes a self-contained packet, such as one datagram.
    ///
    /// Unlike [`unpack`](Self::unpack) there is no "later read" to finish a
    /// partial frame, so leftover bytes are an error.
    ///
    /// # Errors
    /// Everything `unpack` returns, plus `ProtocolError::TruncatedFrame`.
    pub fn unpack_packet<T: DeserializeOwned>(
        &self,
        packet: &[u8],
    ) -> Result<Vec<T>, ProtocolError> {
        let (values, consumed) = self.decode_frames(packet)?;
        if consumed != packet.len() {
            return Err(ProtocolError::TruncatedFrame {
                remaining: packet.len() - consumed,
            });
        }
        Ok(values)
    }

    /// Walks `data` frame by frame. Returns the decoded values and how many
    /// bytes the complete frames covered.
    fn decode_frames<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<(Vec<T>, usize), ProtocolError> {
        let mut values = Vec::new();
        let mut offset = 0;

        while data.len() - offset >= HEADER_SIZE {
            let mut header = [0u8; HEADER_SIZE];
            header.copy_from_slice(&data[offset..offset + HEADER_SIZE]);
            let len = u32::from_be_bytes(header) as usize;

            // A corrupt header may announce close to `u32::MAX` bytes.
            let size = HEADER_SIZE.saturating_add(len);
            if size > MAX_PACKET_SIZE {
                return Err(ProtocolError::FrameTooLarge {
                    size,
                    max: MAX_PACKET_SIZE,
                });
            }
            if data.len() - offset < size {
                break;
            }

            let payload = &data[offset + HEADER_SIZE..offset + size];
            if !payload.is_empty() {
                values.push(self.codec.decode(payload)?);
            }
            offset += size;
        }

        Ok((values, offset))
    }
}

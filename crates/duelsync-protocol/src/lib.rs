//! Wire protocol for duelsync.
//!
//! This crate defines what two peers say to each other and how it is laid
//! out on the wire:
//!
//! - **Types** ([`Message`], [`Event`], [`Setup`], [`Snapshot`], etc.):
//!   the structures that travel between the host and the client.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a single message is
//!   turned into payload bytes and back.
//! - **Framer** ([`Framer`], [`FrameBuffer`]): how payloads are bounded on
//!   a byte stream: a 4-byte length header, then the payload, capped at
//!   [`MAX_PACKET_SIZE`].
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding,
//!   decoding, or framing.
//!
//! # Architecture
//!
//! The protocol layer sits below the transport. It knows nothing about
//! sockets, only about bytes:
//!
//! ```text
//! Message ──Codec──→ payload ──Framer──→ [len][payload] ──→ Channel (socket)
//! ```

mod codec;
mod error;
mod framer;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Users write `use duelsync_protocol::Message` rather than reaching into
// the submodules.

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use framer::{FrameBuffer, Framer, HEADER_SIZE, MAX_PACKET_SIZE};
pub use types::{
    EntityState, Event, EventBody, EventKind, Identity, Message, Setup,
    Snapshot, Vec2,
};

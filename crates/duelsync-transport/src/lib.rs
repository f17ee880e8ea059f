//! Transport layer for duelsync.
//!
//! Provides the [`Channel`] trait and its two implementations, one per
//! transport quality:
//!
//! - [`ReliableChannel`]: TCP. Ordered, nothing lost, nothing duplicated.
//!   Carries events and the handshake's setup message.
//! - [`BestEffortChannel`]: UDP with a tiny "connect" handshake of its
//!   own. Anything may be lost, reordered, or duplicated. Carries
//!   snapshots only.
//!
//! # Two phases
//!
//! `host()` and `connect()` block: they run once, before the game loop
//! starts. After that the socket is non-blocking, and `receive()` returns
//! whatever is available *right now*, usually nothing, without ever
//! waiting.

mod best_effort;
mod error;
mod reliable;

pub use best_effort::BestEffortChannel;
pub use error::TransportError;
pub use reliable::ReliableChannel;

use std::fmt;
use std::net::SocketAddr;

use serde::{Serialize, de::DeserializeOwned};

/// The delivery guarantee a channel provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelQuality {
    /// Delivered in order, no loss. TCP.
    Reliable,

    /// May be lost, reordered, or duplicated. UDP.
    BestEffort,
}

impl fmt::Display for ChannelQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => write!(f, "reliable"),
            Self::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// A connection-oriented, non-blocking pipe to exactly one peer.
///
/// Both implementations are built for one `(host, port)` address and one
/// peer. There is no reconnect: after an error, the channel is done.
///
/// `send` and `receive` are generic over the value type. The session layer
/// only ever sends `duelsync_protocol::Message`, but the channels
/// themselves don't care.
pub trait Channel {
    /// Which delivery guarantee this channel provides.
    fn quality(&self) -> ChannelQuality;

    /// Waits for the single peer at this channel's address, then switches
    /// to non-blocking mode. Blocks until the peer shows up.
    fn host(&mut self) -> Result<(), TransportError>;

    /// Reaches out to a peer that is hosting at this channel's address,
    /// then switches to non-blocking mode.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Frames `value` and writes it in a single call.
    fn send<T: Serialize>(&mut self, value: &T) -> Result<(), TransportError>;

    /// Drains every byte available right now and returns the values they
    /// decode to, in arrival order. An empty `Vec` is the normal result
    /// when nothing has arrived.
    fn receive<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, TransportError>;

    /// `true` once `host()` or `connect()` succeeded and until `close()`.
    fn ready(&self) -> bool;

    /// Releases the socket. Calling it on a closed channel does nothing.
    fn close(&mut self) -> Result<(), TransportError>;

    /// The bound local address, once there is a socket.
    fn local_addr(&self) -> Option<SocketAddr>;
}

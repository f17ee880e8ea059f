//! Error types for the session layer.

use duelsync_protocol::Identity;
use duelsync_transport::{ChannelQuality, TransportError};

/// Errors that can occur while establishing or running a session.
///
/// Apart from [`Transport`](Self::Transport), every variant is a protocol
/// violation: a correct peer never causes it, so it means a bug or a
/// corrupted stream. None of them can be recovered from.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A socket failed, the peer left, or the bytes didn't decode.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message arrived where a different one was required (for example
    /// an event while the client waits for its setup, or a setup after the
    /// session is established).
    #[error("expected {expected}, received {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// The host sent more than the one setup message.
    #[error("expected exactly one setup message, received {count}")]
    ExtraSetup { count: usize },

    /// A message showed up on the channel that must never carry it.
    #[error("{message} received on the {channel} channel")]
    WrongChannel {
        message: &'static str,
        channel: ChannelQuality,
    },

    /// The setup message assigned both peers the same identity.
    #[error("setup assigns the same identity {0} to both peers")]
    InvalidSetup(Identity),
}

impl SessionError {
    /// `true` for everything except transport failures.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

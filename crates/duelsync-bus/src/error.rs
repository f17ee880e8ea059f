//! Error types for the event bus.

use duelsync_protocol::Identity;

/// Errors that can occur while routing an event.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The event's sender is neither of the two peers in the session.
    ///
    /// Only two identities exist per session, so this is a protocol
    /// violation: a bug or a corrupted stream, never a recoverable state.
    #[error("event sender {sender} is neither me ({me}) nor you ({you})")]
    UnknownSender {
        sender: Identity,
        me: Identity,
        you: Identity,
    },
}

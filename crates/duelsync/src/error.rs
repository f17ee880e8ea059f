//! Unified error type for duelsync.

use duelsync_bus::BusError;
use duelsync_protocol::ProtocolError;
use duelsync_session::SessionError;
use duelsync_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuelsyncError {
    /// A socket failed or the peer went away.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes that couldn't be framed or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The handshake failed, or the peer broke the session protocol.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An event came from someone who isn't part of the session.
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl DuelsyncError {
    /// `true` when the peer (or a corrupted stream) broke the protocol,
    /// as opposed to the network failing underneath it.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Protocol(_) => false,
            Self::Session(err) => err.is_protocol_violation(),
            Self::Bus(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelsync_protocol::Identity;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: DuelsyncError = err.into();
        assert!(matches!(err, DuelsyncError::Transport(_)));
        assert!(err.to_string().contains("gone"));
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::FrameTooLarge { size: 5000, max: 4096 };
        let err: DuelsyncError = err.into();
        assert!(matches!(err, DuelsyncError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::ExtraSetup { count: 3 };
        let err: DuelsyncError = err.into();
        assert!(matches!(err, DuelsyncError::Session(_)));
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_from_bus_error() {
        let err = BusError::UnknownSender {
            sender: Identity(7),
            me: Identity::HOST,
            you: Identity::CLIENT,
        };
        let err: DuelsyncError = err.into();
        assert!(matches!(err, DuelsyncError::Bus(_)));
        assert!(err.is_protocol_violation());
        assert!(err.to_string().contains("#7"));
    }
}

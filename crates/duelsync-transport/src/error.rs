use std::net::SocketAddr;

use duelsync_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
///
/// Every variant is fatal to the session. "No data right now" on a
/// non-blocking socket is not an error and never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `send`/`receive` was called before `host()` or `connect()` finished,
    /// or after `close()`.
    #[error("channel is not connected")]
    NotReady,

    /// The peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Binding the local address failed.
    #[error("bind {addr} failed: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Accepting (or waiting for) the peer failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to the remote address failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The bytes on the wire couldn't be framed or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

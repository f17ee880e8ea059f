//! Reliable channel over a non-blocking TCP stream.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use duelsync_protocol::{FrameBuffer, Framer, JsonCodec, MAX_PACKET_SIZE};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Channel, ChannelQuality, TransportError};

/// A [`Channel`] backed by one TCP connection.
///
/// Frames can straddle reads, so the channel keeps a [`FrameBuffer`] of
/// undecoded bytes between `receive()` calls.
#[derive(Debug)]
pub struct ReliableChannel {
    addr: SocketAddr,
    stream: Option<TcpStream>,
    framer: Framer<JsonCodec>,
    pending: FrameBuffer,
    /// The peer sent EOF. Whatever was read before it is still delivered;
    /// the next `receive()` reports the closed connection.
    peer_closed: bool,
}

impl ReliableChannel {
    /// Creates a channel for `addr`. No socket is opened until `host()` or
    /// `connect()`.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stream: None,
            framer: Framer::new(JsonCodec),
            pending: FrameBuffer::new(),
            peer_closed: false,
        }
    }

    /// The address this channel hosts on or connects to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Puts a freshly established stream into steady-state mode.
    fn adopt(&mut self, stream: TcpStream) -> Result<(), TransportError> {
        // Events are tiny and latency matters more than batching.
        stream.set_nodelay(true).map_err(TransportError::AcceptFailed)?;
        stream
            .set_nonblocking(true)
            .map_err(TransportError::AcceptFailed)?;
        self.stream = Some(stream);
        self.pending.clear();
        self.peer_closed = false;
        Ok(())
    }
}

impl Channel for ReliableChannel {
    fn quality(&self) -> ChannelQuality {
        ChannelQuality::Reliable
    }

    fn host(&mut self) -> Result<(), TransportError> {
        let listener =
            TcpListener::bind(self.addr).map_err(|source| {
                TransportError::BindFailed {
                    addr: self.addr,
                    source,
                }
            })?;
        tracing::info!(addr = %self.addr, "reliable channel waiting for peer");

        // Exactly one peer per session. The listener is dropped as soon as
        // it has produced that peer.
        let (stream, peer) =
            listener.accept().map_err(TransportError::AcceptFailed)?;
        self.adopt(stream)?;

        tracing::info!(%peer, "reliable channel accepted peer");
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let stream = TcpStream::connect(self.addr).map_err(|source| {
            TransportError::ConnectFailed {
                addr: self.addr,
                source,
            }
        })?;
        self.adopt(stream)?;

        tracing::info!(addr = %self.addr, "reliable channel connected");
        Ok(())
    }

    fn send<T: Serialize>(&mut self, value: &T) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotReady)?;
        let frame = self.framer.pack(value)?;

        // A frame is at most 4 KiB. If the send buffer fills mid-frame the
        // write fails with `WouldBlock`, part of the frame is already on the
        // wire, and the stream can't be resynced: the error is fatal.
        stream.write_all(&frame).map_err(TransportError::SendFailed)?;

        tracing::trace!(bytes = frame.len(), "reliable frame sent");
        Ok(())
    }

    fn receive<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, TransportError> {
        if self.peer_closed {
            return Err(TransportError::ConnectionClosed(
                "peer closed the reliable channel".into(),
            ));
        }
        let stream = self.stream.as_mut().ok_or(TransportError::NotReady)?;

        let mut chunk = [0u8; MAX_PACKET_SIZE];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => self.pending.extend(&chunk[..n]),
                // Nothing more to read right now. The normal way out.
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::ReceiveFailed(e)),
            }
        }

        let values: Vec<T> = self.framer.unpack(&mut self.pending)?;
        if values.is_empty() && self.peer_closed {
            return Err(TransportError::ConnectionClosed(
                "peer closed the reliable channel".into(),
            ));
        }
        if !values.is_empty() {
            tracing::trace!(count = values.len(), "reliable frames received");
        }
        Ok(values)
    }

    fn ready(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; there is nothing to flush then.
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                if e.kind() != ErrorKind::NotConnected {
                    tracing::debug!(error = %e, "reliable shutdown failed");
                }
            }
            tracing::debug!(addr = %self.addr, "reliable channel closed");
        }
        self.pending.clear();
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.local_addr().ok())
    }
}

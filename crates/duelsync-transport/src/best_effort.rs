//! Best-effort channel over a non-blocking UDP socket.
//!
//! UDP has no notion of a connection, so this channel layers a minimal one
//! on top, mirroring what TCP does:
//!
//! ```text
//! host side                              connecting side
//! ─────────                              ───────────────
//! bind(addr)
//! recv_from()  ◄──── empty probe ─────── connect(addr); send([])
//! connect(probe source)
//! ```
//!
//! After that both sockets are `connect`ed to each other, so the kernel
//! drops datagrams from any third party.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use duelsync_protocol::{Framer, JsonCodec, MAX_PACKET_SIZE};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Channel, ChannelQuality, TransportError};

/// A [`Channel`] backed by one UDP socket locked to one peer.
///
/// Every datagram carries whole frames. One that doesn't is corrupt, not
/// "to be continued".
#[derive(Debug)]
pub struct BestEffortChannel {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
    /// `true` once the socket is locked to the peer and non-blocking.
    connected: bool,
    framer: Framer<JsonCodec>,
}

impl BestEffortChannel {
    /// Creates a channel for `addr`. No socket is opened yet.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            socket: None,
            connected: false,
            framer: Framer::new(JsonCodec),
        }
    }

    /// The address this channel hosts on or connects to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Binds the hosting socket without waiting for the peer.
    ///
    /// `host()` calls this itself when needed. Calling it earlier lets the
    /// host claim the port before telling the peer to probe it, so the probe
    /// can't arrive at an unbound port and vanish.
    pub fn bind(&mut self) -> Result<(), TransportError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket =
            UdpSocket::bind(self.addr).map_err(|source| {
                TransportError::BindFailed {
                    addr: self.addr,
                    source,
                }
            })?;
        tracing::debug!(addr = %self.addr, "best-effort channel bound");
        self.socket = Some(socket);
        Ok(())
    }
}

impl Channel for BestEffortChannel {
    fn quality(&self) -> ChannelQuality {
        ChannelQuality::BestEffort
    }

    fn host(&mut self) -> Result<(), TransportError> {
        self.bind()?;
        let socket = self.socket.as_ref().ok_or(TransportError::NotReady)?;
        tracing::info!(addr = %self.addr, "best-effort channel waiting for probe");

        // Block until the first datagram. Its content doesn't matter (it's
        // normally the empty probe); its source address does.
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let peer = loop {
            match socket.recv_from(&mut buf) {
                Ok((_, peer)) => break peer,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::AcceptFailed(e)),
            }
        };

        socket.connect(peer).map_err(|source| {
            TransportError::ConnectFailed { addr: peer, source }
        })?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::AcceptFailed)?;
        self.connected = true;

        tracing::info!(%peer, "best-effort channel locked to peer");
        Ok(())
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        // Any local port will do; the host learns it from the probe.
        let local: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(|source| {
            TransportError::BindFailed {
                addr: local,
                source,
            }
        })?;
        socket.connect(self.addr).map_err(|source| {
            TransportError::ConnectFailed {
                addr: self.addr,
                source,
            }
        })?;

        // The probe is what unblocks the host's `host()`.
        socket.send(&[]).map_err(TransportError::SendFailed)?;
        socket.set_nonblocking(true).map_err(|source| {
            TransportError::ConnectFailed {
                addr: self.addr,
                source,
            }
        })?;

        self.socket = Some(socket);
        self.connected = true;
        tracing::info!(addr = %self.addr, "best-effort channel connected");
        Ok(())
    }

    fn send<T: Serialize>(&mut self, value: &T) -> Result<(), TransportError> {
        let socket = match (&self.socket, self.connected) {
            (Some(socket), true) => socket,
            _ => return Err(TransportError::NotReady),
        };
        let frame = self.framer.pack(value)?;

        match socket.send(&frame) {
            Ok(_) => {
                tracing::trace!(bytes = frame.len(), "best-effort frame sent");
                Ok(())
            }
            // A full send buffer drops the datagram. On this channel that's
            // the same as losing it on the wire.
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::trace!("best-effort frame dropped, send buffer full");
                Ok(())
            }
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    fn receive<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, TransportError> {
        let socket = match (&self.socket, self.connected) {
            (Some(socket), true) => socket,
            _ => return Err(TransportError::NotReady),
        };

        let mut values = Vec::new();
        let mut buf = [0u8; MAX_PACKET_SIZE];
        loop {
            match socket.recv(&mut buf) {
                // Empty datagrams are late or duplicated probes.
                Ok(0) => continue,
                Ok(n) => values.extend(self.framer.unpack_packet(&buf[..n])?),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::ReceiveFailed(e)),
            }
        }

        if !values.is_empty() {
            tracing::trace!(count = values.len(), "best-effort frames received");
        }
        Ok(values)
    }

    fn ready(&self) -> bool {
        self.socket.is_some() && self.connected
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.socket.take().is_some() {
            tracing::debug!(addr = %self.addr, "best-effort channel closed");
        }
        self.connected = false;
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

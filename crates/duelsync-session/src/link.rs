//! Links: what the per-tick loop talks through once a session exists.
//!
//! A [`Link`] hides whether there is a real peer at all. The sync loop
//! sends events and snapshots and drains what came back; it can't tell a
//! [`NetworkLink`] from a [`SandboxLink`].

use std::collections::VecDeque;

use duelsync_protocol::{Event, Message, Snapshot};
use duelsync_transport::{
    BestEffortChannel, Channel, ChannelQuality, ReliableChannel,
};

use crate::SessionError;

/// The steady-state interface of an established session.
///
/// No method blocks. "Nothing arrived" is an empty `Vec`.
pub trait Link {
    /// Commits an event to the reliable path.
    fn send_event(&mut self, event: &Event) -> Result<(), SessionError>;

    /// Sends a snapshot on the best-effort path. It may never arrive.
    fn send_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SessionError>;

    /// Every snapshot that has arrived since the last call, in receive order.
    fn receive_snapshots(&mut self) -> Result<Vec<Snapshot>, SessionError>;

    /// Every event that has arrived since the last call, in send order.
    fn receive_events(&mut self) -> Result<Vec<Event>, SessionError>;

    /// Tears the link down. The session is over afterwards.
    fn close(&mut self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// NetworkLink
// ---------------------------------------------------------------------------

/// The channel pair of a networked session.
///
/// The link enforces which traffic may use which channel: snapshots only on
/// the best-effort channel, events only on the reliable one. Anything else
/// is a protocol violation.
#[derive(Debug)]
pub struct NetworkLink {
    reliable: ReliableChannel,
    best_effort: BestEffortChannel,
}

impl NetworkLink {
    pub(crate) fn new(
        reliable: ReliableChannel,
        best_effort: BestEffortChannel,
    ) -> Self {
        Self {
            reliable,
            best_effort,
        }
    }

    /// `true` while both channels are open.
    pub fn ready(&self) -> bool {
        self.reliable.ready() && self.best_effort.ready()
    }
}

impl Link for NetworkLink {
    fn send_event(&mut self, event: &Event) -> Result<(), SessionError> {
        self.reliable.send(&Message::Event(event.clone()))?;
        Ok(())
    }

    fn send_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SessionError> {
        self.best_effort.send(&Message::Snapshot(*snapshot))?;
        Ok(())
    }

    fn receive_snapshots(&mut self) -> Result<Vec<Snapshot>, SessionError> {
        let messages: Vec<Message> = self.best_effort.receive()?;
        messages
            .into_iter()
            .map(|message| match message {
                Message::Snapshot(snapshot) => Ok(snapshot),
                other => Err(SessionError::WrongChannel {
                    message: other.name(),
                    channel: ChannelQuality::BestEffort,
                }),
            })
            .collect()
    }

    fn receive_events(&mut self) -> Result<Vec<Event>, SessionError> {
        let messages: Vec<Message> = self.reliable.receive()?;
        messages
            .into_iter()
            .map(|message| match message {
                Message::Event(event) => Ok(event),
                // The one setup message was consumed by the handshake.
                Message::Setup(_) => Err(SessionError::UnexpectedMessage {
                    expected: "Event",
                    got: "Setup",
                }),
                Message::Snapshot(_) => Err(SessionError::WrongChannel {
                    message: "Snapshot",
                    channel: ChannelQuality::Reliable,
                }),
            })
            .collect()
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.best_effort.close()?;
        self.reliable.close()?;
        tracing::info!("network link closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SandboxLink
// ---------------------------------------------------------------------------

/// A link with no peer: every sent event comes straight back as received.
///
/// Snapshots have nowhere to go and are dropped; there is no remote state
/// to refresh in a single-process game.
#[derive(Debug, Default)]
pub struct SandboxLink {
    looped: VecDeque<Event>,
    dropped_snapshots: u64,
}

impl SandboxLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events sent but not yet drained by `receive_events`.
    pub fn pending(&self) -> usize {
        self.looped.len()
    }

    /// How many snapshots were sent into the void.
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots
    }
}

impl Link for SandboxLink {
    fn send_event(&mut self, event: &Event) -> Result<(), SessionError> {
        self.looped.push_back(event.clone());
        Ok(())
    }

    fn send_snapshot(&mut self, _snapshot: &Snapshot) -> Result<(), SessionError> {
        self.dropped_snapshots += 1;
        Ok(())
    }

    fn receive_snapshots(&mut self) -> Result<Vec<Snapshot>, SessionError> {
        Ok(Vec::new())
    }

    fn receive_events(&mut self) -> Result<Vec<Event>, SessionError> {
        Ok(self.looped.drain(..).collect())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.looped.clear();
        Ok(())
    }
}

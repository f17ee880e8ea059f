//! Core protocol types for duelsync's wire format.
//!
//! Every type here travels "on the wire": it gets serialized by a codec,
//! framed, written to a socket, and rebuilt on the other peer.
//!
//! There are exactly three kinds of traffic:
//!
//! - [`Event`]: a discrete game happening (someone got eaten, roles
//!   flipped, the game ended). Must arrive, rides the reliable channel.
//! - [`Setup`]: sent once by the host during the handshake to tell the
//!   client who it is.
//! - [`Snapshot`]: the sender's latest positions/velocities. May be lost;
//!   only the newest one matters. Rides the best-effort channel.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Names a peer within one session.
///
/// This is a "newtype wrapper" around `u8`: the value only means something
/// between the two peers that agreed on it during the handshake, so it gets
/// its own type instead of floating around as a bare integer.
///
/// `#[serde(transparent)]` serializes `Identity(2)` as just `2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(pub u8);

impl Identity {
    /// The single identity used by a sandbox session, where "me" and "you"
    /// are the same process.
    pub const LOCAL: Identity = Identity(0);

    /// The identity the host assigns to itself.
    pub const HOST: Identity = Identity(1);

    /// The identity the host assigns to the peer that connects to it.
    pub const CLIENT: Identity = Identity(2);
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Kinematic value types
// ---------------------------------------------------------------------------

/// A 2D vector (position or velocity).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The part of a token the other peer needs to draw it: where it is, where
/// it's heading, and how big it is.
///
/// The remote side never gets the token's full game object, only these
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// The closed set of event kinds.
///
/// The event bus indexes its handler lists by this enum, so adding a kind
/// here forces every `match` over kinds to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    EatPerson,
    FlipRoles,
    GameOver,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 3] =
        [EventKind::EatPerson, EventKind::FlipRoles, EventKind::GameOver];

    /// A dense index (`0..ALL.len()`) for table lookups.
    pub fn index(self) -> usize {
        match self {
            Self::EatPerson => 0,
            Self::FlipRoles => 1,
            Self::GameOver => 2,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EatPerson => write!(f, "EatPerson"),
            Self::FlipRoles => write!(f, "FlipRoles"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}

/// Variant-specific data carried by an [`Event`].
///
/// `#[serde(tag = "kind")]` produces internally tagged JSON:
///   `{ "kind": "EatPerson", "damage": 3 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventBody {
    /// The eater caught their lunch. Sent by the eater's peer. Damages the
    /// person by `damage` health points.
    EatPerson { damage: u32 },

    /// Both peers switch roles at the same time. Sent by the person's peer.
    FlipRoles,

    /// The game is over and the current eater won. Sent by the winner.
    GameOver,
}

impl EventBody {
    /// Which kind of event this is.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EatPerson { .. } => EventKind::EatPerson,
            Self::FlipRoles => EventKind::FlipRoles,
            Self::GameOver => EventKind::GameOver,
        }
    }
}

/// A discrete game event.
///
/// `sender` and `receiver` are session identities, not game objects. The
/// event bus maps them to whatever the game uses for players when the event
/// is dispatched, without ever rewriting these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub sender: Identity,
    pub receiver: Identity,
    pub body: EventBody,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// The host's one-shot identity assignment.
///
/// Written from the host's point of view: `me` is the host, `you` is the
/// client. The client adopts the mirror image (`me = setup.you`,
/// `you = setup.me`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    pub me: Identity,
    pub you: Identity,
    /// `true` when the receiving peer starts the game as the eater.
    pub become_eater: bool,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The sender's latest view of the tokens it owns.
///
/// No sequence number, no history: a snapshot replaces whatever the
/// receiver had before, even if it is older than what it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// The sender's own player token.
    pub player: EntityState,
    /// The shared objective token.
    pub objective: EntityState,
}

// ---------------------------------------------------------------------------
// Message: the top-level wire type
// ---------------------------------------------------------------------------

/// Every frame on the wire decodes to one `Message`.
///
/// `#[serde(tag = "type")]` produces:
///   `{ "type": "Event", "sender": 2, "receiver": 1, "body": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    Event(Event),
    Setup(Setup),
    Snapshot(Snapshot),
}

impl Message {
    /// A short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Event(_) => "Event",
            Self::Setup(_) => "Setup",
            Self::Snapshot(_) => "Snapshot",
        }
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<Setup> for Message {
    fn from(setup: Setup) -> Self {
        Self::Setup(setup)
    }
}

impl From<Snapshot> for Message {
    fn from(snapshot: Snapshot) -> Self {
        Self::Snapshot(snapshot)
    }
}

// =========================================================================
// Tests
// =========================================================================

//! Session types: what a finished handshake leaves behind, and how to
//! configure one.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use duelsync_protocol::Identity;

/// The port a host listens on when no offset is given.
pub const DEFAULT_PORT: u16 = 11249;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The role a peer starts the game in.
///
/// When roles are assigned, exactly one of the two peers starts as the
/// [`Eater`](Role::Eater). Game rules may flip roles later; this layer
/// only hands out the starting one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Person,
    Eater,
}

impl Role {
    pub fn is_eater(self) -> bool {
        matches!(self, Self::Eater)
    }

    /// The role the other peer has when this one is `self`.
    pub fn opposite(self) -> Self {
        match self {
            Self::Person => Self::Eater,
            Self::Eater => Self::Person,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Eater => write!(f, "eater"),
        }
    }
}

/// How the host picks the starting roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleAssignment {
    /// 50/50: either side may start as the eater.
    #[default]
    CoinFlip,
    /// The host always starts as the eater.
    HostEater,
    /// The client always starts as the eater.
    ClientEater,
    /// Nobody is assigned the eater role; both start as persons.
    Disabled,
}

impl RoleAssignment {
    /// Resolves the assignment into the host's starting role, or `None`
    /// when roles are disabled.
    pub(crate) fn host_role(self) -> Option<Role> {
        use rand::Rng;

        match self {
            Self::CoinFlip => {
                let heads = rand::rng().random_bool(0.5);
                Some(if heads { Role::Eater } else { Role::Person })
            }
            Self::HostEater => Some(Role::Eater),
            Self::ClientEater => Some(Role::Person),
            Self::Disabled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Which side of the handshake this peer played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    Host,
    Client,
    /// No peer and no sockets: everything loops back locally.
    Sandbox,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Client => write!(f, "client"),
            Self::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// The identities and starting role fixed by the handshake.
///
/// Immutable: the fields are private and there are no setters. A `Session`
/// is passed by reference to whatever needs to know who "me" and "you" are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    me: Identity,
    you: Identity,
    role: Role,
    mode: SessionMode,
}

impl Session {
    /// Builds a session by hand. [`host`](crate::host) and
    /// [`join`](crate::join) are the usual way to get one.
    pub fn new(
        me: Identity,
        you: Identity,
        role: Role,
        mode: SessionMode,
    ) -> Self {
        Self {
            me,
            you,
            role,
            mode,
        }
    }

    /// The session of a sandbox: one identity playing both sides.
    pub fn sandbox() -> Self {
        Self::new(
            Identity::LOCAL,
            Identity::LOCAL,
            Role::Person,
            SessionMode::Sandbox,
        )
    }

    /// This peer's identity.
    pub fn me(&self) -> Identity {
        self.me
    }

    /// The other peer's identity.
    pub fn you(&self) -> Identity {
        self.you
    }

    /// This peer's starting role.
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_sandbox(&self) -> bool {
        self.mode == SessionMode::Sandbox
    }
}

// ---------------------------------------------------------------------------
// HandshakeConfig
// ---------------------------------------------------------------------------

/// Configuration for [`host`](crate::host) and [`join`](crate::join).
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Where the host listens and the client connects. Both channels use
    /// this same address, one over TCP and one over UDP.
    pub addr: SocketAddr,

    /// How the host picks starting roles. Ignored by the client.
    pub roles: RoleAssignment,

    /// How long the client sleeps between polls while it waits for the
    /// host's setup message.
    pub setup_poll_interval: Duration,
}

impl HandshakeConfig {
    /// A config for `addr` with default settings.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    pub fn with_roles(mut self, roles: RoleAssignment) -> Self {
        self.roles = roles;
        self
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            roles: RoleAssignment::default(),
            setup_poll_interval: Duration::from_millis(1),
        }
    }
}

// ---------------------------------------------------------------------------
// HandshakeState
// ---------------------------------------------------------------------------

/// Where a handshake is.
///
/// The two roles walk different paths to the same end:
///
/// ```text
/// host:    Idle ─→ AwaitingPeer ─────────────────→ Established
/// client:  Idle ─→ Connecting ─→ AwaitingSetup ──→ Established
/// ```
///
/// `Established` is terminal. There is no way back and no re-handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingPeer,
    Connecting,
    AwaitingSetup,
    Established,
}

impl HandshakeState {
    /// Returns `true` if `self → target` is a step the handshake for `mode`
    /// may take.
    pub fn can_transition_to(self, target: Self, mode: SessionMode) -> bool {
        use HandshakeState::*;

        matches!(
            (mode, self, target),
            (SessionMode::Host, Idle, AwaitingPeer)
                | (SessionMode::Host, AwaitingPeer, Established)
                | (SessionMode::Client, Idle, Connecting)
                | (SessionMode::Client, Connecting, AwaitingSetup)
                | (SessionMode::Client, AwaitingSetup, Established)
                | (SessionMode::Sandbox, Idle, Established)
        )
    }

    pub fn is_established(self) -> bool {
        matches!(self, Self::Established)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingPeer => write!(f, "AwaitingPeer"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingSetup => write!(f, "AwaitingSetup"),
            Self::Established => write!(f, "Established"),
        }
    }
}

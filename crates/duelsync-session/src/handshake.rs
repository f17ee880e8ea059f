//! The one-time, blocking handshake.
//!
//! ```text
//! host H                                   client C
//! ──────                                   ────────
//! reliable.host()  ◄───── TCP connect ──── reliable.connect()
//! me=1, you=2, pick roles
//! best_effort.bind()
//! Setup{me:1, you:2, eater?} ────────────► poll until Setup, me=2, you=1
//! best_effort.host() ◄──── UDP probe ───── best_effort.connect()
//! Established                              Established
//! ```
//!
//! The best-effort channel is only opened once the setup message is on the
//! reliable channel. A snapshot can therefore never reach the client before
//! the client knows its own identity.

use std::thread;

use duelsync_protocol::{Identity, Message, Setup};
use duelsync_transport::{BestEffortChannel, Channel, ReliableChannel};

use crate::{
    HandshakeConfig, HandshakeState, Link, NetworkLink, Role, SandboxLink,
    Session, SessionError, SessionMode,
};

/// A finished handshake: the agreed session plus the link to drive.
#[derive(Debug)]
pub struct Established<L: Link> {
    pub session: Session,
    pub link: L,
}

impl<L: Link> Established<L> {
    pub fn into_parts(self) -> (Session, L) {
        (self.session, self.link)
    }
}

/// Tracks and logs progress through [`HandshakeState`].
struct Progress {
    mode: SessionMode,
    state: HandshakeState,
}

impl Progress {
    fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            state: HandshakeState::Idle,
        }
    }

    fn enter(&mut self, next: HandshakeState) {
        debug_assert!(
            self.state.can_transition_to(next, self.mode),
            "{} handshake cannot go from {} to {}",
            self.mode,
            self.state,
            next
        );
        tracing::debug!(mode = %self.mode, from = %self.state, to = %next, "handshake");
        self.state = next;
    }
}

/// Hosts a session at `config.addr`.
///
/// Blocks until a peer connects on both channels. The host is always
/// [`Identity::HOST`] and the peer [`Identity::CLIENT`].
///
/// # Errors
/// Any [`SessionError::Transport`] raised while binding, accepting, or
/// sending the setup message.
pub fn host(
    config: &HandshakeConfig,
) -> Result<Established<NetworkLink>, SessionError> {
    let mut progress = Progress::new(SessionMode::Host);
    let mut reliable = ReliableChannel::new(config.addr);
    let mut best_effort = BestEffortChannel::new(config.addr);

    progress.enter(HandshakeState::AwaitingPeer);
    reliable.host()?;

    let me = Identity::HOST;
    let you = Identity::CLIENT;
    let host_role = config.roles.host_role();
    let role = host_role.unwrap_or_default();
    let setup = Setup {
        me,
        you,
        become_eater: host_role.is_some_and(|r| r.opposite().is_eater()),
    };

    // Claim the UDP port before the client learns it may probe it. The
    // channel isn't open until `host()` below sees that probe.
    best_effort.bind()?;
    reliable.send(&Message::Setup(setup))?;
    tracing::info!(%me, %you, %role, "setup sent");

    best_effort.host()?;
    progress.enter(HandshakeState::Established);

    let session = Session::new(me, you, role, SessionMode::Host);
    tracing::info!(%me, %you, %role, "hosted session established");
    Ok(Established {
        session,
        link: NetworkLink::new(reliable, best_effort),
    })
}

/// Joins the session hosted at `config.addr`.
///
/// Blocks until the host's setup message arrives. The identities are the
/// mirror of what the host wrote into it.
///
/// # Errors
/// - [`SessionError::Transport`] if connecting or receiving fails.
/// - [`SessionError::UnexpectedMessage`], [`SessionError::ExtraSetup`] or
///   [`SessionError::InvalidSetup`] if the host breaks the protocol.
pub fn join(
    config: &HandshakeConfig,
) -> Result<Established<NetworkLink>, SessionError> {
    let mut progress = Progress::new(SessionMode::Client);
    let mut reliable = ReliableChannel::new(config.addr);
    let mut best_effort = BestEffortChannel::new(config.addr);

    progress.enter(HandshakeState::Connecting);
    reliable.connect()?;

    progress.enter(HandshakeState::AwaitingSetup);
    let setup = await_setup(&mut reliable, config)?;

    // Mirror image of the host's point of view.
    let me = setup.you;
    let you = setup.me;
    let role = if setup.become_eater {
        Role::Eater
    } else {
        Role::Person
    };

    best_effort.connect()?;
    progress.enter(HandshakeState::Established);

    let session = Session::new(me, you, role, SessionMode::Client);
    tracing::info!(%me, %you, %role, "joined session established");
    Ok(Established {
        session,
        link: NetworkLink::new(reliable, best_effort),
    })
}

/// A session with no peer at all. Never touches a socket.
pub fn sandbox() -> Established<SandboxLink> {
    let mut progress = Progress::new(SessionMode::Sandbox);
    progress.enter(HandshakeState::Established);
    tracing::info!("sandbox session established");
    Established {
        session: Session::sandbox(),
        link: SandboxLink::new(),
    }
}

/// Polls the reliable channel until the host's setup message shows up.
fn await_setup(
    reliable: &mut ReliableChannel,
    config: &HandshakeConfig,
) -> Result<Setup, SessionError> {
    loop {
        let mut batch: Vec<Message> = reliable.receive()?;
        match batch.len() {
            0 => thread::sleep(config.setup_poll_interval),
            1 => {
                return match batch.remove(0) {
                    Message::Setup(setup) if setup.me == setup.you => {
                        Err(SessionError::InvalidSetup(setup.me))
                    }
                    Message::Setup(setup) => Ok(setup),
                    other => Err(SessionError::UnexpectedMessage {
                        expected: "Setup",
                        got: other.name(),
                    }),
                };
            }
            count => return Err(SessionError::ExtraSetup { count }),
        }
    }
}

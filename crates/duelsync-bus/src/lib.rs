//! Typed publish/subscribe for game events.
//!
//! Game rules register handlers per [`EventKind`] and per [`Direction`]:
//!
//! - **Incoming** handlers run for events the peer sent us.
//! - **Outgoing** handlers run for events we just committed to the wire.
//!
//! Before a handler sees an event, the event's session identities are
//! translated into the game's own notion of a player (the [`Roster`]).
//! That translation is the pure function [`route`]: it builds a fresh
//! [`Routed`] and leaves the event untouched, so it doesn't matter whether
//! an event is dispatched before or after it is serialized.

mod error;

pub use error::BusError;

use std::fmt;

use duelsync_protocol::{Event, EventKind};
use duelsync_session::Session;

// ---------------------------------------------------------------------------
// Direction / Roster / Routed
// ---------------------------------------------------------------------------

/// Which way an event is travelling relative to this peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// The game's view of the two peers.
///
/// `E` is whatever the game uses to name a player: an index, a handle, an
/// `Rc` to a player object. The bus only clones it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster<E> {
    /// The player controlled by this process.
    pub local: E,
    /// The player controlled by the peer.
    pub remote: E,
}

/// An event with its sender and receiver translated into game players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed<'a, E> {
    pub sender: E,
    pub receiver: E,
    pub event: &'a Event,
}

/// Translates an event's session identities into roster entries.
///
/// | `event.sender`   | result                  |
/// |------------------|-------------------------|
/// | `session.me()`   | `(local, remote)`       |
/// | `session.you()`  | `(remote, local)`       |
/// | anything else    | `BusError::UnknownSender` |
///
/// In a sandbox `me == you`, so the first row always wins; pass a roster
/// whose `remote` is the local player there.
pub fn route<'a, E: Clone>(
    session: &Session,
    roster: &Roster<E>,
    event: &'a Event,
) -> Result<Routed<'a, E>, BusError> {
    let (sender, receiver) = if event.sender == session.me() {
        (roster.local.clone(), roster.remote.clone())
    } else if event.sender == session.you() {
        (roster.remote.clone(), roster.local.clone())
    } else {
        return Err(BusError::UnknownSender {
            sender: event.sender,
            me: session.me(),
            you: session.you(),
        });
    };

    Ok(Routed {
        sender,
        receiver,
        event,
    })
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A registered handler. It gets the caller's context (typically the game
/// world) mutably, and the routed event.
pub type Handler<C, E> = Box<dyn FnMut(&mut C, &Routed<'_, E>)>;

const KINDS: usize = EventKind::ALL.len();

/// Handler lists indexed by event kind, one table per direction.
///
/// Registration only appends: handlers run in the order they were
/// registered and there is no way to remove one.
pub struct EventBus<C, E> {
    incoming: [Vec<Handler<C, E>>; KINDS],
    outgoing: [Vec<Handler<C, E>>; KINDS],
}

impl<C, E: Clone> EventBus<C, E> {
    pub fn new() -> Self {
        Self {
            incoming: Default::default(),
            outgoing: Default::default(),
        }
    }

    /// Appends one incoming and one outgoing handler for `kind`.
    pub fn register<I, O>(&mut self, kind: EventKind, incoming: I, outgoing: O)
    where
        I: FnMut(&mut C, &Routed<'_, E>) + 'static,
        O: FnMut(&mut C, &Routed<'_, E>) + 'static,
    {
        self.on(kind, Direction::Incoming, incoming);
        self.on(kind, Direction::Outgoing, outgoing);
    }

    /// Appends a handler for one kind and one direction.
    pub fn on<F>(&mut self, kind: EventKind, direction: Direction, handler: F)
    where
        F: FnMut(&mut C, &Routed<'_, E>) + 'static,
    {
        self.table_mut(direction)[kind.index()].push(Box::new(handler));
        tracing::debug!(%kind, %direction, "event handler registered");
    }

    /// How many handlers are registered for `kind` in `direction`.
    pub fn handler_count(&self, kind: EventKind, direction: Direction) -> usize {
        self.table(direction)[kind.index()].len()
    }

    /// Routes `event` and runs every handler registered for its kind in
    /// `direction`, in registration order. Returns how many ran.
    ///
    /// # Errors
    /// [`BusError::UnknownSender`] if the sender isn't part of `session`.
    /// No handler runs in that case.
    pub fn dispatch(
        &mut self,
        direction: Direction,
        ctx: &mut C,
        session: &Session,
        roster: &Roster<E>,
        event: &Event,
    ) -> Result<usize, BusError> {
        let routed = route(session, roster, event)?;
        let kind = event.kind();

        let handlers = &mut self.table_mut(direction)[kind.index()];
        for handler in handlers.iter_mut() {
            handler(&mut *ctx, &routed);
        }

        tracing::trace!(%kind, %direction, handlers = handlers.len(), "event dispatched");
        Ok(handlers.len())
    }

    fn table(&self, direction: Direction) -> &[Vec<Handler<C, E>>; KINDS] {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    fn table_mut(
        &mut self,
        direction: Direction,
    ) -> &mut [Vec<Handler<C, E>>; KINDS] {
        match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        }
    }
}

impl<C, E: Clone> Default for EventBus<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> fmt::Debug for EventBus<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |table: &[Vec<Handler<C, E>>; KINDS]| {
            table.iter().map(Vec::len).collect::<Vec<_>>()
        };
        f.debug_struct("EventBus")
            .field("incoming", &counts(&self.incoming))
            .field("outgoing", &counts(&self.outgoing))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelsync_protocol::{EventBody, Identity};
    use duelsync_session::{Role, Session, SessionMode};

    /// Player names stand in for the game's player objects.
    fn roster() -> Roster<&'static str> {
        Roster {
            local: "me",
            remote: "you",
        }
    }

    /// A session as the host sees it: me = 1, you = 2.
    fn host_session() -> Session {
        Session::new(Identity::HOST, Identity::CLIENT, Role::Person, SessionMode::Host)
    }

    fn event(sender: Identity, body: EventBody) -> Event {
        Event {
            sender,
            receiver: Identity::HOST,
            body,
        }
    }

    // =====================================================================
    // route
    // =====================================================================

    #[test]
    fn test_route_from_me_is_local_to_remote() {
        let ev = event(Identity::HOST, EventBody::GameOver);
        let routed = route(&host_session(), &roster(), &ev).unwrap();
        assert_eq!(routed.sender, "me");
        assert_eq!(routed.receiver, "you");
        assert_eq!(routed.event, &ev);
    }

    #[test]
    fn test_route_from_you_is_remote_to_local() {
        let ev = event(Identity::CLIENT, EventBody::EatPerson { damage: 1 });
        let routed = route(&host_session(), &roster(), &ev).unwrap();
        assert_eq!(routed.sender, "you");
        assert_eq!(routed.receiver, "me");
    }

    #[test]
    fn test_route_from_stranger_is_rejected() {
        let ev = event(Identity(9), EventBody::FlipRoles);
        let err = route(&host_session(), &roster(), &ev).unwrap_err();
        assert!(matches!(
            err,
            BusError::UnknownSender {
                sender: Identity(9),
                me: Identity::HOST,
                you: Identity::CLIENT,
            }
        ));
    }

    #[test]
    fn test_route_leaves_event_untouched() {
        let ev = event(Identity::CLIENT, EventBody::GameOver);
        let before = ev.clone();
        let _ = route(&host_session(), &roster(), &ev).unwrap();
        assert_eq!(ev, before);
    }

    #[test]
    fn test_route_in_sandbox_uses_first_branch() {
        let ev = Event {
            sender: Identity::LOCAL,
            receiver: Identity::LOCAL,
            body: EventBody::GameOver,
        };
        let roster = Roster {
            local: "me",
            remote: "me",
        };
        let routed = route(&Session::sandbox(), &roster, &ev).unwrap();
        assert_eq!((routed.sender, routed.receiver), ("me", "me"));
    }

    // =====================================================================
    // EventBus
    // =====================================================================

    type Log = Vec<String>;

    #[test]
    fn test_handlers_run_in_registration_order() {
        let mut bus: EventBus<Log, &'static str> = EventBus::new();
        bus.on(EventKind::GameOver, Direction::Incoming, |log, _| {
            log.push("h1".into())
        });
        bus.on(EventKind::GameOver, Direction::Incoming, |log, _| {
            log.push("h2".into())
        });

        let mut log = Log::new();
        let ev = event(Identity::CLIENT, EventBody::GameOver);
        for _ in 0..3 {
            let ran = bus
                .dispatch(Direction::Incoming, &mut log, &host_session(), &roster(), &ev)
                .unwrap();
            assert_eq!(ran, 2);
        }
        assert_eq!(log, ["h1", "h2", "h1", "h2", "h1", "h2"]);
    }

    #[test]
    fn test_handlers_receive_routed_players() {
        let mut bus: EventBus<Log, &'static str> = EventBus::new();
        bus.on(EventKind::EatPerson, Direction::Incoming, |log, r| {
            if let EventBody::EatPerson { damage } = r.event.body {
                log.push(format!("{} ate {} for {}", r.sender, r.receiver, damage));
            }
        });

        let mut log = Log::new();
        let ev = event(Identity::CLIENT, EventBody::EatPerson { damage: 4 });
        bus.dispatch(Direction::Incoming, &mut log, &host_session(), &roster(), &ev)
            .unwrap();
        assert_eq!(log, ["you ate me for 4"]);
    }

    #[test]
    fn test_directions_and_kinds_are_separate() {
        let mut bus: EventBus<Log, &'static str> = EventBus::new();
        bus.register(
            EventKind::FlipRoles,
            |log, _| log.push("in".into()),
            |log, _| log.push("out".into()),
        );
        assert_eq!(bus.handler_count(EventKind::FlipRoles, Direction::Incoming), 1);
        assert_eq!(bus.handler_count(EventKind::FlipRoles, Direction::Outgoing), 1);
        assert_eq!(bus.handler_count(EventKind::GameOver, Direction::Incoming), 0);

        let mut log = Log::new();
        let flip = event(Identity::HOST, EventBody::FlipRoles);
        bus.dispatch(Direction::Outgoing, &mut log, &host_session(), &roster(), &flip)
            .unwrap();
        assert_eq!(log, ["out"]);

        // A kind with no handlers is fine and runs nothing.
        let over = event(Identity::HOST, EventBody::GameOver);
        let ran = bus
            .dispatch(Direction::Incoming, &mut log, &host_session(), &roster(), &over)
            .unwrap();
        assert_eq!(ran, 0);
        assert_eq!(log, ["out"]);
    }

    #[test]
    fn test_unknown_sender_runs_no_handler() {
        let mut bus: EventBus<Log, &'static str> = EventBus::new();
        bus.on(EventKind::GameOver, Direction::Incoming, |log, _| {
            log.push("ran".into())
        });

        let mut log = Log::new();
        let ev = event(Identity(42), EventBody::GameOver);
        let result =
            bus.dispatch(Direction::Incoming, &mut log, &host_session(), &roster(), &ev);
        assert!(result.is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_debug_shows_handler_counts() {
        let mut bus: EventBus<Log, &'static str> = EventBus::default();
        bus.on(EventKind::EatPerson, Direction::Outgoing, |_, _| {});
        let text = format!("{bus:?}");
        assert!(text.contains("outgoing: [1, 0, 0]"));
    }
}

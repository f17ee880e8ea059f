//! The per-tick driver.
//!
//! Once a session is established the game calls [`SyncLoop::tick`] once
//! per frame. Each tick:
//!
//! 1. adds `dt` to the refresh accumulator and, once it passes
//!    [`SyncConfig::refresh_interval`], broadcasts a snapshot of the local
//!    state and resets the accumulator;
//! 2. drains the best-effort channel, overwriting the remote state with
//!    every snapshot in receive order;
//! 3. drains the reliable channel and dispatches every event to the
//!    incoming handlers.
//!
//! The game sends its own events through [`SyncLoop::send_eat`] and
//! friends. Each one is committed to the link first and only then handed
//! to the outgoing handlers.

use std::time::Duration;

use duelsync_bus::{Direction, EventBus, Roster, Routed};
use duelsync_protocol::{Event, EventBody, EventKind};
use duelsync_session::{Established, Link, Session};
use tracing::{debug, info, trace};

use crate::{DuelsyncError, World};

/// Sync loop configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How much game time passes between two snapshot broadcasts.
    pub refresh_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(100),
        }
    }
}

/// What one call to [`SyncLoop::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A snapshot of the local state went out this tick.
    pub snapshot_sent: bool,
    /// Snapshots from the peer applied to the world.
    pub snapshots_applied: usize,
    /// Events from the peer dispatched to incoming handlers.
    pub events_dispatched: usize,
}

/// Keeps a [`World`] in step with the peer over an established [`Link`].
pub struct SyncLoop<W: World, L: Link> {
    world: W,
    session: Session,
    link: L,
    bus: EventBus<W, W::Entity>,
    config: SyncConfig,
    since_refresh: Duration,
}

impl<W: World, L: Link> SyncLoop<W, L> {
    /// Takes over an established session and hands its starting role to
    /// the world.
    pub fn new(mut world: W, established: Established<L>, config: SyncConfig) -> Self {
        let (session, link) = established.into_parts();
        world.assign_role(session.role());
        info!(
            me = %session.me(),
            you = %session.you(),
            role = %session.role(),
            mode = %session.mode(),
            refresh_ms = config.refresh_interval.as_millis() as u64,
            "sync loop started"
        );

        Self {
            world,
            session,
            link,
            bus: EventBus::new(),
            config,
            since_refresh: Duration::ZERO,
        }
    }

    /// Registers an incoming and an outgoing handler for `kind`.
    pub fn register<I, O>(&mut self, kind: EventKind, incoming: I, outgoing: O)
    where
        I: FnMut(&mut W, &Routed<'_, W::Entity>) + 'static,
        O: FnMut(&mut W, &Routed<'_, W::Entity>) + 'static,
    {
        self.bus.register(kind, incoming, outgoing);
    }

    /// Registers a single handler for one direction.
    pub fn on<F>(&mut self, kind: EventKind, direction: Direction, handler: F)
    where
        F: FnMut(&mut W, &Routed<'_, W::Entity>) + 'static,
    {
        self.bus.on(kind, direction, handler);
    }

    /// Runs one tick. Never blocks.
    ///
    /// # Errors
    /// Any transport failure or protocol violation. All of them end the
    /// session; the caller should stop ticking and [`close`](Self::close).
    pub fn tick(&mut self, dt: Duration) -> Result<TickReport, DuelsyncError> {
        let mut report = TickReport::default();

        self.since_refresh += dt;
        if self.since_refresh > self.config.refresh_interval {
            let snapshot = self.world.snapshot();
            self.link.send_snapshot(&snapshot)?;
            self.since_refresh = Duration::ZERO;
            report.snapshot_sent = true;
        }

        // Last one wins, even if the network reordered them.
        for snapshot in self.link.receive_snapshots()? {
            self.world.refresh(&snapshot);
            report.snapshots_applied += 1;
        }

        let events = self.link.receive_events()?;
        if !events.is_empty() {
            let roster = roster(&self.world, &self.session);
            for event in &events {
                debug!(kind = %event.kind(), sender = %event.sender, "event received");
                self.bus.dispatch(
                    Direction::Incoming,
                    &mut self.world,
                    &self.session,
                    &roster,
                    event,
                )?;
            }
            report.events_dispatched = events.len();
        }

        trace!(
            snapshot_sent = report.snapshot_sent,
            snapshots = report.snapshots_applied,
            events = report.events_dispatched,
            "tick"
        );
        Ok(report)
    }

    /// Tells the peer this player ate the other one.
    pub fn send_eat(&mut self, damage: u32) -> Result<(), DuelsyncError> {
        self.send(EventBody::EatPerson { damage })
    }

    pub fn send_flip_roles(&mut self) -> Result<(), DuelsyncError> {
        self.send(EventBody::FlipRoles)
    }

    pub fn send_game_over(&mut self) -> Result<(), DuelsyncError> {
        self.send(EventBody::GameOver)
    }

    fn send(&mut self, body: EventBody) -> Result<(), DuelsyncError> {
        let event = Event {
            sender: self.session.me(),
            receiver: self.session.you(),
            body,
        };

        // On the wire before any handler sees it.
        self.link.send_event(&event)?;
        debug!(kind = %event.kind(), "event sent");

        let roster = roster(&self.world, &self.session);
        self.bus.dispatch(
            Direction::Outgoing,
            &mut self.world,
            &self.session,
            &roster,
            &event,
        )?;
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Closes the link and hands the world back.
    pub fn close(mut self) -> Result<W, DuelsyncError> {
        self.link.close()?;
        info!(mode = %self.session.mode(), "sync loop closed");
        Ok(self.world)
    }
}

/// The world's players as the bus should see them. A sandbox has no peer,
/// so both sides are the local player.
fn roster<W: World>(world: &W, session: &Session) -> Roster<W::Entity> {
    let local = world.local_entity();
    let remote = if session.is_sandbox() {
        local.clone()
    } else {
        world.remote_entity()
    };
    Roster { local, remote }
}

//! # duelsync
//!
//! Session and state synchronization for two-player real-time games.
//!
//! Two peers, one hosting and one joining, run a short blocking handshake
//! that fixes who is who and opens two channels: a reliable one for game
//! events and a best-effort one for state snapshots. After that the game
//! drives a [`SyncLoop`] once per frame. It never blocks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use duelsync::prelude::*;
//! # use duelsync::protocol::Snapshot;
//! # struct Arena;
//! # impl World for Arena {
//! #     type Entity = usize;
//! #     fn local_entity(&self) -> usize { 0 }
//! #     fn remote_entity(&self) -> usize { 1 }
//! #     fn snapshot(&self) -> Snapshot { Snapshot::default() }
//! #     fn refresh(&mut self, _: &Snapshot) {}
//! #     fn assign_role(&mut self, _: Role) {}
//! # }
//! # fn main() -> Result<(), DuelsyncError> {
//! let established = duelsync::session::join(&HandshakeConfig::default())?;
//! let mut sync = SyncLoop::new(Arena, established, SyncConfig::default());
//! sync.on(EventKind::EatPerson, Direction::Incoming, |_arena, routed| {
//!     println!("player {} was eaten", routed.receiver);
//! });
//! loop {
//!     sync.tick(std::time::Duration::from_millis(25))?;
//! }
//! # }
//! ```

mod error;
mod sync;
mod world;

pub use error::DuelsyncError;
pub use sync::{SyncConfig, SyncLoop, TickReport};
pub use world::World;

pub use duelsync_bus as bus;
pub use duelsync_protocol as protocol;
pub use duelsync_session as session;
pub use duelsync_tick as tick;
pub use duelsync_transport as transport;

/// Installs a `tracing` subscriber that reads `RUST_LOG`, falling back to
/// `default_filter` when it is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Everything a game needs to get a session going.
pub mod prelude {
    pub use crate::{DuelsyncError, SyncConfig, SyncLoop, TickReport, World};
    pub use duelsync_bus::{Direction, Roster, Routed};
    pub use duelsync_protocol::{EntityState, EventBody, EventKind, Identity, Snapshot, Vec2};
    pub use duelsync_session::{
        Established, HandshakeConfig, Link, Role, RoleAssignment, Session, SessionMode,
    };
    pub use duelsync_tick::{Frame, FrameClock, FrameConfig};
}

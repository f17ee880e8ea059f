//! Session establishment for duelsync.
//!
//! This crate turns an address into a ready-to-use session:
//!
//! 1. **Handshake**: [`host`] or [`join`] (blocking, runs once) decide who
//!    is who, assign the starting roles, and open both channels in the
//!    right order. [`sandbox`] skips all of that for single-process play.
//! 2. **Session**: the [`Session`] value both peers end up with: my
//!    identity, the peer's identity, my starting role.
//! 3. **Link**: the [`Link`] the per-tick loop drives afterwards. It never
//!    blocks.
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync loop (above)  ← drives a Link every tick, routes events by Session
//!     ↕
//! Session layer (this crate)  ← handshake, identities, channel isolation
//!     ↕
//! Transport (below)  ← ReliableChannel + BestEffortChannel
//! ```

mod error;
mod handshake;
mod link;
mod session;

pub use error::SessionError;
pub use handshake::{Established, host, join, sandbox};
pub use link::{Link, NetworkLink, SandboxLink};
pub use session::{
    DEFAULT_PORT, HandshakeConfig, HandshakeState, Role, RoleAssignment,
    Session, SessionMode,
};

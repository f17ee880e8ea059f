//! The game-side collaborator the sync loop reads from and writes into.

use duelsync_protocol::Snapshot;
use duelsync_session::Role;

/// The game state the sync loop keeps in step with the peer.
///
/// The sync loop carries positions and velocities around without
/// interpreting them. Everything it knows about the game goes through this
/// trait.
pub trait World {
    /// How the game names a player. Event handlers receive these instead of
    /// session identities.
    type Entity: Clone;

    /// The player controlled by this process.
    fn local_entity(&self) -> Self::Entity;

    /// The player controlled by the peer.
    fn remote_entity(&self) -> Self::Entity;

    /// The local player and objective state to broadcast.
    fn snapshot(&self) -> Snapshot;

    /// Overwrites the remote player and objective with what the peer sent.
    /// No merging: the latest snapshot replaces whatever was there.
    fn refresh(&mut self, snapshot: &Snapshot);

    /// Called once, when the sync loop is built, with the starting role
    /// the handshake gave this peer.
    fn assign_role(&mut self, role: Role);
}

//! The game itself: two players and a button in a walled arena.
//!
//! The eater chases the person. The person runs for the button; pressing
//! it flips the roles. Every bite costs the person one point of health and
//! the game ends when a player runs out.
//!
//! Each side only simulates its own player. The peer's player is dead
//! reckoned from the last snapshot, and the button belongs to whoever is
//! currently the person.

use std::fmt;

use duelsync::prelude::*;
use rand::Rng;

pub const ARENA_SIZE: f32 = 500.0;
pub const PLAYER_RADIUS: f32 = 10.0;
pub const PLAYER_SPEED: f32 = 100.0;
pub const BUTTON_RADIUS: f32 = 5.0;
pub const START_HEALTH: u32 = 10;
pub const BITE_DAMAGE: u32 = 1;
/// Seconds between two bites.
pub const BITE_COOLDOWN: f32 = 0.5;

/// How the game names a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Me,
    You,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Me => write!(f, "me"),
            Self::You => write!(f, "you"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub state: EntityState,
    pub health: u32,
}

impl Player {
    fn at(x: f32, y: f32) -> Self {
        Self {
            state: EntityState {
                position: Vec2::new(x, y),
                velocity: Vec2::ZERO,
                radius: PLAYER_RADIUS,
            },
            health: START_HEALTH,
        }
    }
}

/// Something the local player did this frame that the peer must hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Bite,
    PressButton,
}

#[derive(Debug)]
pub struct Arena {
    pub me: Player,
    pub you: Player,
    pub button: EntityState,
    /// `true` while the local player is the eater.
    pub eater: bool,
    pub playing: bool,
    pub winner: Option<Slot>,
    bite_cooldown: f32,
}

impl Arena {
    /// The host starts in the left half, the client in the right. Both
    /// sides agree on the starting layout without talking.
    pub fn new(mode: SessionMode) -> Self {
        let left = Player::at(ARENA_SIZE * 0.25, ARENA_SIZE * 0.5);
        let right = Player::at(ARENA_SIZE * 0.75, ARENA_SIZE * 0.5);
        let (me, you) = match mode {
            SessionMode::Client => (right, left),
            SessionMode::Host | SessionMode::Sandbox => (left, right),
        };

        Self {
            me,
            you,
            button: EntityState {
                position: Vec2::new(ARENA_SIZE * 0.5, ARENA_SIZE * 0.2),
                velocity: Vec2::ZERO,
                radius: BUTTON_RADIUS,
            },
            eater: false,
            playing: true,
            winner: None,
            bite_cooldown: 0.0,
        }
    }

    pub fn player(&self, slot: Slot) -> &Player {
        match slot {
            Slot::Me => &self.me,
            Slot::You => &self.you,
        }
    }

    pub fn player_mut(&mut self, slot: Slot) -> &mut Player {
        match slot {
            Slot::Me => &mut self.me,
            Slot::You => &mut self.you,
        }
    }

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Option<Intent> {
        self.bite_cooldown = (self.bite_cooldown - dt).max(0.0);

        let target = if self.eater {
            self.you.state.position
        } else {
            self.button.position
        };
        self.me.state.velocity = steer(self.me.state.position, target);
        advance(&mut self.me.state, dt);
        advance(&mut self.you.state, dt);

        if self.eater {
            if self.bite_cooldown == 0.0 && touching(&self.me.state, &self.you.state) {
                self.bite_cooldown = BITE_COOLDOWN;
                return Some(Intent::Bite);
            }
        } else if touching(&self.me.state, &self.button) {
            self.move_button();
            return Some(Intent::PressButton);
        }
        None
    }

    fn move_button(&mut self) {
        let mut rng = rand::rng();
        let margin = BUTTON_RADIUS;
        self.button.position = Vec2::new(
            rng.random_range(margin..ARENA_SIZE - margin),
            rng.random_range(margin..ARENA_SIZE - margin),
        );
    }

    fn finish(&mut self) {
        self.playing = false;
        self.winner = if self.me.health == 0 {
            Some(Slot::You)
        } else if self.you.health == 0 {
            Some(Slot::Me)
        } else {
            None
        };
    }
}

impl World for Arena {
    type Entity = Slot;

    fn local_entity(&self) -> Slot {
        Slot::Me
    }

    fn remote_entity(&self) -> Slot {
        Slot::You
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            player: self.me.state,
            objective: self.button,
        }
    }

    fn refresh(&mut self, snapshot: &Snapshot) {
        self.you.state = snapshot.player;
        // The person owns the button.
        if self.eater {
            self.button = snapshot.objective;
        }
    }

    fn assign_role(&mut self, role: Role) {
        self.eater = role.is_eater();
    }
}

/// Hooks the game rules up to the sync loop.
pub fn install_rules<L: Link>(sync: &mut SyncLoop<Arena, L>) {
    sync.register(EventKind::EatPerson, bite, bite);
    sync.register(EventKind::FlipRoles, flip, flip);
    sync.register(EventKind::GameOver, game_over, game_over);
}

fn bite(arena: &mut Arena, routed: &Routed<'_, Slot>) {
    if let EventBody::EatPerson { damage } = routed.event.body {
        let victim = arena.player_mut(routed.receiver);
        victim.health = victim.health.saturating_sub(damage);
        tracing::info!(
            eater = %routed.sender,
            person = %routed.receiver,
            health = victim.health,
            "bite"
        );
    }
}

/// Whoever pressed the button is the eater now.
fn flip(arena: &mut Arena, routed: &Routed<'_, Slot>) {
    arena.eater = routed.sender == Slot::Me;
    tracing::info!(eater = %routed.sender, "roles flipped");
}

fn game_over(arena: &mut Arena, _: &Routed<'_, Slot>) {
    arena.finish();
    tracing::info!(winner = ?arena.winner, "game over");
}

fn steer(from: Vec2, to: Vec2) -> Vec2 {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return Vec2::ZERO;
    }
    Vec2::new(dx / len * PLAYER_SPEED, dy / len * PLAYER_SPEED)
}

/// Moves `state` along its velocity, bouncing off the walls.
fn advance(state: &mut EntityState, dt: f32) {
    let r = state.radius;
    let max = ARENA_SIZE - r;

    state.position.x += state.velocity.x * dt;
    state.position.y += state.velocity.y * dt;

    if state.position.x < r || state.position.x > max {
        state.velocity.x = -state.velocity.x;
        state.position.x = state.position.x.clamp(r, max);
    }
    if state.position.y < r || state.position.y > max {
        state.velocity.y = -state.velocity.y;
        state.position.y = state.position.y.clamp(r, max);
    }
}

fn touching(a: &EntityState, b: &EntityState) -> bool {
    let (dx, dy) = (a.position.x - b.position.x, a.position.y - b.position.y);
    let reach = a.radius + b.radius;
    dx * dx + dy * dy <= reach * reach
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use duelsync::protocol::Event;
    use duelsync::session::{SessionError, sandbox};

    /// Hands out queued events once and swallows everything sent.
    #[derive(Debug, Default)]
    struct ScriptedLink {
        inbox: Vec<Event>,
    }

    impl Link for ScriptedLink {
        fn send_event(&mut self, _: &Event) -> Result<(), SessionError> {
            Ok(())
        }

        fn send_snapshot(&mut self, _: &Snapshot) -> Result<(), SessionError> {
            Ok(())
        }

        fn receive_snapshots(&mut self) -> Result<Vec<Snapshot>, SessionError> {
            Ok(Vec::new())
        }

        fn receive_events(&mut self) -> Result<Vec<Event>, SessionError> {
            Ok(std::mem::take(&mut self.inbox))
        }

        fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    /// A host-side loop whose link delivers `inbox` on the first tick.
    fn host_loop(role: Role, inbox: Vec<Event>) -> SyncLoop<Arena, ScriptedLink> {
        let established = Established {
            session: Session::new(Identity::HOST, Identity::CLIENT, role, SessionMode::Host),
            link: ScriptedLink { inbox },
        };
        let mut sync =
            SyncLoop::new(Arena::new(SessionMode::Host), established, SyncConfig::default());
        install_rules(&mut sync);
        sync
    }

    // =====================================================================
    // Simulation
    // =====================================================================

    #[test]
    fn test_advance_bounces_off_walls() {
        let mut state = EntityState {
            position: Vec2::new(ARENA_SIZE - PLAYER_RADIUS - 1.0, 100.0),
            velocity: Vec2::new(100.0, 0.0),
            radius: PLAYER_RADIUS,
        };
        advance(&mut state, 0.1);
        assert_eq!(state.position.x, ARENA_SIZE - PLAYER_RADIUS);
        assert_eq!(state.velocity.x, -100.0);
    }

    #[test]
    fn test_steer_has_player_speed() {
        let v = steer(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0));
        assert!((v.x - 60.0).abs() < 1e-4);
        assert!((v.y - 80.0).abs() < 1e-4);
        assert_eq!(steer(Vec2::ZERO, Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_eater_bites_once_per_cooldown() {
        let mut arena = Arena::new(SessionMode::Host);
        arena.eater = true;
        arena.you.state.position = arena.me.state.position;

        assert_eq!(arena.update(0.01), Some(Intent::Bite));
        assert_eq!(arena.update(0.01), None);
        assert_eq!(arena.update(BITE_COOLDOWN), Some(Intent::Bite));
    }

    #[test]
    fn test_person_presses_button_and_it_moves() {
        let mut arena = Arena::new(SessionMode::Host);
        arena.me.state.position = arena.button.position;
        let before = arena.button.position;
        assert_eq!(arena.update(0.0), Some(Intent::PressButton));
        assert_ne!(arena.button.position, before);
    }

    #[test]
    fn test_refresh_takes_button_only_as_eater() {
        let mut arena = Arena::new(SessionMode::Host);
        let mut snapshot = arena.snapshot();
        snapshot.player.position = Vec2::new(1.0, 2.0);
        snapshot.objective.position = Vec2::new(3.0, 4.0);

        arena.refresh(&snapshot);
        assert_eq!(arena.you.state.position, Vec2::new(1.0, 2.0));
        assert_ne!(arena.button.position, Vec2::new(3.0, 4.0));

        arena.eater = true;
        arena.refresh(&snapshot);
        assert_eq!(arena.button.position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_client_layout_mirrors_host() {
        let host = Arena::new(SessionMode::Host);
        let client = Arena::new(SessionMode::Client);
        assert_eq!(host.me, client.you);
        assert_eq!(host.you, client.me);
    }

    // =====================================================================
    // Rules
    // =====================================================================

    #[test]
    fn test_outgoing_bite_hurts_the_peer() {
        let mut sync = host_loop(Role::Eater, Vec::new());
        assert!(sync.world().eater);
        sync.send_eat(BITE_DAMAGE).unwrap();
        assert_eq!(sync.world().you.health, START_HEALTH - BITE_DAMAGE);
        assert_eq!(sync.world().me.health, START_HEALTH);
    }

    #[test]
    fn test_incoming_bite_hurts_me() {
        let bite = Event {
            sender: Identity::CLIENT,
            receiver: Identity::HOST,
            body: EventBody::EatPerson { damage: 3 },
        };
        let mut sync = host_loop(Role::Person, vec![bite]);
        sync.tick(Duration::ZERO).unwrap();
        assert_eq!(sync.world().me.health, START_HEALTH - 3);
    }

    #[test]
    fn test_incoming_flip_makes_peer_the_eater() {
        let flip = Event {
            sender: Identity::CLIENT,
            receiver: Identity::HOST,
            body: EventBody::FlipRoles,
        };
        let mut sync = host_loop(Role::Eater, vec![flip]);
        assert!(sync.world().eater);
        sync.tick(Duration::ZERO).unwrap();
        assert!(!sync.world().eater);
    }

    #[test]
    fn test_game_over_picks_winner_by_health() {
        let mut sync = host_loop(Role::Eater, Vec::new());
        for _ in 0..START_HEALTH {
            sync.send_eat(BITE_DAMAGE).unwrap();
        }
        assert_eq!(sync.world().you.health, 0);
        sync.send_game_over().unwrap();
        assert!(!sync.world().playing);
        assert_eq!(sync.world().winner, Some(Slot::Me));
    }

    #[test]
    fn test_sandbox_flip_is_idempotent() {
        let mut sync =
            SyncLoop::new(Arena::new(SessionMode::Sandbox), sandbox(), SyncConfig::default());
        install_rules(&mut sync);

        sync.send_flip_roles().unwrap();
        assert!(sync.world().eater);
        // The loopback replays it as incoming; still the eater.
        sync.tick(Duration::ZERO).unwrap();
        assert!(sync.world().eater);
    }
}

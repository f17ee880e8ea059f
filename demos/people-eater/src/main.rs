//! People Eater: a headless two-player chase game.
//!
//! ```bash
//! # Terminal 1
//! people-eater --role host
//! # Terminal 2
//! people-eater --role client --host 127.0.0.1
//! # No peer at all
//! people-eater --role sandbox
//! ```
//!
//! `--port` is an offset added to the base port 11249. `RUST_LOG` controls
//! the log level (default `info`).

mod arena;

use std::net::{SocketAddr, ToSocketAddrs};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use duelsync::prelude::*;
use duelsync::session::{self, DEFAULT_PORT, SessionError};
use tracing::{error, info};

use crate::arena::{Arena, Intent, Slot, install_rules, BITE_DAMAGE};

#[derive(Parser, Debug)]
#[command(name = "people-eater")]
#[command(about = "Headless two-player chase game over duelsync")]
struct Cli {
    /// Which side of the session to play.
    #[arg(long, value_enum, default_value_t = Mode::Sandbox)]
    role: Mode,

    /// Host to listen on (host) or connect to (client).
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Offset added to the base port.
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// How the host picks who starts as the eater.
    #[arg(long, value_enum, default_value_t = Roles::CoinFlip)]
    roles: Roles,

    /// Frames per second.
    #[arg(long, default_value_t = 40)]
    rate: u32,

    /// Give up if the handshake hasn't finished after this many seconds.
    #[arg(long, default_value_t = 60)]
    handshake_timeout: u64,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Host,
    Client,
    Sandbox,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Roles {
    CoinFlip,
    HostEater,
    ClientEater,
    Disabled,
}

impl From<Roles> for RoleAssignment {
    fn from(roles: Roles) -> Self {
        match roles {
            Roles::CoinFlip => Self::CoinFlip,
            Roles::HostEater => Self::HostEater,
            Roles::ClientEater => Self::ClientEater,
            Roles::Disabled => Self::Disabled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("could not resolve {0}")]
    Resolve(String),

    #[error("no peer showed up within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("handshake task failed: {0}")]
    HandshakeTask(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sync(#[from] DuelsyncError),
}

fn main() -> ExitCode {
    duelsync::init_tracing("info");
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "could not start the runtime");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cli));
    // A handshake that timed out is still parked in `accept` on a blocking
    // thread, and a normal runtime drop would wait for it forever.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "game aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), DemoError> {
    let clock = FrameClock::new(FrameConfig {
        rate_hz: cli.rate,
        ..FrameConfig::default()
    });
    let sync_config = SyncConfig::default();

    let winner = match cli.role {
        Mode::Sandbox => {
            let established = session::sandbox();
            let sync = SyncLoop::new(Arena::new(SessionMode::Sandbox), established, sync_config);
            play(sync, clock, cli.frames).await?
        }
        Mode::Host | Mode::Client => {
            let addr = resolve(&cli.host, cli.port)?;
            let config = HandshakeConfig::new(addr).with_roles(cli.roles.into());
            let timeout = Duration::from_secs(cli.handshake_timeout);
            let hosting = matches!(cli.role, Mode::Host);

            info!(%addr, hosting, "waiting for handshake");
            let handshake = tokio::task::spawn_blocking(move || {
                if hosting {
                    session::host(&config)
                } else {
                    session::join(&config)
                }
            });
            let established = tokio::time::timeout(timeout, handshake)
                .await
                .map_err(|_| DemoError::HandshakeTimeout(timeout))???;

            let mode = established.session.mode();
            let sync = SyncLoop::new(Arena::new(mode), established, sync_config);
            play(sync, clock, cli.frames).await?
        }
    };

    match winner {
        Some(Slot::Me) => info!("you win!"),
        Some(Slot::You) => info!("you lose!"),
        None => info!("game ended without a winner"),
    }
    Ok(())
}

fn resolve(host: &str, offset: u16) -> Result<SocketAddr, DemoError> {
    let port = DEFAULT_PORT.saturating_add(offset);
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| DemoError::Resolve(format!("{host}:{port}")))
}

/// Runs the game until it is over, the frame limit is hit, or Ctrl-C.
async fn play<L: Link>(
    mut sync: SyncLoop<Arena, L>,
    mut clock: FrameClock,
    frames: Option<u64>,
) -> Result<Option<Slot>, DuelsyncError> {
    install_rules(&mut sync);
    let sandbox = sync.session().is_sandbox();

    loop {
        let frame = tokio::select! {
            frame = clock.wait_for_frame() => frame,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                sync.send_game_over()?;
                break;
            }
        };
        let dt = frame.dt;

        match sync.world_mut().update(dt.as_secs_f32()) {
            Some(Intent::Bite) => sync.send_eat(BITE_DAMAGE)?,
            Some(Intent::PressButton) => {
                sync.send_flip_roles()?;
                // Alone in the arena, reaching the button ends the round.
                if sandbox {
                    sync.send_game_over()?;
                }
            }
            None => {}
        }

        sync.tick(dt)?;

        let world = sync.world();
        if world.playing && world.player(Slot::You).health == 0 {
            sync.send_game_over()?;
        }
        clock.record_frame_end();

        if !sync.world().playing {
            break;
        }
        if frames.is_some_and(|limit| frame.number >= limit) {
            info!(frames = frame.number, "frame limit reached");
            sync.send_game_over()?;
            break;
        }
    }

    let world = sync.close()?;
    info!(
        my_health = world.player(Slot::Me).health,
        your_health = world.player(Slot::You).health,
        "final score"
    );
    Ok(world.winner)
}

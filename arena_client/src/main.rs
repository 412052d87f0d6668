//! Headless arena client.
//!
//! Usage:
//!   cargo run -p arena_client -- [--config arena.json] [--host localhost:8080]
//!       [--secure] [--name Player] [--offline] [--bots 3] [--seed 42]
//!
//! Connects to the authority (or starts offline), drives the fixed-timestep
//! loop with scripted input and logs a HUD summary every few seconds.
//! Ctrl-C stops the loop and closes the connection.

use std::{env, path::PathBuf, time::Duration};

use anyhow::Context;
use arena_client::{
    game_loop::GameLoop,
    input::{InputFrame, InputSource, InputState, MoveKeys},
    GameContext,
};
use arena_shared::{
    config::ArenaConfig,
    event::GameEvent,
    math::Vec2,
    render::{FrameSink, FrameView},
};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    host: Option<String>,
    secure: bool,
    name: Option<String>,
    offline: bool,
    bots: Option<usize>,
    seed: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut out = Args::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--host" if i + 1 < args.len() => {
                out.host = Some(args[i + 1].clone());
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                out.name = Some(args[i + 1].clone());
                i += 2;
            }
            "--bots" if i + 1 < args.len() => {
                out.bots = Some(args[i + 1].parse().context("parse --bots")?);
                i += 2;
            }
            "--seed" if i + 1 < args.len() => {
                out.seed = Some(args[i + 1].parse().context("parse --seed")?);
                i += 2;
            }
            "--secure" => {
                out.secure = true;
                i += 1;
            }
            "--offline" => {
                out.offline = true;
                i += 1;
            }
            other => {
                warn!(arg = %other, "Ignoring unknown argument");
                i += 1;
            }
        }
    }
    Ok(out)
}

fn load_config(args: &Args) -> anyhow::Result<ArenaConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            ArenaConfig::from_json_str(&text).context("parse config")?
        }
        None => ArenaConfig::default(),
    };
    if let Some(host) = &args.host {
        cfg.endpoint.host = host.clone();
    }
    if args.secure {
        cfg.endpoint.secure = true;
    }
    if let Some(name) = &args.name {
        cfg.player_name = name.clone();
    }
    if args.offline {
        cfg.offline = true;
    }
    if let Some(bots) = args.bots {
        cfg.bot_count = bots;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    Ok(cfg)
}

/// Wanders in a square and fires at the nearest other player.
#[derive(Default)]
struct ScriptedInput {
    frame: u64,
}

impl ScriptedInput {
    const LEG_FRAMES: u64 = 120;
    const FIRE_EVERY: u64 = 15;
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, view: &FrameView<'_>) -> InputFrame {
        self.frame += 1;
        let keys = match (self.frame / Self::LEG_FRAMES) % 4 {
            0 => MoveKeys::RIGHT,
            1 => MoveKeys::DOWN,
            2 => MoveKeys::LEFT,
            _ => MoveKeys::UP,
        };

        let me = view.local_id.and_then(|id| view.store.player(id));
        let aim = me.and_then(|me| {
            view.store
                .players()
                .filter(|p| p.id != me.id && !p.is_eliminated())
                .min_by(|a, b| {
                    a.position
                        .distance(me.position)
                        .total_cmp(&b.position.distance(me.position))
                })
                .map(|p| p.position)
        });

        InputFrame {
            state: InputState {
                keys,
                pointer: aim.unwrap_or(Vec2::ZERO),
                fire: aim.is_some() && self.frame % Self::FIRE_EVERY == 0,
            },
            // Pointer is already in world space.
            view_offset: Vec2::ZERO,
        }
    }
}

/// Logs notifications as they happen and a HUD line periodically.
struct LogRenderer {
    frames: u64,
    every: u64,
}

impl FrameSink for LogRenderer {
    fn notify(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Notice(text) => info!(notice = %text, "System"),
            GameEvent::KillFeed { killer, victim } => info!(%killer, %victim, "Elimination"),
            GameEvent::Chat { from, message } => info!(from = %from, %message, "Chat"),
            _ => {}
        }
    }

    fn present(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        let me = frame.local_id.and_then(|id| frame.store.player(id));
        let leader = frame.store.players().max_by_key(|p| p.score);
        info!(
            local = ?frame.local_id,
            health = me.map(|p| p.health()),
            score = me.map(|p| p.score),
            players = frame.store.player_count(),
            projectiles = frame.store.projectile_count(),
            leader = leader.map(|p| p.name.as_str()),
            "HUD"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args()?;
    let cfg = load_config(&args)?;
    info!(
        url = %cfg.endpoint.url(),
        offline = cfg.offline,
        name = %cfg.player_name,
        "Starting client"
    );

    let frame_period = cfg.frame_duration();
    let tick = cfg.tick_duration();
    let name = cfg.player_name.clone();
    let hud_every = u64::from(cfg.frame_hz.max(1)) * 5;

    let mut ctx = GameContext::new(cfg);
    ctx.start(&name);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received");
        let _ = shutdown_tx.send(true);
    });

    let mut input = ScriptedInput::default();
    let mut sink = LogRenderer {
        frames: 0,
        every: hud_every,
    };
    let stats = GameLoop::new(tick)
        .run(&mut ctx, &mut input, &mut sink, frame_period, shutdown_rx)
        .await;

    let hud = ctx.hud();
    info!(
        frames = stats.frames,
        ticks = stats.ticks,
        kills = hud.kills,
        deaths = hud.deaths,
        "Client exiting"
    );
    // Give the transport driver a moment to send its close frame.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}

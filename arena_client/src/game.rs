//! Game context.
//!
//! [`GameContext`] is the single owner of everything the client knows about
//! the match: the entity store, the network session, the simulators and the
//! HUD counters. It is driven from one task by [`crate::game_loop`]; nothing
//! in here awaits.
//!
//! Lifecycle:
//! - `Menu`: nothing runs until [`GameContext::start`].
//! - `Connecting`: waiting for the transport to open (or fail).
//! - `Playing`: fixed ticks run, online or in the offline fallback.

use std::time::Duration;

use arena_shared::{
    config::ArenaConfig,
    event::{EventBus, GameEvent},
    math::Vec2,
    net::{ChatMessage, NetMsg, PlayerHit, PlayerId, PlayerJoin},
    render::FrameView,
    store::EntityStore,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::{
    input::InputFrame,
    interp::advance_non_local,
    offline::{allocate_id, OfflineWorld},
    prediction::LocalPredictor,
    projectile::{ProjectileHit, ProjectileSimulator},
    reconcile::{MatchStats, Reconciler},
    session::{wall_clock_ms, NetworkSession, SessionEvent, SessionState},
    spawn::{fresh_player, random_spawn},
};

/// Camera shake when the local player fires.
pub const SHOOT_SHAKE: f32 = 5.0;
/// Entries shown on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Menu,
    Connecting,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Online,
    Offline,
}

/// Snapshot of the numbers a HUD shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub phase: Phase,
    pub mode: Mode,
    pub local_id: Option<PlayerId>,
    pub health: f32,
    pub max_health: f32,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub ping_ms: Option<u32>,
    pub player_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub is_local: bool,
}

pub struct GameContext {
    cfg: ArenaConfig,
    phase: Phase,
    mode: Mode,
    player_name: String,
    local_id: Option<PlayerId>,
    store: EntityStore,
    session: NetworkSession,
    predictor: LocalPredictor,
    projectiles: ProjectileSimulator,
    offline: OfflineWorld,
    events: EventBus,
    stats: MatchStats,
    rng: StdRng,
    /// Simulation clock, advanced one tick at a time.
    sim_time: Duration,
    /// Wall time fed in by the frame loop. Paces outgoing position updates,
    /// so catch-up ticks within one frame share a single reading.
    frame_clock: Duration,
    ticks: u64,
}

impl GameContext {
    pub fn new(cfg: ArenaConfig) -> Self {
        let rng = cfg
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let player_name = cfg.player_name.clone();
        Self {
            cfg,
            phase: Phase::Menu,
            mode: Mode::Online,
            player_name,
            local_id: None,
            store: EntityStore::new(),
            session: NetworkSession::detached(),
            predictor: LocalPredictor::default(),
            projectiles: ProjectileSimulator::new(),
            offline: OfflineWorld::new(),
            events: EventBus::default(),
            stats: MatchStats::default(),
            rng,
            sim_time: Duration::ZERO,
            frame_clock: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Leaves the menu: connects to the configured endpoint, or goes straight
    /// to offline play when configured so.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, name: &str) {
        if self.cfg.offline {
            if self.leave_menu(name) {
                self.enter_offline();
            }
            return;
        }
        let session = NetworkSession::connect(&self.cfg.endpoint, (&self.cfg).into());
        self.start_with_session(name, session);
    }

    /// Like [`start`](Self::start) with a caller-provided session.
    pub fn start_with_session(&mut self, name: &str, session: NetworkSession) {
        if !self.leave_menu(name) {
            return;
        }
        self.session = session;
        self.mode = Mode::Online;
        self.phase = Phase::Connecting;
        info!(name = %self.player_name, "Connecting");
    }

    fn leave_menu(&mut self, name: &str) -> bool {
        if self.phase != Phase::Menu {
            warn!(phase = ?self.phase, "Start ignored outside the menu");
            return false;
        }
        let name = name.trim();
        if !name.is_empty() {
            self.player_name = name.to_string();
        }
        true
    }

    /// Applies everything the session has queued since the last call.
    pub fn pump_network(&mut self) {
        for ev in self.session.poll() {
            match ev {
                SessionEvent::Connected => self.on_connected(),
                SessionEvent::Message(msg) => {
                    if self.mode == Mode::Online {
                        self.reconciler().apply(msg);
                    }
                }
                SessionEvent::Disconnected { reason } => {
                    info!(reason = %reason, "Disconnected");
                    self.events
                        .notice("Disconnected from server! Switching to offline mode...");
                }
                SessionEvent::FallbackToOffline => self.enter_offline(),
            }
        }
    }

    fn on_connected(&mut self) {
        let id = allocate_id(&self.store, &mut self.rng, false);
        let pos = random_spawn(&mut self.rng);
        self.store
            .insert_player(fresh_player(&mut self.rng, id, self.player_name.clone(), pos));
        self.local_id = Some(id);

        self.session.send(&NetMsg::PlayerJoin(PlayerJoin {
            player_id: id,
            name: self.player_name.clone(),
            x: Some(pos.x),
            y: Some(pos.y),
        }));
        self.session.start_heartbeat(id);
        self.phase = Phase::Playing;
        info!(player_id = %id, "Joined as local player");
        self.events.notice("Connected to server!");
    }

    /// One-way switch to the local simulation.
    pub fn enter_offline(&mut self) {
        if self.mode == Mode::Offline && self.phase == Phase::Playing {
            return;
        }
        self.session.go_offline();
        self.mode = Mode::Offline;
        self.predictor.reset();
        self.projectiles.reset();
        let local = self.offline.seed(
            &mut self.store,
            &mut self.rng,
            &self.player_name,
            self.cfg.bot_count,
        );
        self.local_id = Some(local);
        self.phase = Phase::Playing;
        self.events.notice("Running in offline mode");
    }

    fn reconciler(&mut self) -> Reconciler<'_> {
        Reconciler {
            store: &mut self.store,
            local: self.local_id,
            events: &mut self.events,
            stats: &mut self.stats,
            rng: &mut self.rng,
            projectiles: &mut self.projectiles,
            now: self.sim_time,
            wall_ms: wall_clock_ms(),
        }
    }

    /// Moves the frame clock forward by the real time a frame took.
    pub fn advance_frame_clock(&mut self, elapsed: Duration) {
        self.frame_clock += elapsed;
    }

    /// Runs one fixed simulation step. A no-op outside `Playing`.
    pub fn tick(&mut self, input: &InputFrame) {
        if self.phase != Phase::Playing {
            return;
        }
        let step = self.cfg.tick_duration();
        let dt = step.as_secs_f32();
        self.sim_time += step;
        self.ticks += 1;
        let bounds = self.cfg.world;

        if let Some(local) = self.local_id {
            self.step_local(local, input, dt);
        }

        advance_non_local(&mut self.store, self.local_id, &bounds, dt);

        let hits = self.projectiles.tick(&mut self.store, &bounds, dt);
        for hit in hits {
            self.on_projectile_hit(hit);
        }

        if self.mode == Mode::Offline {
            self.offline
                .tick(&mut self.store, &mut self.rng, self.sim_time, &mut self.events);
        }
    }

    fn step_local(&mut self, local: PlayerId, input: &InputFrame, dt: f32) {
        let bounds = self.cfg.world;
        let Some(me) = self.store.player_mut(local) else {
            return;
        };
        if me.is_eliminated() {
            return;
        }
        let update = self.predictor.step(me, input, &bounds, dt, self.frame_clock);
        if let Some(update) = update {
            self.session.send(&NetMsg::PlayerUpdate(update));
        }

        if input.state.fire {
            if let Some(shot) = self.projectiles.try_fire(&mut self.store, local, self.sim_time) {
                self.events.push(GameEvent::MuzzleFlash {
                    at: Vec2::new(shot.x, shot.y),
                    angle: shot.rotation,
                });
                self.events.push(GameEvent::CameraShake(SHOOT_SHAKE));
                self.session.send(&NetMsg::PlayerShoot(shot));
            }
        }
    }

    fn on_projectile_hit(&mut self, hit: ProjectileHit) {
        match self.mode {
            Mode::Online => {
                self.events.push(GameEvent::HitEffect {
                    at: hit.at,
                    victim: hit.victim,
                });
                if Some(hit.shooter) == self.local_id {
                    debug!(victim = %hit.victim, "Reporting hit");
                    self.session.send(&NetMsg::PlayerHit(PlayerHit {
                        shooter_id: Some(hit.shooter),
                        victim_id: hit.victim,
                        damage: hit.damage,
                        health: None,
                    }));
                }
            }
            Mode::Offline => {
                let kill = self
                    .offline
                    .resolve_hit(&mut self.store, &mut self.events, &hit, self.sim_time);
                if let Some(kill) = kill {
                    self.reconciler().apply_death(
                        kill.shooter,
                        kill.victim,
                        kill.killer_name,
                        kill.victim_name,
                    );
                }
            }
        }
    }

    /// Sends a chat line as the local player and echoes it to the local feed.
    /// Blank input and calls before a local player exists are ignored.
    pub fn send_chat(&mut self, message: &str) {
        let message = message.trim();
        let Some(local) = self.local_id else {
            return;
        };
        if message.is_empty() {
            return;
        }
        self.session.send(&NetMsg::ChatMessage(ChatMessage {
            player_id: local,
            message: message.to_string(),
            timestamp: Some(wall_clock_ms() as f64 / 1000.0),
        }));
        self.events.push(GameEvent::Chat {
            from: local,
            message: message.to_string(),
        });
        debug!(player_id = %local, "Chat sent");
    }

    pub fn hud(&self) -> Hud {
        let me = self.local_id.and_then(|id| self.store.player(id));
        Hud {
            phase: self.phase,
            mode: self.mode,
            local_id: self.local_id,
            health: me.map_or(0.0, |p| p.health()),
            max_health: me.map_or(0.0, |p| p.max_health),
            score: me.map_or(0, |p| p.score),
            kills: self.stats.kills,
            deaths: self.stats.deaths,
            ping_ms: self.stats.ping_ms,
            player_count: self.store.player_count(),
        }
    }

    /// Highest scores first; ties broken by identifier.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<_> = self
            .store
            .players()
            .map(|p| LeaderboardEntry {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                is_local: Some(p.id) == self.local_id,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        entries.truncate(limit);
        entries
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn frame_view(&self, alpha: f32) -> FrameView<'_> {
        FrameView {
            store: &self.store,
            local_id: self.local_id,
            alpha,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.cfg
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Cancels timers and releases the transport.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
        info!(ticks = self.ticks, "Game context shut down");
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::{
        entity::Player,
        net::{PlayerState, WorldState},
    };

    use super::*;
    use crate::{input::MoveKeys, session::SessionTimings};

    fn seeded() -> GameContext {
        GameContext::new(ArenaConfig {
            seed: Some(1234),
            ..ArenaConfig::default()
        })
    }

    fn online() -> (GameContext, crate::session::LoopbackPeer) {
        let mut ctx = seeded();
        let (session, peer) = NetworkSession::loopback(SessionTimings::default());
        ctx.start_with_session("Tester", session);
        assert_eq!(ctx.phase(), Phase::Connecting);
        peer.open();
        ctx.pump_network();
        assert_eq!(ctx.phase(), Phase::Playing);
        (ctx, peer)
    }

    #[test]
    fn nothing_runs_in_menu() {
        let mut ctx = seeded();
        ctx.tick(&InputFrame::default());
        assert_eq!(ctx.ticks(), 0);
        assert_eq!(ctx.phase(), Phase::Menu);
    }

    #[tokio::test]
    async fn connect_publishes_join() {
        let (ctx, mut peer) = online();
        let local = ctx.local_id().unwrap();
        assert!((1..=9999).contains(&local.0));
        let sent = peer.sent_messages();
        assert!(matches!(
            &sent[0],
            NetMsg::PlayerJoin(j) if j.player_id == local && j.name == "Tester"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn close_falls_back_to_offline_with_bots() {
        let (mut ctx, peer) = online();
        peer.close("authority gone");
        ctx.pump_network();
        assert_eq!(ctx.mode(), Mode::Online);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        ctx.pump_network();
        assert_eq!(ctx.mode(), Mode::Offline);
        assert_eq!(ctx.phase(), Phase::Playing);

        let store = ctx.store();
        assert_eq!(store.player_count(), 4);
        let local = ctx.local_id().unwrap();
        assert!(local.0 > 0);
        assert_eq!(store.players().filter(|p| p.is_bot && p.id.0 < 0).count(), 3);

        peer.deliver(&NetMsg::PlayerJoin(PlayerJoin {
            player_id: PlayerId(555),
            name: "late".into(),
            x: None,
            y: None,
        }));
        ctx.pump_network();
        assert_eq!(ctx.store().player_count(), 4);

        let notices: Vec<_> = ctx
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(
            notices,
            vec![
                "Connected to server!".to_string(),
                "Disconnected from server! Switching to offline mode...".to_string(),
                "Running in offline mode".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn chat_goes_out_and_shows_locally() {
        let (mut ctx, mut peer) = online();
        let local = ctx.local_id().unwrap();
        peer.sent();
        ctx.drain_events();

        ctx.send_chat("   ");
        ctx.send_chat("  gg all  ");

        let sent = peer.sent_messages();
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            NetMsg::ChatMessage(c) if c.player_id == local && c.message == "gg all" && c.timestamp.is_some()
        ));
        assert_eq!(
            ctx.drain_events(),
            vec![GameEvent::Chat {
                from: local,
                message: "gg all".into(),
            }]
        );
    }

    #[test]
    fn chat_before_start_is_dropped() {
        let mut ctx = seeded();
        ctx.send_chat("hello");
        assert!(ctx.drain_events().is_empty());
    }

    #[tokio::test]
    async fn first_world_state_snaps_remote() {
        let (mut ctx, peer) = online();
        peer.deliver(&NetMsg::WorldState(WorldState {
            players: vec![PlayerState {
                id: PlayerId(-7),
                name: "far".into(),
                x: 500.0,
                y: 500.0,
                vx: None,
                vy: None,
                rotation: None,
                health: None,
                score: None,
                is_dead: None,
                is_bot: None,
            }],
            ..WorldState::default()
        }));
        ctx.pump_network();
        ctx.tick(&InputFrame::default());
        let p = ctx.store().player(PlayerId(-7)).unwrap();
        assert_eq!(p.position, Vec2::new(500.0, 500.0));
    }

    #[tokio::test]
    async fn own_projectiles_never_hurt_the_shooter() {
        let (mut ctx, mut peer) = online();
        let local = ctx.local_id().unwrap();
        let mut input = InputFrame::default();
        input.state.fire = true;
        input.state.keys = MoveKeys::RIGHT;

        for _ in 0..180 {
            ctx.tick(&input);
        }
        let me = ctx.store().player(local).unwrap();
        assert_eq!(me.health(), 100.0);
        assert_eq!(me.score, 0);
        assert!(peer
            .sent_messages()
            .iter()
            .all(|m| !matches!(m, NetMsg::PlayerHit(_))));
    }

    #[tokio::test]
    async fn local_hit_on_remote_is_reported_not_applied() {
        let (mut ctx, mut peer) = online();
        let local = ctx.local_id().unwrap();
        peer.sent();

        let me = ctx.store.player_mut(local).unwrap();
        me.position = Vec2::new(500.0, 500.0);
        me.rotation = 0.0;
        let mut foe = Player::new(PlayerId(9), "foe", Vec2::new(600.0, 500.0));
        foe.target = Some(foe.position);
        ctx.store.insert_player(foe);

        let mut input = InputFrame::default();
        input.view_offset = Vec2::ZERO;
        input.state.pointer = Vec2::new(900.0, 500.0);
        input.state.fire = true;
        ctx.tick(&input);
        input.state.fire = false;
        for _ in 0..10 {
            ctx.tick(&input);
        }

        let hits: Vec<_> = peer
            .sent_messages()
            .into_iter()
            .filter_map(|m| match m {
                NetMsg::PlayerHit(h) => Some(h),
                _ => None,
            })
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shooter_id, Some(local));
        assert_eq!(hits[0].victim_id, PlayerId(9));
        assert_eq!(hits[0].damage, 20);
        assert_eq!(ctx.store().player(PlayerId(9)).unwrap().health(), 100.0);
    }

    #[tokio::test]
    async fn offline_start_skips_the_network() {
        let mut ctx = GameContext::new(ArenaConfig {
            offline: true,
            seed: Some(5),
            bot_count: 2,
            ..ArenaConfig::default()
        });
        ctx.start("  ");
        assert_eq!(ctx.mode(), Mode::Offline);
        assert_eq!(ctx.store().player_count(), 3);
        let hud = ctx.hud();
        assert_eq!(hud.health, 100.0);
        let me = ctx.store().player(hud.local_id.unwrap()).unwrap();
        assert_eq!(me.name, "Player");
    }

    #[tokio::test]
    async fn leaderboard_is_sorted_and_capped() {
        let mut ctx = GameContext::new(ArenaConfig {
            offline: true,
            seed: Some(5),
            bot_count: 7,
            ..ArenaConfig::default()
        });
        ctx.start("me");
        let board = ctx.leaderboard(LEADERBOARD_SIZE);
        assert_eq!(board.len(), 5);
        assert!(board.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

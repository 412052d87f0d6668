//! Applying authoritative messages to the entity store.
//!
//! Ownership rules:
//! - The local player's motion belongs to this client. Only authoritative
//!   fields (health, score, elimination) are taken from the authority.
//! - Remote players and bots get a new interpolation target; the first
//!   report for an entity snaps it into place.
//! - Health, score and elimination always replace the local value outright.

use std::time::Duration;

use arena_shared::{
    entity::PlayerPatch,
    event::{EventBus, GameEvent},
    math::Vec2,
    net::{
        NetMsg, PlayerDeath, PlayerHit, PlayerId, PlayerJoin, PlayerRespawn, PlayerShoot,
        PlayerState, PlayerUpdate,
    },
    store::EntityStore,
};
use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::{
    projectile::ProjectileSimulator,
    session::estimate_latency_ms,
    spawn::{fresh_player, random_spawn},
};

/// Camera shake when the local player is hit.
pub const HIT_SHAKE: f32 = 10.0;

/// Per-match counters shown on the HUD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub kills: u32,
    pub deaths: u32,
    /// Advisory latency from the last `SYNC`.
    pub ping_ms: Option<u32>,
}

/// Borrowed view of the game state needed to apply one message.
pub struct Reconciler<'a> {
    pub store: &'a mut EntityStore,
    pub local: Option<PlayerId>,
    pub events: &'a mut EventBus,
    pub stats: &'a mut MatchStats,
    pub rng: &'a mut StdRng,
    pub projectiles: &'a mut ProjectileSimulator,
    /// Simulation clock.
    pub now: Duration,
    /// Wall clock, Unix milliseconds.
    pub wall_ms: i64,
}

impl Reconciler<'_> {
    pub fn apply(&mut self, msg: NetMsg) {
        trace!(kind = msg.kind(), "Applying message");
        match msg {
            NetMsg::WorldState(ws) => {
                for entry in &ws.players {
                    self.apply_player_state(entry);
                }
            }
            NetMsg::PlayerJoin(join) => self.apply_join(&join),
            NetMsg::PlayerLeave(leave) => {
                if let Some(gone) = self.store.remove_player(leave.player_id) {
                    self.projectiles.forget(gone.id);
                    self.events.notice(format!("{} left the game", gone.name));
                }
            }
            NetMsg::PlayerUpdate(update) => self.apply_update(&update),
            NetMsg::PlayerShoot(shot) => self.apply_shoot(&shot),
            NetMsg::PlayerHit(hit) => self.apply_hit(&hit),
            NetMsg::PlayerDeath(PlayerDeath {
                shooter_id,
                victim_id,
                killer_name,
                victim_name,
            }) => self.apply_death(shooter_id, victim_id, killer_name, victim_name),
            NetMsg::PlayerRespawn(respawn) => self.apply_respawn(&respawn),
            NetMsg::Sync(sync) => {
                let ping = estimate_latency_ms(sync.server_time, self.wall_ms);
                self.stats.ping_ms = Some(ping);
                trace!(ping_ms = ping, tick = ?sync.tick, "Time sync");
            }
            NetMsg::ChatMessage(chat) => self.events.push(GameEvent::Chat {
                from: chat.player_id,
                message: chat.message,
            }),
            NetMsg::Heartbeat(hb) => debug!(player_id = %hb.player_id, "Heartbeat echo ignored"),
        }
    }

    fn is_local(&self, id: PlayerId) -> bool {
        self.local == Some(id)
    }

    fn apply_player_state(&mut self, entry: &PlayerState) {
        let reported = Vec2::new(entry.x, entry.y);
        let authoritative = PlayerPatch {
            health: entry.health,
            score: entry.score,
            eliminated: entry.is_dead,
            ..PlayerPatch::default()
        };

        if self.is_local(entry.id) {
            if let Some(me) = self.store.player_mut(entry.id) {
                authoritative.apply(me);
            }
            return;
        }

        let velocity = match (entry.vx, entry.vy) {
            (None, None) => None,
            (vx, vy) => Some(Vec2::new(vx.unwrap_or(0.0), vy.unwrap_or(0.0))),
        };
        let patch = PlayerPatch {
            name: Some(entry.name.clone()).filter(|n| !n.is_empty()),
            velocity,
            rotation: entry.rotation,
            is_bot: entry.is_bot.map(|b| b || entry.id.is_bot_range()),
            target: Some(reported),
            ..authoritative
        };

        let rng = &mut *self.rng;
        let player = self.store.upsert_player(entry.id, &PlayerPatch::default(), || {
            fresh_player(rng, entry.id, entry.name.clone(), reported)
        });
        if player.target.is_none() {
            player.position = reported;
        }
        patch.apply(player);
    }

    fn apply_join(&mut self, join: &PlayerJoin) {
        if self.is_local(join.player_id) {
            return;
        }
        // Without coordinates the spawn point is a placeholder, so no target
        // is recorded and the first update snaps.
        let reported = match (join.x, join.y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        };
        let patch = PlayerPatch {
            name: Some(join.name.clone()).filter(|n| !n.is_empty()),
            target: reported,
            ..PlayerPatch::default()
        };

        let rng = &mut *self.rng;
        let player = self.store.upsert_player(join.player_id, &PlayerPatch::default(), || {
            let at = reported.unwrap_or_else(|| random_spawn(&mut *rng));
            fresh_player(&mut *rng, join.player_id, join.name.clone(), at)
        });
        if let Some(at) = reported {
            if player.target.is_none() {
                player.position = at;
            }
        }
        patch.apply(player);
        debug!(player_id = %join.player_id, name = %join.name, "Player joined");
        self.events.notice(format!("{} joined the game", join.name));
    }

    fn apply_update(&mut self, update: &PlayerUpdate) {
        if self.is_local(update.player_id) {
            return;
        }
        let Some(player) = self.store.player_mut(update.player_id) else {
            trace!(player_id = %update.player_id, "Update for unknown player");
            return;
        };
        let reported = Vec2::new(update.x, update.y);
        if player.target.is_none() {
            player.position = reported;
        }
        PlayerPatch {
            velocity: Some(Vec2::new(
                update.vx.unwrap_or(0.0),
                update.vy.unwrap_or(0.0),
            )),
            rotation: update.rotation,
            target: Some(reported),
            ..PlayerPatch::default()
        }
        .apply(player);
    }

    fn apply_shoot(&mut self, shot: &PlayerShoot) {
        if self.is_local(shot.shooter_id) || !self.store.contains_player(shot.shooter_id) {
            return;
        }
        self.projectiles.spawn_remote(self.store, shot, self.now);
        self.events.push(GameEvent::MuzzleFlash {
            at: Vec2::new(shot.x, shot.y),
            angle: shot.rotation,
        });
    }

    fn apply_hit(&mut self, hit: &PlayerHit) {
        let Some(victim) = self.store.player_mut(hit.victim_id) else {
            return;
        };
        if let Some(health) = hit.health {
            victim.set_health(health);
        }
        let at = victim.position;
        self.events.push(GameEvent::HitEffect {
            at,
            victim: hit.victim_id,
        });
        if self.is_local(hit.victim_id) {
            self.events.push(GameEvent::CameraShake(HIT_SHAKE));
        }
    }

    /// Records an elimination, whether ruled by the authority or locally.
    pub fn apply_death(
        &mut self,
        shooter: PlayerId,
        victim: PlayerId,
        killer_name: String,
        victim_name: String,
    ) {
        if let Some(v) = self.store.player_mut(victim) {
            v.set_eliminated(true);
            let at = v.position;
            self.events.push(GameEvent::Explosion { at });
        }
        if let Some(k) = self.store.player_mut(shooter) {
            k.score += 1;
        }
        if self.is_local(shooter) {
            self.stats.kills += 1;
        }
        if self.is_local(victim) {
            self.stats.deaths += 1;
        }
        debug!(shooter = %shooter, victim = %victim, "Player eliminated");
        self.events.push(GameEvent::KillFeed {
            killer: killer_name,
            victim: victim_name,
        });
    }

    fn apply_respawn(&mut self, respawn: &PlayerRespawn) {
        let Some(player) = self.store.player_mut(respawn.player_id) else {
            return;
        };
        let at = Vec2::new(respawn.x, respawn.y);
        player.position = at;
        if player.target.is_some() {
            player.target = Some(at);
        }
        player.set_eliminated(false);
        player.set_health(respawn.health);
        self.events.push(GameEvent::RespawnEffect { at });
    }
}

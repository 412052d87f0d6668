//! Projectile simulation.
//!
//! Projectiles are simulated on every client, local and remote alike. The
//! simulator only *detects* hits; whether a hit changes health is decided by
//! the caller (authority online, [`crate::offline`] offline).

use std::{collections::HashMap, time::Duration};

use arena_shared::{
    entity::{Projectile, ProjectileId},
    math::Vec2,
    net::{PlayerId, PlayerShoot},
    physics::{circles_overlap, WorldBounds},
    store::EntityStore,
};
use tracing::trace;

pub const MUZZLE_SPEED: f32 = 800.0;
pub const PROJECTILE_RADIUS: f32 = 5.0;
pub const DAMAGE: u32 = 20;
/// Seconds.
pub const LIFETIME: f32 = 2.0;
/// Distance in front of the shooter where local shots appear.
pub const MUZZLE_OFFSET: f32 = 30.0;
/// Minimum spacing between local shots of one shooter.
pub const FIRE_INTERVAL: Duration = Duration::from_millis(200);

/// A projectile touched a player this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileHit {
    pub projectile: ProjectileId,
    pub shooter: PlayerId,
    pub victim: PlayerId,
    pub damage: u32,
    pub at: Vec2,
}

#[derive(Debug, Default)]
pub struct ProjectileSimulator {
    last_shot: HashMap<PlayerId, Duration>,
}

impl ProjectileSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a projectile leaving `origin` along `angle`.
    pub fn make(owner: PlayerId, origin: Vec2, angle: f32, spawned_ms: u64) -> Projectile {
        Projectile {
            id: ProjectileId { owner, spawned_ms },
            owner,
            position: origin,
            velocity: Vec2::from_angle(angle) * MUZZLE_SPEED,
            radius: PROJECTILE_RADIUS,
            damage: DAMAGE,
            lifetime: LIFETIME,
        }
    }

    /// Fires from `shooter`'s muzzle if its rate limit allows.
    ///
    /// Returns the shot intent to publish. Eliminated or unknown shooters
    /// never fire.
    pub fn try_fire(
        &mut self,
        store: &mut EntityStore,
        shooter: PlayerId,
        now: Duration,
    ) -> Option<PlayerShoot> {
        let player = store.player(shooter)?;
        if player.is_eliminated() {
            return None;
        }
        if let Some(last) = self.last_shot.get(&shooter) {
            if now.saturating_sub(*last) < FIRE_INTERVAL {
                return None;
            }
        }

        let angle = player.rotation;
        let origin = player.position + Vec2::from_angle(angle) * MUZZLE_OFFSET;
        let spawned_ms = free_spawn_ms(store, shooter, now.as_millis() as u64);
        store.insert_projectile(Self::make(shooter, origin, angle, spawned_ms));
        self.last_shot.insert(shooter, now);
        trace!(shooter = %shooter, spawned_ms, "Projectile fired");

        Some(PlayerShoot {
            shooter_id: shooter,
            x: origin.x,
            y: origin.y,
            rotation: angle,
            timestamp: Some(spawned_ms as f64 / 1000.0),
        })
    }

    /// Mirrors a shot announced by the authority. Not rate limited.
    pub fn spawn_remote(&mut self, store: &mut EntityStore, shot: &PlayerShoot, now: Duration) -> ProjectileId {
        let spawned_ms = shot
            .timestamp
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map_or(now.as_millis() as u64, |t| (t * 1000.0) as u64);
        let spawned_ms = free_spawn_ms(store, shot.shooter_id, spawned_ms);
        let projectile = Self::make(
            shot.shooter_id,
            Vec2::new(shot.x, shot.y),
            shot.rotation,
            spawned_ms,
        );
        let id = projectile.id;
        store.insert_projectile(projectile);
        id
    }

    /// Advances every projectile by `dt` seconds and reports hits.
    ///
    /// A projectile hits at most one player (the nearest overlapping one)
    /// and is removed on contact, on expiry, or when it leaves the world.
    pub fn tick(&mut self, store: &mut EntityStore, bounds: &WorldBounds, dt: f32) -> Vec<ProjectileHit> {
        let targets: Vec<(PlayerId, Vec2, f32)> = store
            .players()
            .filter(|p| !p.is_eliminated())
            .map(|p| (p.id, p.position, p.radius))
            .collect();

        let mut hits = Vec::new();
        let mut spent = Vec::new();

        for projectile in store.projectiles_mut() {
            projectile.position += projectile.velocity * dt;
            projectile.lifetime -= dt;

            let victim = targets
                .iter()
                .filter(|(id, ..)| *id != projectile.owner)
                .filter(|(_, pos, radius)| {
                    circles_overlap(projectile.position, projectile.radius, *pos, *radius)
                })
                .min_by(|a, b| {
                    let da = a.1.distance(projectile.position);
                    let db = b.1.distance(projectile.position);
                    da.total_cmp(&db)
                });

            if let Some((victim, ..)) = victim {
                hits.push(ProjectileHit {
                    projectile: projectile.id,
                    shooter: projectile.owner,
                    victim: *victim,
                    damage: projectile.damage,
                    at: projectile.position,
                });
                spent.push(projectile.id);
            } else if projectile.lifetime <= 0.0 || !bounds.contains(projectile.position) {
                spent.push(projectile.id);
            }
        }

        for id in spent {
            store.remove_projectile(id);
        }
        hits
    }

    /// Drops the rate-limit record of a departed shooter.
    pub fn forget(&mut self, shooter: PlayerId) {
        self.last_shot.remove(&shooter);
    }

    pub fn reset(&mut self) {
        self.last_shot.clear();
    }
}

/// First millisecond at or after `spawned_ms` with no live projectile of
/// `owner`, so two shots in one tick never share an id.
fn free_spawn_ms(store: &EntityStore, owner: PlayerId, mut spawned_ms: u64) -> u64 {
    while store.projectile(ProjectileId { owner, spawned_ms }).is_some() {
        spawned_ms += 1;
    }
    spawned_ms
}

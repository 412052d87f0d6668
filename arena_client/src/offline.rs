//! Offline simulation fallback.
//!
//! When no authority is reachable the client runs a local match against
//! stationary bots. Hits are ruled here instead of by the authority:
//! - damage is subtracted locally, floored at zero;
//! - an elimination is reported back to the caller;
//! - the victim respawns after [`RESPAWN_DELAY`] of simulation time.

use std::time::Duration;

use arena_shared::{
    event::{EventBus, GameEvent},
    net::PlayerId,
    store::EntityStore,
};
use rand::Rng;
use tracing::{debug, info};

use crate::{
    projectile::ProjectileHit,
    spawn::{fresh_player, random_spawn},
};

pub const RESPAWN_DELAY: Duration = Duration::from_secs(3);
/// Largest magnitude of a generated identifier.
pub const MAX_ID: i32 = 9999;

/// Draws an identifier not present in `store`.
///
/// Bots get negative identifiers, everyone else positive ones.
pub fn allocate_id<R: Rng + ?Sized>(store: &EntityStore, rng: &mut R, bot: bool) -> PlayerId {
    loop {
        let n = rng.gen_range(1..=MAX_ID);
        let id = PlayerId(if bot { -n } else { n });
        if !store.contains_player(id) {
            return id;
        }
    }
}

/// A locally ruled elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kill {
    pub shooter: PlayerId,
    pub victim: PlayerId,
    pub killer_name: String,
    pub victim_name: String,
}

#[derive(Debug, Default)]
pub struct OfflineWorld {
    pending_respawns: Vec<(PlayerId, Duration)>,
}

impl OfflineWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the store's contents with a local player and `bots` bots.
    ///
    /// Returns the local player's identifier.
    pub fn seed<R: Rng + ?Sized>(
        &mut self,
        store: &mut EntityStore,
        rng: &mut R,
        name: &str,
        bots: usize,
    ) -> PlayerId {
        store.clear();
        self.pending_respawns.clear();

        let local = allocate_id(store, rng, false);
        let pos = random_spawn(rng);
        store.insert_player(fresh_player(rng, local, name, pos));

        for _ in 0..bots {
            let id = allocate_id(store, rng, true);
            let pos = random_spawn(rng);
            let mut bot = fresh_player(rng, id, format!("Bot{}", id.0.unsigned_abs()), pos);
            bot.is_bot = true;
            bot.score = rng.gen_range(0..10);
            store.insert_player(bot);
        }

        info!(local = %local, bots, "Offline match seeded");
        local
    }

    /// Applies a projectile hit. Returns the elimination it caused, if any.
    pub fn resolve_hit(
        &mut self,
        store: &mut EntityStore,
        events: &mut EventBus,
        hit: &ProjectileHit,
        now: Duration,
    ) -> Option<Kill> {
        let victim = store.player_mut(hit.victim)?;
        if victim.is_eliminated() {
            return None;
        }
        victim.set_health(victim.health() - hit.damage as f32);
        events.push(GameEvent::HitEffect {
            at: victim.position,
            victim: hit.victim,
        });
        if victim.health() > 0.0 {
            return None;
        }

        victim.set_eliminated(true);
        let victim_name = victim.name.clone();
        let killer_name = store
            .player(hit.shooter)
            .map_or_else(|| "Unknown".to_string(), |k| k.name.clone());
        self.pending_respawns.push((hit.victim, now + RESPAWN_DELAY));
        debug!(victim = %hit.victim, "Respawn scheduled");

        Some(Kill {
            shooter: hit.shooter,
            victim: hit.victim,
            killer_name,
            victim_name,
        })
    }

    /// Brings back every player whose respawn is due.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        store: &mut EntityStore,
        rng: &mut R,
        now: Duration,
        events: &mut EventBus,
    ) {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending_respawns
            .drain(..)
            .partition(|(_, at)| *at <= now);
        self.pending_respawns = waiting;

        for (id, _) in due {
            let Some(player) = store.player_mut(id) else {
                continue;
            };
            let at = random_spawn(rng);
            player.position = at;
            player.set_eliminated(false);
            player.set_health(player.max_health);
            events.push(GameEvent::RespawnEffect { at });
        }
    }

    pub fn pending_respawns(&self) -> usize {
        self.pending_respawns.len()
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::math::Vec2;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn hit(shooter: PlayerId, victim: PlayerId) -> ProjectileHit {
        ProjectileHit {
            projectile: arena_shared::entity::ProjectileId {
                owner: shooter,
                spawned_ms: 0,
            },
            shooter,
            victim,
            damage: 20,
            at: Vec2::ZERO,
        }
    }

    #[test]
    fn seed_creates_local_and_bots() {
        let mut store = EntityStore::new();
        store.insert_player(arena_shared::entity::Player::new(PlayerId(42), "stale", Vec2::ZERO));
        let mut rng = StdRng::seed_from_u64(3);
        let local = OfflineWorld::new().seed(&mut store, &mut rng, "me", 3);

        assert!(local.0 > 0);
        assert!(store.players().all(|p| p.name != "stale"));
        assert_eq!(store.player_count(), 4);
        let bots: Vec<_> = store.players().filter(|p| p.is_bot).collect();
        assert_eq!(bots.len(), 3);
        for b in bots {
            assert!(b.id.0 < 0);
            assert_eq!(b.name, format!("Bot{}", -b.id.0));
            assert!(b.score < 10);
        }
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let id = allocate_id(&store, &mut rng, true);
            assert!(!store.contains_player(id));
            store.insert_player(arena_shared::entity::Player::new(id, "b", Vec2::ZERO));
        }
        assert_eq!(store.player_count(), 500);
    }

    #[test]
    fn five_hits_eliminate_then_respawn() {
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventBus::default();
        let mut world = OfflineWorld::new();
        let local = world.seed(&mut store, &mut rng, "me", 1);
        let bot = store.players().find(|p| p.is_bot).unwrap().id;
        let now = Duration::from_secs(10);

        for _ in 0..4 {
            assert!(world.resolve_hit(&mut store, &mut events, &hit(local, bot), now).is_none());
        }
        assert_eq!(store.player(bot).unwrap().health(), 20.0);
        let kill = world
            .resolve_hit(&mut store, &mut events, &hit(local, bot), now)
            .unwrap();
        assert_eq!(kill.shooter, local);
        assert_eq!(kill.killer_name, "me");
        assert_eq!(world.pending_respawns(), 1);
        assert!(store.player(bot).unwrap().is_eliminated());
        assert!(world.resolve_hit(&mut store, &mut events, &hit(local, bot), now).is_none());

        world.tick(&mut store, &mut rng, now + Duration::from_millis(2999), &mut events);
        assert_eq!(world.pending_respawns(), 1);
        world.tick(&mut store, &mut rng, now + RESPAWN_DELAY, &mut events);
        assert_eq!(world.pending_respawns(), 0);
        assert_eq!(store.player(bot).unwrap().health(), 100.0);
        assert!(!store.player(bot).unwrap().is_eliminated());
    }

    #[test]
    fn health_floors_at_zero() {
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut events = EventBus::default();
        let mut world = OfflineWorld::new();
        let local = world.seed(&mut store, &mut rng, "me", 1);
        let bot = store.players().find(|p| p.is_bot).unwrap().id;
        store.player_mut(bot).unwrap().set_health(5.0);
        let mut big = hit(local, bot);
        big.damage = 50;
        assert!(world.resolve_hit(&mut store, &mut events, &big, Duration::ZERO).is_some());
        assert_eq!(store.player(bot).unwrap().health(), 0.0);
    }
}

//! Entity store.
//!
//! The canonical mapping of identifier to entity. It holds no policy: callers
//! decide what to write, the store only guarantees that an upsert on an
//! existing identifier merges instead of replacing.

use std::collections::HashMap;

use crate::{
    entity::{Player, PlayerPatch, Projectile, ProjectileId},
    net::PlayerId,
};

#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    players: HashMap<PlayerId, Player>,
    projectiles: HashMap<ProjectileId, Projectile>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a whole player, replacing any entity with the same id.
    pub fn insert_player(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    /// Merges `patch` into the player, creating it from `create` first if absent.
    pub fn upsert_player(
        &mut self,
        id: PlayerId,
        patch: &PlayerPatch,
        create: impl FnOnce() -> Player,
    ) -> &mut Player {
        let player = self.players.entry(id).or_insert_with(create);
        patch.apply(player);
        player
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Iterates players in unspecified order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn insert_projectile(&mut self, projectile: Projectile) -> Option<Projectile> {
        self.projectiles.insert(projectile.id, projectile)
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn projectiles_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.projectiles.values_mut()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Drops every entity.
    pub fn clear(&mut self) {
        self.players.clear();
        self.projectiles.clear();
    }
}

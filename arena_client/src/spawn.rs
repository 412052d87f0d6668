//! Spawn placement for players created without an authoritative position.

use arena_shared::{
    entity::{random_color, Player},
    math::Vec2,
    net::PlayerId,
};
use rand::Rng;

pub const SPAWN_MIN: Vec2 = Vec2::new(100.0, 100.0);
pub const SPAWN_MAX: Vec2 = Vec2::new(1700.0, 900.0);

/// Uniform position inside the spawn rectangle.
pub fn random_spawn<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::new(
        rng.gen_range(SPAWN_MIN.x..=SPAWN_MAX.x),
        rng.gen_range(SPAWN_MIN.y..=SPAWN_MAX.y),
    )
}

/// New player at `position` with a palette color.
pub fn fresh_player<R: Rng + ?Sized>(
    rng: &mut R,
    id: PlayerId,
    name: impl Into<String>,
    position: Vec2,
) -> Player {
    Player::new(id, name, position).with_color(random_color(rng))
}

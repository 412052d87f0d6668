//! Interpolation.
//!
//! The authority sends sparse, partial positions. Between them the client
//! moves non-local entities toward their last reported target:
//! - Remote players: exponential smoothing with a deadband.
//! - Bots: dead-reckoning from reported velocity, smoothing when stationary.
//!
//! The local player is never interpolated; see `prediction`.

use arena_shared::{
    entity::Player,
    net::PlayerId,
    physics::WorldBounds,
    store::EntityStore,
};

/// Fraction of the remaining distance a remote player covers per tick.
pub const REMOTE_LERP: f32 = 0.2;
/// Fraction of the remaining distance a stationary bot covers per tick.
pub const BOT_LERP: f32 = 0.15;
/// Distance under which no smoothing is applied.
pub const DEADBAND: f32 = 1.0;

/// Trust policy applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Local,
    Remote,
    Bot,
}

pub fn role_of(player: &Player, local: Option<PlayerId>) -> Role {
    if Some(player.id) == local {
        Role::Local
    } else if player.is_bot {
        Role::Bot
    } else {
        Role::Remote
    }
}

/// Moves a remote player a fixed fraction toward its target.
pub fn advance_remote(player: &mut Player) {
    let Some(target) = player.target else {
        return;
    };
    let delta = target - player.position;
    if delta.len() > DEADBAND {
        player.position += delta * REMOTE_LERP;
    }
}

/// Moves a bot toward its target, extrapolating when it has velocity.
pub fn advance_bot(player: &mut Player, dt: f32) {
    if player.is_eliminated() {
        return;
    }
    let Some(target) = player.target else {
        return;
    };
    let delta = target - player.position;
    if delta.len() <= DEADBAND {
        return;
    }
    if player.velocity.is_zero() {
        player.position += delta * BOT_LERP;
    } else {
        player.position += player.velocity * dt;
    }
}

/// Advances every non-local entity, then clamps every player to the world.
pub fn advance_non_local(
    store: &mut EntityStore,
    local: Option<PlayerId>,
    bounds: &WorldBounds,
    dt: f32,
) {
    for player in store.players_mut() {
        match role_of(player, local) {
            Role::Local => {}
            Role::Remote => advance_remote(player),
            Role::Bot => advance_bot(player, dt),
        }
        player.position = bounds.clamp_circle(player.position, player.radius);
    }
}

//! Entity model.
//!
//! Players (including bots) and projectiles are plain data. All policy lives in
//! the client crate; these types only enforce their own invariants.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{math::Vec2, net::PlayerId};

pub const DEFAULT_MAX_HEALTH: f32 = 100.0;
pub const PLAYER_RADIUS: f32 = 20.0;

/// Display colors handed out to new players.
pub const PALETTE: [&str; 10] = [
    "#ff6b6b", "#4ecdc4", "#45b7d1", "#96ceb4", "#feca57", "#ff9ff3", "#54a0ff", "#48dbfb",
    "#00d2d3", "#ff6348",
];

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    PALETTE[rng.gen_range(0..PALETTE.len())].to_string()
}

/// A player or bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Facing angle, radians.
    pub rotation: f32,
    health: f32,
    pub max_health: f32,
    pub radius: f32,
    pub color: String,
    pub score: u32,
    eliminated: bool,
    pub is_bot: bool,
    /// Latest authoritative position. Never set on the local player.
    pub target: Option<Vec2>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            radius: PLAYER_RADIUS,
            color: PALETTE[0].to_string(),
            score: 0,
            eliminated: false,
            is_bot: id.is_bot_range(),
            target: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Sets health, clamped to `[0, max_health]`.
    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Marks the player eliminated (health drops to zero) or back in play.
    pub fn set_eliminated(&mut self, eliminated: bool) {
        self.eliminated = eliminated;
        if eliminated {
            self.health = 0.0;
        }
    }
}

/// Partial update for a player. `None` fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
    pub rotation: Option<f32>,
    pub health: Option<f32>,
    pub score: Option<u32>,
    pub eliminated: Option<bool>,
    pub is_bot: Option<bool>,
    pub target: Option<Vec2>,
}

impl PlayerPatch {
    pub fn apply(&self, p: &mut Player) {
        if let Some(name) = &self.name {
            p.name.clone_from(name);
        }
        if let Some(pos) = self.position {
            p.position = pos;
        }
        if let Some(vel) = self.velocity {
            p.velocity = vel;
        }
        if let Some(rot) = self.rotation {
            p.rotation = rot;
        }
        if let Some(score) = self.score {
            p.score = score;
        }
        if let Some(is_bot) = self.is_bot {
            p.is_bot = is_bot;
        }
        if let Some(target) = self.target {
            p.target = Some(target);
        }
        if let Some(health) = self.health {
            p.set_health(health);
        }
        if let Some(eliminated) = self.eliminated {
            p.set_eliminated(eliminated);
        }
    }
}

/// Projectile identity: shooter plus spawn time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileId {
    pub owner: PlayerId,
    pub spawned_ms: u64,
}

impl std::fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.owner, self.spawned_ms)
    }
}

/// Short-lived ballistic entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub damage: u32,
    /// Seconds left before the projectile expires.
    pub lifetime: f32,
}

//! Outward notifications.
//!
//! The simulation never draws or plays anything itself. It records what
//! happened as [`GameEvent`]s and the UI/effects layer drains them once per
//! frame.

use crate::{math::Vec2, net::PlayerId};

/// Something downstream collaborators may want to show.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Projectile impact at a position.
    HitEffect { at: Vec2, victim: PlayerId },
    MuzzleFlash { at: Vec2, angle: f32 },
    Explosion { at: Vec2 },
    RespawnEffect { at: Vec2 },
    /// Screen shake strength for the local view.
    CameraShake(f32),
    KillFeed { killer: String, victim: String },
    Chat { from: PlayerId, message: String },
    /// System notice for the chat panel (connect, fallback, join, leave).
    Notice(String),
}

/// FIFO queue of notifications.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<GameEvent>,
}

impl EventBus {
    pub fn push(&mut self, e: GameEvent) {
        self.queue.push(e);
    }

    pub fn notice(&mut self, text: impl Into<String>) {
        self.push(GameEvent::Notice(text.into()));
    }

    /// Takes every queued event in arrival order.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

//! Local prediction.
//!
//! The controlled player is advanced straight from input every tick and never
//! waits for the authority. Its state is published back as `PLAYER_UPDATE`
//! intents, throttled so outbound traffic is independent of tick and frame
//! rate.

use std::time::Duration;

use arena_shared::{
    entity::Player,
    math::Vec2,
    net::PlayerUpdate,
    physics::WorldBounds,
};

use crate::input::InputFrame;

/// Movement speed, units per second.
pub const MOVE_SPEED: f32 = 300.0;
/// Per-axis movement that counts as a position change.
pub const POSITION_EPSILON: f32 = 1.0;
/// Facing change (radians) that counts as a rotation change.
pub const ROTATION_EPSILON: f32 = 0.1;
/// Minimum spacing between outbound updates (at most 20 per second).
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Rate limiter for outbound position updates.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    interval: Duration,
    last_sent: Option<Duration>,
    last_sent_rotation: f32,
}

impl Default for UpdateThrottle {
    fn default() -> Self {
        Self::new(UPDATE_INTERVAL)
    }
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            last_sent_rotation: 0.0,
        }
    }

    /// Whether an update may go out at frame-clock time `now`.
    pub fn should_send(&self, moved: bool, rotation: f32, now: Duration) -> bool {
        let rotated = (self.last_sent_rotation - rotation).abs() > ROTATION_EPSILON;
        if !moved && !rotated {
            return false;
        }
        self.last_sent
            .map_or(true, |last| now.saturating_sub(last) >= self.interval)
    }

    pub fn mark_sent(&mut self, rotation: f32, now: Duration) {
        self.last_sent = Some(now);
        self.last_sent_rotation = rotation;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.interval);
    }
}

/// Advances the local player and decides what to publish.
#[derive(Debug, Default)]
pub struct LocalPredictor {
    throttle: UpdateThrottle,
}

impl LocalPredictor {
    /// Integrates one tick of input into `player`.
    ///
    /// Returns the update intent to send, if the throttle allows one.
    pub fn step(
        &mut self,
        player: &mut Player,
        input: &InputFrame,
        bounds: &WorldBounds,
        dt: f32,
        now: Duration,
    ) -> Option<PlayerUpdate> {
        let old = player.position;

        player.velocity = input.state.move_vector() * MOVE_SPEED;
        player.position = bounds.clamp_circle(player.position + player.velocity * dt, player.radius);

        let aim = input.state.pointer_world(input.view_offset);
        player.rotation = player.position.angle_to(aim);

        let moved = moved_beyond_epsilon(old, player.position);
        if !self.throttle.should_send(moved, player.rotation, now) {
            return None;
        }
        self.throttle.mark_sent(player.rotation, now);
        Some(PlayerUpdate {
            player_id: player.id,
            x: player.position.x,
            y: player.position.y,
            vx: Some(player.velocity.x),
            vy: Some(player.velocity.y),
            rotation: Some(player.rotation),
        })
    }

    pub fn reset(&mut self) {
        self.throttle.reset();
    }
}

fn moved_beyond_epsilon(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() > POSITION_EPSILON || (a.y - b.y).abs() > POSITION_EPSILON
}

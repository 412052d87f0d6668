//! World bounds and overlap tests.
//!
//! The arena is a fixed axis-aligned rectangle anchored at the origin.
//! Players are kept inside it; projectiles are discarded once they leave it.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Fixed world rectangle `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
    /// Minimum distance kept between a player's center and any wall.
    #[serde(default)]
    pub edge_margin: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 1200.0,
            edge_margin: 50.0,
        }
    }
}

impl WorldBounds {
    pub const fn new(width: f32, height: f32, edge_margin: f32) -> Self {
        Self {
            width,
            height,
            edge_margin,
        }
    }

    /// Clamps a circle center so the circle stays inside the rectangle.
    ///
    /// The margin is the larger of the radius and the configured edge margin.
    /// If the world is too small for the margin the center collapses to the
    /// middle of that axis.
    pub fn clamp_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        let margin = radius.max(self.edge_margin);
        Vec2::new(
            clamp_axis(center.x, margin, self.width),
            clamp_axis(center.y, margin, self.height),
        )
    }

    /// Whether a point lies inside the closed rectangle.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }
}

fn clamp_axis(v: f32, margin: f32, extent: f32) -> f32 {
    let lo = margin;
    let hi = extent - margin;
    if lo > hi {
        return extent * 0.5;
    }
    v.clamp(lo, hi)
}

/// Strict circle overlap test: `distance < ra + rb`.
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    (b - a).len_sq() < r * r
}

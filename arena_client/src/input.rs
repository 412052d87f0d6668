//! Input handling.
//!
//! Capture plumbing (keyboard, mouse, windowing) lives outside the engine.
//! The loop samples an [`InputSource`] once per display frame and every tick
//! of that frame sees the same live state, as a browser's held-key map would.

use arena_shared::{math::Vec2, render::FrameView};

bitflags::bitflags! {
    /// Held movement keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveKeys: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub keys: MoveKeys,
    /// Pointer position in view (screen) space.
    pub pointer: Vec2,
    pub fire: bool,
}

impl InputState {
    /// Direction of travel with magnitude 1 (or 0 when idle).
    ///
    /// Opposing keys cancel out; diagonals are scaled by 1/sqrt(2).
    pub fn move_vector(self) -> Vec2 {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.keys.contains(MoveKeys::UP) {
            dy -= 1.0;
        }
        if self.keys.contains(MoveKeys::DOWN) {
            dy += 1.0;
        }
        if self.keys.contains(MoveKeys::LEFT) {
            dx -= 1.0;
        }
        if self.keys.contains(MoveKeys::RIGHT) {
            dx += 1.0;
        }
        let v = Vec2::new(dx, dy);
        if dx != 0.0 && dy != 0.0 {
            v * std::f32::consts::FRAC_1_SQRT_2
        } else {
            v
        }
    }

    /// Pointer translated into world space by the current view offset.
    pub fn pointer_world(self, view_offset: Vec2) -> Vec2 {
        self.pointer + view_offset
    }
}

/// Input sampled for one display frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub state: InputState,
    /// World position of the view's top-left corner (camera offset).
    pub view_offset: Vec2,
}

/// Supplies input to the loop.
pub trait InputSource {
    fn sample(&mut self, frame: &FrameView<'_>) -> InputFrame;
}

/// No keys held, pointer at the view origin.
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self, _frame: &FrameView<'_>) -> InputFrame {
        InputFrame::default()
    }
}

//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend. A renderer
//! receives read-only access to the store once per display frame together
//! with the interpolation fraction left over by the fixed-timestep loop.

use crate::{event::GameEvent, net::PlayerId, store::EntityStore};

/// What a renderer sees each frame.
pub struct FrameView<'a> {
    pub store: &'a EntityStore,
    pub local_id: Option<PlayerId>,
    /// Leftover accumulator divided by the tick duration, in `[0, 1)`.
    pub alpha: f32,
}

/// A minimal rendering API.
pub trait FrameSink {
    /// Receives each notification drained this frame, before `present`.
    fn notify(&mut self, _event: &GameEvent) {}

    fn present(&mut self, frame: &FrameView<'_>);
}

/// A no-op renderer useful for headless runs and tests.
#[derive(Default)]
pub struct NullRenderer;

impl FrameSink for NullRenderer {
    fn present(&mut self, _frame: &FrameView<'_>) {}
}

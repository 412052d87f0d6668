//! Fixed-timestep driver.
//!
//! Display frames arrive at whatever rate the host manages; the simulation
//! advances in fixed ticks. Each frame:
//! 1. drains the network session,
//! 2. samples input once,
//! 3. runs as many whole ticks as the accumulated time allows,
//! 4. hands queued notifications and the leftover fraction to the renderer.

use std::time::Duration;

use arena_shared::render::FrameSink;
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{game::GameContext, input::InputSource};

/// Longest frame delta fed into the accumulator.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Accumulator turning variable frame time into fixed ticks.
///
/// Frame deltas above [`MAX_FRAME_DELTA`] are truncated before they reach the
/// accumulator. Time lost to a stall is dropped, not replayed, so at most
/// 250 ms worth of ticks runs after a hitch.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
}

impl FixedTimestep {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            accumulator: Duration::ZERO,
        }
    }

    /// Adds `elapsed` and returns how many ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.min(MAX_FRAME_DELTA);
        let mut due = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            due += 1;
        }
        due
    }

    /// Fraction of a tick left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f64() / self.step.as_secs_f64()) as f32
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub ticks: u64,
}

pub struct GameLoop {
    timestep: FixedTimestep,
    stats: LoopStats,
}

impl GameLoop {
    pub fn new(tick: Duration) -> Self {
        Self {
            timestep: FixedTimestep::new(tick),
            stats: LoopStats::default(),
        }
    }

    /// Processes one display frame that took `elapsed`. Returns ticks run.
    pub fn frame<I, S>(&mut self, ctx: &mut GameContext, elapsed: Duration, input: &mut I, sink: &mut S) -> u32
    where
        I: InputSource + ?Sized,
        S: FrameSink + ?Sized,
    {
        ctx.pump_network();

        let sampled = input.sample(&ctx.frame_view(self.timestep.alpha()));
        ctx.advance_frame_clock(elapsed);
        let due = self.timestep.advance(elapsed);
        for _ in 0..due {
            ctx.tick(&sampled);
        }

        for event in ctx.drain_events() {
            sink.notify(&event);
        }
        sink.present(&ctx.frame_view(self.timestep.alpha()));
        self.stats.frames += 1;
        self.stats.ticks += u64::from(due);
        due
    }

    /// Drives frames every `frame_period` until `shutdown` turns true or its
    /// sender goes away, then tears the context down.
    pub async fn run<I, S>(
        mut self,
        ctx: &mut GameContext,
        input: &mut I,
        sink: &mut S,
        frame_period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> LoopStats
    where
        I: InputSource + ?Sized,
        S: FrameSink + ?Sized,
    {
        let mut ticker = tokio::time::interval(frame_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();

        info!(frame_ms = frame_period.as_millis() as u64, "Game loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now - last;
                    last = now;
                    self.frame(ctx, elapsed, input, sink);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        ctx.shutdown();
        info!(frames = self.stats.frames, ticks = self.stats.ticks, "Game loop stopped");
        self.stats
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::{
        config::ArenaConfig,
        event::GameEvent,
        render::{FrameView, NullRenderer},
    };

    use arena_shared::net::NetMsg;

    use super::*;
    use crate::{
        game::Phase,
        input::{IdleInput, InputFrame, MoveKeys},
        session::{NetworkSession, SessionTimings},
    };

    const TICK: Duration = Duration::from_nanos(16_666_667);

    #[test]
    fn forty_ms_runs_two_ticks() {
        let mut ts = FixedTimestep::new(TICK);
        assert_eq!(ts.advance(Duration::from_millis(40)), 2);
        assert!((ts.alpha() - 0.4).abs() < 1e-3);
    }

    #[test]
    fn short_frame_runs_nothing() {
        let mut ts = FixedTimestep::new(TICK);
        assert_eq!(ts.advance(Duration::from_millis(5)), 0);
        assert!((ts.alpha() - 0.3).abs() < 1e-3);
    }

    #[test]
    fn stalls_are_clamped() {
        let mut ts = FixedTimestep::new(TICK);
        assert_eq!(ts.advance(Duration::from_secs(10)), 14);
    }

    #[derive(Default)]
    struct Recorder {
        alphas: Vec<f32>,
        events: Vec<GameEvent>,
    }

    impl FrameSink for Recorder {
        fn notify(&mut self, event: &GameEvent) {
            self.events.push(event.clone());
        }

        fn present(&mut self, frame: &FrameView<'_>) {
            self.alphas.push(frame.alpha);
        }
    }

    #[tokio::test]
    async fn frame_ticks_only_while_playing() {
        let mut ctx = GameContext::new(ArenaConfig {
            offline: true,
            seed: Some(2),
            ..ArenaConfig::default()
        });
        let mut lp = GameLoop::new(ctx.config().tick_duration());
        let mut sink = Recorder::default();

        lp.frame(&mut ctx, Duration::from_millis(40), &mut IdleInput, &mut sink);
        assert_eq!(ctx.ticks(), 0);

        ctx.start("me");
        assert_eq!(ctx.phase(), Phase::Playing);
        lp.frame(&mut ctx, Duration::from_millis(40), &mut IdleInput, &mut sink);
        assert_eq!(ctx.ticks(), 2);
        assert_eq!(sink.alphas.len(), 2);
        assert_eq!(sink.events, vec![GameEvent::Notice("Running in offline mode".into())]);
    }

    struct Hold(InputFrame);

    impl InputSource for Hold {
        fn sample(&mut self, _frame: &FrameView<'_>) -> InputFrame {
            self.0
        }
    }

    #[tokio::test]
    async fn catch_up_ticks_publish_one_update() {
        let mut ctx = GameContext::new(ArenaConfig {
            seed: Some(3),
            ..ArenaConfig::default()
        });
        let (session, mut peer) = NetworkSession::loopback(SessionTimings::default());
        ctx.start_with_session("me", session);
        peer.open();
        ctx.pump_network();
        assert_eq!(ctx.phase(), Phase::Playing);
        peer.sent();

        let mut held = InputFrame::default();
        held.state.keys = MoveKeys::RIGHT;
        let mut lp = GameLoop::new(ctx.config().tick_duration());
        let due = lp.frame(&mut ctx, Duration::from_millis(200), &mut Hold(held), &mut NullRenderer);
        assert!(due >= 11, "due = {due}");

        let updates = peer
            .sent_messages()
            .into_iter()
            .filter(|m| matches!(m, NetMsg::PlayerUpdate(_)))
            .count();
        assert_eq!(updates, 1);

        lp.frame(&mut ctx, Duration::from_millis(50), &mut Hold(held), &mut NullRenderer);
        let updates = peer
            .sent_messages()
            .into_iter()
            .filter(|m| matches!(m, NetMsg::PlayerUpdate(_)))
            .count();
        assert_eq!(updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let mut ctx = GameContext::new(ArenaConfig {
            offline: true,
            seed: Some(2),
            ..ArenaConfig::default()
        });
        ctx.start("me");
        let (tx, rx) = watch::channel(false);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(true);
        });

        let lp = GameLoop::new(ctx.config().tick_duration());
        let stats = lp
            .run(&mut ctx, &mut IdleInput, &mut NullRenderer, Duration::from_millis(16), rx)
            .await;
        stopper.await.unwrap();

        assert!(stats.frames >= 50, "{stats:?}");
        assert!((55..=62).contains(&ctx.ticks()), "ticks = {}", ctx.ticks());
    }
}

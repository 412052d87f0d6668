//! Socket-level tests: arena client against the mock authority.

use std::time::Duration;

use arena_client::{
    game::{Mode, Phase},
    input::{IdleInput, InputFrame, InputSource, MoveKeys},
    GameContext, GameLoop,
};
use arena_shared::{
    config::ArenaConfig,
    math::Vec2,
    net::{NetMsg, PlayerHit, PlayerId, PlayerState, WorldState},
    render::{FrameView, NullRenderer},
};
use arena_tests::{drive_until, init_tracing, MockAuthority};

fn client_for(authority: &MockAuthority) -> GameContext {
    GameContext::new(ArenaConfig {
        endpoint: authority.endpoint(),
        player_name: "Tester".into(),
        seed: Some(99),
        ..ArenaConfig::default()
    })
}

fn remote(id: i32, x: f32, y: f32) -> PlayerState {
    PlayerState {
        id: PlayerId(id),
        name: format!("remote{id}"),
        x,
        y,
        vx: None,
        vy: None,
        rotation: None,
        health: None,
        score: None,
        is_dead: None,
        is_bot: None,
    }
}

struct HoldRight;

impl InputSource for HoldRight {
    fn sample(&mut self, _frame: &FrameView<'_>) -> InputFrame {
        let mut input = InputFrame::default();
        input.state.keys = MoveKeys::RIGHT;
        input
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connect_publishes_join() -> anyhow::Result<()> {
    init_tracing();
    let authority = MockAuthority::bind_ephemeral().await?;
    let mut ctx = client_for(&authority);

    let server = tokio::spawn(async move {
        let mut conn = authority.accept().await?;
        let first = conn.recv_timeout(Duration::from_secs(2)).await?;
        Ok::<_, anyhow::Error>(first)
    });

    ctx.start("Tester");
    let mut lp = GameLoop::new(ctx.config().tick_duration());
    let playing = drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_secs(2), |c| {
        c.phase() == Phase::Playing
    })
    .await;
    assert!(playing, "client never reached Playing");
    assert_eq!(ctx.mode(), Mode::Online);

    let first = server.await??;
    match first {
        Some(NetMsg::PlayerJoin(join)) => {
            assert_eq!(Some(join.player_id), ctx.local_id());
            assert_eq!(join.name, "Tester");
        }
        other => panic!("expected PLAYER_JOIN, got {other:?}"),
    }
    ctx.shutdown();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn world_state_snaps_new_players() -> anyhow::Result<()> {
    init_tracing();
    let authority = MockAuthority::bind_ephemeral().await?;
    let mut ctx = client_for(&authority);

    let server = tokio::spawn(async move {
        let mut conn = authority.accept().await?;
        conn.recv_timeout(Duration::from_secs(2)).await?;
        conn.send_raw("{not json").await?;
        conn.send(&NetMsg::WorldState(WorldState {
            players: vec![remote(7, 500.0, 500.0)],
            ..WorldState::default()
        }))
        .await?;
        conn.send(&NetMsg::PlayerHit(PlayerHit {
            shooter_id: None,
            victim_id: PlayerId(7),
            damage: 20,
            health: Some(60.0),
        }))
        .await?;
        // Keep the connection up while the client applies the messages.
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, anyhow::Error>(())
    });

    ctx.start("Tester");
    let mut lp = GameLoop::new(ctx.config().tick_duration());
    let seen = drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_secs(2), |c| {
        c.store()
            .player(PlayerId(7))
            .is_some_and(|p| p.health() == 60.0)
    })
    .await;
    assert!(seen, "remote player never arrived");

    let p = ctx.store().player(PlayerId(7)).expect("player 7");
    assert_eq!(p.position, Vec2::new(500.0, 500.0));
    assert_eq!(ctx.mode(), Mode::Online);

    server.await??;
    ctx.shutdown();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn authority_close_falls_back_to_offline() -> anyhow::Result<()> {
    init_tracing();
    let authority = MockAuthority::bind_ephemeral().await?;
    let mut ctx = client_for(&authority);

    let server = tokio::spawn(async move {
        let mut conn = authority.accept().await?;
        conn.recv_timeout(Duration::from_secs(2)).await?;
        conn.close().await?;
        Ok::<_, anyhow::Error>(())
    });

    ctx.start("Tester");
    let mut lp = GameLoop::new(ctx.config().tick_duration());
    assert!(
        drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_secs(2), |c| {
            c.phase() == Phase::Playing
        })
        .await
    );
    server.await??;

    let fell_back = drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_millis(1_500), |c| {
        c.mode() == Mode::Offline
    })
    .await;
    assert!(fell_back, "no offline fallback within 1.5 s");

    let store = ctx.store();
    assert_eq!(store.player_count(), 4);
    assert_eq!(store.players().filter(|p| p.is_bot).count(), 3);
    assert!(ctx.local_id().is_some_and(|id| id.0 > 0));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_authority_falls_back_to_offline() -> anyhow::Result<()> {
    init_tracing();
    let endpoint = {
        let authority = MockAuthority::bind_ephemeral().await?;
        authority.endpoint()
    };
    let mut ctx = GameContext::new(ArenaConfig {
        endpoint,
        seed: Some(3),
        ..ArenaConfig::default()
    });

    ctx.start("Tester");
    assert_eq!(ctx.phase(), Phase::Connecting);
    let mut lp = GameLoop::new(ctx.config().tick_duration());
    let fell_back = drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_secs(3), |c| {
        c.mode() == Mode::Offline
    })
    .await;
    assert!(fell_back, "no offline fallback for an unreachable authority");
    assert_eq!(ctx.phase(), Phase::Playing);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn position_updates_are_rate_limited() -> anyhow::Result<()> {
    init_tracing();
    let authority = MockAuthority::bind_ephemeral().await?;
    let mut ctx = client_for(&authority);

    let server = tokio::spawn(async move {
        let mut conn = authority.accept().await?;
        let received = conn.collect_for(Duration::from_secs(2)).await?;
        Ok::<_, anyhow::Error>(received)
    });

    ctx.start("Tester");
    let mut lp = GameLoop::new(ctx.config().tick_duration());
    assert!(
        drive_until(&mut ctx, &mut lp, &mut IdleInput, &mut NullRenderer, Duration::from_secs(2), |c| {
            c.phase() == Phase::Playing
        })
        .await
    );

    // One simulated second at 240 frames/s: four frames per tick.
    let before = ctx.ticks();
    let frame = Duration::from_secs(1) / 240;
    for _ in 0..240 {
        lp.frame(&mut ctx, frame, &mut HoldRight, &mut NullRenderer);
    }
    let ticks = ctx.ticks() - before;
    assert!((59..=60).contains(&ticks), "ticks = {ticks}");

    let received = server.await??;
    let updates = received
        .iter()
        .filter(|m| matches!(m, NetMsg::PlayerUpdate(u) if u.vx.is_some_and(|vx| vx > 0.0)))
        .count();
    assert!(updates > 0, "no position updates sent");
    assert!(updates <= 20, "{updates} updates in one simulated second");
    Ok(())
}

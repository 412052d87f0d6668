//! In-process mock authority for socket-level tests.
//!
//! The mock speaks the same WebSocket/JSON protocol as the real authority but
//! has no game logic: each test scripts what it sends and inspects what the
//! client published.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::Context;
use arena_client::{input::InputSource, GameContext, GameLoop};
use arena_shared::{
    net::{self, Endpoint, NetMsg},
    render::FrameSink,
};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    time::Instant,
};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::debug;

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Listening socket standing in for the authority.
pub struct MockAuthority {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockAuthority {
    /// Binds to an ephemeral loopback port.
    pub async fn bind_ephemeral() -> anyhow::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .context("bind mock authority")?;
        let addr = listener.local_addr().context("mock authority local_addr")?;
        Ok(Self { listener, addr })
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.addr.to_string(), false)
    }

    /// Accepts one client and completes the WebSocket handshake.
    pub async fn accept(&self) -> anyhow::Result<AuthorityConn> {
        let (stream, peer) = self.listener.accept().await.context("accept")?;
        let ws = accept_async(stream).await.context("websocket handshake")?;
        debug!(peer = %peer, "Mock authority accepted client");
        Ok(AuthorityConn { ws })
    }
}

/// Authority side of one client connection.
pub struct AuthorityConn {
    ws: WebSocketStream<TcpStream>,
}

impl AuthorityConn {
    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let text = net::encode(msg).context("encode")?;
        self.ws.send(Message::text(text)).await.context("send")?;
        Ok(())
    }

    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws
            .send(Message::text(text.to_owned()))
            .await
            .context("send raw")?;
        Ok(())
    }

    /// Next decodable message, or `None` on timeout or close.
    pub async fn recv_timeout(&mut self, wait: Duration) -> anyhow::Result<Option<NetMsg>> {
        let deadline = Instant::now() + wait;
        loop {
            let next = match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => return Ok(None),
                Ok(Some(frame)) => frame.context("read")?,
            };
            match next {
                Message::Text(text) => {
                    if let Some(msg) = net::decode(text.as_str()).context("decode")? {
                        return Ok(Some(msg));
                    }
                }
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
    }

    /// Everything received within `wait`.
    pub async fn collect_for(&mut self, wait: Duration) -> anyhow::Result<Vec<NetMsg>> {
        let deadline = Instant::now() + wait;
        let mut out = Vec::new();
        while let Some(msg) = self.recv_timeout(deadline.saturating_duration_since(Instant::now())).await? {
            out.push(msg);
        }
        Ok(out)
    }

    /// Sends a close frame and drops the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await.context("close")?;
        Ok(())
    }
}

/// Runs real-time frames until `done` holds or `timeout` passes.
///
/// Returns whether `done` was reached.
pub async fn drive_until<I, S>(
    ctx: &mut GameContext,
    lp: &mut GameLoop,
    input: &mut I,
    sink: &mut S,
    timeout: Duration,
    mut done: impl FnMut(&GameContext) -> bool,
) -> bool
where
    I: InputSource + ?Sized,
    S: FrameSink + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut last = Instant::now();
    while Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let now = Instant::now();
        lp.frame(ctx, now - last, input, sink);
        last = now;
        if done(&*ctx) {
            return true;
        }
    }
    false
}

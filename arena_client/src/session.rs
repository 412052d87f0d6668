//! Network session.
//!
//! The session owns one logical connection to the authority:
//! - A WebSocket driver task (or an in-memory loopback) feeding a single FIFO
//!   channel of transport events
//! - An outbound channel for best-effort, fire-and-forget intents
//! - A heartbeat timer while the connection is open
//! - A one-way fallback timer armed when the transport fails
//!
//! Nothing here touches the entity store. [`NetworkSession::poll`] turns
//! queued transport events into typed [`SessionEvent`]s which the game
//! context applies synchronously, in arrival order.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use arena_shared::{
    config::ArenaConfig,
    net::{self, Endpoint, Heartbeat, NetMsg, PlayerId},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::timer::ScheduledTask;

/// Upper bound for the displayed latency estimate.
pub const MAX_DISPLAY_LATENCY_MS: u32 = 999;

/// What the transport reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// Classified output of [`NetworkSession::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Message(NetMsg),
    Disconnected { reason: String },
    /// The fallback delay elapsed; the caller should switch to offline play.
    FallbackToOffline,
}

/// Session lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport yet.
    Idle,
    /// Transport is being opened.
    Connecting,
    Open,
    /// Transport failed; fallback pending.
    Closed,
    /// Fallen back to local simulation; inbound traffic is discarded.
    Offline,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub fallback_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            fallback_delay: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(5),
        }
    }
}

impl From<&ArenaConfig> for SessionTimings {
    fn from(cfg: &ArenaConfig) -> Self {
        Self {
            fallback_delay: cfg.fallback_delay(),
            heartbeat_interval: cfg.heartbeat_interval(),
        }
    }
}

/// Traffic counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_in: u64,
    pub frames_dropped: u64,
    pub frames_out: u64,
}

#[derive(Debug)]
enum Inbound {
    Transport(TransportEvent),
    FallbackDue,
}

pub struct NetworkSession {
    state: SessionState,
    timings: SessionTimings,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    open: Arc<AtomicBool>,
    driver: Option<ScheduledTask>,
    heartbeat: Option<ScheduledTask>,
    fallback: Option<ScheduledTask>,
    stats: SessionStats,
}

impl NetworkSession {
    fn with_timings(timings: SessionTimings) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            state: SessionState::Idle,
            timings,
            inbound_tx,
            inbound_rx,
            outbound: None,
            open: Arc::new(AtomicBool::new(false)),
            driver: None,
            heartbeat: None,
            fallback: None,
            stats: SessionStats::default(),
        }
    }

    /// A session with no transport. `send` is a no-op and `poll` yields nothing.
    pub fn detached() -> Self {
        Self::with_timings(SessionTimings::default())
    }

    /// Opens a WebSocket to `endpoint` on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(endpoint: &Endpoint, timings: SessionTimings) -> Self {
        let mut session = Self::with_timings(timings);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let url = endpoint.url();

        info!(url = %url, "Connecting to authority");

        session.outbound = Some(out_tx);
        session.state = SessionState::Connecting;
        session.driver = Some(ScheduledTask::spawn(drive_websocket(
            url,
            session.inbound_tx.clone(),
            out_rx,
            session.open.clone(),
        )));
        session
    }

    /// A session wired to an in-memory peer instead of a socket.
    pub fn loopback(timings: SessionTimings) -> (Self, LoopbackPeer) {
        let mut session = Self::with_timings(timings);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        session.outbound = Some(out_tx);
        session.state = SessionState::Connecting;
        let peer = LoopbackPeer {
            inbound: session.inbound_tx.clone(),
            outbound: out_rx,
            open: session.open.clone(),
        };
        (session, peer)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open && self.open.load(Ordering::Acquire)
    }

    /// Serializes and transmits `msg` if the transport is open.
    ///
    /// Best-effort: never queues for later, never reports failure.
    pub fn send(&mut self, msg: &NetMsg) {
        if !self.is_open() {
            return;
        }
        let Some(tx) = &self.outbound else {
            return;
        };
        match net::encode(msg) {
            Ok(text) => {
                if tx.send(text).is_ok() {
                    self.stats.frames_out += 1;
                }
            }
            Err(e) => warn!(error = %e, kind = msg.kind(), "Failed to encode intent"),
        }
    }

    /// Starts the keepalive for `player_id`. Replaces any running heartbeat.
    pub fn start_heartbeat(&mut self, player_id: PlayerId) {
        let Some(tx) = self.outbound.clone() else {
            return;
        };
        let frame = match net::encode(&NetMsg::Heartbeat(Heartbeat { player_id })) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to encode heartbeat");
                return;
            }
        };
        let open = self.open.clone();
        self.heartbeat = Some(ScheduledTask::every(
            self.timings.heartbeat_interval,
            move || {
                if open.load(Ordering::Acquire) {
                    let _ = tx.send(frame.clone());
                }
            },
        ));
        debug!(player_id = %player_id, "Heartbeat started");
    }

    /// Drains queued transport events into classified session events.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(item) = self.inbound_rx.try_recv() {
            match item {
                Inbound::Transport(ev) => self.on_transport(ev, &mut out),
                Inbound::FallbackDue => {
                    if self.state != SessionState::Offline {
                        info!("Falling back to offline simulation");
                        self.go_offline();
                        out.push(SessionEvent::FallbackToOffline);
                    }
                }
            }
        }
        out
    }

    fn on_transport(&mut self, ev: TransportEvent, out: &mut Vec<SessionEvent>) {
        if self.state == SessionState::Offline {
            debug!(?ev, "Discarding transport event after fallback");
            return;
        }

        match ev {
            TransportEvent::Opened => {
                info!("Connected to authority");
                self.state = SessionState::Open;
                out.push(SessionEvent::Connected);
            }
            TransportEvent::Frame(text) => {
                self.stats.frames_in += 1;
                if self.state != SessionState::Open {
                    self.stats.frames_dropped += 1;
                    debug!(state = ?self.state, "Dropping frame outside open state");
                    return;
                }
                match net::decode(&text) {
                    Ok(Some(msg)) => out.push(SessionEvent::Message(msg)),
                    Ok(None) => {
                        debug!(frame = %text, "Ignoring unknown message type");
                    }
                    Err(e) => {
                        self.stats.frames_dropped += 1;
                        warn!(error = %e, "Dropping malformed frame");
                    }
                }
            }
            TransportEvent::Error(reason) => {
                warn!(error = %reason, "Transport error");
                self.on_failure(reason, out);
            }
            TransportEvent::Closed { code, reason } => {
                info!(?code, reason = %reason, "Transport closed");
                self.on_failure(reason, out);
            }
        }
    }

    fn on_failure(&mut self, reason: String, out: &mut Vec<SessionEvent>) {
        self.open.store(false, Ordering::Release);
        self.heartbeat = None;
        if self.state == SessionState::Closed {
            // Error followed by close for the same connection.
            return;
        }
        self.state = SessionState::Closed;
        out.push(SessionEvent::Disconnected { reason });

        let tx = self.inbound_tx.clone();
        self.fallback = Some(ScheduledTask::after(self.timings.fallback_delay, move || {
            let _ = tx.send(Inbound::FallbackDue);
        }));
    }

    /// Switches to offline immediately and releases the transport.
    pub fn go_offline(&mut self) {
        self.teardown();
        self.state = SessionState::Offline;
    }

    /// Cancels timers and lets the transport close.
    pub fn shutdown(&mut self) {
        self.teardown();
        if self.state != SessionState::Offline {
            self.state = SessionState::Closed;
        }
    }

    fn teardown(&mut self) {
        self.open.store(false, Ordering::Release);
        self.heartbeat = None;
        self.fallback = None;
        // Dropping the sender makes the driver send a close frame and exit.
        self.outbound = None;
        if let Some(driver) = self.driver.take() {
            driver.detach();
        }
    }
}

/// In-memory stand-in for the authority end of a transport.
pub struct LoopbackPeer {
    inbound: mpsc::UnboundedSender<Inbound>,
    outbound: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
}

impl LoopbackPeer {
    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
        self.emit(TransportEvent::Opened);
    }

    pub fn frame(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Frame(text.into()));
    }

    /// Encodes and delivers `msg` as one frame.
    pub fn deliver(&self, msg: &NetMsg) {
        if let Ok(text) = net::encode(msg) {
            self.frame(text);
        }
    }

    pub fn error(&self, reason: impl Into<String>) {
        self.open.store(false, Ordering::Release);
        self.emit(TransportEvent::Error(reason.into()));
    }

    pub fn close(&self, reason: impl Into<String>) {
        self.open.store(false, Ordering::Release);
        self.emit(TransportEvent::Closed {
            code: Some(1000),
            reason: reason.into(),
        });
    }

    /// Frames the session has sent so far.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(f) = self.outbound.try_recv() {
            frames.push(f);
        }
        frames
    }

    /// Sent frames decoded back into messages.
    pub fn sent_messages(&mut self) -> Vec<NetMsg> {
        self.sent()
            .iter()
            .filter_map(|f| net::decode(f).ok().flatten())
            .collect()
    }

    fn emit(&self, ev: TransportEvent) {
        let _ = self.inbound.send(Inbound::Transport(ev));
    }
}

/// One-way latency estimate from an authority timestamp in seconds.
///
/// Advisory only: clamped to `[0, MAX_DISPLAY_LATENCY_MS]`.
pub fn estimate_latency_ms(server_time_secs: f64, now_ms: i64) -> u32 {
    let server_ms = server_time_secs * 1000.0;
    let delta = (now_ms as f64 - server_ms).round().max(0.0);
    delta.min(f64::from(MAX_DISPLAY_LATENCY_MS)) as u32
}

/// Wall clock in milliseconds since the Unix epoch.
pub fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn drive_websocket(
    url: String,
    events: mpsc::UnboundedSender<Inbound>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
) {
    let emit = |ev: TransportEvent| {
        let _ = events.send(Inbound::Transport(ev));
    };

    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            emit(TransportEvent::Error(e.to_string()));
            emit(TransportEvent::Closed {
                code: None,
                reason: "connect failed".to_string(),
            });
            return;
        }
    };

    open.store(true, Ordering::Release);
    emit(TransportEvent::Opened);

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Frame(text.as_str().to_owned())),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => emit(TransportEvent::Frame(text)),
                    Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    open.store(false, Ordering::Release);
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                    emit(TransportEvent::Closed { code, reason });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    open.store(false, Ordering::Release);
                    emit(TransportEvent::Error(e.to_string()));
                    emit(TransportEvent::Closed { code: None, reason: "read failed".to_string() });
                    break;
                }
                None => {
                    open.store(false, Ordering::Release);
                    emit(TransportEvent::Closed { code: None, reason: "stream ended".to_string() });
                    break;
                }
            },
            out = outbound.recv() => match out {
                Some(text) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        open.store(false, Ordering::Release);
                        emit(TransportEvent::Error(e.to_string()));
                        emit(TransportEvent::Closed { code: None, reason: "write failed".to_string() });
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
    open.store(false, Ordering::Release);
    debug!(url = %url, "WebSocket driver exiting");
}

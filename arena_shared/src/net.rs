//! Wire protocol.
//!
//! Every frame on the WebSocket is one JSON object discriminated by a `type`
//! string. Field names are camelCase on the wire.
//!
//! Decoding fails closed: a frame either parses into a complete [`NetMsg`] or
//! is rejected with a [`DecodeError`]. Frames whose `type` is not known to
//! this client decode to `Ok(None)` so newer authorities can add messages
//! without breaking older clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request path of the authority's WebSocket endpoint.
pub const WS_PATH: &str = "/ws";

/// Discriminators this client understands.
pub const KNOWN_TYPES: &[&str] = &[
    "WORLD_STATE",
    "PLAYER_JOIN",
    "PLAYER_LEAVE",
    "PLAYER_UPDATE",
    "PLAYER_SHOOT",
    "PLAYER_HIT",
    "PLAYER_DEATH",
    "PLAYER_RESPAWN",
    "SYNC",
    "HEARTBEAT",
    "CHAT_MESSAGE",
];

/// Identifies a player or bot.
///
/// Positive values are network-joined players, negative values are bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i32);

impl PlayerId {
    pub fn is_bot_range(self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the authority lives.
///
/// Whether to use the secure transport is decided by the embedding
/// environment (for a browser build: the page's own scheme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// `host[:port]` of the serving host.
    pub host: String,
    #[serde(default)]
    pub secure: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Full WebSocket URL, e.g. `wss://arena.example/ws`.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}{WS_PATH}", self.host)
    }
}

/// High-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetMsg {
    // ─── Snapshots ───
    /// Authority -> client: partial state of every player.
    WorldState(WorldState),

    // ─── Membership ───
    PlayerJoin(PlayerJoin),
    PlayerLeave(PlayerLeave),

    // ─── Gameplay ───
    PlayerUpdate(PlayerUpdate),
    PlayerShoot(PlayerShoot),
    PlayerHit(PlayerHit),
    PlayerDeath(PlayerDeath),
    PlayerRespawn(PlayerRespawn),

    // ─── Housekeeping ───
    /// Authority clock, seconds.
    Sync(TimeSync),
    Heartbeat(Heartbeat),
    /// UI-only; carried through untouched.
    ChatMessage(ChatMessage),
}

impl NetMsg {
    /// Wire discriminator of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            NetMsg::WorldState(_) => "WORLD_STATE",
            NetMsg::PlayerJoin(_) => "PLAYER_JOIN",
            NetMsg::PlayerLeave(_) => "PLAYER_LEAVE",
            NetMsg::PlayerUpdate(_) => "PLAYER_UPDATE",
            NetMsg::PlayerShoot(_) => "PLAYER_SHOOT",
            NetMsg::PlayerHit(_) => "PLAYER_HIT",
            NetMsg::PlayerDeath(_) => "PLAYER_DEATH",
            NetMsg::PlayerRespawn(_) => "PLAYER_RESPAWN",
            NetMsg::Sync(_) => "SYNC",
            NetMsg::Heartbeat(_) => "HEARTBEAT",
            NetMsg::ChatMessage(_) => "CHAT_MESSAGE",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default)]
    pub players: Vec<PlayerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<f64>,
}

/// One player's entry in a `WORLD_STATE`. Absent fields keep local values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dead: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoin {
    pub player_id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeave {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
}

/// Shot announcement.
///
/// Clients send `playerId`; the authority rebroadcasts it as `shooterId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerShoot {
    #[serde(rename = "playerId", alias = "shooterId")]
    pub shooter_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    /// Seconds on the sender's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shooter_id: Option<PlayerId>,
    pub victim_id: PlayerId,
    #[serde(default = "default_damage")]
    pub damage: u32,
    /// Victim health after the hit, as ruled by the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

fn default_damage() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDeath {
    pub shooter_id: PlayerId,
    pub victim_id: PlayerId,
    #[serde(default)]
    pub killer_name: String,
    #[serde(default)]
    pub victim_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRespawn {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_health")]
    pub health: f32,
}

fn default_health() -> f32 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSync {
    pub server_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub player_id: PlayerId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Why an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("malformed {kind} frame: {source}")]
    Schema {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serializes a message into one text frame.
pub fn encode(msg: &NetMsg) -> serde_json::Result<String> {
    serde_json::to_string(msg)
}

/// Parses one text frame.
///
/// Returns `Ok(None)` for well-formed frames with an unknown discriminator.
pub fn decode(frame: &str) -> Result<Option<NetMsg>, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(frame)?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or(DecodeError::MissingType)?;

    if !KNOWN_TYPES.contains(&kind) {
        return Ok(None);
    }

    let kind = kind.to_string();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| DecodeError::Schema { kind, source })
}

//! Configuration system.
//!
//! Loads client configuration from JSON strings (file IO left to app).
//! Every field has a default so partial files are valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{net::Endpoint, physics::WorldBounds};

/// Root configuration for the arena client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Authority location.
    #[serde(default = "default_endpoint")]
    pub endpoint: Endpoint,
    /// Skip the authority and start in offline mode.
    #[serde(default)]
    pub offline: bool,
    #[serde(default = "default_player_name")]
    pub player_name: String,
    /// Fixed simulation tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Display refresh rate the headless driver emulates.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    #[serde(default)]
    pub world: WorldBounds,
    /// Bots spawned by the offline fallback.
    #[serde(default = "default_bot_count")]
    pub bot_count: usize,
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    /// Seed for spawn positions, colors and offline ids. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_endpoint() -> Endpoint {
    Endpoint::new("localhost:8080", false)
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_tick_hz() -> u32 {
    60
}

fn default_frame_hz() -> u32 {
    60
}

fn default_bot_count() -> usize {
    3
}

fn default_fallback_delay_ms() -> u64 {
    1000
}

fn default_heartbeat_ms() -> u64 {
    5000
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            offline: false,
            player_name: default_player_name(),
            tick_hz: default_tick_hz(),
            frame_hz: default_frame_hz(),
            world: WorldBounds::default(),
            bot_count: default_bot_count(),
            fallback_delay_ms: default_fallback_delay_ms(),
            heartbeat_ms: default_heartbeat_ms(),
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_hz.max(1)))
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = ArenaConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.tick_hz, 60);
        assert_eq!(cfg.bot_count, 3);
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(cfg.endpoint.url(), "ws://localhost:8080/ws");
    }

    #[test]
    fn partial_override() {
        let cfg = ArenaConfig::from_json_str(
            r#"{"endpoint":{"host":"arena.example","secure":true},"player_name":"ace","world":{"width":800,"height":600}}"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint.url(), "wss://arena.example/ws");
        assert_eq!(cfg.player_name, "ace");
        assert_eq!(cfg.world.width, 800.0);
        assert_eq!(cfg.world.edge_margin, 0.0);
    }
}

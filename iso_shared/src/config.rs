//! Configuration system.
//!
//! Loads client configuration from JSON strings/files. Every field has a
//! default so partial files work.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::iso::{IsoProjection, TILE_H, TILE_W};

/// Root client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Room server address, e.g. `127.0.0.1:5001`.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Display name sent on join.
    #[serde(default = "default_player_name")]
    pub player_name: String,
    /// Requested monster type key.
    #[serde(default = "default_monster")]
    pub monster: String,
    /// Visual movement speed in grid cells per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_tile_w")]
    pub tile_w: f32,
    #[serde(default = "default_tile_h")]
    pub tile_h: f32,
    /// Vertical screen position of grid cell (0, 0).
    #[serde(default = "default_origin_y")]
    pub origin_y: f32,
    /// Pixels added to an entity's screen y so its feet sit inside the tile.
    #[serde(default = "default_sprite_offset_y")]
    pub sprite_offset_y: f32,
    #[serde(default = "default_viewport_w")]
    pub viewport_w: u32,
    #[serde(default = "default_viewport_h")]
    pub viewport_h: u32,
    /// Render/update rate of the headless loop.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnection policy. Attempts are unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
    /// Relative jitter applied to each delay, in `[0, 1]`.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_server_addr() -> String {
    "127.0.0.1:5001".to_string()
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_monster() -> String {
    "wolf".to_string()
}

fn default_move_speed() -> f32 {
    6.0
}

fn default_tile_w() -> f32 {
    TILE_W
}

fn default_tile_h() -> f32 {
    TILE_H
}

fn default_origin_y() -> f32 {
    120.0
}

fn default_sprite_offset_y() -> f32 {
    6.0
}

fn default_viewport_w() -> u32 {
    1280
}

fn default_viewport_h() -> u32 {
    720
}

fn default_frame_hz() -> u32 {
    60
}

fn default_delay_ms() -> u64 {
    500
}

fn default_delay_max_ms() -> u64 {
    2500
}

fn default_jitter() -> f64 {
    0.5
}

fn default_connect_timeout_ms() -> u64 {
    8000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            delay_max_ms: default_delay_max_ms(),
            jitter: default_jitter(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            player_name: default_player_name(),
            monster: default_monster(),
            move_speed: default_move_speed(),
            tile_w: default_tile_w(),
            tile_h: default_tile_h(),
            origin_y: default_origin_y(),
            sprite_offset_y: default_sprite_offset_y(),
            viewport_w: default_viewport_w(),
            viewport_h: default_viewport_h(),
            frame_hz: default_frame_hz(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Rejects values the projection and interpolation cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("move_speed", self.move_speed),
            ("tile_w", self.tile_w),
            ("tile_h", self.tile_h),
        ] {
            anyhow::ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be a positive number, got {value}"
            );
        }
        Ok(())
    }

    pub fn projection(&self) -> IsoProjection {
        IsoProjection::new(self.tile_w, self.tile_h)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_hz.max(1) as f32)
    }
}

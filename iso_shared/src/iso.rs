//! Isometric projection.
//!
//! Maps between grid and screen space with a 2:1 diamond tile and computes
//! the draw-order key. Everything here is pure and total.

use serde::{Deserialize, Serialize};

use crate::math::{GridPos, ScreenPos};

pub const TILE_W: f32 = 64.0;
pub const TILE_H: f32 = 32.0;

/// Diamond tile projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoProjection {
    pub tile_w: f32,
    pub tile_h: f32,
}

impl Default for IsoProjection {
    fn default() -> Self {
        Self {
            tile_w: TILE_W,
            tile_h: TILE_H,
        }
    }
}

impl IsoProjection {
    pub const fn new(tile_w: f32, tile_h: f32) -> Self {
        Self { tile_w, tile_h }
    }

    pub fn grid_to_screen(&self, p: GridPos, origin: ScreenPos) -> ScreenPos {
        ScreenPos::new(
            (p.x - p.y) * (self.tile_w / 2.0) + origin.x,
            (p.x + p.y) * (self.tile_h / 2.0) + origin.y,
        )
    }

    /// Inverse of [`grid_to_screen`](Self::grid_to_screen), rounded half-up
    /// to the nearest cell on each axis.
    ///
    /// The result is still a `GridPos` so that non-finite input stays
    /// observable to the caller instead of being squashed by an int cast.
    pub fn screen_to_grid(&self, s: ScreenPos, origin: ScreenPos) -> GridPos {
        let dx = s.x - origin.x;
        let dy = s.y - origin.y;

        let gx = (dy / (self.tile_h / 2.0) + dx / (self.tile_w / 2.0)) / 2.0;
        let gy = (dy / (self.tile_h / 2.0) - dx / (self.tile_w / 2.0)) / 2.0;

        GridPos::new((gx + 0.5).floor(), (gy + 0.5).floor())
    }
}

/// Draw-order key: larger draws later (nearer the viewer).
pub fn depth_key(x: f32, y: f32) -> f32 {
    x + y
}

/// Offset bands that keep layers apart regardless of position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthBand {
    Tile,
    Decoration,
    Entity,
}

impl DepthBand {
    pub const fn offset(self) -> f32 {
        match self {
            DepthBand::Tile => 0.0,
            DepthBand::Decoration => 900.0,
            DepthBand::Entity => 1000.0,
        }
    }

    pub fn depth(self, p: GridPos) -> f32 {
        depth_key(p.x, p.y) + self.offset()
    }
}

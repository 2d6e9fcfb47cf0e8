//! Map model.
//!
//! The server ships a whole map on connect and on every room snapshot. The
//! client never patches it: a new [`MapData`] always becomes a brand new
//! [`MapModel`], normalized so the tile grid matches the declared size.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    iso::{DepthBand, IsoProjection},
    math::{GridCell, GridPos, ScreenPos},
    net::{lenient_coord, nan},
};

/// Size used before the server has sent anything, and for zero sizes.
pub const DEFAULT_MAP_SIZE: u32 = 12;

/// Largest accepted width or height. Larger sizes are clamped.
pub const MAX_MAP_SIZE: u32 = 256;

/// Tile type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "u8", into = "u8")]
pub enum TileKind {
    /// Code 0.
    #[default]
    Bare,
    /// Code 1.
    Covered,
    /// Any other code, kept so newer maps still load.
    Other(u8),
}

impl From<u8> for TileKind {
    fn from(code: u8) -> Self {
        match code {
            0 => TileKind::Bare,
            1 => TileKind::Covered,
            other => TileKind::Other(other),
        }
    }
}

impl From<TileKind> for u8 {
    fn from(kind: TileKind) -> Self {
        match kind {
            TileKind::Bare => 0,
            TileKind::Covered => 1,
            TileKind::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    Tree,
    #[serde(other)]
    Unknown,
}

/// Static object placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    #[serde(rename = "type")]
    pub kind: DecorationKind,
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub x: f32,
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub y: f32,
}

/// Map as sent over the wire. Tiles and objects are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MapData {
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<Vec<TileKind>>>,
    #[serde(default)]
    pub objects: Vec<Decoration>,
}

/// Normalized map. `tiles.len() == height` and every row has `width` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct MapModel {
    width: u32,
    height: u32,
    tiles: Vec<Vec<TileKind>>,
    decorations: Vec<Decoration>,
}

impl Default for MapModel {
    fn default() -> Self {
        Self::bare(DEFAULT_MAP_SIZE, DEFAULT_MAP_SIZE)
    }
}

impl MapModel {
    /// Bare grid of the given size.
    pub fn bare(width: u32, height: u32) -> Self {
        let width = usable_size(width);
        let height = usable_size(height);
        Self {
            width,
            height,
            tiles: vec![vec![TileKind::Bare; width as usize]; height as usize],
            decorations: Vec::new(),
        }
    }

    /// Builds a model from wire data, synthesizing or repairing the tile grid.
    pub fn from_data(data: MapData) -> Self {
        let width = usable_size(data.w);
        let height = usable_size(data.h);

        let mut tiles = data.tiles.unwrap_or_default();
        tiles.resize_with(height as usize, Vec::new);
        for row in &mut tiles {
            row.resize(width as usize, TileKind::Bare);
        }

        Self {
            width,
            height,
            tiles,
            decorations: data.objects,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn bounds(&self) -> MapBounds {
        MapBounds {
            width: self.width,
            height: self.height,
        }
    }

    /// Tile at a cell; out of bounds reads as bare.
    pub fn tile_at(&self, cell: GridCell) -> TileKind {
        if cell.x < 0 || cell.y < 0 {
            return TileKind::Bare;
        }
        self.tiles
            .get(cell.y as usize)
            .and_then(|row| row.get(cell.x as usize))
            .copied()
            .unwrap_or_default()
    }

    /// Static draw list: every tile, then every tree, each with its depth.
    /// Trees without a usable position are left out.
    pub fn draw_list(&self, proj: &IsoProjection, origin: ScreenPos) -> Vec<StaticSprite> {
        let tiles = (self.width as usize).saturating_mul(self.height as usize);
        let mut out = Vec::with_capacity(tiles.saturating_add(self.decorations.len()));

        for (y, row) in self.tiles.iter().enumerate() {
            for (x, &tile) in row.iter().enumerate() {
                let p = GridPos::new(x as f32, y as f32);
                out.push(StaticSprite {
                    kind: StaticKind::Tile(tile),
                    cell: p,
                    screen: proj.grid_to_screen(p, origin),
                    depth: DepthBand::Tile.depth(p),
                });
            }
        }

        for deco in &self.decorations {
            if deco.kind != DecorationKind::Tree {
                continue;
            }
            let p = GridPos::new(deco.x, deco.y);
            if !p.is_finite() {
                continue;
            }
            // Trees are anchored at their bottom edge, one tile below the
            // diamond's top vertex.
            let screen = proj.grid_to_screen(p, origin).offset(0.0, proj.tile_h);
            out.push(StaticSprite {
                kind: StaticKind::Decoration(deco.kind),
                cell: p,
                screen,
                depth: DepthBand::Decoration.depth(p),
            });
        }

        out
    }
}

/// Map dimensions used to clamp pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapBounds {
    pub width: u32,
    pub height: u32,
}

impl MapBounds {
    /// Clamps a rounded grid position into the map, or `None` if it is not
    /// a finite position.
    pub fn clamp(&self, p: GridPos) -> Option<GridCell> {
        if !p.is_finite() {
            return None;
        }
        let max_x = self.width.saturating_sub(1) as f32;
        let max_y = self.height.saturating_sub(1) as f32;
        Some(GridCell::new(
            p.x.clamp(0.0, max_x) as i32,
            p.y.clamp(0.0, max_y) as i32,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Tile(TileKind),
    Decoration(DecorationKind),
}

/// One static image for the render engine's map layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticSprite {
    pub kind: StaticKind,
    pub cell: GridPos,
    pub screen: ScreenPos,
    pub depth: f32,
}

fn usable_size(n: u32) -> u32 {
    match n {
        0 => DEFAULT_MAP_SIZE,
        n if n > MAX_MAP_SIZE => {
            warn!(size = n, max = MAX_MAP_SIZE, "Map size too large, clamping");
            MAX_MAP_SIZE
        }
        n => n,
    }
}

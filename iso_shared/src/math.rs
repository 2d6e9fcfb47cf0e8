//! Math types.
//!
//! Two coordinate spaces are kept apart at the type level: the logical map
//! grid and screen pixels. Both stay `f32` and avoid SIMD/unsafe.

use serde::{Deserialize, Serialize};

/// Position on the logical map grid. Fractional while an entity is between
/// cells, integral when it comes straight from the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GridPos {
    pub x: f32,
    pub y: f32,
}

impl GridPos {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Whole grid cell, the unit the server accepts for moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel position in the rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_pos_finite_check() {
        assert!(GridPos::new(1.5, -2.0).is_finite());
        assert!(!GridPos::new(f32::NAN, 0.0).is_finite());
        assert!(!GridPos::new(0.0, f32::INFINITY).is_finite());
    }
}

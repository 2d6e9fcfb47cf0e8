//! Interpolation.
//!
//! The server reports whole cells, rarely. The client walks each entity's
//! drawn position toward its reported target at a fixed speed, per axis,
//! so motion looks continuous regardless of frame rate.
//!
//! Axes move independently: a diagonal move covers both axes at full
//! speed and is therefore faster than an axis-aligned one.

use iso_shared::math::GridPos;
use tracing::warn;

use crate::registry::SAFE_POS;

/// Distance (in cells, per axis) under which an entity counts as arrived.
pub const ARRIVE_EPSILON: f32 = 0.01;

/// Result of advancing one entity for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Moving,
    Stationary,
}

impl Motion {
    pub fn is_moving(self) -> bool {
        self == Motion::Moving
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    /// Grid cells per second.
    speed: f32,
}

impl Interpolator {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Largest per-axis move for a frame of `dt_sec` seconds.
    pub fn step(&self, dt_sec: f32) -> f32 {
        self.speed * dt_sec
    }

    /// Advances `current` toward `target` for one frame.
    ///
    /// Within [`ARRIVE_EPSILON`] on both axes the entity snaps exactly onto
    /// its target and is stationary. A non-finite position on either side
    /// resets both to [`SAFE_POS`].
    pub fn advance(&self, current: &mut GridPos, target: &mut GridPos, dt_sec: f32) -> Motion {
        if !current.is_finite() || !target.is_finite() {
            warn!(?current, ?target, "Non-finite entity position, resetting");
            *current = SAFE_POS;
            *target = SAFE_POS;
        }

        let delta = target.sub(*current);
        let moving = delta.x.abs() > ARRIVE_EPSILON || delta.y.abs() > ARRIVE_EPSILON;
        if !moving {
            *current = *target;
            return Motion::Stationary;
        }

        let step = self.step(dt_sec);
        current.x = approach(current.x, target.x, step);
        current.y = approach(current.y, target.y, step);
        Motion::Moving
    }
}

/// Moves `from` toward `to` by at most `step`, landing exactly on `to`
/// when it is within reach.
fn approach(from: f32, to: f32, step: f32) -> f32 {
    let d = to - from;
    if d.abs() <= step {
        to
    } else {
        from + d.signum() * step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_step_clamps_to_remaining_distance() {
        let interp = Interpolator::new(6.0);
        let mut cur = GridPos::new(0.0, 0.0);
        let mut tgt = GridPos::new(5.0, 0.0);
        assert_eq!(interp.advance(&mut cur, &mut tgt, 1.0), Motion::Moving);
        assert_eq!(cur, GridPos::new(5.0, 0.0));
        assert_eq!(interp.advance(&mut cur, &mut tgt, 1.0), Motion::Stationary);
    }

    #[test]
    fn converges_without_overshoot() {
        let interp = Interpolator::new(6.0);
        let dt = 1.0 / 60.0;
        for &(tx, ty) in &[(7.0f32, 0.0f32), (-3.0, 0.0), (0.0, 11.0), (4.0, -9.0)] {
            let mut cur = GridPos::new(0.0, 0.0);
            let mut tgt = GridPos::new(tx, ty);
            let bound = (tx.abs().max(ty.abs()) / interp.step(dt)).ceil() as usize + 1;
            let mut frames = 0;
            while interp.advance(&mut cur, &mut tgt, dt).is_moving() {
                assert!(cur.x.abs() <= tx.abs() && cur.y.abs() <= ty.abs());
                assert!(cur.x * tx >= 0.0 && cur.y * ty >= 0.0);
                frames += 1;
                assert!(frames <= bound, "did not converge toward ({tx},{ty})");
            }
            assert_eq!(cur, tgt);
        }
    }

    #[test]
    fn near_target_snaps_exactly() {
        let interp = Interpolator::new(6.0);
        let mut cur = GridPos::new(3.005, 4.0);
        let mut tgt = GridPos::new(3.0, 3.992);
        assert_eq!(interp.advance(&mut cur, &mut tgt, 0.016), Motion::Stationary);
        assert_eq!(cur, tgt);
    }

    #[test]
    fn diagonal_moves_both_axes_at_full_step() {
        let interp = Interpolator::new(2.0);
        let mut cur = GridPos::new(0.0, 0.0);
        let mut tgt = GridPos::new(4.0, 4.0);
        interp.advance(&mut cur, &mut tgt, 0.5);
        assert_eq!(cur, GridPos::new(1.0, 1.0));
    }

    #[test]
    fn non_finite_state_resets_to_safe_default() {
        let interp = Interpolator::new(6.0);
        let mut cur = GridPos::new(f32::NAN, 1.0);
        let mut tgt = GridPos::new(8.0, 8.0);
        assert_eq!(interp.advance(&mut cur, &mut tgt, 0.1), Motion::Stationary);
        assert_eq!(cur, SAFE_POS);
        assert_eq!(tgt, SAFE_POS);

        let mut cur = GridPos::new(1.0, 1.0);
        let mut tgt = GridPos::new(1.0, f32::NEG_INFINITY);
        interp.advance(&mut cur, &mut tgt, 0.1);
        assert_eq!((cur, tgt), (SAFE_POS, SAFE_POS));
    }
}

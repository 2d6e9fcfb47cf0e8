//! Facing and animation selection.
//!
//! Facing comes from the motion vector *on screen*, not on the grid: the
//! isometric axes are diagonal on screen, so the dominant screen axis is
//! what makes a sprite look like it walks the right way.

use iso_shared::{
    iso::IsoProjection,
    math::{GridPos, ScreenPos},
    monster::{AnimKey, Facing, MonsterKind},
    render::RenderBackend,
};

use crate::interp::Motion;

/// Playback rate of every walk cycle.
pub const WALK_FRAME_RATE: u32 = 10;

/// What the sprite should show this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    /// Loop the walk cycle (started only if not already playing).
    Walk(AnimKey),
    /// Stop and show a fixed frame.
    Idle { frame: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub facing: Facing,
    pub pose: Pose,
}

/// Facing for a screen-space motion vector. Equal magnitudes resolve to the
/// vertical facing.
pub fn facing_from_screen_delta(sdx: f32, sdy: f32) -> Facing {
    if sdx.abs() > sdy.abs() {
        if sdx > 0.0 {
            Facing::East
        } else {
            Facing::West
        }
    } else if sdy > 0.0 {
        Facing::South
    } else {
        Facing::North
    }
}

/// Picks facing and pose for one entity after it has been advanced.
///
/// `from` is where the entity stood before this tick's step. A stationary
/// entity keeps `last_facing`; a moving one faces along its screen-space
/// path from `from` to the target. A zero path also keeps `last_facing`.
pub fn resolve(
    proj: &IsoProjection,
    origin: ScreenPos,
    from: GridPos,
    target: GridPos,
    motion: Motion,
    last_facing: Facing,
    kind: MonsterKind,
) -> Resolved {
    let def = kind.def();

    let facing = match motion {
        Motion::Moving => {
            let start = proj.grid_to_screen(from, origin);
            let tgt = proj.grid_to_screen(target, origin);
            let (sdx, sdy) = (tgt.x - start.x, tgt.y - start.y);
            if sdx == 0.0 && sdy == 0.0 {
                last_facing
            } else {
                facing_from_screen_delta(sdx, sdy)
            }
        }
        Motion::Stationary => last_facing,
    };

    let pose = match motion {
        Motion::Moving => Pose::Walk(AnimKey::new(kind, facing)),
        Motion::Stationary => Pose::Idle {
            frame: def.idle_frame(facing),
        },
    };

    Resolved { facing, pose }
}

/// Registers every sheet and every (monster, facing) walk cycle with the
/// render engine.
pub fn register_monster_assets<R>(render: &mut R)
where
    R: RenderBackend + ?Sized,
{
    for kind in MonsterKind::ALL {
        let def = kind.def();
        render.register_sheet(def);
        for facing in Facing::ALL {
            render.register_animation(
                AnimKey::new(kind, facing),
                def.walk_frames(facing),
                WALK_FRAME_RATE,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_shared::render::RecordingRenderer;

    #[test]
    fn dominant_screen_axis_wins() {
        assert_eq!(facing_from_screen_delta(10.0, 3.0), Facing::East);
        assert_eq!(facing_from_screen_delta(-10.0, 3.0), Facing::West);
        assert_eq!(facing_from_screen_delta(1.0, 4.0), Facing::South);
        assert_eq!(facing_from_screen_delta(1.0, -4.0), Facing::North);
    }

    #[test]
    fn equal_magnitudes_resolve_vertically() {
        assert_eq!(facing_from_screen_delta(3.0, 3.0), Facing::South);
        assert_eq!(facing_from_screen_delta(-3.0, 3.0), Facing::South);
        assert_eq!(facing_from_screen_delta(3.0, -3.0), Facing::North);
    }

    #[test]
    fn grid_axes_map_to_screen_facings() {
        let proj = IsoProjection::default();
        let at = |target: GridPos| {
            resolve(
                &proj,
                ScreenPos::ZERO,
                GridPos::new(5.0, 5.0),
                target,
                Motion::Moving,
                Facing::South,
                MonsterKind::Wolf,
            )
            .facing
        };
        // +x on the grid is down-right on screen: sdx 32, sdy 16.
        assert_eq!(at(GridPos::new(6.0, 5.0)), Facing::East);
        // +y on the grid is down-left: sdx -32, sdy 16.
        assert_eq!(at(GridPos::new(5.0, 6.0)), Facing::West);
        // +x +y is straight down.
        assert_eq!(at(GridPos::new(6.0, 6.0)), Facing::South);
        assert_eq!(at(GridPos::new(4.0, 4.0)), Facing::North);
    }

    #[test]
    fn stationary_keeps_last_facing_and_idles_on_row_start() {
        let r = resolve(
            &IsoProjection::default(),
            ScreenPos::ZERO,
            GridPos::new(1.0, 1.0),
            GridPos::new(1.0, 1.0),
            Motion::Stationary,
            Facing::East,
            MonsterKind::Golem,
        );
        assert_eq!(r.facing, Facing::East);
        assert_eq!(r.pose, Pose::Idle { frame: 14 });
    }

    #[test]
    fn moving_selects_walk_cycle_key() {
        let r = resolve(
            &IsoProjection::default(),
            ScreenPos::ZERO,
            GridPos::new(1.0, 1.0),
            GridPos::new(1.0, 0.0),
            Motion::Moving,
            Facing::South,
            MonsterKind::Vampire,
        );
        assert_eq!(r.facing, Facing::East);
        assert_eq!(
            r.pose,
            Pose::Walk(AnimKey::new(MonsterKind::Vampire, Facing::East))
        );
    }

    #[test]
    fn arrival_step_with_no_screen_path_keeps_last_facing() {
        let r = resolve(
            &IsoProjection::default(),
            ScreenPos::ZERO,
            GridPos::new(3.0, 0.0),
            GridPos::new(3.0, 0.0),
            Motion::Moving,
            Facing::East,
            MonsterKind::Wolf,
        );
        assert_eq!(r.facing, Facing::East);
        assert_eq!(r.pose, Pose::Walk(AnimKey::new(MonsterKind::Wolf, Facing::East)));
    }

    #[test]
    fn assets_cover_every_monster_and_facing() {
        let mut render = RecordingRenderer::default();
        register_monster_assets(&mut render);
        assert_eq!(render.sheets.len(), MonsterKind::ALL.len());
        assert_eq!(render.animations.len(), MonsterKind::ALL.len() * 4);
        let (frames, rate) = &render.animations[&AnimKey::new(MonsterKind::Goblin, Facing::South)];
        assert_eq!(frames.clone(), 0..6);
        assert_eq!(*rate, WALK_FRAME_RATE);
        assert_eq!(render.sheets[&MonsterKind::Imp], (64, 64));
    }
}

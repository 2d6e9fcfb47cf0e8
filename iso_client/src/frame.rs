//! Per-frame update.
//!
//! For every entity: advance, pick facing and pose, then write position,
//! depth and animation into its sprite. This is the only place the core
//! writes per-entity render state.

use iso_shared::{
    iso::{DepthBand, IsoProjection},
    math::ScreenPos,
    render::RenderBackend,
};
use tracing::debug;

use crate::{
    anim::{resolve, Pose},
    interp::Interpolator,
    registry::EntityRegistry,
};

/// Counters for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub updated: usize,
    pub moving: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameOrchestrator {
    interp: Interpolator,
    proj: IsoProjection,
    sprite_offset_y: f32,
}

impl FrameOrchestrator {
    pub fn new(interp: Interpolator, proj: IsoProjection, sprite_offset_y: f32) -> Self {
        Self {
            interp,
            proj,
            sprite_offset_y,
        }
    }

    pub fn projection(&self) -> &IsoProjection {
        &self.proj
    }

    /// Runs one tick. A non-finite or negative `dt_sec` skips the tick.
    pub fn tick<R>(
        &self,
        dt_sec: f32,
        origin: ScreenPos,
        registry: &mut EntityRegistry,
        render: &mut R,
    ) -> FrameStats
    where
        R: RenderBackend + ?Sized,
    {
        let mut stats = FrameStats::default();
        if !dt_sec.is_finite() || dt_sec < 0.0 {
            debug!(dt_sec, "Skipping tick with invalid dt");
            return stats;
        }

        for entity in registry.iter_mut() {
            let from = entity.current;
            let motion = self
                .interp
                .advance(&mut entity.current, &mut entity.target, dt_sec);

            let resolved = resolve(
                &self.proj,
                origin,
                from,
                entity.target,
                motion,
                entity.facing,
                entity.kind,
            );
            entity.facing = resolved.facing;

            let screen = self
                .proj
                .grid_to_screen(entity.current, origin)
                .offset(0.0, self.sprite_offset_y);
            render.set_position(entity.sprite, screen);
            render.set_depth(entity.sprite, DepthBand::Entity.depth(entity.current));

            match resolved.pose {
                Pose::Walk(key) => render.play_if_idle(entity.sprite, key),
                Pose::Idle { frame } => render.stop_at_frame(entity.sprite, frame),
            }

            stats.updated += 1;
            if motion.is_moving() {
                stats.moving += 1;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anim::register_monster_assets, registry::SAFE_POS};
    use iso_shared::{
        math::GridPos,
        monster::{AnimKey, Facing, MonsterKind},
        net::PlayerState,
        render::RecordingRenderer,
    };

    fn setup() -> (FrameOrchestrator, EntityRegistry, RecordingRenderer) {
        let mut render = RecordingRenderer::default();
        register_monster_assets(&mut render);
        let orch = FrameOrchestrator::new(Interpolator::new(6.0), IsoProjection::default(), 6.0);
        (orch, EntityRegistry::new(), render)
    }

    fn join(reg: &mut EntityRegistry, render: &mut RecordingRenderer, sid: &str, x: f32, y: f32) {
        reg.upsert(
            &PlayerState {
                sid: sid.into(),
                name: None,
                monster: Some("wolf".into()),
                x,
                y,
            },
            render,
        );
    }

    #[test]
    fn idle_entity_is_pinned_to_its_row_start() {
        let (orch, mut reg, mut render) = setup();
        join(&mut reg, &mut render, "a", 3.0, 3.0);
        let origin = ScreenPos::new(100.0, 50.0);

        let stats = orch.tick(1.0 / 60.0, origin, &mut reg, &mut render);
        assert_eq!(stats, FrameStats { updated: 1, moving: 0 });

        let e = reg.get("a").unwrap();
        let s = render.sprite(e.sprite).unwrap();
        assert_eq!(s.playing, None);
        assert_eq!(s.frame, 0);
        assert_eq!(s.position, ScreenPos::new(100.0, 50.0 + 96.0 + 6.0));
        assert_eq!(s.depth, 1006.0);
    }

    #[test]
    fn walk_cycle_starts_once_then_stops_on_arrival() {
        let (orch, mut reg, mut render) = setup();
        join(&mut reg, &mut render, "a", 0.0, 0.0);
        reg.set_target("a", 2.0, 0.0);
        let sprite = reg.get("a").unwrap().sprite;

        for _ in 0..3 {
            orch.tick(0.1, ScreenPos::ZERO, &mut reg, &mut render);
        }
        let s = render.sprite(sprite).unwrap();
        assert_eq!(s.playing, Some(AnimKey::new(MonsterKind::Wolf, Facing::East)));
        assert_eq!(s.starts, 1);

        for _ in 0..5 {
            orch.tick(0.1, ScreenPos::ZERO, &mut reg, &mut render);
        }
        let e = reg.get("a").unwrap();
        assert_eq!(e.current, GridPos::new(2.0, 0.0));
        assert_eq!(e.facing, Facing::East);
        let s = render.sprite(sprite).unwrap();
        assert_eq!(s.playing, None);
        // East row (2) of a 4-column sheet.
        assert_eq!(s.frame, 8);
    }

    #[test]
    fn single_step_arrival_keeps_travel_facing() {
        let (orch, mut reg, mut render) = setup();
        join(&mut reg, &mut render, "a", 0.0, 0.0);
        reg.set_target("a", 1.0, 0.0);
        let sprite = reg.get("a").unwrap().sprite;

        // One long tick covers the whole cell.
        orch.tick(1.0, ScreenPos::ZERO, &mut reg, &mut render);
        let e = reg.get("a").unwrap();
        assert_eq!(e.current, GridPos::new(1.0, 0.0));
        assert_eq!(e.facing, Facing::East);
        assert_eq!(
            render.sprite(sprite).unwrap().playing,
            Some(AnimKey::new(MonsterKind::Wolf, Facing::East))
        );

        orch.tick(1.0, ScreenPos::ZERO, &mut reg, &mut render);
        assert_eq!(reg.get("a").unwrap().facing, Facing::East);
        let s = render.sprite(sprite).unwrap();
        assert_eq!(s.playing, None);
        assert_eq!(s.frame, 8);
    }

    #[test]
    fn invalid_dt_skips_tick() {
        let (orch, mut reg, mut render) = setup();
        join(&mut reg, &mut render, "a", 0.0, 0.0);
        reg.set_target("a", 3.0, 0.0);

        for dt in [f32::NAN, f32::INFINITY, -1.0] {
            let stats = orch.tick(dt, ScreenPos::ZERO, &mut reg, &mut render);
            assert_eq!(stats.updated, 0);
        }
        assert_eq!(reg.get("a").unwrap().current, GridPos::ZERO);
    }

    #[test]
    fn corrupt_entity_does_not_poison_draw_calls() {
        let (orch, mut reg, mut render) = setup();
        join(&mut reg, &mut render, "a", 1.0, 1.0);
        join(&mut reg, &mut render, "b", 4.0, 4.0);
        reg.iter_mut()
            .filter(|e| e.sid == "a")
            .for_each(|e| e.target = GridPos::new(f32::NAN, 0.0));

        orch.tick(0.016, ScreenPos::ZERO, &mut reg, &mut render);

        let a = reg.get("a").unwrap();
        assert_eq!(a.current, SAFE_POS);
        for s in render.sprites.values() {
            assert!(s.position.x.is_finite() && s.position.y.is_finite());
            assert!(s.depth.is_finite());
        }
        assert_eq!(reg.get("b").unwrap().current, GridPos::new(4.0, 4.0));
    }
}

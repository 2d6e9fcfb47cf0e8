//! Rendering abstraction.
//!
//! No graphics backend is linked here. The core only ever writes into a
//! [`RenderBackend`]; it never reads engine state back.
//! [`RecordingRenderer`] keeps the last written state per sprite so headless
//! runs and tests can observe what a real engine would draw.

use std::collections::HashMap;
use std::ops::Range;

use crate::{
    map::StaticSprite,
    math::ScreenPos,
    monster::{AnimKey, MonsterDef, MonsterKind},
};

/// Opaque per-entity sprite handle owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u64);

/// Capabilities the core needs from a render engine.
pub trait RenderBackend {
    /// Registers a monster sheet with its frame size.
    fn register_sheet(&mut self, def: &MonsterDef);
    /// Registers a looping animation over a frame range of a sheet.
    fn register_animation(&mut self, key: AnimKey, frames: Range<u32>, frame_rate: u32);

    /// Creates a sprite showing the first frame of a sheet.
    fn spawn_sprite(&mut self, kind: MonsterKind) -> SpriteId;
    fn release_sprite(&mut self, id: SpriteId);

    fn set_position(&mut self, id: SpriteId, pos: ScreenPos);
    fn set_depth(&mut self, id: SpriteId, depth: f32);
    /// Starts `key` unless it is already the active animation.
    fn play_if_idle(&mut self, id: SpriteId, key: AnimKey);
    /// Stops any animation and shows a fixed frame.
    fn stop_at_frame(&mut self, id: SpriteId, frame: u32);

    /// Replaces the whole static map layer.
    fn replace_static_layer(&mut self, sprites: Vec<StaticSprite>);

    /// Releases the engine itself. Must tolerate repeated calls.
    fn shutdown(&mut self);
}

/// Last known state of one sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteState {
    pub kind: MonsterKind,
    pub position: ScreenPos,
    pub depth: f32,
    pub playing: Option<AnimKey>,
    pub frame: u32,
    /// Number of times an animation was (re)started.
    pub starts: u32,
}

/// Headless renderer that records everything written into it.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_id: u64,
    pub sheets: HashMap<MonsterKind, (u32, u32)>,
    pub animations: HashMap<AnimKey, (Range<u32>, u32)>,
    pub sprites: HashMap<SpriteId, SpriteState>,
    pub static_layer: Vec<StaticSprite>,
    pub released: Vec<SpriteId>,
    pub shutdowns: u32,
}

impl RecordingRenderer {
    pub fn sprite(&self, id: SpriteId) -> Option<&SpriteState> {
        self.sprites.get(&id)
    }

    pub fn live_sprites(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdowns > 0
    }
}

impl RenderBackend for RecordingRenderer {
    fn register_sheet(&mut self, def: &MonsterDef) {
        self.sheets.insert(def.kind, (def.frame_w, def.frame_h));
    }

    fn register_animation(&mut self, key: AnimKey, frames: Range<u32>, frame_rate: u32) {
        self.animations.entry(key).or_insert((frames, frame_rate));
    }

    fn spawn_sprite(&mut self, kind: MonsterKind) -> SpriteId {
        let id = SpriteId(self.next_id);
        self.next_id += 1;
        self.sprites.insert(
            id,
            SpriteState {
                kind,
                position: ScreenPos::ZERO,
                depth: 0.0,
                playing: None,
                frame: 0,
                starts: 0,
            },
        );
        id
    }

    fn release_sprite(&mut self, id: SpriteId) {
        if self.sprites.remove(&id).is_some() {
            self.released.push(id);
        }
    }

    fn set_position(&mut self, id: SpriteId, pos: ScreenPos) {
        if let Some(s) = self.sprites.get_mut(&id) {
            s.position = pos;
        }
    }

    fn set_depth(&mut self, id: SpriteId, depth: f32) {
        if let Some(s) = self.sprites.get_mut(&id) {
            s.depth = depth;
        }
    }

    fn play_if_idle(&mut self, id: SpriteId, key: AnimKey) {
        let Some(s) = self.sprites.get_mut(&id) else {
            return;
        };
        if s.playing == Some(key) {
            return;
        }
        s.playing = Some(key);
        s.starts += 1;
        if let Some((frames, _)) = self.animations.get(&key) {
            s.frame = frames.start;
        }
    }

    fn stop_at_frame(&mut self, id: SpriteId, frame: u32) {
        if let Some(s) = self.sprites.get_mut(&id) {
            s.playing = None;
            s.frame = frame;
        }
    }

    fn replace_static_layer(&mut self, sprites: Vec<StaticSprite>) {
        self.static_layer = sprites;
    }

    fn shutdown(&mut self) {
        self.sprites.clear();
        self.static_layer.clear();
        self.shutdowns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::Facing;

    #[test]
    fn play_if_idle_does_not_restart_active_cycle() {
        let mut r = RecordingRenderer::default();
        let key = AnimKey::new(MonsterKind::Wolf, Facing::East);
        r.register_animation(key, 8..12, 10);
        let id = r.spawn_sprite(MonsterKind::Wolf);

        r.play_if_idle(id, key);
        r.play_if_idle(id, key);
        let s = r.sprite(id).unwrap();
        assert_eq!(s.starts, 1);
        assert_eq!(s.frame, 8);

        r.stop_at_frame(id, 8);
        r.play_if_idle(id, key);
        assert_eq!(r.sprite(id).unwrap().starts, 2);
    }

    #[test]
    fn release_is_recorded_once() {
        let mut r = RecordingRenderer::default();
        let id = r.spawn_sprite(MonsterKind::Imp);
        r.release_sprite(id);
        r.release_sprite(id);
        assert_eq!(r.released, vec![id]);
        assert_eq!(r.live_sprites(), 0);
    }
}

//! Entity registry.
//!
//! One entry per connected player, keyed by server session id. The local
//! player is not special: its position also arrives as server echoes.
//!
//! Every entry owns a live sprite from the moment `upsert` returns until
//! `remove` (or `clear`) releases it.

use std::collections::HashMap;

use iso_shared::{
    math::GridPos,
    monster::{Facing, MonsterKind},
    net::{PlayerState, SessionId},
    render::{RenderBackend, SpriteId},
};
use tracing::{debug, warn};

/// Position used whenever a coordinate cannot be trusted.
pub const SAFE_POS: GridPos = GridPos::new(2.0, 2.0);

pub const DEFAULT_NAME: &str = "Player";

/// A player's logical and visual state.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub sid: SessionId,
    pub name: String,
    pub kind: MonsterKind,
    /// Last position reported by the server.
    pub target: GridPos,
    /// Position currently drawn; only the interpolator moves it.
    pub current: GridPos,
    /// Facing kept across frames so a stop does not flip the sprite.
    pub facing: Facing,
    pub sprite: SpriteId,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
    /// Monster type changed; the sprite was replaced.
    Respawned,
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<SessionId, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates the entry for `state.sid`.
    ///
    /// A new entry starts at its reported position (no travel on join). An
    /// existing entry only gets a new target; the interpolator walks it
    /// there.
    pub fn upsert<R>(&mut self, state: &PlayerState, render: &mut R) -> Upsert
    where
        R: RenderBackend + ?Sized,
    {
        let kind = MonsterKind::from_key_lossy(state.monster.as_deref());
        let reported = GridPos::new(state.x, state.y);

        let Some(entity) = self.entities.get_mut(&state.sid) else {
            let start = if reported.is_finite() {
                reported
            } else {
                warn!(sid = %state.sid, x = state.x, y = state.y, "Non-finite spawn position, using safe default");
                SAFE_POS
            };
            let sprite = render.spawn_sprite(kind);
            let name = non_empty(state.name.as_deref()).unwrap_or(DEFAULT_NAME).to_string();
            debug!(sid = %state.sid, %name, %kind, ?start, "Entity created");
            self.entities.insert(
                state.sid.clone(),
                Entity {
                    sid: state.sid.clone(),
                    name,
                    kind,
                    target: start,
                    current: start,
                    facing: Facing::South,
                    sprite,
                },
            );
            return Upsert::Created;
        };

        entity.target = reported;
        if let Some(name) = non_empty(state.name.as_deref()) {
            entity.name = name.to_string();
        }

        if entity.kind == kind {
            return Upsert::Updated;
        }

        render.release_sprite(entity.sprite);
        entity.sprite = render.spawn_sprite(kind);
        debug!(sid = %entity.sid, from = %entity.kind, to = %kind, "Entity monster changed");
        entity.kind = kind;
        entity.facing = Facing::South;
        Upsert::Respawned
    }

    /// Sets a new target for an existing entity. Non-finite coordinates and
    /// unknown ids leave everything untouched.
    pub fn set_target(&mut self, sid: &str, x: f32, y: f32) -> bool {
        let target = GridPos::new(x, y);
        if !target.is_finite() {
            warn!(%sid, x, y, "Dropping non-finite move");
            return false;
        }
        match self.entities.get_mut(sid) {
            Some(entity) => {
                entity.target = target;
                true
            }
            None => {
                debug!(%sid, "Move for unknown entity ignored");
                false
            }
        }
    }

    /// Removes an entry and releases its sprite. No-op for unknown ids.
    pub fn remove<R>(&mut self, sid: &str, render: &mut R) -> Option<Entity>
    where
        R: RenderBackend + ?Sized,
    {
        let entity = self.entities.remove(sid)?;
        render.release_sprite(entity.sprite);
        debug!(%sid, "Entity removed");
        Some(entity)
    }

    /// Removes every entry, releasing all sprites. Returns how many were
    /// released; calling it again releases nothing.
    pub fn clear<R>(&mut self, render: &mut R) -> usize
    where
        R: RenderBackend + ?Sized,
    {
        let n = self.entities.len();
        for (_, entity) in self.entities.drain() {
            render.release_sprite(entity.sprite);
        }
        n
    }

    pub fn get(&self, sid: &str) -> Option<&Entity> {
        self.entities.get(sid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

//! Client world state.
//!
//! The world owns everything the view is built from: the current map, the
//! entity registry, the viewport and the chat log. Network messages are
//! applied one at a time and run to completion, so a tick never sees a
//! half-applied message.

use iso_shared::{
    chat::{ChatLine, ChatLog},
    config::ClientConfig,
    iso::IsoProjection,
    map::{MapData, MapModel},
    math::{GridCell, ScreenPos},
    net::{NetMsg, SessionId},
    render::RenderBackend,
};
use tracing::{debug, info};

use crate::{
    anim::register_monster_assets,
    frame::{FrameOrchestrator, FrameStats},
    input::{pointer_to_grid, Viewport},
    interp::Interpolator,
    registry::EntityRegistry,
};

pub struct World<R: RenderBackend> {
    map: MapModel,
    registry: EntityRegistry,
    orchestrator: FrameOrchestrator,
    viewport: Viewport,
    chat: ChatLog,
    room: Option<String>,
    you: Option<SessionId>,
    render: R,
    engine_released: bool,
}

impl<R: RenderBackend> World<R> {
    /// Builds a world on a fresh render engine: registers monster assets
    /// and draws the placeholder map.
    pub fn new(cfg: &ClientConfig, mut render: R) -> Self {
        register_monster_assets(&mut render);

        let orchestrator = FrameOrchestrator::new(
            Interpolator::new(cfg.move_speed),
            cfg.projection(),
            cfg.sprite_offset_y,
        );
        let mut world = Self {
            map: MapModel::default(),
            registry: EntityRegistry::new(),
            orchestrator,
            viewport: Viewport {
                width: cfg.viewport_w,
                height: cfg.viewport_h,
                origin_y: cfg.origin_y,
            },
            chat: ChatLog::default(),
            room: None,
            you: None,
            render,
            engine_released: false,
        };
        world.redraw_map();
        world
    }

    /// Applies one inbound message. Outbound variants are ignored.
    pub fn apply(&mut self, msg: NetMsg) {
        match msg {
            NetMsg::ServerInfo { room, map } => {
                if let Some(map) = map {
                    self.replace_map(map);
                }
                if room.is_some() {
                    self.room = room;
                }
            }
            NetMsg::RoomSnapshot {
                you,
                room,
                map,
                players,
            } => {
                info!(%room, players = players.len(), "Entered room");
                self.chat.system(&format!("Joined room: {room}"));
                self.room = Some(room);
                if you.is_some() {
                    self.you = you;
                }
                self.replace_map(map);
                for state in players.values() {
                    self.registry.upsert(state, &mut self.render);
                }
            }
            NetMsg::PlayerJoined(state) => {
                self.registry.upsert(&state, &mut self.render);
                if let Some(e) = self.registry.get(&state.sid) {
                    info!(sid = %e.sid, name = %e.name, monster = %e.kind, "Player joined");
                    self.chat
                        .system(&format!("{} joined ({})", e.name, e.kind));
                }
            }
            NetMsg::PlayerLeft { sid } => {
                if let Some(e) = self.registry.remove(&sid, &mut self.render) {
                    info!(%sid, name = %e.name, "Player left");
                    self.chat.system(&format!("{} left", e.name));
                }
            }
            NetMsg::PlayerMoved { sid, x, y } => {
                self.registry.set_target(&sid, x, y);
            }
            NetMsg::ChatMsg { name, msg, .. } => {
                debug!(%name, "Chat message");
                self.chat.push(ChatLine::new(&name, &msg));
            }
            other @ (NetMsg::JoinRoom { .. } | NetMsg::MoveTo { .. } | NetMsg::Chat { .. }) => {
                debug!(?other, "Ignoring outbound message type from server");
            }
        }
    }

    /// Advances every entity by `dt_sec` and writes their render state.
    pub fn tick(&mut self, dt_sec: f32) -> FrameStats {
        let origin = self.origin();
        self.orchestrator
            .tick(dt_sec, origin, &mut self.registry, &mut self.render)
    }

    /// Recomputes the origin for a new view size and redraws the map.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
        debug!(width, height, "Viewport resized");
        self.redraw_map();
    }

    /// Translates a screen position into a clamped map cell.
    pub fn cell_at(&self, pos: ScreenPos) -> Option<GridCell> {
        pointer_to_grid(self.projection(), pos, self.origin(), self.map.bounds())
    }

    /// Releases every entity sprite. Safe to call repeatedly.
    pub fn release_entities(&mut self) -> usize {
        self.registry.clear(&mut self.render)
    }

    /// Releases the render engine. Safe to call repeatedly.
    pub fn release_engine(&mut self) -> bool {
        if self.engine_released {
            return false;
        }
        self.render.shutdown();
        self.engine_released = true;
        true
    }

    pub fn origin(&self) -> ScreenPos {
        self.viewport.origin()
    }

    pub fn projection(&self) -> &IsoProjection {
        self.orchestrator.projection()
    }

    pub fn map(&self) -> &MapModel {
        &self.map
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatLog {
        &mut self.chat
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn you(&self) -> Option<&str> {
        self.you.as_deref()
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    fn replace_map(&mut self, data: MapData) {
        self.map = MapModel::from_data(data);
        info!(
            width = self.map.width(),
            height = self.map.height(),
            decorations = self.map.decorations().len(),
            "Map replaced"
        );
        self.redraw_map();
    }

    fn redraw_map(&mut self) {
        if self.engine_released {
            return;
        }
        let sprites = self.map.draw_list(self.projection(), self.origin());
        self.render.replace_static_layer(sprites);
    }
}

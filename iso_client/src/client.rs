//! Client session.
//!
//! A session ties one world to one network task and one UI capture, and
//! tears them down in a fixed order: network first (so nothing new
//! arrives), then entity sprites, then the render engine.

use iso_shared::{
    chat::sanitize_outgoing,
    config::ClientConfig,
    math::GridCell,
    monster::MonsterKind,
    net::NetMsg,
    render::RenderBackend,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    conn::{self, Backoff, Dialer, NetEvent, NetHandle},
    frame::FrameStats,
    input::{build_move, PointerEvent, UiCapture},
    registry::DEFAULT_NAME,
    world::World,
};

/// Connection state as seen by the world loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// No connection has succeeded yet.
    Connecting,
    Online,
    Offline,
}

pub struct Session<R: RenderBackend> {
    world: World<R>,
    ui: UiCapture,
    net: Option<NetHandle>,
    events: mpsc::UnboundedReceiver<NetEvent>,
    link: Link,
    closed: bool,
}

impl<R: RenderBackend> Session<R> {
    /// Builds the world and starts connecting. Must be called inside a
    /// tokio runtime.
    pub fn start<D: Dialer>(cfg: &ClientConfig, dialer: D, render: R) -> Self {
        let world = World::new(cfg, render);
        let monster = MonsterKind::from_key_lossy(Some(&cfg.monster));
        let name = match cfg.player_name.trim() {
            "" => DEFAULT_NAME,
            name => name,
        };
        let join = NetMsg::JoinRoom {
            name: name.to_string(),
            monster: monster.to_string(),
        };
        let (net, events) = conn::spawn(dialer, join, Backoff::from_config(&cfg.reconnect));
        info!(%name, %monster, server = %cfg.server_addr, "Session started");

        Self {
            world,
            ui: UiCapture::install(),
            net: Some(net),
            events,
            link: Link::Connecting,
            closed: false,
        }
    }

    /// Applies every pending network event. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        while let Ok(ev) = self.events.try_recv() {
            self.handle(ev);
            n += 1;
        }
        n
    }

    /// Waits for the next network event and applies it. Returns false once
    /// the network task is gone. Cancel safe.
    pub async fn process_next(&mut self) -> bool {
        match self.events.recv().await {
            Some(ev) => {
                self.handle(ev);
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self, dt_sec: f32) -> FrameStats {
        if self.closed {
            return FrameStats::default();
        }
        self.world.tick(dt_sec)
    }

    /// Handles a pointer press: overlay presses are ignored, anything else
    /// becomes a move request for the clamped cell under the pointer.
    pub fn click(&mut self, ev: PointerEvent) -> Option<GridCell> {
        if self.closed || !self.ui.accepts_pointer(&ev) {
            return None;
        }
        let cell = self.world.cell_at(ev.pos)?;
        self.move_to(cell);
        Some(cell)
    }

    /// Requests a move. Dropped while offline.
    pub fn move_to(&mut self, cell: GridCell) -> bool {
        if !self.is_online() {
            debug!(?cell, "Dropping move while offline");
            return false;
        }
        self.send(build_move(cell))
    }

    /// Sends a chat line. Empty text is ignored; offline sends are reported
    /// in the chat log.
    pub fn say(&mut self, text: &str) -> bool {
        let Some(msg) = sanitize_outgoing(text) else {
            return false;
        };
        if !self.is_online() {
            self.world.chat_mut().system("You are offline right now.");
            return false;
        }
        self.send(NetMsg::Chat { msg })
    }

    pub fn focus_chat(&mut self) {
        self.ui.focus_chat();
    }

    pub fn blur_chat(&mut self) {
        self.ui.blur_chat();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.closed {
            self.world.resize(width, height);
        }
    }

    pub fn is_online(&self) -> bool {
        self.link == Link::Online
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn world(&self) -> &World<R> {
        &self.world
    }

    pub fn ui(&self) -> &UiCapture {
        &self.ui
    }

    /// Ordered teardown. Returns false if the session was already closed.
    pub fn shutdown(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        if let Some(net) = self.net.take() {
            net.detach();
        }
        self.events.close();
        self.link = Link::Offline;
        self.ui.uninstall();

        let released = self.world.release_entities();
        self.world.release_engine();
        info!(released, "Session shut down");
        true
    }

    fn send(&self, msg: NetMsg) -> bool {
        match &self.net {
            Some(net) => net.send(msg),
            None => false,
        }
    }

    fn handle(&mut self, ev: NetEvent) {
        if self.closed {
            return;
        }
        match ev {
            NetEvent::Connected { reconnect } => {
                self.link = Link::Online;
                self.world.chat_mut().system("Connected.");
                if reconnect {
                    // Session ids do not survive a reconnect; the next
                    // snapshot repopulates the room.
                    let released = self.world.release_entities();
                    debug!(released, "Cleared entities from previous connection");
                    self.world.chat_mut().system("Reconnected!");
                }
            }
            NetEvent::Disconnected { reason } => {
                warn!(%reason, "Disconnected");
                self.link = Link::Offline;
                self.world
                    .chat_mut()
                    .system("Connection lost... reconnecting.");
            }
            NetEvent::ConnectFailed { error } => {
                debug!(%error, "Connect attempt failed");
                if self.link == Link::Online {
                    self.link = Link::Offline;
                }
                self.world.chat_mut().system("Could not reach the server.");
            }
            NetEvent::Message(msg) => self.world.apply(msg),
        }
    }
}

impl<R: RenderBackend> Drop for Session<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

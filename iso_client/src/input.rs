//! Input handling.
//!
//! Pointer input is advisory: a click becomes a clamped grid cell that is
//! sent to the server as a move request. The server decides whether the
//! move happens; the client only sees the outcome through `player_moved`.
//!
//! Keyboard and pointer routing between the game view and the UI overlay
//! (chat box, send and leave buttons) lives in [`UiCapture`], a
//! subscription installed once per session and torn down with it.

use bitflags::bitflags;
use iso_shared::{
    iso::IsoProjection,
    map::MapBounds,
    math::{GridCell, ScreenPos},
    net::NetMsg,
};
use tracing::debug;

bitflags! {
    /// UI overlay elements a pointer event may land on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UiElements: u8 {
        const CHAT_INPUT = 1 << 0;
        const SEND_BUTTON = 1 << 1;
        const LEAVE_BUTTON = 1 << 2;
    }
}

/// Raw pointer press in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: ScreenPos,
    /// Overlay elements under the pointer, empty for the bare game view.
    pub over: UiElements,
}

impl PointerEvent {
    pub fn on_world(x: f32, y: f32) -> Self {
        Self {
            pos: ScreenPos::new(x, y),
            over: UiElements::empty(),
        }
    }
}

/// View size; the grid origin is derived from it and recomputed on resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub origin_y: f32,
}

impl Viewport {
    pub fn origin(&self) -> ScreenPos {
        ScreenPos::new((self.width / 2) as f32, self.origin_y)
    }
}

/// Maps a pointer position to a cell inside the map, or `None` when the
/// inverse projection does not yield a finite position.
pub fn pointer_to_grid(
    proj: &IsoProjection,
    pos: ScreenPos,
    origin: ScreenPos,
    bounds: MapBounds,
) -> Option<GridCell> {
    bounds.clamp(proj.screen_to_grid(pos, origin))
}

/// Outbound move request for a cell.
pub fn build_move(cell: GridCell) -> NetMsg {
    NetMsg::MoveTo {
        x: cell.x,
        y: cell.y,
    }
}

/// Per-session input routing between the game view and the UI overlay.
///
/// While the chat box has focus the game does not receive keys. Pointer
/// presses on overlay elements never reach the game. After
/// [`uninstall`](Self::uninstall) nothing reaches the game.
#[derive(Debug)]
pub struct UiCapture {
    installed: bool,
    chat_focused: bool,
}

impl UiCapture {
    pub fn install() -> Self {
        debug!("UI capture installed");
        Self {
            installed: true,
            chat_focused: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn focus_chat(&mut self) {
        if self.installed {
            self.chat_focused = true;
        }
    }

    pub fn blur_chat(&mut self) {
        self.chat_focused = false;
    }

    pub fn chat_focused(&self) -> bool {
        self.chat_focused
    }

    /// Whether game key bindings should see keyboard input right now.
    pub fn game_keys_enabled(&self) -> bool {
        self.installed && !self.chat_focused
    }

    /// Whether a pointer press belongs to the game view.
    pub fn accepts_pointer(&self, ev: &PointerEvent) -> bool {
        self.installed && ev.over.is_empty()
    }

    /// Removes the subscription. Returns `false` if it was already gone.
    pub fn uninstall(&mut self) -> bool {
        if !self.installed {
            return false;
        }
        self.installed = false;
        self.chat_focused = false;
        debug!("UI capture uninstalled");
        true
    }
}

impl Drop for UiCapture {
    fn drop(&mut self) {
        self.uninstall();
    }
}

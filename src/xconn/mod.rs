//! The display/property boundary: everything the window manager core needs
//! from the X server, expressed as a trait so the state machine can be
//! exercised without a live display.
//!
//! Commands never fail from the core's point of view. The backing
//! implementation swallows protocol errors (a window vanishing mid-call is
//! routine) and the core reconciles through the destroy/unmap notifications
//! that follow.

pub mod xcb;

#[cfg(test)]
pub mod mock;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub type Window = u32;

/// A window rectangle in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// WM_NORMAL_HINTS fields the core cares about. Read once when a window is
/// managed and treated as read-only afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub position: Option<(i32, i32)>,
    pub size: Option<(u32, u32)>,
    pub min_size: Option<(u32, u32)>,
    pub base_size: Option<(u32, u32)>,
}

/// Window kind derived from _NET_WM_WINDOW_TYPE (and WM_TRANSIENT_FOR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Normal,
    Dock,
    Dialog,
    Splash,
    Utility,
    Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Normal,
    Move,
    Resize,
}

/// ICCCM WM_STATE values written back to managed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcccmState {
    Withdrawn,
    Normal,
}

/// _NET_WM_STATE client-message modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetStateMode {
    Remove,
    Add,
    Toggle,
}

/// A configure request forwarded verbatim; `mask` carries the xproto
/// ConfigWindow bits the requester set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub border_width: u32,
    pub mask: u16,
}

/// Decoded client-message payloads the core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Our own IPC envelope: a raw command line issued by `driftwmc`.
    Command(String),
    /// _NET_CURRENT_DESKTOP switch request.
    CurrentDesktop(u32),
    /// _NET_WM_STATE fullscreen add/remove/toggle.
    FullscreenState(NetStateMode),
}

/// The external event stream, already translated out of raw protocol form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    ConfigureRequest(ConfigureRequest),
    MapRequest { window: Window },
    MapNotify { window: Window },
    UnmapNotify { window: Window },
    DestroyNotify { window: Window },
    KeyPress { modifiers: u16, keysym: u32 },
    ButtonPress { child: Window, button: u8, root_x: i32, root_y: i32 },
    ButtonRelease,
    MotionNotify { root_x: i32, root_y: i32 },
    ClientMessage { window: Window, kind: MessageKind },
}

pub trait XConn {
    /// Block until the next event arrives. Only connection loss is an error.
    fn next_event(&mut self) -> Result<XEvent>;
    fn flush(&self);

    fn display_size(&self) -> (u32, u32);

    // Window commands.
    fn configure_window(&self, req: &ConfigureRequest);
    fn move_resize_window(&self, window: Window, rect: Rect);
    fn map_window(&self, window: Window);
    fn unmap_window(&self, window: Window);
    fn raise_window(&self, window: Window);
    fn set_border(&self, window: Window, width: u32, color: u32);
    fn define_cursor(&self, cursor: CursorKind);

    // Queries.
    fn window_geometry(&self, window: Window) -> Option<Rect>;
    fn size_hints(&self, window: Window) -> SizeHints;
    fn window_kind(&self, window: Window) -> WindowKind;
    fn window_class(&self, window: Window) -> Option<String>;
    fn has_fullscreen_hint(&self, window: Window) -> bool;
    /// Viewable, non-override-redirect top-level windows (startup scan).
    fn viewable_windows(&self) -> Vec<Window>;

    // Exported properties.
    fn set_icccm_state(&self, window: Window, state: IcccmState);
    fn set_net_fullscreen(&self, window: Window, fullscreen: bool);
    fn set_active_window(&self, window: Window);
    fn clear_active_window(&self);
    fn set_client_list(&self, windows: &[Window]);
    fn set_current_desktop(&self, index: u32);

    // Client lifetime.
    fn supports_delete(&self, window: Window) -> bool;
    fn send_delete(&self, window: Window);
    fn kill_window(&self, window: Window);

    // Input grabs. Keybinds are (modifier mask, keysym) pairs.
    fn grab_keys(&self, keybinds: &[(u16, u32)]);
    fn ungrab_keys(&self);
    fn grab_buttons(&self);
}

//! The window manager core: the event dispatcher plus every state transition
//! it can trigger. All X traffic goes through the [`XConn`] seam, so the whole
//! state machine runs under test against a scripted connection.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::action::{Action, Direction};
use crate::config::Config;
use crate::core::cookie::Cookie;
use crate::core::error::FatalError;
use crate::ipc;
use crate::util;
use crate::window::client::{Client, DEFAULT_FLOATING_HEIGHT, DEFAULT_FLOATING_WIDTH};
use crate::window::layout;
use crate::window::workspace::Workspace;
use crate::xconn::{
    ConfigureRequest, CursorKind, IcccmState, MessageKind, NetStateMode, Rect, Window, WindowKind,
    XConn, XEvent,
};

/// An in-progress pointer drag on a floating window. Button 1 moves,
/// button 3 resizes; everything is computed from the pointer's offset
/// against the geometry captured at press time.
#[derive(Debug, Clone, Copy)]
struct Drag {
    window: Window,
    button: u8,
    origin_x: i32,
    origin_y: i32,
    start: Rect,
}

pub struct WindowManager<X: XConn> {
    conn: X,
    config: Config,
    config_path: Option<PathBuf>,
    cookie: Cookie,
    /// Arena of managed clients; workspaces refer into it by window id.
    clients: HashMap<Window, Client>,
    workspaces: Vec<Workspace>,
    current: usize,
    /// Panels and bars. Never managed, but their struts shrink the tiling area.
    docks: BTreeSet<Window>,
    /// Popup notification windows, kept above everything else.
    notifications: BTreeSet<Window>,
    /// Windows that withdrew themselves; a later configure request revives them.
    hidden: BTreeSet<Window>,
    drag: Option<Drag>,
    running: bool,
}

impl<X: XConn> WindowManager<X> {
    pub fn new(conn: X, config: Config, config_path: Option<PathBuf>, cookie: Cookie) -> Self {
        let workspaces = (0..config.workspace_count)
            .map(|i| Workspace::new(config.workspace_name(i).to_string()))
            .collect();
        Self {
            conn,
            config,
            config_path,
            cookie,
            clients: HashMap::new(),
            workspaces,
            current: 0,
            docks: BTreeSet::new(),
            notifications: BTreeSet::new(),
            hidden: BTreeSet::new(),
            drag: None,
            running: true,
        }
    }

    /// Grabs inputs, adopts windows that were already viewable when we took
    /// over, and launches the user's autostart commands.
    pub fn startup(&mut self) {
        self.conn.grab_keys(&self.config.grab_list());
        self.conn.grab_buttons();
        self.conn.define_cursor(CursorKind::Normal);

        for window in self.conn.viewable_windows() {
            match self.conn.window_kind(window) {
                WindowKind::Dock => {
                    self.docks.insert(window);
                }
                WindowKind::Notification => {
                    self.notifications.insert(window);
                }
                _ => self.manage(window),
            }
        }
        self.arrange_windows();

        for command in self.config.autostart.clone() {
            util::spawn(&command);
        }
    }

    /// Blocks on the event stream until an exit is requested or the
    /// connection drops.
    pub fn run(&mut self) -> Result<(), FatalError> {
        info!("entering event loop");
        while self.running {
            self.conn.flush();
            let event = self
                .conn
                .next_event()
                .map_err(FatalError::ConnectionLost)?;
            self.handle_event(event)?;
        }
        self.conn.flush();
        Ok(())
    }

    pub fn handle_event(&mut self, event: XEvent) -> Result<(), FatalError> {
        match event {
            XEvent::ConfigureRequest(req) => self.on_configure_request(req),
            XEvent::MapRequest { window } => self.on_map_request(window),
            XEvent::MapNotify { window } => self.on_map_notify(window),
            XEvent::UnmapNotify { window } => self.on_unmap_notify(window),
            XEvent::DestroyNotify { window } => self.on_destroy_notify(window),
            XEvent::KeyPress { modifiers, keysym } => {
                return self.on_key_press(modifiers, keysym)
            }
            XEvent::ButtonPress { child, button, root_x, root_y } => {
                self.on_button_press(child, button, root_x, root_y)
            }
            XEvent::ButtonRelease => self.on_button_release(),
            XEvent::MotionNotify { root_x, root_y } => self.on_motion_notify(root_x, root_y),
            XEvent::ClientMessage { window, kind } => {
                return self.on_client_message(window, kind)
            }
        }
        Ok(())
    }

    // -- event handlers ----------------------------------------------------

    fn on_configure_request(&mut self, req: ConfigureRequest) {
        self.conn.configure_window(&req);
        // A window we saw withdraw itself is asking for attention again;
        // adopt it back (this is how hidden chat/tray windows reappear).
        if self.hidden.remove(&req.window) {
            debug!(window = req.window, "re-managing previously hidden window");
            self.manage(req.window);
        }
        self.arrange_windows();
    }

    fn on_map_request(&mut self, window: Window) {
        let class = self.window_class(window);
        if self.config.should_prohibit(&class) {
            debug!(window, class, "map request prohibited by rule");
            return;
        }
        if self.conn.window_kind(window) == WindowKind::Dock {
            if self.docks.insert(window) {
                self.conn.map_window(window);
                self.arrange_windows();
            }
            return;
        }
        self.conn.set_icccm_state(window, IcccmState::Normal);
        self.manage(window);
    }

    fn on_map_notify(&mut self, window: Window) {
        if self.conn.window_kind(window) == WindowKind::Notification
            && !self.clients.contains_key(&window)
            && !self.docks.contains(&window)
        {
            self.notifications.insert(window);
            self.conn.raise_window(window);
        }
        if let Some(c) = self.clients.get_mut(&window) {
            c.mapped = true;
        }
    }

    fn on_unmap_notify(&mut self, window: Window) {
        let Some(c) = self.clients.get_mut(&window) else {
            return;
        };
        c.mapped = false;
        if c.wm_unmap_pending {
            // Our own unmap coming back around; nothing to reconcile.
            c.wm_unmap_pending = false;
            return;
        }
        // The program withdrew its window. Stop managing it but remember it,
        // so a later configure request can bring it back.
        self.hidden.insert(window);
        self.unmanage(window);
    }

    fn on_destroy_notify(&mut self, window: Window) {
        if self.docks.remove(&window) {
            self.arrange_windows();
            return;
        }
        if self.notifications.remove(&window) {
            return;
        }
        self.conn.set_icccm_state(window, IcccmState::Withdrawn);
        self.hidden.remove(&window);
        self.unmanage(window);
    }

    fn on_key_press(&mut self, modifiers: u16, keysym: u32) -> Result<(), FatalError> {
        let actions = self.config.keybind_actions(modifiers, keysym).to_vec();
        for action in actions {
            self.handle_action(action)?;
        }
        Ok(())
    }

    fn on_button_press(&mut self, child: Window, button: u8, root_x: i32, root_y: i32) {
        let Some((floating, fullscreen, start)) = self
            .clients
            .get(&child)
            .map(|c| (c.floating, c.fullscreen, c.geometry))
        else {
            return;
        };
        self.focus(child);
        self.raise_floating();
        if floating && !fullscreen {
            self.conn.raise_window(child);
            self.conn.define_cursor(if button == 3 {
                CursorKind::Resize
            } else {
                CursorKind::Move
            });
            self.drag = Some(Drag { window: child, button, origin_x: root_x, origin_y: root_y, start });
        }
    }

    fn on_button_release(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let settled = self
            .clients
            .get(&drag.window)
            .filter(|c| c.floating)
            .map(|c| c.geometry);
        if let Some(geometry) = settled {
            let key = self.cookie_key(drag.window);
            self.cookie.put(&key, geometry);
        }
        self.conn.define_cursor(CursorKind::Normal);
    }

    fn on_motion_notify(&mut self, root_x: i32, root_y: i32) {
        let Some(drag) = self.drag else {
            return;
        };
        if !self.clients.contains_key(&drag.window) {
            self.drag = None;
            return;
        }
        let dx = root_x - drag.origin_x;
        let dy = root_y - drag.origin_y;
        let g = drag.start;
        let rect = if drag.button == 3 {
            Rect::new(
                g.x,
                g.y,
                (g.w as i64 + dx as i64).max(1) as u32,
                (g.h as i64 + dy as i64).max(1) as u32,
            )
        } else {
            Rect::new(g.x + dx, g.y + dy, g.w, g.h)
        };
        let conn = &self.conn;
        if let Some(c) = self.clients.get_mut(&drag.window) {
            c.move_resize(conn, rect);
        }
    }

    fn on_client_message(&mut self, window: Window, kind: MessageKind) -> Result<(), FatalError> {
        match kind {
            MessageKind::Command(payload) => {
                for action in ipc::parse_commands(&payload) {
                    self.handle_action(action)?;
                }
            }
            MessageKind::CurrentDesktop(index) => self.goto_workspace(index as i64),
            MessageKind::FullscreenState(mode) => {
                let Some(current) = self.clients.get(&window).map(|c| c.fullscreen) else {
                    return Ok(());
                };
                let target = match mode {
                    NetStateMode::Add => true,
                    NetStateMode::Remove => false,
                    NetStateMode::Toggle => !current,
                };
                self.set_fullscreen(window, target);
            }
        }
        Ok(())
    }

    // -- actions -----------------------------------------------------------

    pub fn handle_action(&mut self, action: Action) -> Result<(), FatalError> {
        let focused = self.workspaces[self.current].focused();
        match action {
            Action::Navigate(direction) => self.navigate(direction),
            Action::SetTilingDirection(direction) => {
                self.workspaces[self.current].set_direction(direction);
                self.retile();
            }
            Action::ToggleFloating => {
                if let Some(window) = focused {
                    let floating = self.clients.get(&window).map_or(false, |c| c.floating);
                    self.set_floating(window, !floating, true);
                }
            }
            Action::ToggleFullscreen => {
                if let Some(window) = focused {
                    let fullscreen = self.clients.get(&window).map_or(false, |c| c.fullscreen);
                    self.set_fullscreen(window, !fullscreen);
                }
            }
            Action::GotoWorkspace(index) => self.goto_workspace(index as i64),
            Action::WorkspaceRelative(delta) => {
                self.goto_workspace(self.current as i64 + delta)
            }
            Action::MoveWindowToWorkspace(index) => {
                if let Some(window) = focused {
                    self.move_window_to_workspace(window, index as i64);
                }
            }
            Action::Kill => {
                if let Some(window) = focused {
                    self.kill_client(window);
                }
            }
            Action::Reload => self.reload_config(),
            Action::Exit => {
                info!("exit requested");
                self.running = false;
            }
            Action::Exec(command) => util::spawn(&command),
            Action::DebugCrash => {
                warn!("debug crash requested");
                return Err(FatalError::DebugCrash);
            }
        }
        Ok(())
    }

    fn navigate(&mut self, direction: Direction) {
        if self.workspaces[self.current].is_fullscreen() {
            return;
        }
        if let Some(next) = self.workspaces[self.current].navigate(direction) {
            self.focus(next);
            if let Some(c) = self.clients.get(&next) {
                if c.floating {
                    c.raise(&self.conn);
                }
            }
        }
    }

    // -- state transitions -------------------------------------------------

    /// Adopts a window: arena entry, workspace membership, rules, initial
    /// float/fullscreen modes. Managing an already-managed window is a no-op.
    pub fn manage(&mut self, window: Window) {
        if self.clients.contains_key(&window)
            || self.docks.contains(&window)
            || self.notifications.contains(&window)
        {
            return;
        }

        let class = self.window_class(window);
        let target = self.config.spawn_workspace(&class).unwrap_or(self.current);
        let geometry = self.conn.window_geometry(window).unwrap_or_else(|| {
            Rect::new(0, 0, DEFAULT_FLOATING_WIDTH, DEFAULT_FLOATING_HEIGHT)
        });
        let hints = self.conn.size_hints(window);
        let kind = self.conn.window_kind(window);

        // Only windows landing on the visible, non-fullscreen workspace get
        // mapped here; the rest stay hidden until that workspace is shown.
        let visible = target == self.current && !self.workspaces[target].is_fullscreen();

        let mut client = Client::new(window, target, geometry, hints);
        client.border_width = self.config.border_width;
        client.mapped = visible;
        self.clients.insert(window, client);
        self.workspaces[target].add(window);
        self.update_client_list();
        self.conn
            .set_border(window, self.config.border_width, self.config.unfocused_color);
        if visible {
            self.conn.map_window(window);
        }
        debug!(window, class, workspace = target, "managed window");

        if !self.workspaces[target].is_fullscreen() {
            self.workspaces[target].set_focused(window);
        }

        let float = self.config.should_float(&class)
            || matches!(kind, WindowKind::Dialog | WindowKind::Splash | WindowKind::Utility);
        if float {
            self.set_floating(window, true, false);
        }
        if self.config.should_fullscreen(&class) || self.conn.has_fullscreen_hint(window) {
            self.set_fullscreen(window, true);
        }

        if visible {
            self.arrange_windows();
        }
    }

    /// Drops a window from all bookkeeping and re-arranges. Safe to call for
    /// windows that were never managed.
    pub fn unmanage(&mut self, window: Window) {
        let Some(client) = self.clients.remove(&window) else {
            return;
        };
        if client.fullscreen {
            self.workspaces[client.workspace].set_fullscreen(false);
        }
        self.workspaces[client.workspace].remove(window);
        self.update_client_list();
        debug!(window, workspace = client.workspace, "unmanaged window");
        self.arrange_windows();
    }

    /// Makes a client float (at its remembered/hinted/centered geometry) or
    /// puts it back in the tiling order. Fullscreen clients don't change
    /// floating state until they leave fullscreen.
    pub fn set_floating(&mut self, window: Window, floating: bool, use_default_size: bool) {
        let Some(is_fullscreen) = self.clients.get(&window).map(|c| c.fullscreen) else {
            return;
        };
        if is_fullscreen {
            return;
        }
        if floating {
            let area = self.floating_area(window, use_default_size);
            let conn = &self.conn;
            if let Some(c) = self.clients.get_mut(&window) {
                c.move_resize(conn, area);
            }
        }
        if let Some(c) = self.clients.get_mut(&window) {
            c.floating = floating;
        }
        self.arrange_windows();
    }

    /// Puts a client into or out of fullscreen. At most one client per
    /// workspace is fullscreen; entering fullscreen drops any previous one
    /// back to its saved geometry first.
    pub fn set_fullscreen(&mut self, window: Window, fullscreen: bool) {
        let Some((ws, already, geometry)) = self
            .clients
            .get(&window)
            .map(|c| (c.workspace, c.fullscreen, c.geometry))
        else {
            return;
        };
        if already == fullscreen {
            return;
        }

        if fullscreen {
            let other = self.workspaces[ws]
                .windows()
                .iter()
                .copied()
                .find(|&w| w != window && self.clients.get(&w).map_or(false, |c| c.fullscreen));
            if let Some(other) = other {
                self.set_fullscreen(other, false);
            }
        }

        let border_width = if fullscreen { 0 } else { self.config.border_width };
        if let Some(c) = self.clients.get_mut(&window) {
            c.fullscreen = fullscreen;
            c.border_width = border_width;
        }
        self.workspaces[ws].set_fullscreen(fullscreen);
        self.conn
            .set_border(window, border_width, self.config.focused_color);

        if fullscreen {
            self.unmap_docks();
            let (sw, sh) = self.conn.display_size();
            let conn = &self.conn;
            if let Some(c) = self.clients.get_mut(&window) {
                c.saved_geometry = Some(geometry);
                c.map(conn);
                c.move_resize(conn, Rect::new(0, 0, sw, sh));
            }
            let siblings: Vec<Window> = self.workspaces[ws]
                .windows()
                .iter()
                .copied()
                .filter(|&w| w != window)
                .collect();
            for sibling in siblings {
                if let Some(c) = self.clients.get_mut(&sibling) {
                    c.unmap(&self.conn);
                }
            }
            self.conn.raise_window(window);
            self.workspaces[ws].set_focused(window);
            if ws == self.current {
                self.conn.set_active_window(window);
            }
        } else {
            self.map_docks();
            let saved = self
                .clients
                .get_mut(&window)
                .and_then(|c| c.saved_geometry.take());
            if let Some(saved) = saved {
                let conn = &self.conn;
                if let Some(c) = self.clients.get_mut(&window) {
                    c.move_resize(conn, saved);
                }
            }
            if ws == self.current {
                self.arrange_windows();
            }
        }
        self.conn.set_net_fullscreen(window, fullscreen);
    }

    /// Switches the visible workspace. Out-of-range or same-workspace
    /// requests are no-ops (so relative switches stop at the ends instead of
    /// wrapping).
    pub fn goto_workspace(&mut self, target: i64) {
        if target < 0 || target as usize >= self.workspaces.len() {
            return;
        }
        let target = target as usize;
        if target == self.current {
            return;
        }

        for window in self.workspaces[self.current].windows().to_vec() {
            if let Some(c) = self.clients.get_mut(&window) {
                c.unmap(&self.conn);
            }
        }
        for window in self.workspaces[target].windows().to_vec() {
            if let Some(c) = self.clients.get_mut(&window) {
                c.map(&self.conn);
            }
        }
        self.current = target;
        self.arrange_windows();
        self.conn.set_current_desktop(target as u32);
        debug!(
            workspace = target,
            name = self.workspaces[target].name(),
            "switched workspace"
        );
    }

    /// Sends a client to another workspace without following it. The
    /// destination's focus is cleared so the mover lands unfocused there.
    pub fn move_window_to_workspace(&mut self, window: Window, target: i64) {
        let Some(source) = self.clients.get(&window).map(|c| c.workspace) else {
            return;
        };
        if target < 0 || target as usize >= self.workspaces.len() {
            return;
        }
        let target = target as usize;
        if target == source {
            return;
        }

        if self.workspaces[source].is_fullscreen() {
            self.set_fullscreen(window, false);
        }
        if let Some(c) = self.clients.get_mut(&window) {
            c.unmap(&self.conn);
        }
        self.workspaces[target].unset_focused();
        self.workspaces[source].remove(window);
        self.workspaces[target].add(window);
        if let Some(c) = self.clients.get_mut(&window) {
            c.workspace = target;
        }
        self.update_client_list();
        self.arrange_windows();
    }

    /// Asks the client to close itself when it speaks WM_DELETE_WINDOW,
    /// otherwise severs its connection.
    pub fn kill_client(&mut self, window: Window) {
        if self.conn.supports_delete(window) {
            self.conn.send_delete(window);
        } else {
            self.conn.kill_window(window);
        }
    }

    fn reload_config(&mut self) {
        util::notify("reloading configuration");
        let path = self.config_path.clone();
        let mut config = match Config::load(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("config reload failed, keeping current config: {e:#}");
                return;
            }
        };
        // The workspace set is fixed for the lifetime of the session.
        if config.workspace_count != self.config.workspace_count {
            warn!(
                old = self.config.workspace_count,
                new = config.workspace_count,
                "workspace count changes require a restart"
            );
            config.workspace_count = self.config.workspace_count;
        }
        self.config = config;

        for (&window, c) in &mut self.clients {
            if !c.fullscreen {
                c.border_width = self.config.border_width;
                self.conn
                    .set_border(window, c.border_width, self.config.unfocused_color);
            }
        }
        self.conn.ungrab_keys();
        self.conn.grab_keys(&self.config.grab_list());
        self.arrange_windows();
        for command in self.config.autostart_on_reload.clone() {
            util::spawn(&command);
        }
        info!("configuration reloaded");
    }

    // -- arrangement -------------------------------------------------------

    /// Re-establishes the visible state of the current workspace: active
    /// window hint, dock visibility, tiling, borders and stacking. This runs
    /// after every transition that could invalidate any of those, so handlers
    /// never need to reason about what exactly changed.
    fn arrange_windows(&mut self) {
        let ws = self.current;
        match self.workspaces[ws].focused() {
            Some(window) => self.conn.set_active_window(window),
            None => self.conn.clear_active_window(),
        }

        if self.workspaces[ws].is_fullscreen() {
            let fullscreen = self.workspaces[ws]
                .windows()
                .iter()
                .copied()
                .find(|w| self.clients.get(w).map_or(false, |c| c.fullscreen));
            if let Some(window) = fullscreen {
                self.unmap_docks();
                let (sw, sh) = self.conn.display_size();
                let conn = &self.conn;
                if let Some(c) = self.clients.get_mut(&window) {
                    c.move_resize(conn, Rect::new(0, 0, sw, sh));
                    c.raise(conn);
                }
                return;
            }
            // Stale flag with no fullscreen client left; heal and tile.
            self.workspaces[ws].set_fullscreen(false);
        }

        self.map_docks();
        for window in self.workspaces[ws].windows().to_vec() {
            if let Some(c) = self.clients.get_mut(&window) {
                c.map(&self.conn);
            }
        }
        self.retile();
        self.apply_borders();
        self.raise_floating();
        for &window in &self.notifications {
            self.conn.raise_window(window);
        }
    }

    /// Recomputes tiling slots for the current workspace and applies them.
    /// Floating, fullscreen and unmapped clients keep their geometry.
    fn retile(&mut self) {
        let area = self.tiling_area();
        let ws = &self.workspaces[self.current];
        let tileable: Vec<Window> = ws
            .windows()
            .iter()
            .copied()
            .filter(|w| {
                self.clients
                    .get(w)
                    .map_or(false, |c| c.mapped && !c.floating && !c.fullscreen)
            })
            .collect();
        let slots = layout::split(
            tileable.len(),
            area,
            ws.direction(),
            self.config.alternate_split,
        );
        let conn = &self.conn;
        for (window, slot) in tileable.into_iter().zip(slots) {
            if let Some(c) = self.clients.get_mut(&window) {
                c.move_resize(conn, slot);
            }
        }
    }

    /// The screen minus every dock's reserved edge.
    fn tiling_area(&self) -> Rect {
        let (sw, sh) = self.conn.display_size();
        let screen = Rect::new(0, 0, sw, sh);
        let docks: Vec<Rect> = self
            .docks
            .iter()
            .filter_map(|&d| self.conn.window_geometry(d))
            .collect();
        layout::tiling_area(screen, &docks)
    }

    /// Resolves where a newly floating window should sit. Previously
    /// remembered geometry (by class) wins, then the program's own hints,
    /// then centered defaults.
    fn floating_area(&self, window: Window, use_default_size: bool) -> Rect {
        let (sw, sh) = self.conn.display_size();
        if use_default_size {
            return Rect::new(
                center(sw, DEFAULT_FLOATING_WIDTH),
                center(sh, DEFAULT_FLOATING_HEIGHT),
                DEFAULT_FLOATING_WIDTH,
                DEFAULT_FLOATING_HEIGHT,
            );
        }

        let remembered = self.cookie.get(&self.cookie_key(window));
        let (hints, current) = self
            .clients
            .get(&window)
            .map(|c| (c.size_hints, c.geometry))
            .unwrap_or_default();

        let positive = |&(w, h): &(u32, u32)| w > 0 && h > 0;
        let (w, h) = if let Some(r) = remembered {
            (r.w, r.h)
        } else if let Some(size) = hints.size.filter(positive) {
            size
        } else if let Some(size) = hints.min_size.filter(positive) {
            size
        } else if let Some(size) = hints.base_size.filter(positive) {
            size
        } else {
            (DEFAULT_FLOATING_WIDTH, DEFAULT_FLOATING_HEIGHT)
        };

        let (x, y) = if let Some(r) = remembered {
            (r.x, r.y)
        } else if let Some(pos) = hints.position.filter(|&(x, y)| x > 0 && y > 0) {
            pos
        } else {
            (center(sw, current.w), center(sh, current.h))
        };

        Rect::new(x, y, w, h)
    }

    fn focus(&mut self, window: Window) {
        let Some(ws) = self.clients.get(&window).map(|c| c.workspace) else {
            return;
        };
        if let Some(old) = self.workspaces[ws].focused() {
            if old != window {
                let width = self.clients.get(&old).map_or(0, |c| c.border_width);
                self.conn.set_border(old, width, self.config.unfocused_color);
            }
        }
        self.workspaces[ws].set_focused(window);
        let width = self.clients.get(&window).map_or(0, |c| c.border_width);
        self.conn.set_border(window, width, self.config.focused_color);
        if ws == self.current {
            self.conn.set_active_window(window);
        }
    }

    fn apply_borders(&self) {
        let ws = &self.workspaces[self.current];
        for &window in ws.windows() {
            let Some(c) = self.clients.get(&window) else {
                continue;
            };
            let color = if ws.focused() == Some(window) {
                self.config.focused_color
            } else {
                self.config.unfocused_color
            };
            self.conn.set_border(window, c.border_width, color);
        }
    }

    fn raise_floating(&self) {
        for &window in self.workspaces[self.current].windows() {
            if self.clients.get(&window).map_or(false, |c| c.floating) {
                self.conn.raise_window(window);
            }
        }
    }

    fn map_docks(&self) {
        for &dock in &self.docks {
            self.conn.map_window(dock);
        }
    }

    fn unmap_docks(&self) {
        for &dock in &self.docks {
            self.conn.unmap_window(dock);
        }
    }

    /// Publishes _NET_CLIENT_LIST: every managed window, grouped by
    /// workspace in tiling order.
    fn update_client_list(&self) {
        let list: Vec<Window> = self
            .workspaces
            .iter()
            .flat_map(|ws| ws.windows().iter().copied())
            .collect();
        self.conn.set_client_list(&list);
    }

    fn window_class(&self, window: Window) -> String {
        self.conn.window_class(window).unwrap_or_default()
    }

    /// Cookie key for remembered floating geometry. Keyed by class so the
    /// position survives the application restarting with a new window id.
    fn cookie_key(&self, window: Window) -> String {
        self.conn
            .window_class(window)
            .unwrap_or_else(|| format!("0x{window:x}"))
    }
}

fn center(total: u32, size: u32) -> i32 {
    (total as i32 - size as i32) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::layout::TilingDirection;
    use crate::xconn::mock::{Call, MockXConn};
    use crate::xconn::SizeHints;

    fn manager() -> WindowManager<MockXConn> {
        manager_with_config(Config::default())
    }

    fn manager_with_config(config: Config) -> WindowManager<MockXConn> {
        let conn = MockXConn::new(800, 600);
        WindowManager::new(conn, config, None, Cookie::load(None))
    }

    fn spawn(wm: &mut WindowManager<MockXConn>, window: Window) {
        wm.conn
            .register_window(window, WindowKind::Normal, Rect::new(0, 0, 400, 300));
        wm.manage(window);
    }

    fn spawn_dock(wm: &mut WindowManager<MockXConn>, window: Window, geometry: Rect) {
        wm.conn.register_window(window, WindowKind::Dock, geometry);
        wm.handle_event(XEvent::MapRequest { window }).unwrap();
    }

    fn geometry(wm: &WindowManager<MockXConn>, window: Window) -> Rect {
        wm.clients[&window].geometry
    }

    #[test]
    fn single_client_fills_the_screen() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        assert!(wm.workspaces[0].contains(1));
        assert_eq!(wm.workspaces[0].focused(), Some(1));
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn two_clients_split_along_workspace_direction() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 400, 600));
        assert_eq!(geometry(&wm, 2), Rect::new(400, 0, 400, 600));

        wm.handle_action(Action::SetTilingDirection(TilingDirection::Vertical))
            .unwrap();
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 800, 300));
        assert_eq!(geometry(&wm, 2), Rect::new(0, 300, 800, 300));
    }

    #[test]
    fn docks_shrink_the_tiling_area() {
        let mut wm = manager();
        spawn_dock(&mut wm, 50, Rect::new(0, 0, 800, 24));
        spawn(&mut wm, 1);
        assert_eq!(geometry(&wm, 1), Rect::new(0, 24, 800, 576));
        assert!(!wm.clients.contains_key(&50), "docks are never managed");
    }

    #[test]
    fn destroying_a_dock_gives_the_space_back() {
        let mut wm = manager();
        spawn_dock(&mut wm, 50, Rect::new(0, 0, 800, 24));
        spawn(&mut wm, 1);
        wm.handle_event(XEvent::DestroyNotify { window: 50 }).unwrap();
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn fullscreen_covers_display_and_hides_docks_and_siblings() {
        let mut wm = manager();
        spawn_dock(&mut wm, 50, Rect::new(0, 0, 800, 24));
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        let tiled = geometry(&wm, 2);

        wm.conn.clear_calls();
        wm.set_fullscreen(2, true);
        assert_eq!(geometry(&wm, 2), Rect::new(0, 0, 800, 600));
        assert!(wm.workspaces[0].is_fullscreen());
        assert_eq!(wm.workspaces[0].focused(), Some(2));
        let calls = wm.conn.calls();
        assert!(calls.contains(&Call::Unmap(50)), "dock hidden");
        assert!(calls.contains(&Call::Unmap(1)), "sibling hidden");
        assert!(calls.contains(&Call::SetNetFullscreen(2, true)));

        wm.conn.clear_calls();
        wm.set_fullscreen(2, false);
        assert!(!wm.workspaces[0].is_fullscreen());
        assert_eq!(geometry(&wm, 2), tiled, "saved geometry restored, then retiled to the same slot");
        let calls = wm.conn.calls();
        assert!(calls.contains(&Call::Map(50)), "dock back");
        assert!(calls.contains(&Call::Map(1)), "sibling back");
        assert!(calls.contains(&Call::SetNetFullscreen(2, false)));
    }

    #[test]
    fn at_most_one_fullscreen_client_per_workspace() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        wm.set_fullscreen(1, true);
        wm.set_fullscreen(2, true);
        assert!(!wm.clients[&1].fullscreen);
        assert!(wm.clients[&2].fullscreen);
        assert!(wm.workspaces[0].is_fullscreen());
    }

    #[test]
    fn fullscreen_blocks_floating_toggle() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.set_fullscreen(1, true);
        wm.set_floating(1, true, true);
        assert!(!wm.clients[&1].floating);
    }

    #[test]
    fn float_then_unfloat_returns_to_tiling_order() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);

        wm.set_floating(2, true, true);
        assert_eq!(geometry(&wm, 2), Rect::new(0, 0, 800, 600), "default size, centered");
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 800, 600), "remaining tile takes it all");

        wm.set_floating(2, false, false);
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 400, 600));
        assert_eq!(geometry(&wm, 2), Rect::new(400, 0, 400, 600));
    }

    #[test]
    fn dialogs_float_automatically() {
        let mut wm = manager();
        wm.conn
            .register_window(7, WindowKind::Dialog, Rect::new(10, 10, 200, 100));
        wm.manage(7);
        assert!(wm.clients[&7].floating);
    }

    #[test]
    fn floating_size_prefers_hints_over_defaults() {
        let mut wm = manager();
        wm.conn
            .register_window(7, WindowKind::Dialog, Rect::new(0, 0, 200, 100));
        wm.conn.set_hints(
            7,
            SizeHints {
                size: Some((320, 240)),
                ..SizeHints::default()
            },
        );
        wm.manage(7);
        let g = geometry(&wm, 7);
        assert_eq!((g.w, g.h), (320, 240));
        assert_eq!((g.x, g.y), (center(800, 200), center(600, 100)), "centered on current size");
    }

    #[test]
    fn goto_workspace_hides_and_shows() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.clear_calls();

        wm.goto_workspace(1);
        assert_eq!(wm.current, 1);
        let calls = wm.conn.calls();
        assert!(calls.contains(&Call::Unmap(1)));
        assert!(calls.contains(&Call::SetCurrentDesktop(1)));
        assert!(calls.contains(&Call::ClearActiveWindow), "empty workspace has no active window");

        wm.goto_workspace(0);
        assert!(wm.conn.calls().contains(&Call::Map(1)));
        assert_eq!(wm.workspaces[0].focused(), Some(1), "focus survives the round trip");
    }

    #[test]
    fn goto_same_or_invalid_workspace_is_noop() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.clear_calls();
        wm.goto_workspace(0);
        wm.goto_workspace(-1);
        wm.goto_workspace(99);
        assert!(wm.conn.calls().is_empty());
        assert_eq!(wm.current, 0);
    }

    #[test]
    fn relative_workspace_switch_stops_at_the_ends() {
        let mut wm = manager();
        wm.handle_action(Action::WorkspaceRelative(-1)).unwrap();
        assert_eq!(wm.current, 0);
        wm.handle_action(Action::WorkspaceRelative(1)).unwrap();
        assert_eq!(wm.current, 1);
    }

    #[test]
    fn move_window_clears_destination_focus() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        wm.move_window_to_workspace(1, 2);
        assert_eq!(wm.workspaces[2].windows(), &[1]);
        assert_eq!(wm.workspaces[2].focused(), None);

        // Simulate the user having focused it over there.
        wm.workspaces[2].set_focused(1);
        wm.move_window_to_workspace(2, 2);
        assert_eq!(wm.workspaces[2].focused(), None, "arrival clears prior focus");
        assert_eq!(wm.workspaces[2].windows(), &[1, 2]);
        assert!(wm.workspaces[0].is_empty());
        assert_eq!(wm.clients[&2].workspace, 2);
    }

    #[test]
    fn move_window_to_same_workspace_is_noop() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.clear_calls();
        wm.move_window_to_workspace(1, 0);
        assert!(wm.conn.calls().is_empty());
        assert_eq!(wm.workspaces[0].windows(), &[1]);
    }

    #[test]
    fn remaining_client_retiles_after_unmanage() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        wm.handle_event(XEvent::DestroyNotify { window: 2 }).unwrap();
        assert!(!wm.clients.contains_key(&2));
        assert_eq!(geometry(&wm, 1), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn remanaging_a_closed_window_leaves_no_stale_focus() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        assert_eq!(wm.workspaces[0].focused(), Some(2));

        wm.handle_event(XEvent::DestroyNotify { window: 2 }).unwrap();
        assert_eq!(wm.workspaces[0].focused(), None);

        spawn(&mut wm, 2);
        assert_eq!(wm.workspaces[0].focused(), Some(2));
        assert_eq!(wm.workspaces[0].windows(), &[1, 2]);
    }

    #[test]
    fn self_withdrawn_window_comes_back_on_configure_request() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.handle_event(XEvent::UnmapNotify { window: 1 }).unwrap();
        assert!(!wm.clients.contains_key(&1));
        assert!(wm.hidden.contains(&1));

        wm.handle_event(XEvent::ConfigureRequest(ConfigureRequest {
            window: 1,
            x: 0,
            y: 0,
            w: 300,
            h: 200,
            border_width: 0,
            mask: 0,
        }))
        .unwrap();
        assert!(wm.clients.contains_key(&1));
        assert!(wm.hidden.is_empty());
    }

    #[test]
    fn wm_initiated_unmap_does_not_unmanage() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.goto_workspace(1);
        // The unmap we caused comes back as a notification.
        wm.handle_event(XEvent::UnmapNotify { window: 1 }).unwrap();
        assert!(wm.clients.contains_key(&1));
        assert!(wm.hidden.is_empty());
    }

    #[test]
    fn prohibit_rule_blocks_map_request() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            class = "blocked"
            prohibit = true
            "#,
        )
        .unwrap();
        let mut wm = manager_with_config(config);
        wm.conn
            .register_window(1, WindowKind::Normal, Rect::new(0, 0, 100, 100));
        wm.conn.set_class(1, "blocked");
        wm.handle_event(XEvent::MapRequest { window: 1 }).unwrap();
        assert!(wm.clients.is_empty());
    }

    #[test]
    fn spawn_rule_places_window_on_its_workspace() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            class = "browser"
            workspace = 3
            "#,
        )
        .unwrap();
        let mut wm = manager_with_config(config);
        wm.conn
            .register_window(1, WindowKind::Normal, Rect::new(0, 0, 100, 100));
        wm.conn.set_class(1, "browser");
        wm.handle_event(XEvent::MapRequest { window: 1 }).unwrap();
        assert_eq!(wm.clients[&1].workspace, 2);
        assert!(wm.workspaces[2].contains(1));
        assert!(wm.workspaces[0].is_empty());
    }

    #[test]
    fn spawn_rule_window_stays_hidden_until_its_workspace_is_shown() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            class = "browser"
            workspace = 3
            "#,
        )
        .unwrap();
        let mut wm = manager_with_config(config);
        wm.conn
            .register_window(1, WindowKind::Normal, Rect::new(0, 0, 100, 100));
        wm.conn.set_class(1, "browser");
        wm.handle_event(XEvent::MapRequest { window: 1 }).unwrap();

        assert_eq!(wm.clients[&1].workspace, 2);
        assert!(!wm.clients[&1].mapped);
        assert!(
            !wm.conn.calls().contains(&Call::Map(1)),
            "a window destined for a hidden workspace must not appear on the visible desktop"
        );

        wm.goto_workspace(2);
        assert!(wm.conn.calls().contains(&Call::Map(1)));
        assert!(wm.clients[&1].mapped);
    }

    #[test]
    fn manage_under_fullscreen_keeps_new_window_hidden() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.set_fullscreen(1, true);
        wm.conn.clear_calls();

        spawn(&mut wm, 2);
        assert!(!wm.clients[&2].mapped);
        assert!(!wm.conn.calls().contains(&Call::Map(2)));
        assert_eq!(wm.workspaces[0].focused(), Some(1), "fullscreen client keeps focus");

        wm.set_fullscreen(1, false);
        assert!(wm.conn.calls().contains(&Call::Map(2)));
    }

    #[test]
    fn kill_prefers_delete_protocol() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.set_deletable(1);
        wm.handle_action(Action::Kill).unwrap();
        assert!(wm.conn.calls().contains(&Call::SendDelete(1)));

        spawn(&mut wm, 2);
        wm.conn.clear_calls();
        wm.handle_action(Action::Kill).unwrap();
        assert!(wm.conn.calls().contains(&Call::KillWindow(2)));
    }

    #[test]
    fn key_press_runs_bound_actions() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.set_deletable(1);
        let keysym = crate::config::keys::keysym_from_name("q").unwrap();
        wm.handle_event(XEvent::KeyPress {
            modifiers: crate::config::keys::MOD4,
            keysym,
        })
        .unwrap();
        assert!(wm.conn.calls().contains(&Call::SendDelete(1)));
    }

    #[test]
    fn debug_crash_action_is_fatal() {
        let mut wm = manager();
        let err = wm.handle_action(Action::DebugCrash).unwrap_err();
        assert!(matches!(err, FatalError::DebugCrash));
    }

    #[test]
    fn exit_action_stops_the_loop() {
        let mut wm = manager();
        assert!(wm.running);
        wm.handle_action(Action::Exit).unwrap();
        assert!(!wm.running);
    }

    #[test]
    fn ipc_command_message_dispatches_actions() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.handle_event(XEvent::ClientMessage {
            window: 0,
            kind: MessageKind::Command("goto_workspace:2".to_string()),
        })
        .unwrap();
        assert_eq!(wm.current, 1);
    }

    #[test]
    fn net_wm_state_toggle_enters_and_leaves_fullscreen() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.handle_event(XEvent::ClientMessage {
            window: 1,
            kind: MessageKind::FullscreenState(NetStateMode::Toggle),
        })
        .unwrap();
        assert!(wm.clients[&1].fullscreen);
        wm.handle_event(XEvent::ClientMessage {
            window: 1,
            kind: MessageKind::FullscreenState(NetStateMode::Toggle),
        })
        .unwrap();
        assert!(!wm.clients[&1].fullscreen);
    }

    #[test]
    fn fullscreen_hint_applies_at_manage_time() {
        let mut wm = manager();
        wm.conn
            .register_window(1, WindowKind::Normal, Rect::new(0, 0, 100, 100));
        wm.conn.set_fullscreen_hint(1);
        wm.manage(1);
        assert!(wm.clients[&1].fullscreen);
        assert!(wm.workspaces[0].is_fullscreen());
    }

    #[test]
    fn navigation_moves_focus_between_tiles() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        assert_eq!(wm.workspaces[0].focused(), Some(2));
        wm.handle_action(Action::Navigate(Direction::Left)).unwrap();
        assert_eq!(wm.workspaces[0].focused(), Some(1));
        assert!(wm.conn.calls().contains(&Call::SetActiveWindow(1)));
        wm.handle_action(Action::Navigate(Direction::Left)).unwrap();
        assert_eq!(wm.workspaces[0].focused(), Some(1), "no wrap at the edge");
    }

    #[test]
    fn drag_moves_a_floating_window_and_remembers_it() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.set_class(1, "floaty");
        wm.set_floating(1, true, true);
        let start = geometry(&wm, 1);

        wm.handle_event(XEvent::ButtonPress { child: 1, button: 1, root_x: 100, root_y: 100 })
            .unwrap();
        wm.handle_event(XEvent::MotionNotify { root_x: 130, root_y: 80 }).unwrap();
        assert_eq!(
            geometry(&wm, 1),
            Rect::new(start.x + 30, start.y - 20, start.w, start.h)
        );

        wm.handle_event(XEvent::ButtonRelease).unwrap();
        assert_eq!(wm.cookie.get("floaty"), Some(geometry(&wm, 1)));
        assert!(wm.drag.is_none());
    }

    #[test]
    fn drag_resizes_with_button_three() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.set_floating(1, true, true);
        let start = geometry(&wm, 1);

        wm.handle_event(XEvent::ButtonPress { child: 1, button: 3, root_x: 500, root_y: 500 })
            .unwrap();
        wm.handle_event(XEvent::MotionNotify { root_x: 540, root_y: 525 }).unwrap();
        let g = geometry(&wm, 1);
        assert_eq!((g.w, g.h), (start.w + 40, start.h + 25));
        assert_eq!((g.x, g.y), (start.x, start.y));
    }

    #[test]
    fn drag_ignores_tiled_windows() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.handle_event(XEvent::ButtonPress { child: 1, button: 1, root_x: 10, root_y: 10 })
            .unwrap();
        assert!(wm.drag.is_none());
        let before = geometry(&wm, 1);
        wm.handle_event(XEvent::MotionNotify { root_x: 300, root_y: 300 }).unwrap();
        assert_eq!(geometry(&wm, 1), before);
    }

    #[test]
    fn remembered_geometry_wins_when_refloating() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        wm.conn.set_class(1, "floaty");
        wm.cookie.put("floaty", Rect::new(42, 24, 300, 200));
        wm.set_floating(1, true, false);
        assert_eq!(geometry(&wm, 1), Rect::new(42, 24, 300, 200));
    }

    #[test]
    fn client_list_follows_workspace_order() {
        let mut wm = manager();
        spawn(&mut wm, 1);
        spawn(&mut wm, 2);
        wm.move_window_to_workspace(1, 3);
        let calls = wm.conn.calls();
        let last_list = calls
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::SetClientList(list) => Some(list.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_list, vec![2, 1]);
    }

    #[test]
    fn run_stops_with_connection_lost_when_stream_ends() {
        let mut wm = manager();
        wm.conn.push_event(XEvent::MapNotify { window: 99 });
        let err = wm.run().unwrap_err();
        assert!(matches!(err, FatalError::ConnectionLost(_)));
    }
}

//! The x11rb-backed implementation of [`XConn`].
//!
//! Protocol errors on commands are swallowed here: the window in question is
//! usually gone already and a destroy/unmap notification will arrive to
//! reconcile the core's state. Queries degrade to `None`/defaults the same
//! way.

use anyhow::{anyhow, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent,
    ConfigWindow, ConfigureWindowAux, ConnectionExt, EventMask, GrabMode, InputFocus, MapState,
    ModMask, PropMode, StackMode, CLIENT_MESSAGE_EVENT,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;

use crate::config::keys::{LOCK, MOD2};
use crate::core::context::Context;
use crate::xconn::{
    ConfigureRequest, CursorKind, IcccmState, MessageKind, NetStateMode, Rect, SizeHints, Window,
    WindowKind, XConn, XEvent,
};

// WM_NORMAL_HINTS flag bits (ICCCM).
const P_POSITION: u32 = 1 << 2;
const P_SIZE: u32 = 1 << 3;
const P_MIN_SIZE: u32 = 1 << 4;
const P_BASE_SIZE: u32 = 1 << 8;

// Glyphs from the standard "cursor" font.
const XC_LEFT_PTR: u16 = 68;
const XC_FLEUR: u16 = 52;
const XC_SIZING: u16 = 120;

struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<u32>,
}

impl Keymap {
    fn keysym(&self, keycode: u8) -> u32 {
        let idx = (keycode.saturating_sub(self.min_keycode)) as usize
            * self.keysyms_per_keycode as usize;
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    fn keycodes(&self, keysym: u32) -> Vec<u8> {
        let per = self.keysyms_per_keycode as usize;
        if per == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(per)
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&keysym))
            .map(|(i, _)| self.min_keycode.wrapping_add(i as u8))
            .collect()
    }
}

struct Cursors {
    normal: u32,
    move_: u32,
    resize: u32,
}

pub struct XcbConn {
    ctx: Context,
    keymap: Keymap,
    cursors: Cursors,
}

impl XcbConn {
    pub fn new(ctx: Context) -> Result<Self> {
        let setup = ctx.conn.setup();
        let (min_keycode, max_keycode) = (setup.min_keycode, setup.max_keycode);
        let mapping = ctx
            .conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;
        let keymap = Keymap {
            min_keycode,
            keysyms_per_keycode: mapping.keysyms_per_keycode,
            keysyms: mapping.keysyms,
        };

        let font = ctx.conn.generate_id()?;
        ctx.conn.open_font(font, b"cursor")?;
        let glyph_cursor = |glyph: u16| -> Result<u32> {
            let cursor = ctx.conn.generate_id()?;
            ctx.conn.create_glyph_cursor(
                cursor,
                font,
                font,
                glyph,
                glyph + 1,
                0,
                0,
                0,
                u16::MAX,
                u16::MAX,
                u16::MAX,
            )?;
            Ok(cursor)
        };
        let cursors = Cursors {
            normal: glyph_cursor(XC_LEFT_PTR)?,
            move_: glyph_cursor(XC_FLEUR)?,
            resize: glyph_cursor(XC_SIZING)?,
        };

        let conn = Self { ctx, keymap, cursors };
        conn.define_cursor(CursorKind::Normal);
        Ok(conn)
    }

    fn atoms(&self) -> &crate::ewmh::atoms::AtomCollection {
        &self.ctx.atoms
    }

    fn window_type_atoms(&self, window: Window) -> Vec<u32> {
        self.ctx
            .conn
            .get_property(
                false,
                window,
                self.atoms()._NET_WM_WINDOW_TYPE,
                AtomEnum::ATOM,
                0,
                32,
            )
            .ok()
            .and_then(|c| c.reply().ok())
            .and_then(|prop| prop.value32().map(|it| it.collect()))
            .unwrap_or_default()
    }

    fn is_transient(&self, window: Window) -> bool {
        self.ctx
            .conn
            .get_property(
                false,
                window,
                self.atoms().WM_TRANSIENT_FOR,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .ok()
            .and_then(|c| c.reply().ok())
            .map_or(false, |prop| prop.value_len > 0)
    }

    fn read_command_property(&self) -> Option<String> {
        let prop = self
            .ctx
            .conn
            .get_property(
                true, // delete after reading; each message carries one command
                self.ctx.root_window,
                self.atoms()._DRIFTWM_COMMAND,
                self.atoms().UTF8_STRING,
                0,
                1024,
            )
            .ok()?
            .reply()
            .ok()?;
        if prop.value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&prop.value).into_owned())
    }

    fn translate(&self, event: Event) -> Option<XEvent> {
        match event {
            Event::ConfigureRequest(e) => Some(XEvent::ConfigureRequest(ConfigureRequest {
                window: e.window,
                x: e.x as i32,
                y: e.y as i32,
                w: e.width as u32,
                h: e.height as u32,
                border_width: e.border_width as u32,
                mask: u16::from(e.value_mask),
            })),
            Event::MapRequest(e) => Some(XEvent::MapRequest { window: e.window }),
            Event::MapNotify(e) => Some(XEvent::MapNotify { window: e.window }),
            Event::UnmapNotify(e) => Some(XEvent::UnmapNotify { window: e.window }),
            Event::DestroyNotify(e) => Some(XEvent::DestroyNotify { window: e.window }),
            Event::KeyPress(e) => {
                let modifiers = u16::from(e.state) & 0xff & !(LOCK | MOD2);
                Some(XEvent::KeyPress {
                    modifiers,
                    keysym: self.keymap.keysym(e.detail),
                })
            }
            Event::ButtonPress(e) => Some(XEvent::ButtonPress {
                child: e.child,
                button: e.detail,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
            }),
            Event::ButtonRelease(_) => Some(XEvent::ButtonRelease),
            Event::MotionNotify(e) => Some(XEvent::MotionNotify {
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
            }),
            Event::ClientMessage(e) => {
                if e.format != 32 {
                    return None;
                }
                let data = e.data.as_data32();
                if e.type_ == self.atoms()._DRIFTWM_COMMAND {
                    let command = self.read_command_property()?;
                    Some(XEvent::ClientMessage {
                        window: e.window,
                        kind: MessageKind::Command(command),
                    })
                } else if e.type_ == self.atoms()._NET_CURRENT_DESKTOP {
                    Some(XEvent::ClientMessage {
                        window: e.window,
                        kind: MessageKind::CurrentDesktop(data[0]),
                    })
                } else if e.type_ == self.atoms()._NET_WM_STATE {
                    let fullscreen = self.atoms()._NET_WM_STATE_FULLSCREEN;
                    if data[1] != fullscreen && data[2] != fullscreen {
                        return None;
                    }
                    let mode = match data[0] {
                        0 => NetStateMode::Remove,
                        1 => NetStateMode::Add,
                        _ => NetStateMode::Toggle,
                    };
                    Some(XEvent::ClientMessage {
                        window: e.window,
                        kind: MessageKind::FullscreenState(mode),
                    })
                } else {
                    None
                }
            }
            Event::Error(e) => {
                // Routine: the window vanished mid-call. State converges via
                // the notifications that follow.
                debug!("ignoring X protocol error: {e:?}");
                None
            }
            _ => None,
        }
    }
}

impl XConn for XcbConn {
    fn next_event(&mut self) -> Result<XEvent> {
        loop {
            let event = self
                .ctx
                .conn
                .wait_for_event()
                .map_err(|e| anyhow!("X connection error: {e}"))?;
            if let Some(translated) = self.translate(event) {
                return Ok(translated);
            }
        }
    }

    fn flush(&self) {
        let _ = self.ctx.conn.flush();
    }

    fn display_size(&self) -> (u32, u32) {
        (self.ctx.screen_width as u32, self.ctx.screen_height as u32)
    }

    fn configure_window(&self, req: &ConfigureRequest) {
        let has = |bit: ConfigWindow| req.mask & u16::from(bit) != 0;
        let mut aux = ConfigureWindowAux::new();
        if has(ConfigWindow::X) {
            aux = aux.x(req.x);
        }
        if has(ConfigWindow::Y) {
            aux = aux.y(req.y);
        }
        if has(ConfigWindow::WIDTH) {
            aux = aux.width(req.w);
        }
        if has(ConfigWindow::HEIGHT) {
            aux = aux.height(req.h);
        }
        if has(ConfigWindow::BORDER_WIDTH) {
            aux = aux.border_width(req.border_width);
        }
        let _ = self.ctx.conn.configure_window(req.window, &aux);
    }

    fn move_resize_window(&self, window: Window, rect: Rect) {
        let aux = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(rect.w)
            .height(rect.h);
        let _ = self.ctx.conn.configure_window(window, &aux);
    }

    fn map_window(&self, window: Window) {
        let _ = self.ctx.conn.map_window(window);
    }

    fn unmap_window(&self, window: Window) {
        let _ = self.ctx.conn.unmap_window(window);
    }

    fn raise_window(&self, window: Window) {
        let aux = ConfigureWindowAux::new().stack_mode(StackMode::ABOVE);
        let _ = self.ctx.conn.configure_window(window, &aux);
    }

    fn set_border(&self, window: Window, width: u32, color: u32) {
        let _ = self
            .ctx
            .conn
            .configure_window(window, &ConfigureWindowAux::new().border_width(width));
        let _ = self.ctx.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(color),
        );
    }

    fn define_cursor(&self, cursor: CursorKind) {
        let cursor = match cursor {
            CursorKind::Normal => self.cursors.normal,
            CursorKind::Move => self.cursors.move_,
            CursorKind::Resize => self.cursors.resize,
        };
        let _ = self.ctx.conn.change_window_attributes(
            self.ctx.root_window,
            &ChangeWindowAttributesAux::new().cursor(cursor),
        );
    }

    fn window_geometry(&self, window: Window) -> Option<Rect> {
        let geom = self.ctx.conn.get_geometry(window).ok()?.reply().ok()?;
        Some(Rect::new(
            geom.x as i32,
            geom.y as i32,
            geom.width as u32,
            geom.height as u32,
        ))
    }

    fn size_hints(&self, window: Window) -> SizeHints {
        let reply = self
            .ctx
            .conn
            .get_property(
                false,
                window,
                AtomEnum::WM_NORMAL_HINTS,
                AtomEnum::WM_SIZE_HINTS,
                0,
                18,
            )
            .ok()
            .and_then(|c| c.reply().ok());
        let Some(prop) = reply else {
            return SizeHints::default();
        };
        let Some(fields) = prop.value32().map(|it| it.collect::<Vec<_>>()) else {
            return SizeHints::default();
        };
        if fields.len() < 18 {
            return SizeHints::default();
        }

        let flags = fields[0];
        let mut hints = SizeHints::default();
        if flags & P_POSITION != 0 {
            hints.position = Some((fields[1] as i32, fields[2] as i32));
        }
        if flags & P_SIZE != 0 {
            hints.size = Some((fields[3], fields[4]));
        }
        if flags & P_MIN_SIZE != 0 {
            hints.min_size = Some((fields[5], fields[6]));
        }
        if flags & P_BASE_SIZE != 0 {
            hints.base_size = Some((fields[15], fields[16]));
        }
        hints
    }

    fn window_kind(&self, window: Window) -> WindowKind {
        let types = self.window_type_atoms(window);
        let atoms = self.atoms();
        if types.contains(&atoms._NET_WM_WINDOW_TYPE_DOCK) {
            WindowKind::Dock
        } else if types.contains(&atoms._NET_WM_WINDOW_TYPE_NOTIFICATION) {
            WindowKind::Notification
        } else if types.contains(&atoms._NET_WM_WINDOW_TYPE_SPLASH) {
            WindowKind::Splash
        } else if types.contains(&atoms._NET_WM_WINDOW_TYPE_UTILITY) {
            WindowKind::Utility
        } else if types.contains(&atoms._NET_WM_WINDOW_TYPE_DIALOG) || self.is_transient(window) {
            WindowKind::Dialog
        } else {
            WindowKind::Normal
        }
    }

    fn window_class(&self, window: Window) -> Option<String> {
        let prop = self
            .ctx
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)
            .ok()?
            .reply()
            .ok()?;
        // WM_CLASS holds two NUL-terminated strings: instance, then class.
        let mut parts = prop.value.split(|&b| b == 0);
        let _instance = parts.next()?;
        let class = parts.next()?;
        if class.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(class).into_owned())
    }

    fn has_fullscreen_hint(&self, window: Window) -> bool {
        self.ctx
            .conn
            .get_property(
                false,
                window,
                self.atoms()._NET_WM_STATE,
                AtomEnum::ATOM,
                0,
                32,
            )
            .ok()
            .and_then(|c| c.reply().ok())
            .and_then(|prop| {
                prop.value32()
                    .map(|mut it| it.any(|a| a == self.atoms()._NET_WM_STATE_FULLSCREEN))
            })
            .unwrap_or(false)
    }

    fn viewable_windows(&self) -> Vec<Window> {
        let Some(tree) = self
            .ctx
            .conn
            .query_tree(self.ctx.root_window)
            .ok()
            .and_then(|c| c.reply().ok())
        else {
            return Vec::new();
        };

        tree.children
            .into_iter()
            .filter(|&win| {
                self.ctx
                    .conn
                    .get_window_attributes(win)
                    .ok()
                    .and_then(|c| c.reply().ok())
                    .map_or(false, |attrs| {
                        !attrs.override_redirect && attrs.map_state == MapState::VIEWABLE
                    })
            })
            .collect()
    }

    fn set_icccm_state(&self, window: Window, state: IcccmState) {
        let value = match state {
            IcccmState::Withdrawn => 0,
            IcccmState::Normal => 1,
        };
        let _ = self.ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms().WM_STATE,
            self.atoms().WM_STATE,
            &[value, x11rb::NONE],
        );
    }

    fn set_net_fullscreen(&self, window: Window, fullscreen: bool) {
        let states: &[u32] = if fullscreen {
            &[self.atoms()._NET_WM_STATE_FULLSCREEN]
        } else {
            &[]
        };
        let _ = self.ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms()._NET_WM_STATE,
            AtomEnum::ATOM,
            states,
        );
    }

    fn set_active_window(&self, window: Window) {
        let _ = self.ctx.conn.change_property32(
            PropMode::REPLACE,
            self.ctx.root_window,
            self.atoms()._NET_ACTIVE_WINDOW,
            AtomEnum::WINDOW,
            &[window],
        );
        let _ = self
            .ctx
            .conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME);
    }

    fn clear_active_window(&self) {
        let _ = self
            .ctx
            .conn
            .delete_property(self.ctx.root_window, self.atoms()._NET_ACTIVE_WINDOW);
    }

    fn set_client_list(&self, windows: &[Window]) {
        let _ = self.ctx.conn.change_property32(
            PropMode::REPLACE,
            self.ctx.root_window,
            self.atoms()._NET_CLIENT_LIST,
            AtomEnum::WINDOW,
            windows,
        );
    }

    fn set_current_desktop(&self, index: u32) {
        let _ = self.ctx.conn.change_property32(
            PropMode::REPLACE,
            self.ctx.root_window,
            self.atoms()._NET_CURRENT_DESKTOP,
            AtomEnum::CARDINAL,
            &[index],
        );
    }

    fn supports_delete(&self, window: Window) -> bool {
        self.ctx
            .conn
            .get_property(
                false,
                window,
                self.atoms().WM_PROTOCOLS,
                AtomEnum::ATOM,
                0,
                32,
            )
            .ok()
            .and_then(|c| c.reply().ok())
            .and_then(|prop| {
                prop.value32()
                    .map(|mut it| it.any(|a| a == self.atoms().WM_DELETE_WINDOW))
            })
            .unwrap_or(false)
    }

    fn send_delete(&self, window: Window) {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_: self.atoms().WM_PROTOCOLS,
            data: ClientMessageData::from([
                self.atoms().WM_DELETE_WINDOW,
                x11rb::CURRENT_TIME,
                0,
                0,
                0,
            ]),
        };
        let _ = self
            .ctx
            .conn
            .send_event(false, window, EventMask::NO_EVENT, event);
    }

    fn kill_window(&self, window: Window) {
        let _ = self.ctx.conn.kill_client(window);
    }

    fn grab_keys(&self, keybinds: &[(u16, u32)]) {
        for &(modifiers, keysym) in keybinds {
            for keycode in self.keymap.keycodes(keysym) {
                // Also grab with Lock/NumLock held so the binds keep working.
                for extra in [0, LOCK, MOD2, LOCK | MOD2] {
                    let _ = self.ctx.conn.grab_key(
                        false,
                        self.ctx.root_window,
                        ModMask::from(modifiers | extra),
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    );
                }
            }
        }
    }

    fn ungrab_keys(&self) {
        let _ = self
            .ctx
            .conn
            .ungrab_key(0, self.ctx.root_window, ModMask::ANY);
    }

    fn grab_buttons(&self) {
        let _ = self.ctx.conn.grab_button(
            false,
            self.ctx.root_window,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            ButtonIndex::ANY,
            ModMask::M4,
        );
    }
}

//! A scripted, recording [`XConn`] for exercising the state machine in unit
//! tests without a display.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{bail, Result};

use super::{
    ConfigureRequest, CursorKind, IcccmState, Rect, SizeHints, Window, WindowKind, XConn, XEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Configure(Window),
    MoveResize(Window, Rect),
    Map(Window),
    Unmap(Window),
    Raise(Window),
    SetBorder(Window, u32, u32),
    DefineCursor(CursorKind),
    SetIcccmState(Window, IcccmState),
    SetNetFullscreen(Window, bool),
    SetActiveWindow(Window),
    ClearActiveWindow,
    SetClientList(Vec<Window>),
    SetCurrentDesktop(u32),
    SendDelete(Window),
    KillWindow(Window),
    GrabKeys(usize),
    UngrabKeys,
    GrabButtons,
}

pub struct MockXConn {
    screen: (u32, u32),
    events: RefCell<VecDeque<XEvent>>,
    calls: RefCell<Vec<Call>>,
    kinds: RefCell<HashMap<Window, WindowKind>>,
    classes: RefCell<HashMap<Window, String>>,
    hints: RefCell<HashMap<Window, SizeHints>>,
    geometries: RefCell<HashMap<Window, Rect>>,
    fullscreen_hints: RefCell<HashSet<Window>>,
    deletable: RefCell<HashSet<Window>>,
}

impl MockXConn {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: (width, height),
            events: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            kinds: RefCell::new(HashMap::new()),
            classes: RefCell::new(HashMap::new()),
            hints: RefCell::new(HashMap::new()),
            geometries: RefCell::new(HashMap::new()),
            fullscreen_hints: RefCell::new(HashSet::new()),
            deletable: RefCell::new(HashSet::new()),
        }
    }

    pub fn register_window(&self, window: Window, kind: WindowKind, geometry: Rect) {
        self.kinds.borrow_mut().insert(window, kind);
        self.geometries.borrow_mut().insert(window, geometry);
    }

    pub fn set_class(&self, window: Window, class: &str) {
        self.classes.borrow_mut().insert(window, class.to_string());
    }

    pub fn set_hints(&self, window: Window, hints: SizeHints) {
        self.hints.borrow_mut().insert(window, hints);
    }

    pub fn set_fullscreen_hint(&self, window: Window) {
        self.fullscreen_hints.borrow_mut().insert(window);
    }

    pub fn set_deletable(&self, window: Window) {
        self.deletable.borrow_mut().insert(window);
    }

    pub fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl XConn for MockXConn {
    fn next_event(&mut self) -> Result<XEvent> {
        match self.events.borrow_mut().pop_front() {
            Some(event) => Ok(event),
            None => bail!("scripted event stream exhausted"),
        }
    }

    fn flush(&self) {}

    fn display_size(&self) -> (u32, u32) {
        self.screen
    }

    fn configure_window(&self, req: &ConfigureRequest) {
        self.record(Call::Configure(req.window));
    }

    fn move_resize_window(&self, window: Window, rect: Rect) {
        self.geometries.borrow_mut().insert(window, rect);
        self.record(Call::MoveResize(window, rect));
    }

    fn map_window(&self, window: Window) {
        self.record(Call::Map(window));
    }

    fn unmap_window(&self, window: Window) {
        self.record(Call::Unmap(window));
    }

    fn raise_window(&self, window: Window) {
        self.record(Call::Raise(window));
    }

    fn set_border(&self, window: Window, width: u32, color: u32) {
        self.record(Call::SetBorder(window, width, color));
    }

    fn define_cursor(&self, cursor: CursorKind) {
        self.record(Call::DefineCursor(cursor));
    }

    fn window_geometry(&self, window: Window) -> Option<Rect> {
        self.geometries.borrow().get(&window).copied()
    }

    fn size_hints(&self, window: Window) -> SizeHints {
        self.hints.borrow().get(&window).copied().unwrap_or_default()
    }

    fn window_kind(&self, window: Window) -> WindowKind {
        self.kinds
            .borrow()
            .get(&window)
            .copied()
            .unwrap_or(WindowKind::Normal)
    }

    fn window_class(&self, window: Window) -> Option<String> {
        self.classes.borrow().get(&window).cloned()
    }

    fn has_fullscreen_hint(&self, window: Window) -> bool {
        self.fullscreen_hints.borrow().contains(&window)
    }

    fn viewable_windows(&self) -> Vec<Window> {
        Vec::new()
    }

    fn set_icccm_state(&self, window: Window, state: IcccmState) {
        self.record(Call::SetIcccmState(window, state));
    }

    fn set_net_fullscreen(&self, window: Window, fullscreen: bool) {
        self.record(Call::SetNetFullscreen(window, fullscreen));
    }

    fn set_active_window(&self, window: Window) {
        self.record(Call::SetActiveWindow(window));
    }

    fn clear_active_window(&self) {
        self.record(Call::ClearActiveWindow);
    }

    fn set_client_list(&self, windows: &[Window]) {
        self.record(Call::SetClientList(windows.to_vec()));
    }

    fn set_current_desktop(&self, index: u32) {
        self.record(Call::SetCurrentDesktop(index));
    }

    fn supports_delete(&self, window: Window) -> bool {
        self.deletable.borrow().contains(&window)
    }

    fn send_delete(&self, window: Window) {
        self.record(Call::SendDelete(window));
    }

    fn kill_window(&self, window: Window) {
        self.record(Call::KillWindow(window));
    }

    fn grab_keys(&self, keybinds: &[(u16, u32)]) {
        self.record(Call::GrabKeys(keybinds.len()));
    }

    fn ungrab_keys(&self) {
        self.record(Call::UngrabKeys);
    }

    fn grab_buttons(&self) {
        self.record(Call::GrabButtons);
    }
}

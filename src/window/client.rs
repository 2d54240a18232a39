use crate::xconn::{Rect, SizeHints, Window, XConn};

/// Fallback minimum when a window supplies no usable size hints.
pub const MIN_WINDOW_WIDTH: u32 = 50;
pub const MIN_WINDOW_HEIGHT: u32 = 50;

pub const DEFAULT_FLOATING_WIDTH: u32 = 800;
pub const DEFAULT_FLOATING_HEIGHT: u32 = 600;

/// One managed top-level window.
///
/// Owned by the manager's window→client arena; workspaces refer to it by
/// window id only. `workspace` is the index of the owning workspace and is
/// refreshed whenever the client moves.
#[derive(Debug, Clone)]
pub struct Client {
    pub window: Window,
    pub workspace: usize,
    pub geometry: Rect,
    pub border_width: u32,
    pub mapped: bool,
    pub floating: bool,
    pub fullscreen: bool,
    /// Geometry snapshot taken when entering fullscreen; restored on exit.
    pub saved_geometry: Option<Rect>,
    pub size_hints: SizeHints,
    /// Set when the manager itself unmaps this window, so the resulting
    /// unmap notification is not mistaken for the program withdrawing it.
    pub wm_unmap_pending: bool,
}

impl Client {
    pub fn new(window: Window, workspace: usize, geometry: Rect, size_hints: SizeHints) -> Self {
        Self {
            window,
            workspace,
            geometry,
            border_width: 0,
            mapped: false,
            floating: false,
            fullscreen: false,
            saved_geometry: None,
            size_hints,
            wm_unmap_pending: false,
        }
    }

    pub fn min_size(&self) -> (u32, u32) {
        match self.size_hints.min_size {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => (MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT),
        }
    }

    /// Moves and resizes the window, clamping width/height to the hinted
    /// minimums. The server is authoritative on the final geometry; this
    /// call never fails.
    pub fn move_resize<X: XConn>(&mut self, conn: &X, rect: Rect) {
        let (min_w, min_h) = self.min_size();
        let clamped = Rect::new(rect.x, rect.y, rect.w.max(min_w), rect.h.max(min_h));
        conn.move_resize_window(self.window, clamped);
        self.geometry = clamped;
    }

    pub fn map<X: XConn>(&mut self, conn: &X) {
        conn.map_window(self.window);
        self.mapped = true;
    }

    pub fn unmap<X: XConn>(&mut self, conn: &X) {
        if !self.mapped {
            return;
        }
        self.wm_unmap_pending = true;
        conn.unmap_window(self.window);
        self.mapped = false;
    }

    pub fn raise<X: XConn>(&self, conn: &X) {
        conn.raise_window(self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xconn::mock::MockXConn;

    fn client_with_hints(hints: SizeHints) -> Client {
        Client::new(1, 0, Rect::new(0, 0, 100, 100), hints)
    }

    #[test]
    fn move_resize_clamps_to_global_minimum_without_hints() {
        let conn = MockXConn::new(800, 600);
        let mut c = client_with_hints(SizeHints::default());
        c.move_resize(&conn, Rect::new(10, 10, 5, 5));
        assert_eq!(c.geometry, Rect::new(10, 10, MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT));
    }

    #[test]
    fn move_resize_clamps_to_hinted_minimum() {
        let conn = MockXConn::new(800, 600);
        let mut c = client_with_hints(SizeHints {
            min_size: Some((200, 150)),
            ..SizeHints::default()
        });
        c.move_resize(&conn, Rect::new(0, 0, 50, 50));
        assert_eq!(c.geometry, Rect::new(0, 0, 200, 150));
    }

    #[test]
    fn zero_min_hints_fall_back_to_global_minimum() {
        let conn = MockXConn::new(800, 600);
        let mut c = client_with_hints(SizeHints {
            min_size: Some((0, 0)),
            ..SizeHints::default()
        });
        c.move_resize(&conn, Rect::new(0, 0, 1, 1));
        assert_eq!(c.geometry.w, MIN_WINDOW_WIDTH);
        assert_eq!(c.geometry.h, MIN_WINDOW_HEIGHT);
    }

    #[test]
    fn unmap_marks_wm_request_and_skips_when_unmapped() {
        let conn = MockXConn::new(800, 600);
        let mut c = client_with_hints(SizeHints::default());
        c.map(&conn);
        c.unmap(&conn);
        assert!(c.wm_unmap_pending);
        assert!(!c.mapped);

        c.wm_unmap_pending = false;
        c.unmap(&conn);
        assert!(!c.wm_unmap_pending, "unmapping an unmapped client is a no-op");
    }
}

use crate::config::action::Direction;
use crate::window::layout::TilingDirection;
use crate::xconn::Window;

/// One virtual desktop: an ordered set of window ids plus the focus pointer
/// and layout state for that desktop. Client records themselves live in the
/// manager's arena; a workspace only tracks membership and order, which is
/// what assigns tiling slots.
///
/// Workspaces are created once at startup and never destroyed.
#[derive(Debug, Clone)]
pub struct Workspace {
    name: String,
    windows: Vec<Window>,
    focused: Option<Window>,
    direction: TilingDirection,
    fullscreen: bool,
}

impl Workspace {
    pub fn new(name: String) -> Self {
        Self {
            name,
            windows: Vec::new(),
            focused: None,
            direction: TilingDirection::Horizontal,
            fullscreen: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn contains(&self, window: Window) -> bool {
        self.windows.contains(&window)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Appends a window to the tiling order. Focus is left untouched.
    pub fn add(&mut self, window: Window) {
        if !self.contains(window) {
            self.windows.push(window);
        }
    }

    /// Removes a window; clears focus if it was the focused one. Removing a
    /// non-member is a silent no-op (duplicate destroy notifications are
    /// routine). Returns whether anything was removed.
    pub fn remove(&mut self, window: Window) -> bool {
        let before = self.windows.len();
        self.windows.retain(|&w| w != window);
        if self.focused == Some(window) {
            self.focused = None;
        }
        self.windows.len() != before
    }

    pub fn focused(&self) -> Option<Window> {
        self.focused
    }

    /// Points focus at `window`; no-op unless it is a member.
    pub fn set_focused(&mut self, window: Window) {
        if self.contains(window) {
            self.focused = Some(window);
        }
    }

    pub fn unset_focused(&mut self) {
        self.focused = None;
    }

    /// Moves focus to the ordinal neighbor: left/up select the predecessor,
    /// right/down the successor. No wrap-around; running off either end is a
    /// no-op. With nothing focused, the first window takes focus. Returns the
    /// new focus when it changed.
    pub fn navigate(&mut self, direction: Direction) -> Option<Window> {
        if self.windows.is_empty() {
            return None;
        }
        let current = match self.focused {
            Some(w) => w,
            None => {
                self.focused = Some(self.windows[0]);
                return self.focused;
            }
        };
        let idx = self.windows.iter().position(|&w| w == current)?;
        let next = match direction {
            Direction::Left | Direction::Up => idx.checked_sub(1)?,
            Direction::Right | Direction::Down => {
                if idx + 1 >= self.windows.len() {
                    return None;
                }
                idx + 1
            }
        };
        self.focused = Some(self.windows[next]);
        self.focused
    }

    pub fn direction(&self) -> TilingDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: TilingDirection) {
        self.direction = direction;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::new("1".to_string())
    }

    #[test]
    fn add_keeps_order_and_does_not_focus() {
        let mut ws = workspace();
        ws.add(10);
        ws.add(20);
        ws.add(10);
        assert_eq!(ws.windows(), &[10, 20]);
        assert_eq!(ws.focused(), None);
    }

    #[test]
    fn removing_focused_clears_focus() {
        let mut ws = workspace();
        ws.add(10);
        ws.add(20);
        ws.set_focused(10);
        assert!(ws.remove(10));
        assert_eq!(ws.focused(), None);
        assert_eq!(ws.windows(), &[20]);
    }

    #[test]
    fn removing_unfocused_keeps_focus() {
        let mut ws = workspace();
        ws.add(10);
        ws.add(20);
        ws.set_focused(20);
        ws.remove(10);
        assert_eq!(ws.focused(), Some(20));
    }

    #[test]
    fn remove_of_non_member_is_noop() {
        let mut ws = workspace();
        ws.add(10);
        assert!(!ws.remove(99));
        assert_eq!(ws.windows(), &[10]);
    }

    #[test]
    fn set_focused_rejects_non_member() {
        let mut ws = workspace();
        ws.add(10);
        ws.set_focused(99);
        assert_eq!(ws.focused(), None);
    }

    #[test]
    fn navigate_moves_along_sequence_without_wrapping() {
        let mut ws = workspace();
        ws.add(10);
        ws.add(20);
        ws.add(30);
        ws.set_focused(20);

        assert_eq!(ws.navigate(Direction::Right), Some(30));
        assert_eq!(ws.navigate(Direction::Down), None, "no wrap past the end");
        assert_eq!(ws.focused(), Some(30));

        assert_eq!(ws.navigate(Direction::Left), Some(20));
        assert_eq!(ws.navigate(Direction::Up), Some(10));
        assert_eq!(ws.navigate(Direction::Left), None, "no wrap past the start");
    }

    #[test]
    fn navigate_with_no_focus_selects_first() {
        let mut ws = workspace();
        ws.add(10);
        ws.add(20);
        assert_eq!(ws.navigate(Direction::Down), Some(10));
    }

    #[test]
    fn navigate_on_empty_workspace_is_noop() {
        let mut ws = workspace();
        assert_eq!(ws.navigate(Direction::Left), None);
    }
}

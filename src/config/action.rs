use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::window::layout::TilingDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// The user-triggered action vocabulary, shared by keybinds and the IPC
/// command channel. Workspace numbers are 1-based on the wire and in config,
/// 0-based once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(Direction),
    SetTilingDirection(TilingDirection),
    ToggleFloating,
    ToggleFullscreen,
    GotoWorkspace(usize),
    WorkspaceRelative(i64),
    MoveWindowToWorkspace(usize),
    Kill,
    Reload,
    Exit,
    Exec(String),
    DebugCrash,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (s, None),
        };

        let action = match name {
            "navigate_left" => Action::Navigate(Direction::Left),
            "navigate_right" => Action::Navigate(Direction::Right),
            "navigate_up" => Action::Navigate(Direction::Up),
            "navigate_down" => Action::Navigate(Direction::Down),
            "tile_horizontal" => Action::SetTilingDirection(TilingDirection::Horizontal),
            "tile_vertical" => Action::SetTilingDirection(TilingDirection::Vertical),
            "toggle_floating" => Action::ToggleFloating,
            "toggle_fullscreen" => Action::ToggleFullscreen,
            "goto_workspace" => Action::GotoWorkspace(parse_workspace(name, arg)?),
            "workspace" => {
                let arg = arg.ok_or_else(|| anyhow!("workspace requires an offset"))?;
                Action::WorkspaceRelative(arg.parse()?)
            }
            "move_to_workspace" => Action::MoveWindowToWorkspace(parse_workspace(name, arg)?),
            "kill" => Action::Kill,
            "reload" => Action::Reload,
            "exit" => Action::Exit,
            "exec" => {
                let arg = arg.ok_or_else(|| anyhow!("exec requires a command"))?;
                if arg.is_empty() {
                    bail!("exec requires a command");
                }
                Action::Exec(arg.to_string())
            }
            "debug_crash" => Action::DebugCrash,
            other => bail!("unknown action: {other}"),
        };
        Ok(action)
    }
}

fn parse_workspace(name: &str, arg: Option<&str>) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("{name} requires a workspace number"))?;
    let n: usize = arg.parse()?;
    if n == 0 {
        bail!("{name}: workspaces are numbered from 1");
    }
    Ok(n - 1)
}

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, CreateWindowAux, PropMode, WindowClass};
use x11rb::wrapper::ConnectionExt as _;

use crate::config::Config;
use crate::core::context::Context;

pub const WM_NAME: &str = "driftwm";

/// Publishes the root-window hints that let bars and pagers discover us:
/// the supporting-check window, the supported-atom list and the initial
/// desktop layout.
pub fn setup_hints(ctx: &Context, config: &Config) -> Result<()> {
    let check_win = ctx.conn.generate_id()?;
    ctx.conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        check_win,
        ctx.root_window,
        -1,
        -1,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        0,
        &CreateWindowAux::new(),
    )?;

    ctx.conn.change_property32(
        PropMode::REPLACE,
        check_win,
        ctx.atoms._NET_SUPPORTING_WM_CHECK,
        AtomEnum::WINDOW,
        &[check_win],
    )?;
    ctx.conn.change_property8(
        PropMode::REPLACE,
        check_win,
        ctx.atoms._NET_WM_NAME,
        ctx.atoms.UTF8_STRING,
        WM_NAME.as_bytes(),
    )?;
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_SUPPORTING_WM_CHECK,
        AtomEnum::WINDOW,
        &[check_win],
    )?;
    ctx.conn.change_property8(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_WM_NAME,
        ctx.atoms.UTF8_STRING,
        WM_NAME.as_bytes(),
    )?;

    let supported = [
        ctx.atoms._NET_SUPPORTED,
        ctx.atoms._NET_SUPPORTING_WM_CHECK,
        ctx.atoms._NET_WM_NAME,
        ctx.atoms._NET_CLIENT_LIST,
        ctx.atoms._NET_NUMBER_OF_DESKTOPS,
        ctx.atoms._NET_CURRENT_DESKTOP,
        ctx.atoms._NET_DESKTOP_VIEWPORT,
        ctx.atoms._NET_DESKTOP_NAMES,
        ctx.atoms._NET_ACTIVE_WINDOW,
        ctx.atoms._NET_WM_STATE,
        ctx.atoms._NET_WM_STATE_FULLSCREEN,
        ctx.atoms._NET_WM_WINDOW_TYPE,
        ctx.atoms._NET_WM_WINDOW_TYPE_NORMAL,
        ctx.atoms._NET_WM_WINDOW_TYPE_DOCK,
        ctx.atoms._NET_WM_WINDOW_TYPE_DIALOG,
        ctx.atoms._NET_WM_WINDOW_TYPE_SPLASH,
        ctx.atoms._NET_WM_WINDOW_TYPE_UTILITY,
        ctx.atoms._NET_WM_WINDOW_TYPE_NOTIFICATION,
    ];
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_SUPPORTED,
        AtomEnum::ATOM,
        &supported,
    )?;

    // Start with an empty client list; it is rebuilt as windows are managed.
    ctx.conn
        .delete_property(ctx.root_window, ctx.atoms._NET_CLIENT_LIST)?;

    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_NUMBER_OF_DESKTOPS,
        AtomEnum::CARDINAL,
        &[config.workspace_count as u32],
    )?;
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_CURRENT_DESKTOP,
        AtomEnum::CARDINAL,
        &[0],
    )?;
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_DESKTOP_VIEWPORT,
        AtomEnum::CARDINAL,
        &[0, 0],
    )?;

    // NUL-separated UTF-8 list, one name per desktop.
    let mut names = Vec::new();
    for name in config.workspace_names() {
        names.extend_from_slice(name.as_bytes());
        names.push(0);
    }
    ctx.conn.change_property8(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_DESKTOP_NAMES,
        ctx.atoms.UTF8_STRING,
        &names,
    )?;

    Ok(())
}

mod config;
mod core;
mod ewmh;
mod ipc;
mod util;
mod window;
mod xconn;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::context::Context;
use crate::core::cookie::Cookie;
use crate::window::manager::WindowManager;
use crate::xconn::xcb::XcbConn;

#[derive(Debug, Parser)]
#[command(name = "driftwm", version, about = "A dynamic tiling X11 window manager")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Keeps Java AWT programs from drawing blank windows under a
    // non-reparenting window manager.
    std::env::set_var("_JAVA_AWT_WM_NONREPARENTING", "1");

    let config = Config::load(args.config.as_deref())?;
    let ctx = Context::new()?;
    ewmh::setup::setup_hints(&ctx, &config)?;

    let conn = XcbConn::new(ctx)?;
    let cookie = Cookie::load(Cookie::default_path());

    let mut wm = WindowManager::new(conn, config, args.config, cookie);
    wm.startup();
    info!("driftwm {} up", env!("CARGO_PKG_VERSION"));
    wm.run()?;
    info!("shutting down");
    Ok(())
}

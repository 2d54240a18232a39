use thiserror::Error;

/// The only failures the window manager treats as real. Everything else —
/// events for untracked windows, duplicate notifications, actions with no
/// focused client — is an expected steady-state condition and a silent no-op.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to connect to the X server: {0}")]
    Connect(#[source] anyhow::Error),

    #[error("another window manager is already running")]
    WmDetected,

    #[error("lost the X server connection: {0}")]
    ConnectionLost(#[source] anyhow::Error),

    /// Deliberate crash requested through the debug_crash action.
    #[error("debug crash on demand")]
    DebugCrash,
}

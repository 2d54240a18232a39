use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Fire-and-forget command execution through the shell. Nothing is awaited
/// and no result is observed; a detached thread reaps the child so it does
/// not linger as a zombie.
pub fn spawn(command: &str) {
    let spawned = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(mut child) => {
            debug!(command, pid = child.id(), "spawned command");
            std::thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(e) => warn!(command, "failed to spawn command: {e}"),
    }
}

pub fn notify(message: &str) {
    spawn(&format!("notify-send driftwm \"{message}\""));
}

//! External plot viewer
//!
//! The viewer is a separate program given the log path as its last
//! argument. It runs alongside the calibration and is never waited on.

use std::path::Path;
use std::process::{Child, Command};

use log::{info, warn};

/// Build the viewer command line, or `None` for an empty command
pub fn command_for(command: &str, log_path: &Path) -> Option<Command> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    let mut cmd = Command::new(program);
    cmd.args(parts).arg(log_path);
    Some(cmd)
}

/// Start the viewer; a failure only warns
pub fn launch(command: &str, log_path: &Path) -> Option<Child> {
    let Some(mut cmd) = command_for(command, log_path) else {
        warn!("Empty plot command, not starting a viewer");
        return None;
    };
    match cmd.spawn() {
        Ok(child) => {
            info!("Plot viewer started (pid {})", child.id());
            Some(child)
        }
        Err(err) => {
            warn!("Could not start plot viewer `{}`: {}", command, err);
            None
        }
    }
}

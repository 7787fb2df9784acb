// src/platform/command.rs
//! Bounded external-command execution.
//!
//! The Linux and macOS strategies talk to the OS through small external
//! tools (`xclip`, `xdotool`, `pbpaste`, `osascript`, `pkill`, `killall`).
//! Every invocation is wrapped in a short timeout so a wedged tool cannot
//! stall the monitor loop.

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::platform::PlatformError;

/// Run a command, capturing output, killing it if it outlives `limit`.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    limit: Duration,
) -> Result<Output, PlatformError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PlatformError::Command {
            command: program.to_string(),
            source,
        })?;

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(PlatformError::Command {
            command: program.to_string(),
            source,
        }),
        // kill_on_drop reaps the child when the future is dropped here.
        Err(_) => Err(PlatformError::Timeout(program.to_string(), limit)),
    }
}

/// Run a command purely for its side effect, swallowing every failure.
/// Used for process kills where absence of the target is not an error.
pub async fn run_best_effort(program: &str, args: &[&str], limit: Duration) {
    if let Err(e) = run_with_timeout(program, args, limit).await {
        debug!("best-effort command `{program}` did not complete: {e}");
    }
}

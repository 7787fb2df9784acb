// src/platform/macos.rs
//! macOS strategy: `pbpaste` probe, System Events frontmost-app query via
//! `osascript`, and a pasteboard-server restart for remediation.

use std::time::Duration;

use async_trait::async_trait;

use crate::platform::command::{run_best_effort, run_with_timeout};
use crate::platform::{PlatformError, Strategy};

const FRONTMOST_APP_SCRIPT: &str =
    r#"tell application "System Events" to get name of first application process whose frontmost is true"#;

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(2);
const KILL_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct MacosStrategy;

impl MacosStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for MacosStrategy {
    fn label(&self) -> &'static str {
        "macOS"
    }

    async fn probe(&self) -> Result<bool, PlatformError> {
        // As on Linux, only a spawn failure or timeout counts as blocked;
        // pbpaste's exit status is not consulted.
        match run_with_timeout("pbpaste", &[], PROBE_TIMEOUT).await {
            Ok(_) => Ok(true),
            Err(PlatformError::Timeout(..)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn foreground_app(&self) -> Option<String> {
        run_with_timeout("osascript", &["-e", FRONTMOST_APP_SCRIPT], SCRIPT_TIMEOUT)
            .await
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .filter(|name| !name.is_empty())
    }

    async fn remediate(&self) -> Result<(), PlatformError> {
        // launchd restarts pboard automatically; the pause gives it time.
        run_best_effort("killall", &["pboard"], KILL_TIMEOUT).await;
        tokio::time::sleep(SETTLE).await;
        Ok(())
    }
}

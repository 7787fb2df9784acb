// src/platform/mod.rs
//! Platform strategies.
//!
//! Each supported operating system gets one small, independent strategy
//! implementing the same capability surface: probe clipboard access,
//! identify the foreground process, and attempt remediation. The branches
//! share no algorithms or state; they are thin wrappers over OS tooling,
//! selected once at startup.

pub mod command;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "windows")]
pub mod windows;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by platform primitives. The monitor loop decides what
/// each class means; strategies only report what happened.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unsupported operating system: {0}")]
    Unsupported(String),

    #[error("clipboard API call failed: {0}")]
    Clipboard(String),

    #[error("external command `{command}` failed: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("external command `{0}` timed out after {1:.0?}")]
    Timeout(String, Duration),

    #[error("registry update failed: {0}")]
    Registry(String),
}

/// Capability surface of one platform branch.
#[async_trait]
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Human-readable platform name for logs and the startup banner.
    fn label(&self) -> &'static str;

    /// One-time setup at service start (e.g. persisting the Windows
    /// clipboard-history registry flag). Failures are non-fatal.
    async fn prepare(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Test whether clipboard access currently works. `Ok(false)` is a
    /// definite block; `Err` is an ambiguous failure the loop also treats
    /// as blocked.
    async fn probe(&self) -> Result<bool, PlatformError>;

    /// Name of the current foreground process, or `None` when lookup fails.
    async fn foreground_app(&self) -> Option<String>;

    /// Best-effort attempt to restore clipboard access.
    async fn remediate(&self) -> Result<(), PlatformError>;
}

/// Select the strategy for the host operating system.
pub fn detect() -> Result<Box<dyn Strategy>, PlatformError> {
    strategy_for(std::env::consts::OS)
}

/// Map an OS identifier to its strategy. Factored out of [`detect`] so the
/// unsupported branch stays testable.
pub fn strategy_for(os: &str) -> Result<Box<dyn Strategy>, PlatformError> {
    match os {
        #[cfg(target_os = "linux")]
        "linux" => Ok(Box::new(linux::LinuxStrategy::new())),
        #[cfg(target_os = "macos")]
        "macos" => Ok(Box::new(macos::MacosStrategy::new())),
        #[cfg(target_os = "windows")]
        "windows" => Ok(Box::new(windows::WindowsStrategy::new())),
        other => Err(PlatformError::Unsupported(other.to_string())),
    }
}

/// Resolve a PID to its executable file name.
#[cfg(any(target_os = "linux", target_os = "windows", test))]
pub(crate) fn process_name_for_pid(pid: u32) -> Option<String> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|p| p.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

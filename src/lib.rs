// src/lib.rs
//! Clipboard Sentinel Library
//!
//! This library provides a small, platform-dispatched watchdog that detects
//! when another application interferes with clipboard copy/paste and makes a
//! best-effort attempt to restore clipboard access.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod core;
pub mod platform;

pub use crate::core::monitor::{BlockEvent, BlockListener, ClipboardMonitor, MonitorConfig};
pub use crate::core::session::{SessionReport, SessionState};
pub use crate::platform::{PlatformError, Strategy};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::core::monitor::{
        BlockEvent, BlockListener, ClipboardMonitor, MonitorConfig, RemediationEvent,
    };
    pub use crate::core::session::{SessionReport, SessionState};
    pub use crate::platform::{detect, PlatformError, Strategy};
}

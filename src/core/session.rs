// src/core/session.rs
//! Session state shared between the control path and the monitor task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

/// Mutable state for one run of the service.
///
/// The running flag is the cooperative cancellation point checked by the
/// monitor loop; `stop()` clears it and wakes any task parked on
/// [`SessionState::cancelled`]. The blocked-app ledger is append-only,
/// deduplicated, and keeps first-observed order for the final report.
pub struct SessionState {
    running: AtomicBool,
    blocked_apps: Mutex<Vec<String>>,
    shutdown: Notify,
    started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            blocked_apps: Mutex::new(Vec::new()),
            shutdown: Notify::new(),
            started_at: Utc::now(),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake anything parked on [`Self::cancelled`].
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Resolves once the session has been stopped.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.shutdown.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent stop() is
            // never missed between the check and the await.
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    /// Record a blocking application. Returns `true` the first time a given
    /// name is seen this session.
    pub fn record_blocked(&self, app: &str) -> bool {
        let mut apps = self.blocked_apps.lock().unwrap();
        if apps.iter().any(|a| a == app) {
            false
        } else {
            apps.push(app.to_string());
            true
        }
    }

    pub fn blocked_apps(&self) -> Vec<String> {
        self.blocked_apps.lock().unwrap().clone()
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            started_at: self.started_at,
            stopped_at: Utc::now(),
            blocked_apps: self.blocked_apps(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// End-of-session summary of every distinct blocking application observed,
/// in first-observed order.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub blocked_apps: Vec<String>,
}

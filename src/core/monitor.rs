// src/core/monitor.rs
//! The clipboard monitor loop.
//!
//! One cycle is strictly sequential: probe, identify the foreground app,
//! wait out the grace period, remediate. The loop never overlaps cycles and
//! never retries a failed remediation; resilience of the polling cadence is
//! preferred over correctness signaling. Error policy is deliberate and
//! lives here, not in the platform strategies:
//!
//! - a probe error counts as "blocked" (fail-safe default),
//! - an identification failure yields an unknown app and the cycle proceeds,
//! - a remediation failure is logged as a warning and the loop continues.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::session::SessionState;
use crate::platform::Strategy;

/// Tuning knobs for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between clipboard probes.
    pub poll_interval: Duration,
    /// Delay between detecting a block and attempting remediation, allowing
    /// transient conditions to clear. Not skippable.
    pub grace_period: Duration,
    /// Minimum spacing between two probes; a cycle that comes due earlier is
    /// skipped. With the defaults this never fires, it only guards against a
    /// misconfigured interval shorter than the throttle.
    pub probe_throttle: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::with_interval(Duration::from_secs(3))
    }
}

impl MonitorConfig {
    /// Use one interval for polling, grace, and throttle, the way the
    /// service is normally run.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            poll_interval: interval,
            grace_period: interval,
            probe_throttle: interval,
        }
    }
}

/// A clipboard-block detection.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEvent {
    pub timestamp: DateTime<Utc>,
    /// Foreground process at detection time, when identification succeeded.
    /// Correlation only, not proven causation.
    pub app: Option<String>,
    /// True the first time this app name is seen in the session.
    pub first_sighting: bool,
}

/// Outcome of one remediation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RemediationEvent {
    pub timestamp: DateTime<Utc>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Listener for monitor events, e.g. console or file loggers.
pub trait BlockListener: Send + Sync {
    fn on_monitoring_started(&mut self) {}
    fn on_block_detected(&mut self, event: &BlockEvent);
    fn on_remediation(&mut self, event: &RemediationEvent);
}

/// The monitor loop itself. Owns the platform strategy and runs as a single
/// background task until the session is stopped.
pub struct ClipboardMonitor {
    strategy: Box<dyn Strategy>,
    session: Arc<SessionState>,
    config: MonitorConfig,
    listeners: Vec<Box<dyn BlockListener>>,
}

impl ClipboardMonitor {
    pub fn new(
        strategy: Box<dyn Strategy>,
        session: Arc<SessionState>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            strategy,
            session,
            config,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<T: BlockListener + 'static>(&mut self, listener: T) {
        self.listeners.push(Box::new(listener));
    }

    /// Run until the session is stopped.
    pub async fn run(mut self) {
        info!(
            "🔍 Monitoring clipboard access every {:.0?} on {}",
            self.config.poll_interval,
            self.strategy.label()
        );
        for listener in &mut self.listeners {
            listener.on_monitoring_started();
        }

        let mut last_probe: Option<Instant> = None;
        while self.session.is_running() {
            if !self.pause(self.config.poll_interval).await {
                break;
            }

            if let Some(at) = last_probe {
                if at.elapsed() < self.config.probe_throttle {
                    continue;
                }
            }
            last_probe = Some(Instant::now());

            let usable = match self.strategy.probe().await {
                Ok(usable) => usable,
                Err(e) => {
                    debug!("probe failed, treating clipboard as blocked: {e}");
                    false
                }
            };
            if usable {
                continue;
            }

            // Exactly one identification attempt per blocked probe, whether
            // or not it yields a name.
            let app = self.strategy.foreground_app().await;
            let first_sighting = match app.as_deref() {
                Some(name) => self.session.record_blocked(name),
                None => {
                    debug!("foreground app identification failed, recording unknown blocker");
                    false
                }
            };
            let event = BlockEvent {
                timestamp: Utc::now(),
                app,
                first_sighting,
            };
            for listener in &mut self.listeners {
                listener.on_block_detected(&event);
            }

            info!(
                "⏳ Waiting {:.0?} before re-enabling clipboard...",
                self.config.grace_period
            );
            if !self.pause(self.config.grace_period).await {
                break;
            }

            let outcome = self.strategy.remediate().await;
            let event = RemediationEvent {
                timestamp: Utc::now(),
                succeeded: outcome.is_ok(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            };
            match &outcome {
                Ok(()) => info!("✓ Clipboard access restored"),
                Err(e) => warn!("⚠ Remediation attempt failed, will retry on next detection: {e}"),
            }
            for listener in &mut self.listeners {
                listener.on_remediation(&event);
            }
        }

        debug!("monitor loop stopped");
    }

    /// Cancellation-aware sleep. Returns `false` when the session was
    /// stopped before or during the wait.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.session.is_running(),
            _ = self.session.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted strategy: pops one probe outcome per cycle (usable once the
    /// script runs out) and records what the loop asked of it.
    #[derive(Clone, Debug, Default)]
    struct FakeStrategy(Arc<FakeInner>);

    #[derive(Debug, Default)]
    struct FakeInner {
        // None = probe error, Some(usable) = probe result
        probes: Mutex<VecDeque<Option<bool>>>,
        app: Mutex<Option<String>>,
        identifications: AtomicUsize,
        blocked_at: Mutex<Vec<Instant>>,
        remediations: Mutex<Vec<Instant>>,
    }

    impl FakeStrategy {
        fn scripted(probes: &[Option<bool>], app: Option<&str>) -> Self {
            let fake = Self::default();
            *fake.0.probes.lock().unwrap() = probes.iter().copied().collect();
            *fake.0.app.lock().unwrap() = app.map(str::to_string);
            fake
        }
    }

    #[async_trait]
    impl Strategy for FakeStrategy {
        fn label(&self) -> &'static str {
            "fake"
        }

        async fn probe(&self) -> Result<bool, PlatformError> {
            let next = self.0.probes.lock().unwrap().pop_front();
            match next {
                Some(Some(usable)) => {
                    if !usable {
                        self.0.blocked_at.lock().unwrap().push(Instant::now());
                    }
                    Ok(usable)
                }
                Some(None) => {
                    self.0.blocked_at.lock().unwrap().push(Instant::now());
                    Err(PlatformError::Clipboard("injected probe fault".into()))
                }
                None => Ok(true),
            }
        }

        async fn foreground_app(&self) -> Option<String> {
            self.0.identifications.fetch_add(1, Ordering::SeqCst);
            self.0.app.lock().unwrap().clone()
        }

        async fn remediate(&self) -> Result<(), PlatformError> {
            self.0.remediations.lock().unwrap().push(Instant::now());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingListener {
        blocks: Arc<Mutex<Vec<BlockEvent>>>,
        remediations: Arc<Mutex<Vec<RemediationEvent>>>,
    }

    impl BlockListener for RecordingListener {
        fn on_block_detected(&mut self, event: &BlockEvent) {
            self.blocks.lock().unwrap().push(event.clone());
        }

        fn on_remediation(&mut self, event: &RemediationEvent) {
            self.remediations.lock().unwrap().push(event.clone());
        }
    }

    const TICK: Duration = Duration::from_millis(25);

    async fn drive(
        fake: FakeStrategy,
        listener: RecordingListener,
        cycles: u32,
    ) -> Arc<SessionState> {
        let session = Arc::new(SessionState::new());
        session.start();
        let mut monitor =
            ClipboardMonitor::new(Box::new(fake), session.clone(), MonitorConfig::with_interval(TICK));
        monitor.add_listener(listener);
        let handle = tokio::spawn(monitor.run());

        // A blocked cycle costs poll + grace; allow that much per cycle
        // plus slack for scheduling.
        tokio::time::sleep(TICK * 2 * cycles + Duration::from_millis(150)).await;
        session.stop();
        handle.await.unwrap();
        session
    }

    #[tokio::test]
    async fn one_blocked_probe_means_one_identification_and_one_remediation() {
        let fake = FakeStrategy::scripted(&[Some(false)], Some("sneaky.exe"));
        let session = drive(fake.clone(), RecordingListener::default(), 2).await;

        assert_eq!(fake.0.identifications.load(Ordering::SeqCst), 1);
        assert_eq!(fake.0.remediations.lock().unwrap().len(), 1);
        assert_eq!(session.blocked_apps(), vec!["sneaky.exe".to_string()]);
    }

    #[tokio::test]
    async fn successful_probe_never_records_or_remediates() {
        let fake = FakeStrategy::scripted(&[Some(true), Some(true), Some(true)], Some("innocent"));
        let listener = RecordingListener::default();
        let session = drive(fake.clone(), listener.clone(), 3).await;

        assert_eq!(fake.0.identifications.load(Ordering::SeqCst), 0);
        assert!(fake.0.remediations.lock().unwrap().is_empty());
        assert!(session.blocked_apps().is_empty());
        assert!(listener.blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_blocking_remediates_each_time_but_announces_once() {
        let fake = FakeStrategy::scripted(&[Some(false), Some(false)], Some("sneaky.exe"));
        let listener = RecordingListener::default();
        let session = drive(fake.clone(), listener.clone(), 2).await;

        assert_eq!(session.blocked_apps(), vec!["sneaky.exe".to_string()]);
        assert_eq!(fake.0.remediations.lock().unwrap().len(), 2);

        let sightings: Vec<bool> = listener
            .blocks
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.first_sighting)
            .collect();
        assert_eq!(sightings, vec![true, false]);
    }

    #[tokio::test]
    async fn probe_error_is_treated_as_blocked() {
        let fake = FakeStrategy::scripted(&[None], Some("crashy"));
        let session = drive(fake.clone(), RecordingListener::default(), 2).await;

        assert_eq!(fake.0.identifications.load(Ordering::SeqCst), 1);
        assert_eq!(fake.0.remediations.lock().unwrap().len(), 1);
        assert_eq!(session.blocked_apps(), vec!["crashy".to_string()]);
    }

    #[tokio::test]
    async fn unknown_foreground_app_still_remediates() {
        let fake = FakeStrategy::scripted(&[Some(false)], None);
        let listener = RecordingListener::default();
        let session = drive(fake.clone(), listener.clone(), 2).await;

        assert_eq!(fake.0.identifications.load(Ordering::SeqCst), 1);
        assert_eq!(fake.0.remediations.lock().unwrap().len(), 1);
        assert!(session.blocked_apps().is_empty());

        let blocks = listener.blocks.lock().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].app, None);
        assert!(!blocks[0].first_sighting);
    }

    #[tokio::test]
    async fn grace_period_separates_detection_from_remediation() {
        let fake = FakeStrategy::scripted(&[Some(false)], Some("sneaky.exe"));
        drive(fake.clone(), RecordingListener::default(), 2).await;

        let blocked_at = fake.0.blocked_at.lock().unwrap()[0];
        let remediated_at = fake.0.remediations.lock().unwrap()[0];
        let waited = remediated_at.duration_since(blocked_at);
        assert!(waited >= TICK, "remediation ran before the grace period: {waited:?}");
        assert!(
            waited < TICK * 4,
            "remediation drifted far past the grace period: {waited:?}"
        );
    }

    #[tokio::test]
    async fn stop_during_grace_skips_remediation_but_keeps_ledger() {
        let fake = FakeStrategy::scripted(&[Some(false)], Some("sneaky.exe"));
        let session = Arc::new(SessionState::new());
        session.start();
        let mut monitor = ClipboardMonitor::new(
            Box::new(fake.clone()),
            session.clone(),
            MonitorConfig {
                poll_interval: TICK,
                grace_period: Duration::from_secs(30),
                probe_throttle: TICK,
            },
        );
        monitor.add_listener(RecordingListener::default());
        let handle = tokio::spawn(monitor.run());

        // Let the blocked probe land, then stop while the loop is parked in
        // the long grace wait.
        tokio::time::sleep(TICK * 4).await;
        session.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit from inside the grace wait")
            .unwrap();

        assert!(fake.0.remediations.lock().unwrap().is_empty());
        assert_eq!(session.report().blocked_apps, vec!["sneaky.exe".to_string()]);
    }

    #[tokio::test]
    async fn stopped_session_keeps_every_app_once_in_order() {
        let fake = FakeStrategy::scripted(&[Some(false), Some(true), Some(false)], Some("first"));
        // Swap the foreground app between detections.
        let session = Arc::new(SessionState::new());
        session.start();
        let mut monitor = ClipboardMonitor::new(
            Box::new(fake.clone()),
            session.clone(),
            MonitorConfig::with_interval(TICK),
        );
        monitor.add_listener(RecordingListener::default());
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(TICK * 3).await;
        *fake.0.app.lock().unwrap() = Some("second".to_string());
        tokio::time::sleep(TICK * 8 + Duration::from_millis(150)).await;
        session.stop();
        handle.await.unwrap();

        let report = session.report();
        assert_eq!(
            report.blocked_apps,
            vec!["first".to_string(), "second".to_string()]
        );
    }
}

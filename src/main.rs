// src/main.rs
//! Clipboard Sentinel
//!
//! A small watchdog service that detects applications interfering with
//! clipboard copy/paste and makes best-effort attempts to restore access.
//! Runs until interrupted, then reports every distinct offender it saw.

#![deny(unsafe_op_in_unsafe_fn)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use clipboard_sentinel::core::monitor::{
    BlockEvent, BlockListener, ClipboardMonitor, MonitorConfig, RemediationEvent,
};
use clipboard_sentinel::core::session::SessionState;
use clipboard_sentinel::platform::{self, PlatformError, Strategy};

/// Command line interface for the clipboard protection service.
///
/// Running with no arguments monitors with the stock 3-second cadence until
/// Ctrl+C; the flags below only tune output and timing.
#[derive(Debug, Parser)]
#[command(
    name = "clip-sentinel",
    about = "Detects clipboard blocking and auto re-enables copy/paste",
    long_about = "Periodically probes clipboard access on the host platform. When access is lost, \
                  the foreground application is recorded, a short grace period is observed, and a \
                  platform-specific remediation is attempted. Runs until interrupted."
)]
struct Args {
    /// Seconds between clipboard probes; also the grace period before
    /// remediation
    #[arg(long, default_value_t = 3)]
    interval: u64,

    /// Output format for detection events and the final summary
    #[arg(long, default_value = "human", value_enum)]
    format: OutputFormat,

    /// Verbosity level for logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable status lines
    Human,
    /// One JSON object per event for programmatic processing
    Json,
}

/// Console logger for monitor events, in the format the user asked for.
struct ConsoleEventLogger {
    format: OutputFormat,
}

impl ConsoleEventLogger {
    fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl BlockListener for ConsoleEventLogger {
    fn on_monitoring_started(&mut self) {
        if let OutputFormat::Json = self.format {
            let event = serde_json::json!({
                "event": "monitoring_started",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            println!("{}", serde_json::to_string(&event).unwrap());
        }
    }

    fn on_block_detected(&mut self, event: &BlockEvent) {
        match self.format {
            OutputFormat::Human => {
                // Each offender is announced once; repeat detections only
                // show up through the remediation lines.
                if event.first_sighting {
                    if let Some(app) = &event.app {
                        println!("\n⚠ Detected clipboard blocking by: {app}");
                    }
                }
            }
            OutputFormat::Json => {
                let json_event = serde_json::json!({
                    "event": "block_detected",
                    "timestamp": event.timestamp.to_rfc3339(),
                    "app": event.app,
                    "first_sighting": event.first_sighting,
                });
                println!("{}", serde_json::to_string(&json_event).unwrap());
            }
        }
    }

    fn on_remediation(&mut self, event: &RemediationEvent) {
        match self.format {
            OutputFormat::Human => {
                if event.succeeded {
                    println!("✓ Ctrl+C and Ctrl+V re-enabled despite blocking attempt!");
                } else {
                    println!("⚠ Clipboard still blocked, will retry...");
                }
            }
            OutputFormat::Json => {
                let json_event = serde_json::json!({
                    "event": "remediation",
                    "timestamp": event.timestamp.to_rfc3339(),
                    "succeeded": event.succeeded,
                    "error": event.error,
                });
                println!("{}", serde_json::to_string(&json_event).unwrap());
            }
        }
    }
}

fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(args.verbose > 1)
        .init();

    Ok(())
}

fn print_banner(platform_label: &str, interval: u64) {
    println!("\n{}", "=".repeat(60));
    println!("  CLIPBOARD PROTECTION SERVICE");
    println!("  Detects & Auto Re-enables Ctrl+C / Ctrl+V");
    println!("{}", "=".repeat(60));
    println!("Operating System: {platform_label}");
    println!("Re-enable Interval: {interval} seconds\n");
    println!("✓ Monitoring for clipboard blocking");
    println!("✓ Press Ctrl+C in this terminal to stop\n");
}

fn print_summary(session: &SessionState, format: &OutputFormat) {
    let report = session.report();
    match format {
        OutputFormat::Human => {
            println!("\n\n{}", "=".repeat(60));
            println!("Clipboard Protection Service Stopped");
            println!("{}", "=".repeat(60));
            if !report.blocked_apps.is_empty() {
                println!("Detected blocking by: {}", report.blocked_apps.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&report).unwrap());
        }
    }
}

fn print_troubleshooting_hints() {
    eprintln!("\nTroubleshooting:");
    eprintln!("- Linux: install the window tooling (sudo apt install xdotool xclip)");
    eprintln!("- macOS: grant accessibility permission in System Settings → Privacy & Security");
    eprintln!("- Windows: run from an unelevated interactive session");
    eprintln!("\nMay require administrator/root permissions.");
}

/// Run the monitor until Ctrl+C, then print the session summary.
async fn run(args: Args, strategy: Box<dyn Strategy>) -> Result<()> {
    let start_time = Instant::now();
    let session = Arc::new(SessionState::new());
    session.start();

    // One-time platform setup; failure is a note, not a stop.
    if let Err(e) = strategy.prepare().await {
        warn!("platform preparation incomplete: {e}");
    }

    let config = MonitorConfig::with_interval(Duration::from_secs(args.interval.max(1)));
    let mut monitor = ClipboardMonitor::new(strategy, session.clone(), config);
    monitor.add_listener(ConsoleEventLogger::new(args.format.clone()));
    let monitor_task = tokio::spawn(monitor.run());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the interrupt signal")?;

    session.stop();
    // The loop exits at its next suspension point; don't hold the user
    // hostage if a platform call is mid-flight.
    let _ = tokio::time::timeout(Duration::from_secs(2), monitor_task).await;

    print_summary(&session, &args.format);
    info!(
        "📊 Session completed. Runtime: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = setup_logging(&args) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let strategy = match platform::detect() {
        Ok(strategy) => strategy,
        Err(PlatformError::Unsupported(os)) => {
            eprintln!("❌ Unsupported operating system: {os}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("❌ Error: {e}");
            print_troubleshooting_hints();
            std::process::exit(1);
        }
    };

    if matches!(args.format, OutputFormat::Human) {
        print_banner(strategy.label(), args.interval);
    }

    if let Err(e) = run(args, strategy).await {
        eprintln!("\n❌ Error: {e:#}");
        print_troubleshooting_hints();
        std::process::exit(1);
    }
}

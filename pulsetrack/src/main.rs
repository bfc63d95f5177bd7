//! pulsetrack - endpoint activity tracker
//!
//! Runs the producer -> queue -> sender pipeline against a collector server.
//! Real OS input hooks are out of scope; this binary ships a stdin-driven
//! event source so the pipeline can be fed and observed:
//!
//! ```text
//! key                  one keyboard press
//! click 120 340 left   one mouse click at (120, 340)
//! ```
//!
//! Configuration comes from `~/.config/pulsetrack/config.toml`, with
//! command-line flags taking priority over the config file, and the config
//! file over built-in defaults.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::Parser;

use pulsetrack_core::{logging, ActivityTracker, Config, EventSink, EventSource};

#[derive(Parser)]
#[command(name = "pulsetrack")]
#[command(about = "Track keyboard and mouse activity and ship it to a collector")]
#[command(version)]
struct Args {
    /// Path to config file (default: ~/.config/pulsetrack/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collector server URL
    #[arg(long)]
    server: Option<String>,

    /// User ID reported with every batch
    #[arg(long)]
    user: Option<String>,

    /// Device ID reported with every batch
    #[arg(long)]
    device: Option<String>,
}

/// Event source that reads simulated activity from stdin
///
/// One event per line: `key`, or `click X Y BUTTON`. Lines that do not
/// parse are logged and skipped. EOF ends the feed.
struct StdinSource {
    stop: Arc<AtomicBool>,
}

impl StdinSource {
    fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl EventSource for StdinSource {
    fn start(&mut self, sink: EventSink) -> pulsetrack_core::Result<()> {
        self.stop.store(false, Ordering::SeqCst);
        let stop = Arc::clone(&self.stop);

        std::thread::Builder::new()
            .name("pulsetrack-stdin".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(line) = line else { break };
                    feed_line(&sink, line.trim());
                }
                tracing::debug!("stdin event source finished");
            })
            .map_err(|e| {
                pulsetrack_core::Error::Source(format!("failed to spawn stdin reader: {}", e))
            })?;

        Ok(())
    }

    fn stop(&mut self) {
        // The reader may stay blocked on stdin until the next line or EOF;
        // the flag guarantees nothing more reaches the sink.
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Parse one stdin line and report it into the sink
fn feed_line(sink: &EventSink, line: &str) {
    if line.is_empty() {
        return;
    }

    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("key") => sink.key_press(),
        Some("click") => {
            let coords = (
                parts.next().and_then(|x| x.parse::<i32>().ok()),
                parts.next().and_then(|y| y.parse::<i32>().ok()),
            );
            match coords {
                (Some(x), Some(y)) => {
                    let button = parts.next().unwrap_or("left");
                    sink.mouse_click(x, y, button);
                }
                _ => tracing::warn!(line, "ignoring malformed click line"),
            }
        }
        _ => tracing::warn!(line, "ignoring unrecognized input line"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    // Command line takes priority over the config file
    if let Some(server) = args.server {
        config.tracker.server_url = server;
    }
    if let Some(user) = args.user {
        config.tracker.user_id = Some(user);
    }
    if let Some(device) = args.device {
        config.tracker.device_id = Some(device);
    }

    let _log_guard = logging::init(&config.logging).context("failed to initialize logging")?;

    let server_url = config.tracker.server_url.clone();
    let mut tracker = ActivityTracker::new(config.tracker, vec![Box::new(StdinSource::new())])
        .context("failed to build tracker")?;

    tracker.start().context("failed to start tracking")?;
    println!("Activity tracking started (collector: {})", server_url);
    println!("Feed events on stdin: `key` or `click X Y BUTTON`. Ctrl-C to stop.");

    // Keep the main thread alive until interrupted
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;
    let _ = shutdown_rx.recv();

    println!("Shutting down...");
    tracker.stop();

    let stats = tracker.stats();
    println!(
        "Activity tracking stopped ({} events in {} batches sent, {} failed attempts, {} pending)",
        stats.events_sent,
        stats.batches_sent,
        stats.failed_attempts,
        tracker.pending_events()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsetrack_core::{CounterState, EventData, EventKind, EventQueue};
    use std::time::Duration;

    fn sink_fixture() -> (EventSink, Arc<EventQueue>) {
        let queue = Arc::new(EventQueue::new());
        let counters = Arc::new(CounterState::new());
        let sink = EventSink::new(Arc::clone(&queue), counters);
        (sink, queue)
    }

    fn button_of(data: &EventData) -> &str {
        match data {
            EventData::Mouse { button, .. } => button,
            EventData::Keyboard { .. } => panic!("not a mouse event"),
        }
    }

    #[test]
    fn test_feed_line_parses_events() {
        let (sink, queue) = sink_fixture();

        feed_line(&sink, "key");
        feed_line(&sink, "click 120 340 right");
        feed_line(&sink, "click 10 20");

        let events = queue.drain(10, Duration::from_millis(10));
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Keyboard);
        assert_eq!(button_of(&events[1].data), "right");
        // Button defaults to left when omitted
        assert_eq!(button_of(&events[2].data), "left");
    }

    #[test]
    fn test_feed_line_skips_garbage() {
        let (sink, queue) = sink_fixture();

        feed_line(&sink, "");
        feed_line(&sink, "scroll 1 2");
        feed_line(&sink, "click nowhere");

        assert!(queue.is_empty());
    }
}

//! Event source seam between input hooks and the tracker core
//!
//! The core never touches OS input hooks directly. Anything that can observe
//! activity - a platform keyboard/mouse listener, a test fixture, a stdin
//! feed - implements [`EventSource`] and reports occurrences through the
//! [`EventSink`] handed to it at start. Sink calls are safe from any thread
//! at any rate; they update the counters and enqueue without ever blocking.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::queue::{CounterState, EventQueue};
use crate::types::{Event, EventKind};

/// Something that produces activity events once started
///
/// `start` is called with the sink to report into and may spawn its own
/// threads or register OS callbacks. `stop` must prevent further sink calls
/// promptly; it is called before the tracker shuts its queue.
pub trait EventSource: Send {
    /// Begin producing events into `sink`
    fn start(&mut self, sink: EventSink) -> Result<()>;

    /// Stop producing events
    fn stop(&mut self);
}

/// Cloneable handle producer callbacks report through
///
/// Each report updates [`CounterState`] first and then enqueues, so the
/// counters' `last_activity` never lags a counted event that is still
/// queued.
#[derive(Clone)]
pub struct EventSink {
    queue: Arc<EventQueue>,
    counters: Arc<CounterState>,
}

impl EventSink {
    /// Build a sink over explicitly shared queue and counter state
    ///
    /// Most callers get a sink from
    /// [`ActivityTracker::sink`](crate::tracker::ActivityTracker::sink).
    pub fn new(queue: Arc<EventQueue>, counters: Arc<CounterState>) -> Self {
        Self { queue, counters }
    }

    /// Report a key press happening now
    pub fn key_press(&self) {
        self.record(Event::key_press(Utc::now()));
    }

    /// Report a mouse click happening now at screen position (`x`, `y`)
    pub fn mouse_click(&self, x: i32, y: i32, button: impl Into<String>) {
        self.record(Event::mouse_click(Utc::now(), x, y, button));
    }

    /// Report an already-built event
    pub fn record(&self, event: Event) {
        match event.kind {
            EventKind::Keyboard => self.counters.record_key(event.timestamp),
            EventKind::Mouse => self.counters.record_click(event.timestamp),
        }
        self.queue.enqueue(event);
    }
}

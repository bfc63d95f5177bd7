//! # pulsetrack-core
//!
//! Core library for pulsetrack - an endpoint activity telemetry pipeline.
//!
//! Input-event producers feed a bounded-batch pipeline: callbacks enqueue
//! keyboard/mouse events into an unbounded thread-safe queue, and a
//! background sender drains them into batches and delivers each batch over
//! HTTP to a collector with at-least-once semantics. Transient delivery
//! failures requeue the batch's events for the next flush cycle; nothing is
//! silently dropped while the tracker runs.
//!
//! ## Components
//!
//! - [`queue::EventQueue`] / [`queue::CounterState`] - the shared state
//!   between producers and the sender
//! - [`collector::BatchAssembler`] / [`collector::CollectorClient`] - batch
//!   assembly and single-attempt HTTP delivery
//! - [`tracker::ActivityTracker`] - lifecycle and the background send loop
//! - [`source::EventSource`] - the seam where platform input hooks plug in
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulsetrack_core::{ActivityTracker, TrackerConfig};
//!
//! let config = TrackerConfig::default();
//! let mut tracker = ActivityTracker::new(config, Vec::new()).expect("invalid config");
//! let sink = tracker.sink();
//!
//! tracker.start().expect("failed to start tracking");
//! sink.key_press();
//! sink.mouse_click(120, 340, "left");
//! tracker.stop();
//! ```

// Re-export commonly used items at the crate root
pub use collector::{Batch, BatchAssembler, CollectorClient};
pub use config::{Config, TrackerConfig};
pub use error::{Error, Result};
pub use queue::{CounterState, EventQueue};
pub use source::{EventSink, EventSource};
pub use tracker::{ActivityTracker, DeliveryStats, TrackerState};
pub use types::*;

// Public modules
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod source;
pub mod tracker;
pub mod types;

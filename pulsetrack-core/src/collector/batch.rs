//! Batch assembly from the event queue

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::queue::{CounterState, EventQueue};
use crate::types::{CounterSnapshot, Event};

/// One bounded group of events plus a counters snapshot, assembled for a
/// single delivery attempt
///
/// Batches are ephemeral: consumed exactly once by the client, and on
/// failure dissolved back into individual events via
/// [`into_events`](Self::into_events).
#[derive(Debug, Clone)]
pub struct Batch {
    /// Up to `max_batch_size` events in queue (FIFO) order
    pub events: Vec<Event>,
    /// Counter state read at assembly time
    pub summary: CounterSnapshot,
    /// When this batch was assembled
    pub assembled_at: DateTime<Utc>,
}

impl Batch {
    /// Number of events in the batch
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Dissolve the batch back into its events, oldest first
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Drains the queue into bounded-size batches
pub struct BatchAssembler {
    queue: Arc<EventQueue>,
    counters: Arc<CounterState>,
    max_batch_size: usize,
    flush_interval: Duration,
}

impl BatchAssembler {
    pub fn new(
        queue: Arc<EventQueue>,
        counters: Arc<CounterState>,
        max_batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            queue,
            counters,
            max_batch_size,
            flush_interval,
        }
    }

    /// Assemble the next batch, blocking up to the flush interval
    ///
    /// Waits until `max_batch_size` events are available or the interval
    /// elapses. Returns `None` when the drain came back empty - not an
    /// error, just nothing to send yet.
    pub fn assemble(&self) -> Option<Batch> {
        let events = self.queue.drain(self.max_batch_size, self.flush_interval);
        if events.is_empty() {
            return None;
        }

        Some(Batch {
            events,
            summary: self.counters.snapshot(),
            assembled_at: Utc::now(),
        })
    }
}

//! Shared producer/sender state: the event queue and activity counters
//!
//! These are the only two pieces of mutable state shared between producer
//! callbacks and the sender thread. [`EventQueue::enqueue`] must never block a
//! producer; [`EventQueue::drain`] is the sender's sole blocking wait, bounded
//! by the flush interval and woken early once enough events arrive.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::types::{CounterSnapshot, Event};

struct QueueInner {
    items: VecDeque<Event>,
    closed: bool,
}

/// Unbounded, insertion-ordered buffer of pending events
///
/// The single hand-off point between producer callbacks and the sender.
/// Deliberately uncapped: back-pressure would make producer callbacks
/// blockable, and during a collector outage events accumulate here rather
/// than being dropped.
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl EventQueue {
    /// Create an open, empty queue
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an event at the tail
    ///
    /// Never blocks and never fails; callable concurrently from any number of
    /// producer callbacks. Returns false if the queue is closed (the event is
    /// dropped - no enqueues are accepted after shutdown).
    pub fn enqueue(&self, event: Event) -> bool {
        let mut inner = self.inner.lock().expect("event queue mutex poisoned");
        if inner.closed {
            tracing::trace!("event dropped: queue closed");
            return false;
        }
        inner.items.push_back(event);
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Reinsert events at the head, oldest first
    ///
    /// Used when delivery fails: the batch dissolves back into individual
    /// events that will be retried before anything newer, preserving overall
    /// FIFO order. Inserts even into a closed queue so a failed final flush
    /// still leaves the events accounted for.
    pub fn requeue_front(&self, events: Vec<Event>) {
        let mut inner = self.inner.lock().expect("event queue mutex poisoned");
        for event in events.into_iter().rev() {
            inner.items.push_front(event);
        }
        drop(inner);
        self.available.notify_one();
    }

    /// Remove and return up to `max_items` events, waiting up to `timeout`
    ///
    /// Blocks the calling thread until `max_items` events have been collected
    /// or the deadline passes, then returns whatever was collected (possibly
    /// nothing). Wakes early if the queue is closed.
    pub fn drain(&self, max_items: usize, timeout: Duration) -> Vec<Event> {
        let deadline = Instant::now() + timeout;
        let mut collected = Vec::new();

        let mut inner = self.inner.lock().expect("event queue mutex poisoned");
        loop {
            while collected.len() < max_items {
                match inner.items.pop_front() {
                    Some(event) => collected.push(event),
                    None => break,
                }
            }

            if collected.len() >= max_items || inner.closed {
                return collected;
            }

            let now = Instant::now();
            if now >= deadline {
                return collected;
            }

            let (guard, _) = self
                .available
                .wait_timeout(inner, deadline - now)
                .expect("event queue mutex poisoned");
            inner = guard;
        }
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("event queue mutex poisoned")
            .items
            .len()
    }

    /// Whether the queue holds no pending events
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accept enqueues again after a [`close`](Self::close)
    pub fn open(&self) {
        let mut inner = self.inner.lock().expect("event queue mutex poisoned");
        inner.closed = false;
    }

    /// Stop accepting enqueues and wake any blocked drain
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("event queue mutex poisoned");
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }

    /// Whether the queue is closed to new events
    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .expect("event queue mutex poisoned")
            .closed
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-lifetime activity counters
///
/// `key_count` and `click_count` are monotonically non-decreasing totals;
/// `last_activity` tracks the newest event timestamp seen by either counter,
/// so it is always >= the timestamp of every counted event still queued.
/// Updated by every producer callback, read (never reset) by the sender.
pub struct CounterState {
    key_count: AtomicU64,
    click_count: AtomicU64,
    last_activity: Mutex<DateTime<Utc>>,
}

impl CounterState {
    /// Counters at zero, `last_activity` at the current instant
    pub fn new() -> Self {
        Self {
            key_count: AtomicU64::new(0),
            click_count: AtomicU64::new(0),
            last_activity: Mutex::new(Utc::now()),
        }
    }

    /// Count one key press observed at `timestamp`
    pub fn record_key(&self, timestamp: DateTime<Utc>) {
        self.key_count.fetch_add(1, Ordering::Relaxed);
        self.touch(timestamp);
    }

    /// Count one mouse click observed at `timestamp`
    pub fn record_click(&self, timestamp: DateTime<Utc>) {
        self.click_count.fetch_add(1, Ordering::Relaxed);
        self.touch(timestamp);
    }

    fn touch(&self, timestamp: DateTime<Utc>) {
        let mut last = self
            .last_activity
            .lock()
            .expect("counter state mutex poisoned");
        if timestamp > *last {
            *last = timestamp;
        }
    }

    /// Read all counters at one instant
    ///
    /// The counts and the activity instant are read in turn, not under one
    /// lock; a producer landing between the reads skews the snapshot by at
    /// most its own event, which the wire contract tolerates.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            key_count: self.key_count.load(Ordering::Relaxed),
            click_count: self.click_count.load(Ordering::Relaxed),
            last_activity: *self
                .last_activity
                .lock()
                .expect("counter state mutex poisoned"),
        }
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key_event() -> Event {
        Event::key_press(Utc::now())
    }

    #[test]
    fn test_enqueue_drain_fifo() {
        let queue = EventQueue::new();
        let e1 = Event::key_press("2026-08-29T10:00:01Z".parse().unwrap());
        let e2 = Event::mouse_click("2026-08-29T10:00:02Z".parse().unwrap(), 1, 2, "left");
        let e3 = Event::key_press("2026-08-29T10:00:03Z".parse().unwrap());
        assert!(queue.enqueue(e1.clone()));
        assert!(queue.enqueue(e2.clone()));
        assert!(queue.enqueue(e3.clone()));

        let drained = queue.drain(10, Duration::from_millis(10));
        assert_eq!(drained, vec![e1, e2, e3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_respects_max_items() {
        let queue = EventQueue::new();
        for _ in 0..250 {
            queue.enqueue(key_event());
        }

        let drained = queue.drain(100, Duration::from_secs(5));
        assert_eq!(drained.len(), 100);
        assert_eq!(queue.len(), 150);
    }

    #[test]
    fn test_drain_returns_early_when_full() {
        let queue = EventQueue::new();
        for _ in 0..100 {
            queue.enqueue(key_event());
        }

        // Plenty of events: must not wait out the long timeout.
        let start = Instant::now();
        let drained = queue.drain(100, Duration::from_secs(60));
        assert_eq!(drained.len(), 100);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drain_empty_waits_full_timeout() {
        let queue = EventQueue::new();
        let timeout = Duration::from_millis(100);

        let start = Instant::now();
        let drained = queue.drain(10, timeout);
        let elapsed = start.elapsed();

        assert!(drained.is_empty());
        assert!(elapsed >= timeout, "returned after {:?}", elapsed);
        assert!(elapsed < timeout + Duration::from_millis(250));
    }

    #[test]
    fn test_drain_wakes_on_enqueue() {
        let queue = Arc::new(EventQueue::new());
        let producer_queue = Arc::clone(&queue);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            producer_queue.enqueue(key_event());
        });

        // max_items = 1: the enqueue should wake the drain well before the deadline.
        let start = Instant::now();
        let drained = queue.drain(1, Duration::from_secs(10));
        assert_eq!(drained.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_requeue_front_preserves_fifo() {
        let queue = EventQueue::new();
        let old1 = Event::key_press("2026-08-29T10:00:01Z".parse().unwrap());
        let old2 = Event::key_press("2026-08-29T10:00:02Z".parse().unwrap());
        let newer = Event::key_press("2026-08-29T10:00:03Z".parse().unwrap());

        queue.enqueue(old1.clone());
        queue.enqueue(old2.clone());
        let failed_batch = queue.drain(2, Duration::from_millis(10));
        assert_eq!(failed_batch.len(), 2);

        // A new event arrives while the old ones were out for delivery.
        queue.enqueue(newer.clone());
        queue.requeue_front(failed_batch);

        let drained = queue.drain(10, Duration::from_millis(10));
        assert_eq!(drained, vec![old1, old2, newer]);
    }

    #[test]
    fn test_closed_queue_drops_enqueues() {
        let queue = EventQueue::new();
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.enqueue(key_event()));
        assert!(queue.is_empty());

        queue.open();
        assert!(!queue.is_closed());
        assert!(queue.enqueue(key_event()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_close_wakes_blocked_drain() {
        let queue = Arc::new(EventQueue::new());
        let closer = Arc::clone(&queue);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            closer.close();
        });

        let start = Instant::now();
        let drained = queue.drain(10, Duration::from_secs(30));
        assert!(drained.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_enqueue_keeps_every_event() {
        let queue = Arc::new(EventQueue::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    queue.enqueue(key_event());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 800);
    }

    #[test]
    fn test_counter_totals_exact_under_producers() {
        let counters = Arc::new(CounterState::new());
        let mut handles = Vec::new();

        // 4 threads x 50 keys, 3 threads x 40 clicks
        for _ in 0..4 {
            let counters = Arc::clone(&counters);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    counters.record_key(Utc::now());
                }
            }));
        }
        for _ in 0..3 {
            let counters = Arc::clone(&counters);
            handles.push(std::thread::spawn(move || {
                for _ in 0..40 {
                    counters.record_click(Utc::now());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.key_count, 200);
        assert_eq!(snapshot.click_count, 120);
    }

    #[test]
    fn test_last_activity_is_max_timestamp() {
        let counters = CounterState::new();
        let newer: DateTime<Utc> = Utc::now() + chrono::Duration::seconds(60);
        let older: DateTime<Utc> = Utc::now() - chrono::Duration::seconds(60);

        counters.record_key(newer);
        counters.record_click(older);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.last_activity, newer);
    }
}

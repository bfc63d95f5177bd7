//! The activity tracker orchestrator
//!
//! [`ActivityTracker`] owns the queue, the counters, the event sources, and
//! the collector client, and runs the batch/deliver/retry loop on one
//! dedicated background thread. The thread carries its own current-thread
//! tokio runtime and blocks on each send, so the rest of the pipeline stays
//! plain threads-and-locks: producer callbacks are never async.
//!
//! Lifecycle is a small state machine, Stopped -> Running -> Stopping ->
//! Stopped. `start` and `stop` are both idempotent; a second `start` never
//! spawns a second loop. Shutdown is best-effort: sources stop first, the
//! queue closes (waking the drain), and the loop gets its current iteration
//! - including a final send attempt - before the join deadline applies.
//! Events still queued when the deadline passes are an accepted loss window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::collector::{BatchAssembler, CollectorClient};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::queue::{CounterState, EventQueue};
use crate::source::{EventSink, EventSource};
use crate::types::SystemInfo;

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Stopped,
    Running,
    Stopping,
}

/// Running delivery totals
#[derive(Debug, Default, Clone)]
pub struct DeliveryStats {
    /// Batches delivered successfully
    pub batches_sent: usize,
    /// Events delivered successfully
    pub events_sent: usize,
    /// Send attempts that failed and were requeued
    pub failed_attempts: usize,
}

struct Worker {
    handle: JoinHandle<()>,
    done_rx: mpsc::Receiver<()>,
    /// Owned by this worker alone. A sender abandoned at the join deadline
    /// must never observe a later start()'s flag and resume.
    running: Arc<AtomicBool>,
}

/// Producer -> queue -> batching-sender pipeline
pub struct ActivityTracker {
    config: TrackerConfig,
    queue: Arc<EventQueue>,
    counters: Arc<CounterState>,
    client: Arc<CollectorClient>,
    sources: Vec<Box<dyn EventSource>>,
    stats: Arc<Mutex<DeliveryStats>>,
    state: TrackerState,
    worker: Option<Worker>,
}

impl ActivityTracker {
    /// Build a tracker from configuration and a set of event sources
    ///
    /// Detects the device identity once, here, and attaches it to every
    /// batch for the tracker's lifetime.
    pub fn new(config: TrackerConfig, sources: Vec<Box<dyn EventSource>>) -> Result<Self> {
        config.validate()?;

        let system_info =
            SystemInfo::detect(config.user_id.as_deref(), config.device_id.as_deref());
        tracing::debug!(
            hostname = %system_info.hostname,
            device_id = %system_info.device_id,
            user_id = %system_info.user_id,
            "detected system identity"
        );

        let client = Arc::new(CollectorClient::new(&config, system_info)?);

        Ok(Self {
            config,
            queue: Arc::new(EventQueue::new()),
            counters: Arc::new(CounterState::new()),
            client,
            sources,
            stats: Arc::new(Mutex::new(DeliveryStats::default())),
            state: TrackerState::Stopped,
            worker: None,
        })
    }

    /// Handle for external producers to report events through
    pub fn sink(&self) -> EventSink {
        EventSink::new(Arc::clone(&self.queue), Arc::clone(&self.counters))
    }

    /// Current lifecycle state
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Snapshot of the delivery totals
    pub fn stats(&self) -> DeliveryStats {
        self.stats
            .lock()
            .expect("delivery stats mutex poisoned")
            .clone()
    }

    /// Events currently waiting for delivery
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Start the event sources and the background sender loop
    ///
    /// No-op unless currently stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.state != TrackerState::Stopped {
            tracing::debug!(state = ?self.state, "start ignored");
            return Ok(());
        }

        self.queue.open();

        let sink = self.sink();
        for i in 0..self.sources.len() {
            if let Err(e) = self.sources[i].start(sink.clone()) {
                // Roll back the sources that did start.
                for source in &mut self.sources[..i] {
                    source.stop();
                }
                return Err(e);
            }
        }

        let assembler = BatchAssembler::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.counters),
            self.config.max_batch_size,
            self.config.flush_interval(),
        );
        let client = Arc::clone(&self.client);
        let queue = Arc::clone(&self.queue);
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let stats = Arc::clone(&self.stats);
        let (done_tx, done_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("pulsetrack-sender".to_string())
            .spawn(move || {
                sender_loop(assembler, client, queue, loop_running, stats);
                let _ = done_tx.send(());
            })?;

        self.worker = Some(Worker {
            handle,
            done_rx,
            running,
        });
        self.state = TrackerState::Running;
        tracing::info!("activity tracking started");
        Ok(())
    }

    /// Stop the sources, signal the loop, and join with a bounded wait
    ///
    /// No-op unless currently running. Always leaves the tracker stopped,
    /// even if the sender thread misses the join deadline.
    pub fn stop(&mut self) {
        if self.state != TrackerState::Running {
            tracing::debug!(state = ?self.state, "stop ignored");
            return;
        }
        self.state = TrackerState::Stopping;

        // Sources first: no further enqueues once we begin shutting down.
        for source in &mut self.sources {
            source.stop();
        }

        let worker = self.worker.take();
        if let Some(worker) = &worker {
            worker.running.store(false, Ordering::SeqCst);
        }
        self.queue.close();

        if let Some(worker) = worker {
            match worker.done_rx.recv_timeout(self.config.join_timeout()) {
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        timeout_secs = self.config.join_timeout_secs,
                        pending = self.queue.len(),
                        "sender thread did not exit in time, abandoning it"
                    );
                }
                // Done (or the thread died); reap it.
                _ => {
                    if worker.handle.join().is_err() {
                        tracing::error!("sender thread panicked");
                    }
                }
            }
        }

        self.state = TrackerState::Stopped;
        tracing::info!(pending = self.queue.len(), "activity tracking stopped");
    }
}

impl Drop for ActivityTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The batch/deliver/retry loop, run on the dedicated sender thread
///
/// Each iteration blocks in `assemble` for up to one flush interval, then
/// makes a single delivery attempt. Failed batches dissolve back into the
/// queue head so their events go out before anything newer; the next
/// interval provides the only retry pacing. Nothing here is fatal.
fn sender_loop(
    assembler: BatchAssembler,
    client: Arc<CollectorClient>,
    queue: Arc<EventQueue>,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<DeliveryStats>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to create sender runtime");
            return;
        }
    };

    while running.load(Ordering::SeqCst) {
        let Some(batch) = assembler.assemble() else {
            // Nothing to send yet; assemble's timeout already bounded the wait.
            continue;
        };

        let batch_len = batch.len();
        match runtime.block_on(client.send(&batch)) {
            Ok(()) => {
                let mut stats = stats.lock().expect("delivery stats mutex poisoned");
                stats.batches_sent += 1;
                stats.events_sent += batch_len;
                tracing::debug!(events = batch_len, "delivered activity batch");
            }
            Err(e) => {
                stats
                    .lock()
                    .expect("delivery stats mutex poisoned")
                    .failed_attempts += 1;
                tracing::warn!(
                    error = %e,
                    events = batch_len,
                    "failed to deliver batch, requeueing events"
                );
                queue.requeue_front(batch.into_events());
            }
        }
    }
}

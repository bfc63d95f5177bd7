//! Delivery to the activity collector
//!
//! This module covers the outbound half of the pipeline: draining queued
//! events into bounded batches and POSTing them, together with a counters
//! snapshot and the device identity, to the collector's
//! `POST /api/activity` endpoint.
//!
//! Delivery is at-least-once: the client makes exactly one attempt per
//! batch, and the sender requeues a failed batch's events for the next
//! flush cycle. The collector must therefore tolerate duplicates.

mod batch;
mod client;

pub use batch::{Batch, BatchAssembler};
pub use client::CollectorClient;

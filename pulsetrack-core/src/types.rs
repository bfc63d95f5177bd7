//! Domain types for pulsetrack
//!
//! ## Event envelope
//!
//! Every event serializes to the shape the collector ingests:
//!
//! ```json
//! {"type": "keyboard", "timestamp": "2026-08-29T12:00:00Z", "data": {"count": 1}}
//! {"type": "mouse", "timestamp": "...", "data": {"count": 1, "position": {"x": 10, "y": 20}, "button": "left"}}
//! ```
//!
//! Events are immutable once created: an [`EventSource`](crate::source::EventSource)
//! callback builds one, the queue owns it until it is drained into a batch, and it
//! is dropped once that batch is delivered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single activity occurrence captured on the endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event kind (keyboard press or mouse click)
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// When the occurrence happened
    pub timestamp: DateTime<Utc>,

    /// Kind-specific payload
    pub data: EventData,
}

/// Kind discriminant, serialized as the collector's `type` string
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Keyboard,
    Mouse,
}

/// Kind-specific event payload
///
/// Untagged: the variant is implied by the envelope's `type` field.
/// `Mouse` must be listed first so deserialization tries the richer
/// shape before falling back to the bare count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EventData {
    Mouse {
        count: u32,
        position: CursorPosition,
        button: String,
    },
    Keyboard {
        count: u32,
    },
}

/// Screen coordinates of a mouse click
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

impl Event {
    /// A key press at `timestamp`
    pub fn key_press(timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Keyboard,
            timestamp,
            data: EventData::Keyboard { count: 1 },
        }
    }

    /// A mouse click at `timestamp` and screen position (`x`, `y`)
    pub fn mouse_click(
        timestamp: DateTime<Utc>,
        x: i32,
        y: i32,
        button: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Mouse,
            timestamp,
            data: EventData::Mouse {
                count: 1,
                position: CursorPosition { x, y },
                button: button.into(),
            },
        }
    }
}

/// Immutable device/user identity attached to every outbound batch
///
/// Established once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub hostname: String,
    pub device_id: String,
    pub user_id: String,
}

impl SystemInfo {
    /// Detect host facts, filling identity gaps from the hostname
    ///
    /// `device_id` defaults to the hostname and `user_id` to
    /// `user_{hostname}` when not supplied.
    pub fn detect(user_id: Option<&str>, device_id: Option<&str>) -> Self {
        let hostname =
            sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());

        Self {
            os: sysinfo::System::name()
                .unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: sysinfo::System::os_version()
                .unwrap_or_else(|| "unknown".to_string()),
            device_id: device_id
                .map(str::to_string)
                .unwrap_or_else(|| hostname.clone()),
            user_id: user_id
                .map(str::to_string)
                .unwrap_or_else(|| format!("user_{}", hostname)),
            hostname,
        }
    }
}

/// Point-in-time read of the running activity counters
///
/// Serialized as the `summary` section of the wire payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterSnapshot {
    /// Lifetime key presses since process start
    pub key_count: u64,
    /// Lifetime mouse clicks since process start
    pub click_count: u64,
    /// Instant of the most recent event of either kind
    pub last_activity: DateTime<Utc>,
}

//! Records handed to the event sink

use crate::domain::types::Point;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// One de-duplicated activity change.
///
/// Fields are private: an event is never mutated once the emitter builds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    ts: u64,
    activity: String,
    confidence: Option<f64>,
    zone: Option<String>,
    position: Option<Point>,
}

impl ActivityEvent {
    pub fn new(
        ts: u64,
        activity: impl Into<String>,
        confidence: Option<f64>,
        zone: Option<String>,
        position: Option<Point>,
    ) -> Self {
        Self { ts, activity: activity.into(), confidence, zone, position }
    }

    #[inline]
    pub fn ts(&self) -> u64 {
        self.ts
    }

    #[inline]
    pub fn activity(&self) -> &str {
        &self.activity
    }

    /// Detection confidence; None for inferred states
    #[inline]
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    #[inline]
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Subject center, present only when the subject was visible
    #[inline]
    pub fn position(&self) -> Option<Point> {
        self.position
    }
}

/// Monitoring session lifecycle markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemEventKind {
    Start,
    Stop,
    Crash,
}

impl SystemEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventKind::Start => "start",
            SystemEventKind::Stop => "stop",
            SystemEventKind::Crash => "crash",
        }
    }
}

/// Host-level lifecycle record (start, stop, crash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub session_id: String,
    pub ts: u64,
    /// Wall-clock time as RFC 3339 (UTC)
    pub at: String,
    pub event: SystemEventKind,
    pub message: String,
}

impl SystemEvent {
    pub fn new(session_id: &str, event: SystemEventKind, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            ts: epoch_ms(),
            at: Utc::now().to_rfc3339(),
            event,
            message: message.into(),
        }
    }
}

//! Event sinks
//!
//! The engine hands every emitted activity to an `EventSink`. Failures are
//! reported to the caller but never retried; losing an event is preferable to
//! stalling the tick loop.

use crate::domain::event::{ActivityEvent, SystemEvent};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink rejected event: {0}")]
    Rejected(String),
}

/// Destination for emitted records
pub trait EventSink {
    fn record(&mut self, event: &ActivityEvent) -> Result<(), SinkError>;

    /// Session lifecycle channel; sinks without one drop these
    fn record_system(&mut self, _event: &SystemEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, event: &ActivityEvent) -> Result<(), SinkError> {
        (**self).record(event)
    }

    fn record_system(&mut self, event: &SystemEvent) -> Result<(), SinkError> {
        (**self).record_system(event)
    }
}

/// Appends one JSON object per line to the activity and system files
pub struct JsonlSink {
    events_path: PathBuf,
    system_path: PathBuf,
}

impl JsonlSink {
    pub fn new(events_path: impl Into<PathBuf>, system_path: impl Into<PathBuf>) -> Self {
        let events_path = events_path.into();
        let system_path = system_path.into();
        info!(
            events_file = %events_path.display(),
            system_file = %system_path.display(),
            "sink_initialized"
        );
        Self { events_path, system_path }
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    pub fn system_path(&self) -> &Path {
        &self.system_path
    }

    fn append<T: Serialize>(path: &Path, record: &T) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %path.display(), bytes = %line.len(), "sink_written");
        Ok(())
    }
}

impl EventSink for JsonlSink {
    fn record(&mut self, event: &ActivityEvent) -> Result<(), SinkError> {
        Self::append(&self.events_path, event)
    }

    fn record_system(&mut self, event: &SystemEvent) -> Result<(), SinkError> {
        Self::append(&self.system_path, event)
    }
}

/// Keeps records in memory; can be told to reject writes
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<ActivityEvent>,
    system: Vec<SystemEvent>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write until `set_failing(false)`
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    pub fn system_events(&self) -> &[SystemEvent] {
        &self.system
    }

    /// Recorded activity labels in order
    pub fn labels(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.activity()).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: &ActivityEvent) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Rejected(event.activity().to_string()));
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn record_system(&mut self, event: &SystemEvent) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Rejected(event.event.as_str().to_string()));
        }
        self.system.push(event.clone());
        Ok(())
    }
}

//! Change-only event emission
//!
//! `ActivityState::last_emitted` is the single de-duplication authority and
//! only this module writes it. It advances before the sink is called and is
//! never rolled back when the sink fails.

use crate::domain::event::ActivityEvent;
use crate::domain::types::Point;
use crate::io::sink::EventSink;
use crate::services::resolver::Resolution;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityState {
    /// Label the resolver produced on the latest tick
    pub current_candidate: Option<String>,
    pub last_emitted: Option<String>,
    pub last_emitted_at: Option<u64>,
}

/// Per-tick metadata attached to an emitted event
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitContext<'a> {
    pub now: u64,
    /// Detection confidence of the visible subject
    pub confidence: Option<f64>,
    pub zone: Option<&'a str>,
    /// Subject center when visible
    pub position: Option<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmitOutcome {
    /// The resolver produced nothing this tick
    NoCandidate,
    /// Same label as the last emitted event
    Duplicate,
    /// A new event was produced; `delivered` is false when the sink failed
    Emitted { event: ActivityEvent, delivered: bool },
}

#[derive(Debug, Default)]
pub struct EventEmitter {
    state: ActivityState,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn emit<S: EventSink + ?Sized>(
        &mut self,
        resolution: Option<&Resolution>,
        ctx: &EmitContext<'_>,
        sink: &mut S,
    ) -> EmitOutcome {
        self.state.current_candidate = resolution.map(|r| r.label.clone());

        let Some(resolution) = resolution else {
            return EmitOutcome::NoCandidate;
        };

        if self.state.last_emitted.as_deref() == Some(resolution.label.as_str()) {
            debug!(activity = %resolution.label, "activity_unchanged");
            return EmitOutcome::Duplicate;
        }

        let confidence = if resolution.rule.is_inferred() { None } else { ctx.confidence };
        let event = ActivityEvent::new(
            ctx.now,
            resolution.label.as_str(),
            confidence,
            ctx.zone.map(str::to_string),
            ctx.position,
        );

        self.state.last_emitted = Some(resolution.label.clone());
        self.state.last_emitted_at = Some(ctx.now);

        info!(
            activity = %event.activity(),
            rule = %resolution.rule.as_str(),
            zone = ?event.zone(),
            confidence = ?event.confidence(),
            "activity_emitted"
        );

        let delivered = match sink.record(&event) {
            Ok(()) => true,
            Err(e) => {
                warn!(activity = %event.activity(), error = %e, "sink_write_failed");
                false
            }
        };

        EmitOutcome::Emitted { event, delivered }
    }
}

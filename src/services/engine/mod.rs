//! Per-session activity inference
//!
//! The ActivityEngine owns every piece of session state and runs one tick per
//! observation:
//! - Spatial classification (zones, boundary crossings)
//! - Motion and interaction tracking
//! - Inactivity (sleep/wake) evaluation
//! - Priority resolution and change-only emission to the sink
//!
//! Ticks are strictly sequential. Several subjects need several engines.

#[cfg(test)]
mod tests;

use crate::domain::event::ActivityEvent;
use crate::domain::types::Observation;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::sink::EventSink;
use crate::services::emitter::{ActivityState, EmitContext, EmitOutcome, EventEmitter};
use crate::services::inactivity::{InactivityDetector, InactivitySignal};
use crate::services::interaction::InteractionDetector;
use crate::services::motion::{MotionState, MotionTracker};
use crate::services::resolver::{ActivityResolver, Resolution, TickSignals};
use crate::services::spatial::SpatialClassifier;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// What one tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Tick time after clamping
    pub ts: u64,
    pub resolved: Option<Resolution>,
    /// Set only when the label changed
    pub event: Option<ActivityEvent>,
    pub woke_up: bool,
    /// None when the subject was not visible
    pub moved: Option<bool>,
    pub interaction_count: usize,
}

pub struct ActivityEngine<S: EventSink> {
    pub(crate) classifier: SpatialClassifier,
    pub(crate) motion: MotionTracker,
    pub(crate) interaction: InteractionDetector,
    pub(crate) inactivity: InactivityDetector,
    pub(crate) resolver: ActivityResolver,
    pub(crate) emitter: EventEmitter,
    sink: S,
    metrics: Arc<Metrics>,
    /// Reported when the visible subject overlaps no zone
    default_zone: Option<String>,
    /// Primary zone at the last sighting
    last_zone: Option<String>,
    last_tick: Option<u64>,
}

impl<S: EventSink> ActivityEngine<S> {
    pub fn new(config: &Config, sink: S, metrics: Arc<Metrics>) -> Self {
        info!(
            subject = %config.subject_name(),
            zones = ?config.zone_names(),
            boundaries = %config.boundaries().len(),
            sleep_timeout_ms = %config.sleep_timeout_ms(),
            "engine_created"
        );
        Self {
            classifier: SpatialClassifier::new(config.zones().to_vec(), config.boundaries().to_vec()),
            motion: MotionTracker::new(config.move_threshold()),
            interaction: InteractionDetector::new(config.interaction_window_ms()),
            inactivity: InactivityDetector::new(config.sleep_timeout_ms()),
            resolver: ActivityResolver::new(config),
            emitter: EventEmitter::new(),
            sink,
            metrics,
            default_zone: config.default_zone().map(str::to_string),
            last_zone: None,
            last_tick: None,
        }
    }

    /// Consume observations until the channel closes or shutdown is signalled
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Observation>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                observation = rx.recv() => {
                    match observation {
                        Some(observation) => {
                            self.tick(&observation);
                        }
                        None => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("engine_shutdown");
                        break;
                    }
                }
            }
        }
    }

    /// Process one observation
    pub fn tick(&mut self, observation: &Observation) -> TickOutcome {
        let started = Instant::now();
        let now = self.clamp(observation.ts);

        let subject = observation.visible_subject();
        let bbox = subject.map(|s| &s.bbox);

        let classification = self.classifier.classify(bbox);
        let sample = subject.map(|s| self.motion.update(s.bbox.center(), now));
        let moved = sample.map(|s| s.moved);
        let interaction_count = self.interaction.observe(bbox, &observation.actors, now);
        let inactivity = self.inactivity.evaluate(self.motion.state(), moved, now);

        if subject.is_some() {
            self.last_zone = match classification.primary_zone() {
                Some(index) => Some(self.classifier.zone(index).name.clone()),
                None => self.default_zone.clone(),
            };
        }

        let resolved = self.resolver.resolve(&TickSignals {
            now,
            inactivity,
            visible: subject.is_some(),
            classification: &classification,
            interaction_count,
            objects_present: !observation.objects.is_empty(),
            motion: self.motion.state(),
            last_zone: self.last_zone.as_deref(),
        });

        let ctx = EmitContext {
            now,
            confidence: subject.map(|s| s.confidence),
            zone: self.last_zone.as_deref(),
            position: subject.map(|s| s.bbox.center()),
        };
        let event = match self.emitter.emit(resolved.as_ref(), &ctx, &mut self.sink) {
            EmitOutcome::NoCandidate => None,
            EmitOutcome::Duplicate => {
                self.metrics.record_event_suppressed();
                None
            }
            EmitOutcome::Emitted { event, delivered } => {
                self.metrics.record_event_emitted();
                if !delivered {
                    self.metrics.record_sink_failure();
                }
                Some(event)
            }
        };

        self.metrics.record_tick(started.elapsed().as_micros() as u64, subject.is_some());

        TickOutcome {
            ts: now,
            resolved,
            event,
            woke_up: inactivity == InactivitySignal::WokeUp,
            moved,
            interaction_count,
        }
    }

    /// Tick time never goes backwards within a session
    fn clamp(&mut self, ts: u64) -> u64 {
        let now = match self.last_tick {
            Some(last) if ts < last => {
                debug!(ts = %ts, last = %last, "tick_time_clamped");
                last
            }
            _ => ts,
        };
        self.last_tick = Some(now);
        now
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn activity_state(&self) -> &ActivityState {
        self.emitter.state()
    }

    pub fn motion_state(&self) -> &MotionState {
        self.motion.state()
    }

    /// Primary zone at the last sighting
    pub fn last_zone(&self) -> Option<&str> {
        self.last_zone.as_deref()
    }
}

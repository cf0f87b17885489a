//! JSONL observation source
//!
//! Each line is one frame from the detector/tracker. A frame either names the
//! subject, actors and objects directly or carries a flat list of class-tagged
//! detections that are partitioned by the configured class map.

use crate::domain::event::epoch_ms;
use crate::domain::types::{BBox, Observation, SubjectObservation, TrackId};
use crate::infra::config::ClassesConfig;
use crate::infra::metrics::Metrics;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Timestamp that can be either an RFC 3339 string or epoch milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TimestampValue {
    #[default]
    None,
    IsoString(String),
    EpochMs(u64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<TimestampValue, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = TimestampValue;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::IsoString(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::IsoString(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::EpochMs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            let epoch_ms = u64::try_from(value).unwrap_or(0);
            Ok(TimestampValue::EpochMs(epoch_ms))
        }

        fn visit_unit<E>(self) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::None)
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

/// Parse "2026-01-05T16:41:30.048+00:00" (RFC 3339) to epoch ms
fn parse_iso_time(time_str: &str) -> Option<u64> {
    OffsetDateTime::parse(time_str, &Rfc3339)
        .ok()
        .and_then(|dt| u64::try_from(dt.unix_timestamp_nanos() / 1_000_000).ok())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRecord {
    pub bbox: BBox,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub track_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
    #[serde(rename = "class")]
    pub class_name: String,
    pub bbox: BBox,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub track_id: Option<i64>,
}

fn default_confidence() -> f64 {
    1.0
}

/// One source line
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub ts: TimestampValue,
    #[serde(default)]
    pub subject: Option<SubjectRecord>,
    #[serde(default)]
    pub actors: Vec<BBox>,
    #[serde(default)]
    pub objects: Vec<BBox>,
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionRole {
    Subject,
    Actor,
    Object,
}

/// Detector class name to observation role
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    roles: FxHashMap<String, DetectionRole>,
}

impl ClassMap {
    pub fn from_config(classes: &ClassesConfig) -> Self {
        let mut roles = FxHashMap::default();
        let groups = [
            (&classes.subject, DetectionRole::Subject),
            (&classes.actor, DetectionRole::Actor),
            (&classes.object, DetectionRole::Object),
        ];
        for (names, role) in groups {
            for name in names {
                roles.insert(name.to_lowercase(), role);
            }
        }
        Self { roles }
    }

    pub fn role(&self, class_name: &str) -> Option<DetectionRole> {
        self.roles.get(&class_name.to_lowercase()).copied()
    }
}

#[derive(Debug, Error)]
pub enum LineError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

impl FrameRecord {
    /// Build the tick observation; frames without a timestamp get `received_at`
    pub fn into_observation(self, classes: &ClassMap, received_at: u64) -> Result<Observation, LineError> {
        let ts = match self.ts {
            TimestampValue::EpochMs(ms) => ms,
            TimestampValue::IsoString(s) => parse_iso_time(&s).ok_or(LineError::Timestamp(s))?,
            TimestampValue::None => received_at,
        };

        let mut subject = self.subject.map(|s| SubjectObservation {
            bbox: s.bbox,
            confidence: s.confidence,
            track_id: s.track_id.map(TrackId),
        });
        let mut actors = self.actors;
        let mut objects = self.objects;

        for detection in self.detections {
            match classes.role(&detection.class_name) {
                Some(DetectionRole::Subject) => {
                    let better = subject.as_ref().map_or(true, |s| detection.confidence > s.confidence);
                    if better {
                        subject = Some(SubjectObservation {
                            bbox: detection.bbox,
                            confidence: detection.confidence,
                            track_id: detection.track_id.map(TrackId),
                        });
                    }
                }
                Some(DetectionRole::Actor) => actors.push(detection.bbox),
                Some(DetectionRole::Object) => objects.push(detection.bbox),
                None => {}
            }
        }

        Ok(Observation { ts, subject, actors, objects })
    }
}

/// Parse one source line. Blank lines yield None.
pub fn parse_line(line: &str, classes: &ClassMap, received_at: u64) -> Result<Option<Observation>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let frame: FrameRecord = serde_json::from_str(line)?;
    frame.into_observation(classes, received_at).map(Some)
}

/// Forward observations from a JSONL stream until EOF, shutdown, or the
/// receiver goes away. Malformed lines are logged and skipped.
///
/// Returns the number of observations forwarded.
pub async fn read_observations<R>(
    mut reader: R,
    classes: ClassMap,
    tx: mpsc::Sender<Observation>,
    mut shutdown: watch::Receiver<bool>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    // Partial reads stay in `buf` when another select branch wins
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut forwarded = 0usize;

    loop {
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read?,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(forwarded = %forwarded, "source_shutdown");
                    break;
                }
                continue;
            }
        };
        if read == 0 && buf.is_empty() {
            info!(lines = %line_no, forwarded = %forwarded, "source_eof");
            break;
        }
        line_no += 1;
        let bytes = std::mem::take(&mut buf);

        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line,
            Err(e) => {
                metrics.record_source_error();
                warn!(line = %line_no, error = %e, "source_line_skipped");
                continue;
            }
        };

        match parse_line(line, &classes, epoch_ms()) {
            Ok(Some(observation)) => {
                if tx.send(observation).await.is_err() {
                    debug!("source_receiver_closed");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                metrics.record_source_error();
                warn!(line = %line_no, error = %e, "source_line_skipped");
            }
        }
    }

    Ok(forwarded)
}

//! Domain models - geometry, observations, zones and emitted records
//!
//! This module contains the canonical data types used throughout the system:
//! - `BBox`, `Point`, `Velocity` - frame-space geometry
//! - `Observation` - what the source reports for one tick
//! - `Zone`, `BoundaryLine` - static regions configured at startup
//! - `ActivityEvent` - de-duplicated activity change handed to the sink
//! - `SystemEvent` - session lifecycle markers

pub mod event;
pub mod types;
pub mod zone;

pub use event::{ActivityEvent, SystemEvent, SystemEventKind};
pub use types::{BBox, Observation, Point, SubjectObservation, TrackId, Velocity};
pub use zone::{Axis, BoundaryLine, Zone, ZoneRole};

//! Static zone and boundary-line definitions
//!
//! Both are built once from configuration and never change during a session.

use crate::domain::types::{BBox, Point};
use serde::Deserialize;

/// How a zone contributes to activity resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneRole {
    /// Fires its activity after a continuous dwell, then cools down
    #[default]
    Dwell,
    /// Reports its activity whenever occupied and nothing outranks it
    Resting,
}

/// A named rectangular region with its own dwell/cooldown policy
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub bounds: BBox,
    pub activity: String,
    pub role: ZoneRole,
    pub dwell_ms: u64,
    pub cooldown_ms: u64,
}

/// Which center coordinate a boundary line is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal line at y = position; crossed when center.y > position
    Horizontal,
    /// Vertical line at x = position; crossed when center.x > position
    Vertical,
}

/// A line whose crossing is reported once per transition
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryLine {
    pub name: String,
    pub axis: Axis,
    pub position: f64,
    pub activity: String,
    pub cooldown_ms: u64,
}

impl BoundaryLine {
    /// Whether a point lies on the far side of the line
    #[inline]
    pub fn is_beyond(&self, p: Point) -> bool {
        match self.axis {
            Axis::Horizontal => p.y > self.position,
            Axis::Vertical => p.x > self.position,
        }
    }
}

//! Shared geometry and observation types

use serde::{Deserialize, Serialize};

/// Newtype wrapper for tracker-assigned identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TrackId(pub i64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Velocity in frame units per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };
}

/// Axis-aligned box: (x1, y1) is the top-left corner, (x2, y2) the bottom-right.
///
/// Serialized as `[x1, y1, x2, y2]`, the layout detectors emit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BBox {
    fn from(c: [f64; 4]) -> Self {
        Self { x1: c[0], y1: c[1], x2: c[2], y2: c[3] }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BBox {
    #[inline]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// True for a finite box with positive width and height
    #[inline]
    pub fn has_area(&self) -> bool {
        self.is_finite() && self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Strict axis-aligned overlap: both ranges must intersect with positive length.
    /// Degenerate boxes overlap nothing.
    pub fn overlaps(&self, other: &BBox) -> bool {
        if !self.has_area() || !other.has_area() {
            return false;
        }
        self.x1 < other.x2 && self.x2 > other.x1 && self.y1 < other.y2 && self.y2 > other.y1
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// The tracked subject as reported for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectObservation {
    pub bbox: BBox,
    pub confidence: f64,
    pub track_id: Option<TrackId>,
}

/// Everything the observation source reports for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Tick time (epoch ms)
    pub ts: u64,
    /// None when no subject box was reported this tick
    pub subject: Option<SubjectObservation>,
    pub actors: Vec<BBox>,
    pub objects: Vec<BBox>,
}

impl Observation {
    /// An empty tick: no subject, no actors, no objects
    pub fn at(ts: u64) -> Self {
        Self { ts, subject: None, actors: Vec::new(), objects: Vec::new() }
    }

    pub fn with_subject(mut self, bbox: BBox, confidence: f64) -> Self {
        self.subject = Some(SubjectObservation { bbox, confidence, track_id: None });
        self
    }

    pub fn with_track_id(mut self, track_id: i64) -> Self {
        if let Some(subject) = self.subject.as_mut() {
            subject.track_id = Some(TrackId(track_id));
        }
        self
    }

    pub fn with_actor(mut self, bbox: BBox) -> Self {
        self.actors.push(bbox);
        self
    }

    pub fn with_object(mut self, bbox: BBox) -> Self {
        self.objects.push(bbox);
        self
    }

    #[inline]
    pub fn present(&self) -> bool {
        self.subject.is_some()
    }

    /// The subject, if its box is usable this tick.
    ///
    /// A box with non-finite coordinates counts as no subject at all.
    pub fn visible_subject(&self) -> Option<&SubjectObservation> {
        self.subject.as_ref().filter(|s| s.bbox.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_strict() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        // Touching edges do not count
        assert!(!a.overlaps(&BBox::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.overlaps(&BBox::new(0.0, 10.0, 10.0, 20.0)));
        assert!(a.overlaps(&BBox::new(9.0, 9.0, 20.0, 20.0)));
        assert!(a.overlaps(&BBox::new(2.0, 2.0, 3.0, 3.0)));
    }

    #[test]
    fn test_degenerate_boxes_overlap_nothing() {
        let zone = BBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(!BBox::new(50.0, 50.0, 50.0, 60.0).overlaps(&zone));
        assert!(!BBox::new(60.0, 60.0, 40.0, 40.0).overlaps(&zone));
        assert!(!BBox::new(f64::NAN, 0.0, 10.0, 10.0).overlaps(&zone));
        assert!(!zone.overlaps(&BBox::new(50.0, 50.0, 50.0, 50.0)));
    }

    #[test]
    fn test_center_and_distance() {
        let b = BBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(b.center(), Point::new(20.0, 40.0));
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_bbox_serde_as_array() {
        let b: BBox = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(b, BBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
    }

    #[test]
    fn test_non_finite_subject_is_not_visible() {
        let obs = Observation::at(0).with_subject(BBox::new(f64::INFINITY, 0.0, 1.0, 1.0), 0.9);
        assert!(obs.present());
        assert!(obs.visible_subject().is_none());

        let obs = Observation::at(0).with_subject(BBox::new(5.0, 5.0, 5.0, 5.0), 0.9);
        assert!(obs.visible_subject().is_some());
    }
}

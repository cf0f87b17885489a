//! Spatial classification of the subject's box
//!
//! Maps a box to the zones it overlaps and reports boundary crossings.
//! Crossings are edge-triggered: each line remembers which side the subject
//! center was on at its last sighting, so a subject that stays beyond a line
//! produces one crossing, not one per tick.

use crate::domain::types::BBox;
use crate::domain::zone::{BoundaryLine, Zone};
use smallvec::SmallVec;
use tracing::{debug, info};

/// Result of classifying one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Indices of overlapped zones, in priority order
    pub zones: SmallVec<[usize; 4]>,
    /// Indices of lines crossed on this tick
    pub crossings: SmallVec<[usize; 2]>,
}

impl Classification {
    /// First overlapped zone in priority order
    #[inline]
    pub fn primary_zone(&self) -> Option<usize> {
        self.zones.first().copied()
    }

    #[inline]
    pub fn in_zone(&self, index: usize) -> bool {
        self.zones.contains(&index)
    }

    #[inline]
    pub fn crossed(&self, index: usize) -> bool {
        self.crossings.contains(&index)
    }
}

pub struct SpatialClassifier {
    zones: Vec<Zone>,
    boundaries: Vec<BoundaryLine>,
    /// Whether the subject center was beyond each line when last seen
    beyond: Vec<bool>,
}

impl SpatialClassifier {
    pub fn new(zones: Vec<Zone>, boundaries: Vec<BoundaryLine>) -> Self {
        let beyond = vec![false; boundaries.len()];
        Self { zones, boundaries, beyond }
    }

    /// Classify the subject box for this tick.
    ///
    /// An absent or degenerate box yields an empty result and leaves every
    /// line's last side untouched.
    pub fn classify(&mut self, bbox: Option<&BBox>) -> Classification {
        let Some(bbox) = bbox.filter(|b| b.has_area()) else {
            return Classification::default();
        };

        let zones: SmallVec<[usize; 4]> = self
            .zones
            .iter()
            .enumerate()
            .filter(|(_, zone)| bbox.overlaps(&zone.bounds))
            .map(|(i, _)| i)
            .collect();

        let center = bbox.center();
        let mut crossings = SmallVec::new();
        for (i, line) in self.boundaries.iter().enumerate() {
            let beyond = line.is_beyond(center);
            if beyond && !self.beyond[i] {
                info!(boundary = %line.name, x = %center.x, y = %center.y, "boundary_crossed");
                crossings.push(i);
            }
            self.beyond[i] = beyond;
        }

        if !zones.is_empty() {
            debug!(zones = ?zones.iter().map(|&i| self.zones[i].name.as_str()).collect::<Vec<_>>(), "zones_overlapped");
        }

        Classification { zones, crossings }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn boundaries(&self) -> &[BoundaryLine] {
        &self.boundaries
    }

    #[inline]
    pub fn zone(&self, index: usize) -> &Zone {
        &self.zones[index]
    }
}
